//! Disposal token shared by a watcher and its pending continuations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative disposal flag.
///
/// One token is created per watcher start and cloned into every task the
/// watcher spawns. Continuations check it before folding; disposal never
/// aborts them.
#[derive(Debug, Clone, Default)]
pub struct DisposalToken {
    disposed: Arc<AtomicBool>,
}

impl DisposalToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = DisposalToken::new();
        let captured = token.clone();
        assert!(!captured.is_disposed());

        token.dispose();
        assert!(captured.is_disposed());
        assert!(token.is_disposed());
    }
}
