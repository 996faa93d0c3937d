//! In-memory profile store for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::error::StoreError;
use crate::profile::ProfileRecord;
use crate::session::Session;
use crate::traits::ProfileStore;

type RecordReply = Result<Option<ProfileRecord>, StoreError>;

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<String, ProfileRecord>,
    failures: HashMap<String, StoreError>,
    deferred: HashMap<String, VecDeque<oneshot::Receiver<RecordReply>>>,
    lookups: HashMap<String, usize>,
}

/// Profile store holding records in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, subject_id: &str, record: ProfileRecord) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(subject_id.to_string(), record);
    }

    pub fn remove(&self, subject_id: &str) {
        self.state.lock().unwrap().records.remove(subject_id);
    }

    /// Make lookups for `subject_id` fail with `err`.
    pub fn fail_for(&self, subject_id: &str, err: StoreError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(subject_id.to_string(), err);
    }

    /// Hold the next lookup for `subject_id` until the returned sender fires.
    pub fn defer(&self, subject_id: &str) -> oneshot::Sender<RecordReply> {
        let (tx, rx) = oneshot::channel();
        self.state
            .lock()
            .unwrap()
            .deferred
            .entry(subject_id.to_string())
            .or_default()
            .push_back(rx);
        tx
    }

    /// Lookups made for `subject_id` so far.
    pub fn lookup_count(&self, subject_id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .lookups
            .get(subject_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn find_by_subject(&self, session: &Session) -> Result<Option<ProfileRecord>, StoreError> {
        let subject = session.subject_id.as_str();
        let deferred = {
            let mut state = self.state.lock().unwrap();
            *state.lookups.entry(subject.to_string()).or_default() += 1;

            match state.deferred.get_mut(subject).and_then(VecDeque::pop_front) {
                Some(rx) => rx,
                None => {
                    if let Some(err) = state.failures.get(subject) {
                        return Err(err.clone());
                    }
                    return Ok(state.records.get(subject).cloned());
                }
            }
        };

        match deferred.await {
            Ok(reply) => reply,
            Err(_) => Err(StoreError::Transport("mock reply dropped".to_string())),
        }
    }
}
