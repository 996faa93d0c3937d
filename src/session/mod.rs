//! Client-side session synchronization.
//!
//! - [`SessionWatcher`] drives [`AuthState`] from the provider's event
//!   stream and current-session query.
//! - [`AuthStore`] / [`AuthStateReader`] hold and expose the state.
//! - [`DisposalToken`] guards every async continuation against teardown.
//! - [`WatcherHandle::sign_in`] and [`WatcherHandle::sign_out`] are the
//!   credential actions.

mod actions;
mod state;
mod token;
mod types;
mod watcher;

pub use actions::USER_DATA_NOT_FOUND;
pub use state::{AuthState, AuthStateReader, AuthStore};
pub use token::DisposalToken;
pub use types::{AuthEvent, AuthEventKind, AuthSubscription, Session, Unsubscribe};
pub use watcher::{SessionWatcher, WatcherHandle};
