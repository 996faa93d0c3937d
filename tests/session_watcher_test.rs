//! Integration tests for session reconciliation.
//!
//! These tests pin down the order in which pushed auth events, the
//! current-session query, and profile lookups resolve, and check that the
//! final auth state follows the newest presence signal:
//! - Push and pull arriving in either order
//! - Stale hydrations finishing after a newer signal
//! - Hydration failures and missing records
//! - Disposal while work is still in flight

mod common;

use common::*;
use tenantdash::error::{ProviderError, StoreError};
use tenantdash::{AuthEvent, AuthEventKind, AuthState};

/// Push SIGNED_IN, then the current-session query resolves absent.
#[tokio::test]
async fn test_signed_in_event_then_absent_pull() {
    let harness = Harness::with_records(&["u1"]);
    let pull = harness.provider.defer_current_session();
    let handle = harness.start();
    settle().await;

    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    settle().await;
    assert_eq!(handle.snapshot(), signed_in("u1"));

    pull.send(Ok(None)).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_in("u1"));
}

/// The current-session query resolves present before any event.
#[tokio::test]
async fn test_present_pull_before_any_event() {
    let harness = Harness::with_records(&["u1"]);
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_in("u1"));
    assert_eq!(harness.store.lookup_count("u1"), 1);
}

/// SIGNED_OUT arrives while the SIGNED_IN hydration is still in flight.
#[tokio::test]
async fn test_signed_out_while_hydration_in_flight() {
    let harness = Harness::with_records(&["u1"]);
    let lookup = harness.store.defer("u1");
    let handle = harness.start();
    settle().await;

    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    settle().await;
    harness.provider.emit(AuthEvent::signed_out());
    settle().await;
    assert_eq!(handle.snapshot(), signed_out());

    lookup.send(Ok(Some(record_for("u1")))).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_out());
}

/// A valid session with no provisioned record reads as signed out.
#[tokio::test]
async fn test_missing_record_is_signed_out() {
    let harness = Harness::new();
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_out());
}

#[tokio::test]
async fn test_record_without_tenant_is_signed_out() {
    let harness = Harness::new();
    harness.store.insert(
        "u1",
        tenantdash::ProfileRecord {
            tenant_id: None,
            ..record_for("u1")
        },
    );
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_out());
}

#[tokio::test]
async fn test_hydration_failure_fails_closed() {
    let harness = Harness::new();
    harness
        .store
        .fail_for("u1", StoreError::Transport("connection reset".to_string()));
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_out());
}

#[tokio::test]
async fn test_current_session_failure_resolves_ready() {
    let harness = Harness::new();
    harness
        .provider
        .fail_current_session(ProviderError::Transport("offline".to_string()));
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_out());
}

#[tokio::test]
async fn test_absent_pull_without_events() {
    let harness = Harness::new();
    let handle = harness.start();

    assert_eq!(ready(&handle).await, signed_out());
}

/// An event installed between subscribe and the pull is not lost.
#[tokio::test]
async fn test_event_before_pull_resolves_is_delivered() {
    let harness = Harness::with_records(&["u1"]);
    let pull = harness.provider.defer_current_session();
    let handle = harness.start();

    // No yield since start: the event loop has not polled yet.
    assert_eq!(harness.provider.emit(AuthEvent::signed_in(session("u1"))), 1);
    assert_eq!(ready(&handle).await, signed_in("u1"));

    pull.send(Ok(None)).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_in("u1"));
}

/// A present pull is superseded by a later SIGNED_OUT even if its
/// hydration finishes last.
#[tokio::test]
async fn test_pull_hydration_superseded_by_signed_out() {
    let harness = Harness::with_records(&["u1"]);
    let lookup = harness.store.defer("u1");
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();
    settle().await;
    assert_eq!(harness.store.lookup_count("u1"), 1);

    harness.provider.emit(AuthEvent::signed_out());
    settle().await;
    assert_eq!(handle.snapshot(), signed_out());

    lookup.send(Ok(Some(record_for("u1")))).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_out());
}

/// Both paths present for the same subject: redundant work, same state.
#[tokio::test]
async fn test_same_subject_from_both_paths() {
    let harness = Harness::with_records(&["u1"]);
    harness.provider.set_current_session(Some(session("u1")));
    let handle = harness.start();
    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    settle().await;

    assert_eq!(handle.snapshot(), signed_in("u1"));
}

/// Hydrations for two sign-ins resolve in either order; the later
/// sign-in wins.
#[tokio::test]
async fn test_newest_sign_in_wins_regardless_of_completion_order() {
    for release_newest_first in [true, false] {
        let harness = Harness::new();
        let first = harness.store.defer("u1");
        let second = harness.store.defer("u2");
        let handle = harness.start();
        settle().await;

        harness.provider.emit(AuthEvent::signed_in(session("u1")));
        harness.provider.emit(AuthEvent::signed_in(session("u2")));
        settle().await;

        if release_newest_first {
            second.send(Ok(Some(record_for("u2")))).unwrap();
            settle().await;
            first.send(Ok(Some(record_for("u1")))).unwrap();
        } else {
            first.send(Ok(Some(record_for("u1")))).unwrap();
            settle().await;
            second.send(Ok(Some(record_for("u2")))).unwrap();
        }
        settle().await;

        assert_eq!(
            handle.snapshot(),
            signed_in("u2"),
            "release_newest_first = {}",
            release_newest_first
        );
    }
}

/// Events other than SIGNED_IN that carry a session re-hydrate.
#[tokio::test]
async fn test_token_refreshed_with_session_hydrates() {
    let harness = Harness::with_records(&["u1"]);
    let _pull = harness.provider.defer_current_session();
    let handle = harness.start();
    settle().await;

    harness.provider.emit(AuthEvent::new(
        AuthEventKind::TokenRefreshed,
        Some(session("u1")),
    ));
    assert_eq!(ready(&handle).await, signed_in("u1"));
}

/// A sessionless non-sign-out event marks ready without dropping the
/// profile or cancelling an in-flight hydration.
#[tokio::test]
async fn test_sessionless_event_keeps_profile() {
    let harness = Harness::with_records(&["u1"]);
    let lookup = harness.store.defer("u1");
    let pull = harness.provider.defer_current_session();
    let handle = harness.start();
    settle().await;

    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    harness
        .provider
        .emit(AuthEvent::new(AuthEventKind::UserUpdated, None));
    settle().await;
    assert_eq!(handle.snapshot(), signed_out());

    lookup.send(Ok(Some(record_for("u1")))).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_in("u1"));

    pull.send(Ok(Some(session("u1")))).unwrap();
    settle().await;
    assert_eq!(handle.snapshot(), signed_in("u1"));
    assert_eq!(harness.store.lookup_count("u1"), 1);
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

#[derive(Debug, Clone)]
enum Step {
    Push(AuthEvent),
    Pull(Option<&'static str>),
}

fn expected_after(steps: &[Step]) -> AuthState {
    let last_push = steps.iter().rev().find_map(|step| match step {
        Step::Push(event) => Some(event.clone()),
        Step::Pull(_) => None,
    });

    match last_push {
        Some(event) if event.kind == AuthEventKind::SignedOut => signed_out(),
        Some(event) => signed_in(event.subject_id().unwrap()),
        None => match steps.iter().find_map(|step| match step {
            Step::Pull(subject) => Some(*subject),
            Step::Push(_) => None,
        }) {
            Some(Some(subject)) => signed_in(subject),
            _ => signed_out(),
        },
    }
}

/// Every ordering of pushes and the pull ends on the newest presence signal.
#[tokio::test]
async fn test_final_state_follows_newest_signal_in_any_order() {
    let pushes = [
        Step::Push(AuthEvent::signed_in(session("u1"))),
        Step::Push(AuthEvent::signed_out()),
        Step::Push(AuthEvent::signed_in(session("u2"))),
    ];

    for pull in [Step::Pull(None), Step::Pull(Some("u3"))] {
        let mut steps: Vec<Step> = pushes.to_vec();
        steps.push(pull);

        for order in permutations(&steps) {
            let harness = Harness::with_records(&["u1", "u2", "u3"]);
            let reply = harness.provider.defer_current_session();
            let handle = harness.start();
            settle().await;

            let mut reply = Some(reply);
            for step in &order {
                match step {
                    Step::Push(event) => {
                        harness.provider.emit(event.clone());
                    }
                    Step::Pull(subject) => {
                        let answer = subject.map(session);
                        reply.take().unwrap().send(Ok(answer)).unwrap();
                    }
                }
                settle().await;
            }

            assert_eq!(handle.snapshot(), expected_after(&order), "order: {:?}", order);
        }
    }
}

/// Disposing before the pull resolves leaves the state untouched.
#[tokio::test]
async fn test_dispose_before_pull_resolves() {
    let harness = Harness::with_records(&["u1"]);
    let pull = harness.provider.defer_current_session();
    let handle = harness.start();
    let reader = handle.state();

    handle.dispose();
    pull.send(Ok(Some(session("u1")))).unwrap();
    settle().await;

    assert_eq!(reader.current(), AuthState::default());
    assert_eq!(harness.store.lookup_count("u1"), 0);
}

/// Disposing while a hydration is in flight discards its result.
#[tokio::test]
async fn test_dispose_while_hydration_in_flight() {
    let harness = Harness::with_records(&["u1"]);
    let lookup = harness.store.defer("u1");
    let _pull = harness.provider.defer_current_session();
    let handle = harness.start();
    let reader = handle.state();
    settle().await;

    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    settle().await;
    assert_eq!(harness.store.lookup_count("u1"), 1);

    handle.dispose();
    lookup.send(Ok(Some(record_for("u1")))).unwrap();
    settle().await;

    assert_eq!(reader.current(), AuthState::default());
}

/// Events after disposal are not delivered.
#[tokio::test]
async fn test_events_after_dispose_are_ignored() {
    let harness = Harness::with_records(&["u1"]);
    let handle = harness.start();
    let reader = handle.state();
    assert_eq!(ready(&handle).await, signed_out());

    handle.dispose();
    settle().await;
    assert_eq!(harness.provider.emit(AuthEvent::signed_in(session("u1"))), 0);
    settle().await;

    assert_eq!(reader.current(), signed_out());
    assert_eq!(harness.provider.unsubscribe_count(), 1);
}

/// Ready never reverts once set.
#[tokio::test]
async fn test_ready_is_monotonic() {
    let harness = Harness::with_records(&["u1"]);
    let handle = harness.start();
    assert!(ready(&handle).await.ready);
    let mut reader = handle.state();

    harness.provider.emit(AuthEvent::signed_in(session("u1")));
    harness.provider.emit(AuthEvent::signed_out());
    harness.provider.emit(AuthEvent::signed_in(session("u1")));

    loop {
        let state = tokio::time::timeout(std::time::Duration::from_secs(5), reader.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(state.ready);
        if state == signed_in("u1") {
            break;
        }
    }
}
