// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    notebook = { JobKind::Notebook, "notebook" },
    plantuml = { JobKind::Plantuml, "plantuml" },
    drawio = { JobKind::Drawio, "drawio" },
)]
fn kind_round_trips_through_str(kind: JobKind, s: &str) {
    assert_eq!(kind.as_str(), s);
    assert_eq!(s.parse::<JobKind>().unwrap(), kind);
}

#[test]
fn unknown_kind_is_rejected() {
    assert!("mermaid".parse::<JobKind>().is_err());
}

#[parameterized(
    completed = { JobStatus::Completed },
    failed = { JobStatus::Failed },
    cancelled = { JobStatus::Cancelled },
)]
fn terminal_states_are_terminal(status: JobStatus) {
    assert!(status.is_terminal());
}

#[test]
fn pending_and_processing_are_not_terminal() {
    assert!(!JobStatus::Pending.is_terminal());
    assert!(!JobStatus::Processing.is_terminal());
}

#[parameterized(
    claim = { JobStatus::Pending, JobStatus::Processing },
    cancel = { JobStatus::Pending, JobStatus::Cancelled },
    complete = { JobStatus::Processing, JobStatus::Completed },
    fail = { JobStatus::Processing, JobStatus::Failed },
    reset_hung = { JobStatus::Processing, JobStatus::Pending },
)]
fn legal_transitions(from: JobStatus, to: JobStatus) {
    assert!(from.can_transition_to(to));
}

#[parameterized(
    complete_pending = { JobStatus::Pending, JobStatus::Completed },
    uncancel = { JobStatus::Cancelled, JobStatus::Pending },
    reclaim_completed = { JobStatus::Completed, JobStatus::Processing },
    fail_completed = { JobStatus::Completed, JobStatus::Failed },
)]
fn illegal_transitions(from: JobStatus, to: JobStatus) {
    assert!(!from.can_transition_to(to));
}

#[test]
fn repeated_terminal_write_is_legal() {
    // Idempotent termination: the second write must be accepted as a no-op.
    assert!(JobStatus::Completed.can_transition_to(JobStatus::Completed));
    assert!(JobStatus::Failed.can_transition_to(JobStatus::Failed));
}

#[test]
fn spec_defaults() {
    let spec = JobSpec::new(
        JobKind::Plantuml,
        "a.pu".into(),
        "a.png".into(),
        "hash".into(),
        serde_json::json!({}),
    );
    assert_eq!(spec.priority, 0);
    assert_eq!(spec.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert!(spec.correlation_id.is_none());

    let spec = spec.with_priority(5).with_correlation_id("cid-1");
    assert_eq!(spec.priority, 5);
    assert_eq!(spec.correlation_id.as_deref(), Some("cid-1"));
}
