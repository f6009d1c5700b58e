// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Instant;

const DELAY: Duration = Duration::from_millis(50);

#[tokio::test]
async fn burst_of_events_emits_once() {
    let (mut debouncer, mut ready) = Debouncer::new(DELAY);
    for _ in 0..5 {
        debouncer.on_event("a.py".into());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let first = ready.recv().await.unwrap();
    assert_eq!(first, PathBuf::from("a.py"));

    // Nothing else arrives afterwards.
    let extra = tokio::time::timeout(DELAY * 3, ready.recv()).await;
    assert!(extra.is_err(), "burst must collapse to one emission");
}

#[tokio::test]
async fn spaced_events_emit_twice() {
    let (mut debouncer, mut ready) = Debouncer::new(DELAY);
    debouncer.on_event("a.py".into());
    let first = ready.recv().await.unwrap();
    debouncer.mark_settled(&first);

    tokio::time::sleep(DELAY * 2).await;
    debouncer.on_event("a.py".into());
    let second = ready.recv().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn paths_are_debounced_independently() {
    let (mut debouncer, mut ready) = Debouncer::new(DELAY);
    debouncer.on_event("a.py".into());
    debouncer.on_event("b.py".into());

    let mut settled = vec![ready.recv().await.unwrap(), ready.recv().await.unwrap()];
    settled.sort();
    assert_eq!(settled, vec![PathBuf::from("a.py"), PathBuf::from("b.py")]);
}

#[tokio::test]
async fn new_event_restarts_the_timer() {
    let (mut debouncer, mut ready) = Debouncer::new(Duration::from_millis(80));
    let start = Instant::now();
    debouncer.on_event("a.py".into());
    tokio::time::sleep(Duration::from_millis(50)).await;
    debouncer.on_event("a.py".into());

    ready.recv().await.unwrap();
    // The second event pushed the deadline past the original 80ms.
    assert!(start.elapsed() >= Duration::from_millis(120));
}

#[tokio::test]
async fn clear_discards_pending_timers() {
    let (mut debouncer, mut ready) = Debouncer::new(DELAY);
    debouncer.on_event("a.py".into());
    debouncer.clear();
    assert_eq!(debouncer.pending_count(), 0);

    let emission = tokio::time::timeout(DELAY * 3, ready.recv()).await;
    assert!(emission.is_err());
}
