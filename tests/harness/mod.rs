//! Shared fixtures for the call flow integration tests

#![allow(dead_code)]

pub mod media;

use std::time::Duration;

use roomcall::{CallSnapshot, SessionController};

/// Poll the controller's snapshot until the predicate holds.
///
/// Panics after five (virtual) seconds; every test uses a paused clock, so
/// waiting costs nothing in wall time.
pub async fn wait_until(
    controller: &SessionController,
    what: &str,
    predicate: impl Fn(&CallSnapshot) -> bool,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if predicate(&controller.snapshot()) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until `condition` returns true, polling on the paused clock
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition() {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
