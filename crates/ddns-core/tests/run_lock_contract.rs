//! Contract Test: Run Serialization & Deadline
//!
//! This test verifies the guarded run: lock, deadline, release.
//!
//! Constraints verified:
//! - A held lock makes the run a successful no-op that touches nothing
//! - The lock file is removed on success, on failure, on deadline expiry
//!   and when the run future is dropped
//! - The overall deadline cancels in-flight work with a timeout error
//!
//! If this test fails, overlapping invocations can race or a crash can
//! block every future run.

mod common;

use common::*;
use ddns_core::RunLock;
use ddns_core::engine::{Reconciler, RunStatus, run_exclusive};
use ddns_core::error::Error;
use std::time::Duration;
use tempfile::tempdir;

const DEADLINE: Duration = Duration::from_secs(5);

fn build(
    ip_source: StaticIpSource,
    provider: &MockDnsProvider,
    config: &ddns_core::DdnsConfig,
) -> Reconciler {
    let (reconciler, _events) = Reconciler::new(
        Box::new(ip_source),
        Box::new(MockDnsProvider::sharing_state_with(provider)),
        Box::new(MockStateStore::new()),
        config,
    )
    .expect("reconciler construction succeeds");
    reconciler
}

#[tokio::test]
async fn held_lock_skips_run_without_side_effects() {
    let dir = tempdir().unwrap();
    let mut config = minimal_config();
    config.state.dir = dir.path().to_path_buf();

    let _held = RunLock::try_acquire(config.lock_file())
        .unwrap()
        .expect("first acquire succeeds");

    let ip_source = StaticIpSource::new(RESOLVED_IP);
    let ip_calls = StaticIpSource::sharing_counters_with(&ip_source);
    let provider = MockDnsProvider::empty();
    let reconciler = build(ip_source, &provider, &config);

    let status = run_exclusive(&reconciler, config.lock_file(), DEADLINE)
        .await
        .expect("contention is not an error");

    assert_eq!(status, RunStatus::Skipped);
    assert_eq!(ip_calls.call_count(), 0);
    assert!(provider.calls().is_empty());
    assert!(config.lock_file().exists(), "the holder's lock stays in place");
}

#[tokio::test]
async fn lock_released_after_successful_run() {
    let dir = tempdir().unwrap();
    let mut config = minimal_config();
    config.state.dir = dir.path().to_path_buf();

    let provider = MockDnsProvider::empty();
    let reconciler = build(StaticIpSource::new(RESOLVED_IP), &provider, &config);

    let status = run_exclusive(&reconciler, config.lock_file(), DEADLINE)
        .await
        .expect("run succeeds");

    assert!(matches!(status, RunStatus::Completed(_)));
    assert!(!config.lock_file().exists());
}

#[tokio::test]
async fn lock_released_after_failed_run() {
    let dir = tempdir().unwrap();
    let mut config = minimal_config();
    config.state.dir = dir.path().to_path_buf();

    let provider = MockDnsProvider::empty().fail_list();
    let reconciler = build(StaticIpSource::new(RESOLVED_IP), &provider, &config);

    let err = run_exclusive(&reconciler, config.lock_file(), DEADLINE)
        .await
        .expect_err("list failure propagates");

    assert!(matches!(err, Error::List(_)));
    assert!(!config.lock_file().exists());
}

#[tokio::test]
async fn deadline_aborts_run_and_releases_lock() {
    let dir = tempdir().unwrap();
    let mut config = minimal_config();
    config.state.dir = dir.path().to_path_buf();

    let provider = MockDnsProvider::empty().slow_list(Duration::from_secs(30));
    let reconciler = build(StaticIpSource::new(RESOLVED_IP), &provider, &config);

    let deadline = Duration::from_millis(50);
    let err = run_exclusive(&reconciler, config.lock_file(), deadline)
        .await
        .expect_err("slow listing must hit the deadline");

    assert!(matches!(err, Error::Timeout(d) if d == deadline));
    assert!(provider.mutations().is_empty());
    assert!(!config.lock_file().exists());
}

#[tokio::test]
async fn dropped_run_future_releases_lock() {
    let dir = tempdir().unwrap();
    let mut config = minimal_config();
    config.state.dir = dir.path().to_path_buf();

    let provider = MockDnsProvider::empty().slow_list(Duration::from_secs(30));
    let reconciler = build(StaticIpSource::new(RESOLVED_IP), &provider, &config);

    // Stands in for a shutdown signal winning the race in the binary
    tokio::select! {
        _ = run_exclusive(&reconciler, config.lock_file(), DEADLINE) => {
            panic!("run should still be waiting on the slow listing");
        }
        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
    }

    assert!(!config.lock_file().exists());
    assert!(RunLock::try_acquire(config.lock_file()).unwrap().is_some());
}
