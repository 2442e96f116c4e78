// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::ContendConfig;

fn config(mode: Mode, owners: usize, hold_ms: u64, timeout_ms: Option<u64>) -> CliConfig {
    let mut config = CliConfig {
        lock: LockConfig::new("/locks/contend"),
        contend: ContendConfig {
            owners,
            hold: Duration::from_millis(hold_ms),
            mode,
        },
    };
    config.lock.acquire_timeout = timeout_ms.map(Duration::from_millis);
    config
}

#[tokio::test]
async fn exclusive_contenders_take_turns() {
    let report = run(&config(Mode::Exclusive, 4, 50, None), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.order.len(), 4);
    assert_eq!(report.max_holders, 1);
    assert_eq!(report.timeouts, 0);
    assert_eq!(report.failed, 0);
    // Each waiter is woken exactly once by its predecessor
    assert_eq!(report.watch_fires, 3);
}

#[tokio::test]
async fn short_timeout_gives_up_behind_long_hold() {
    let report = run(
        &config(Mode::Exclusive, 3, 300, Some(30)),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.order.len(), 1);
    assert_eq!(report.timeouts, 2);
}

#[tokio::test]
async fn timed_out_waiter_is_not_counted_as_woken() {
    let report = run(
        &config(Mode::Exclusive, 2, 100, Some(20)),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(report.timeouts, 1);
    // The holder's release fires the abandoned watch, which reaches nobody
    assert_eq!(report.watch_fires, 0);
}

#[tokio::test]
async fn readers_hold_together() {
    let report = run(&config(Mode::Read, 3, 200, None), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.order.len(), 3);
    assert_eq!(report.max_holders, 3);
    assert_eq!(report.max_exclusive, 0);
    assert_eq!(report.watch_fires, 0);
}

#[tokio::test]
async fn mixed_mode_never_overlaps_a_writer() {
    let report = run(&config(Mode::Mixed, 6, 5, None), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.order.len(), 6);
    assert_eq!(report.max_exclusive, 1);
    assert_eq!(report.rw_overlaps, 0);
    let writers = report
        .contenders
        .iter()
        .filter(|c| c.role == Role::Writer)
        .count();
    assert_eq!(writers, 2);
}

#[tokio::test]
async fn cancelled_token_stops_waiters() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run(&config(Mode::Exclusive, 3, 10, None), cancel)
        .await
        .unwrap();

    // The first contender may still win the free lock before noticing
    assert_eq!(report.cancelled + report.order.len(), 3);
    assert!(report.cancelled >= 2);
}

#[tokio::test]
async fn zero_owners_is_an_error() {
    let err = run(&config(Mode::Exclusive, 0, 10, None), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("--owners"));
}

#[test]
fn mixed_mode_assigns_every_third_writer() {
    let roles: Vec<Role> = (0..6).map(|i| Role::for_contender(Mode::Mixed, i)).collect();
    assert_eq!(
        roles,
        vec![
            Role::Writer,
            Role::Reader,
            Role::Reader,
            Role::Writer,
            Role::Reader,
            Role::Reader
        ]
    );
}

#[test]
fn reader_entering_under_a_writer_counts_as_overlap() {
    let occupancy = Occupancy::default();

    occupancy.enter(Role::Writer);
    occupancy.enter(Role::Reader);

    assert_eq!(occupancy.overlaps.load(Ordering::SeqCst), 1);
    assert_eq!(occupancy.peak_exclusive.load(Ordering::SeqCst), 1);
}

#[test]
fn writer_entering_over_readers_counts_as_overlap() {
    let occupancy = Occupancy::default();

    occupancy.enter(Role::Reader);
    occupancy.enter(Role::Reader);
    occupancy.leave(Role::Reader);
    occupancy.enter(Role::Writer);

    assert_eq!(occupancy.overlaps.load(Ordering::SeqCst), 1);
    assert_eq!(occupancy.peak_holders.load(Ordering::SeqCst), 2);
}

#[test]
fn shared_leases_and_disjoint_holds_are_not_overlaps() {
    let occupancy = Occupancy::default();

    occupancy.enter(Role::Mutex);
    occupancy.enter(Role::Mutex);
    occupancy.leave(Role::Mutex);
    occupancy.leave(Role::Mutex);
    occupancy.enter(Role::Writer);
    occupancy.leave(Role::Writer);
    occupancy.enter(Role::Reader);

    assert_eq!(occupancy.overlaps.load(Ordering::SeqCst), 0);
}
