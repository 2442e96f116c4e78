//! Exclusive contention specs
//!
//! Verify the mutex admits one holder at a time and waiters give up on
//! timeout.

use crate::prelude::*;

#[test]
fn contenders_take_turns() {
    Project::empty()
        .kl()
        .args(&["contend", "--owners", "4", "--hold", "20ms"])
        .passes()
        .stdout_has("Mode: exclusive")
        .stdout_has("Max holders: 1")
        .stdout_has("Timeouts: 0")
        .stdout_has("Failed: 0");
}

#[test]
fn waiters_time_out_behind_a_long_hold() {
    Project::empty()
        .kl()
        .args(&[
            "contend",
            "--owners",
            "3",
            "--hold",
            "500ms",
            "--timeout",
            "50ms",
        ])
        .passes()
        .stdout_has("Timeouts: 2");
}

#[test]
fn leases_admit_several_holders() {
    Project::empty()
        .kl()
        .args(&[
            "contend",
            "--owners",
            "4",
            "--hold",
            "300ms",
            "--max-leases",
            "2",
        ])
        .passes()
        .stdout_has("Max holders: 2");
}

#[test]
fn json_report_is_machine_readable() {
    let run = Project::empty()
        .kl()
        .args(&["contend", "--owners", "2", "--hold", "10ms", "--json"])
        .passes();

    let report: serde_json::Value = serde_json::from_str(run.stdout()).unwrap();
    assert_eq!(report["mode"], "exclusive");
    assert_eq!(report["max_holders"], 1);
    assert_eq!(report["order"].as_array().unwrap().len(), 2);
    assert_eq!(report["contenders"][0]["outcome"], "acquired");
}

#[test]
fn zero_owners_fails_with_hint() {
    Project::empty()
        .kl()
        .args(&["contend", "--owners", "0"])
        .fails()
        .stderr_has("--owners");
}
