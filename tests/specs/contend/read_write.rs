//! Read/write contention specs
//!
//! Verify readers share and writers exclude.

use crate::prelude::*;

#[test]
fn readers_hold_together() {
    Project::empty()
        .kl()
        .args(&["contend", "--mode", "read", "--owners", "4", "--hold", "300ms"])
        .passes()
        .stdout_has("Max holders: 4")
        .stdout_has("Max exclusive holders: 0")
        .stdout_has("Watch fires: 0");
}

#[test]
fn writers_hold_alone() {
    Project::empty()
        .kl()
        .args(&["contend", "--mode", "write", "--owners", "3", "--hold", "20ms"])
        .passes()
        .stdout_has("Max holders: 1")
        .stdout_has("Max exclusive holders: 1");
}

#[test]
fn mixed_mode_completes_without_failures() {
    Project::empty()
        .kl()
        .args(&["contend", "--mode", "mixed", "--owners", "6", "--hold", "10ms"])
        .passes()
        .stdout_has("Mode: mixed")
        .stdout_has("Max exclusive holders: 1")
        .stdout_has("Read/write overlaps: 0")
        .stdout_has("Failed: 0")
        .stdout_has("Timeouts: 0");
}
