//! CLI help specs
//!
//! Verify top-level usage and subcommand discovery.

use crate::prelude::*;

#[test]
fn help_lists_subcommands() {
    Project::empty()
        .kl()
        .args(&["--help"])
        .passes()
        .stdout_has("contend")
        .stdout_has("config")
        .stdout_has("completions");
}

#[test]
fn contend_help_lists_flags() {
    Project::empty()
        .kl()
        .args(&["contend", "--help"])
        .passes()
        .stdout_has("--owners")
        .stdout_has("--hold")
        .stdout_has("--timeout")
        .stdout_has("--mode");
}

#[test]
fn unknown_mode_is_rejected() {
    Project::empty()
        .kl()
        .args(&["contend", "--mode", "sideways"])
        .fails()
        .stderr_has("sideways");
}

#[test]
fn completions_generate_for_bash() {
    Project::empty()
        .kl()
        .args(&["completions", "bash"])
        .passes()
        .stdout_has("kl");
}
