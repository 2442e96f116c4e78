//! Config display specs
//!
//! Verify `kl config` merges kl.toml with flags.

use crate::prelude::*;

#[test]
fn defaults_print_without_a_file() {
    Project::empty()
        .kl()
        .args(&["config"])
        .passes()
        .stdout_has("[lock]")
        .stdout_has("base_path = \"/locks\"")
        .stdout_has("[contend]")
        .stdout_has("mode = \"exclusive\"");
}

#[test]
fn kl_toml_in_working_directory_is_used() {
    let temp = Project::empty();
    temp.file(
        "kl.toml",
        "[lock]\nbase_path = \"/locks/deploy\"\n\n[contend]\nowners = 9\n",
    );

    temp.kl()
        .args(&["config"])
        .passes()
        .stdout_has("/locks/deploy")
        .stdout_has("owners = 9");
}

#[test]
fn flags_override_the_file() {
    let temp = Project::empty();
    temp.file("conf/locks.toml", "[contend]\nowners = 9\nmode = \"read\"\n");

    temp.kl()
        .args(&["config", "--config", "conf/locks.toml", "--owners", "2"])
        .passes()
        .stdout_has("owners = 2")
        .stdout_has("mode = \"read\"")
        .stdout_lacks("owners = 9");
}

#[test]
fn missing_config_file_fails() {
    Project::empty()
        .kl()
        .args(&["config", "--config", "nope.toml"])
        .fails()
        .stderr_has("nope.toml");
}
