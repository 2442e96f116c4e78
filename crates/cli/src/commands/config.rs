// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kl config` - Print the effective configuration
//!
//! Accepts the same flags as `kl contend` so their effect can be previewed.

use super::contend::ContendArgs;
use crate::config::CliConfig;

#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub contend: ContendArgs,
}

pub fn handle(args: &ConfigArgs, config: CliConfig) -> anyhow::Result<()> {
    let effective = config.apply(args.contend.overrides());
    if args.contend.json {
        println!("{}", serde_json::to_string_pretty(&effective)?);
    } else {
        print!("{}", effective.to_toml()?);
    }
    Ok(())
}
