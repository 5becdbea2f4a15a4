// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - shows the effective configuration

use super::Globals;
use crate::config;
use anyhow::{Context, Result};

/// Run the config command
///
/// With `path`, prints where the user config file lives; with a key, prints
/// that one value; otherwise prints the whole effective configuration.
pub fn run(globals: &Globals, key: Option<&str>, path: bool) -> Result<()> {
    if path {
        let path = config::default_path()
            .ok_or_else(|| anyhow::anyhow!("No configuration directory on this platform"))?;
        println!("{}", path.display());
        return Ok(());
    }

    if let Some(key) = key {
        println!("{}", config::get(&globals.config, key)?);
        return Ok(());
    }

    if globals.out.json {
        let json = serde_json::to_string_pretty(&globals.config)
            .context("Failed to serialize configuration")?;
        println!("{json}");
    } else {
        print!("{}", globals.config.to_toml()?);
    }

    Ok(())
}
