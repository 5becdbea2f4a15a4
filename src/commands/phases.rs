// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Phases command - lists the phase catalog

use super::Globals;
use anyhow::{Context, Result};

/// Run the phases command
pub fn run(globals: &Globals) -> Result<()> {
    let phases = globals.config.phases();

    if globals.out.json {
        let json = serde_json::to_string_pretty(&phases).context("Failed to serialize phases")?;
        println!("{json}");
        return Ok(());
    }

    let out = globals.out;
    for (i, phase) in phases.iter().enumerate() {
        println!(
            "{:>2}. {}  {}",
            i + 1,
            out.value(&phase.key),
            out.heading(&phase.name)
        );
        if !phase.description.is_empty() {
            println!("    {}", phase.description);
        }
    }

    Ok(())
}
