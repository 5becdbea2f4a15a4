// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Render command - writes the HTML dashboard for a phase

use super::{analyse, print_notices, Globals, PhaseArgs};
use crate::render;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Run the render command
pub fn run(globals: &Globals, args: &PhaseArgs, output: Option<PathBuf>) -> Result<()> {
    let report = analyse(globals, args)?;
    print_notices(globals.out, &report);

    let layout = report.layout(&globals.config.layout);
    let html = render::dashboard_html(&report, &layout, args.top_n(&globals.config))?;

    let path = output.unwrap_or_else(|| globals.config.report.output.clone());
    fs::write(&path, html).with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Dashboard written for {}", report.phase.key);

    if globals.out.json {
        println!("{}", serde_json::json!({ "output": path }));
    } else {
        println!("Wrote dashboard to {}", path.display());
    }

    Ok(())
}
