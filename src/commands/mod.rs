// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod export;
pub mod metrics;
pub mod phases;
pub mod render;
pub mod view;

use crate::config::Config;
use crate::phases::{self as catalog, PhaseDataset};
use crate::pipeline::{PhaseReport, Pipeline};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use tracing::info;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Globals {
    /// Effective configuration
    pub config: Config,
    /// Terminal output style
    pub out: Output,
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Machine-readable JSON instead of text
    pub json: bool,
    /// ANSI colours in text output
    pub color: bool,
}

impl Output {
    /// Section heading
    #[must_use]
    pub fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    /// A highlighted value
    #[must_use]
    pub fn value(&self, text: &str) -> String {
        if self.color {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }

    /// A notice the user should not miss
    #[must_use]
    pub fn notice(&self, text: &str) -> String {
        if self.color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Phase selection shared by `metrics`, `render` and `export`
#[derive(Debug, Clone, Default, clap::Args)]
pub struct PhaseArgs {
    /// Phase to analyse: key, 1-based index or part of the name
    #[arg(short, long, conflicts_with_all = ["nodes", "edges"])]
    pub phase: Option<String>,

    /// Ad-hoc node table (URL or path)
    #[arg(long, requires = "edges")]
    pub nodes: Option<String>,

    /// Ad-hoc edge table (URL or path)
    #[arg(long, requires = "nodes")]
    pub edges: Option<String>,

    /// Community detection seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Rows in each ranked table
    #[arg(long)]
    pub top: Option<usize>,
}

impl PhaseArgs {
    /// Ranked table size, falling back to configuration
    #[must_use]
    pub fn top_n(&self, config: &Config) -> usize {
        self.top.unwrap_or(config.report.top_n)
    }
}

/// Resolve the phase a command should run; the first catalog entry when none is given
pub fn resolve_phase(args: &PhaseArgs, config: &Config) -> Result<PhaseDataset> {
    if let (Some(nodes), Some(edges)) = (&args.nodes, &args.edges) {
        return Ok(PhaseDataset::ad_hoc(nodes, edges));
    }

    let phases = config.phases();
    let selector = args.phase.as_deref().unwrap_or("1");
    catalog::find(&phases, selector).cloned().ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown phase: {}. Run 'charnet phases' to list them",
            selector
        )
    })
}

/// Load and analyse the selected phase
pub fn analyse(globals: &Globals, args: &PhaseArgs) -> Result<PhaseReport> {
    let phase = resolve_phase(args, &globals.config)?;
    info!("Selected phase: {}", phase.name);

    let mut pipeline =
        Pipeline::new(&globals.config).context("Failed to initialise the table loader")?;
    if let Some(seed) = args.seed {
        pipeline.set_seed(seed);
    }

    pipeline
        .run(&phase)
        .with_context(|| format!("Failed to load phase '{}'", phase.name))
}

/// Print the zero-case and data-quality notices for a report to stderr
pub fn print_notices(out: Output, report: &PhaseReport) {
    if report.has_no_edges() {
        eprintln!(
            "{}",
            out.notice("Note: this phase has no relationships; all metrics are zero.")
        );
    }
    if report.build.dangling_edges > 0 {
        eprintln!(
            "{}",
            out.notice(&format!(
                "Note: {} relationship row(s) referenced unknown characters and were dropped.",
                report.build.dangling_edges
            ))
        );
    }
    if !report.rejected.is_empty() {
        eprintln!(
            "{}",
            out.notice(&format!(
                "Warning: {} malformed row(s) skipped:",
                report.rejected.len()
            ))
        );
        for row in &report.rejected {
            eprintln!("  {} line {}: {}", row.table, row.line, row.reason);
        }
    }
}
