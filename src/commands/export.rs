// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - writes a phase graph as DOT or JSON

use super::{analyse, print_notices, Globals, PhaseArgs};
use crate::render;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON format
    Json,
}

impl ExportFormat {
    /// File extension for the format
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dot => "dot",
            Self::Json => "json",
        }
    }
}

/// Run the export command
pub fn run(
    globals: &Globals,
    args: &PhaseArgs,
    format: ExportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    info!("Exporting to {}", format.extension());

    let report = analyse(globals, args)?;
    print_notices(globals.out, &report);

    let content = match format {
        ExportFormat::Dot => render::to_dot(&report),
        ExportFormat::Json => {
            let layout = report.layout(&globals.config.layout);
            render::to_json(&report, &layout, args.top_n(&globals.config))?
        }
    };

    match output {
        Some(path) => {
            fs::write(&path, &content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
            eprintln!("Exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}
