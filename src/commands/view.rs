// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! View command - launches the terminal dashboard

use super::Globals;
use crate::pipeline::Pipeline;
use crate::tui::{self, App, ViewOptions};
use anyhow::{Context, Result};

/// Run the view command
pub fn run(globals: &Globals, seed: Option<u64>) -> Result<()> {
    let config = &globals.config;

    let mut pipeline = Pipeline::new(config).context("Failed to initialise the table loader")?;
    if let Some(seed) = seed {
        pipeline.set_seed(seed);
    }

    let mut app = App::new(
        pipeline,
        config.phases(),
        ViewOptions {
            top_n: config.report.top_n,
            layout: config.layout.clone(),
            output: config.report.output.clone(),
        },
    );

    tui::run(&mut app)
}
