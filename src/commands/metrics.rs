// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Metrics command - runs a phase and prints its cards and ranked tables

use super::{analyse, print_notices, Globals, Output, PhaseArgs};
use crate::metrics::Ranked;
use crate::render;
use anyhow::{Context, Result};

/// Run the metrics command
pub fn run(globals: &Globals, args: &PhaseArgs) -> Result<()> {
    let report = analyse(globals, args)?;
    let top_n = args.top_n(&globals.config);
    let out = globals.out;

    if out.json {
        let json = serde_json::to_string_pretty(&render::summary_value(&report, top_n))
            .context("Failed to serialize metrics")?;
        println!("{json}");
        return Ok(());
    }

    print_notices(out, &report);

    let metrics = &report.metrics;
    println!("{}", out.heading(&report.phase.name));
    if !report.phase.description.is_empty() {
        println!("{}", report.phase.description);
    }
    println!();
    println!(
        "Nodes {}  Edges {}  Density {}  Modularity {}  Communities {}",
        out.value(&metrics.node_count.to_string()),
        out.value(&metrics.edge_count.to_string()),
        out.value(&format!("{:.4}", metrics.density)),
        out.value(&format!("{:.4}", metrics.modularity)),
        out.value(&metrics.partition.community_count().to_string()),
    );
    println!();

    print_table(out, "Top by Degree", &metrics.top_by_degree(&report.graph, top_n));
    println!();
    print_table(
        out,
        "Top by Betweenness",
        &metrics.top_by_betweenness(&report.graph, top_n),
    );

    Ok(())
}

fn print_table(out: Output, title: &str, rows: &[Ranked]) {
    println!("{}", out.heading(title));
    let width = rows
        .iter()
        .map(|r| r.label.chars().count())
        .max()
        .unwrap_or(0)
        .max("Character".len());

    println!("  {:>3}  {:<width$}  {:>8}  Group", "#", "Character", "Score");
    for (i, row) in rows.iter().enumerate() {
        let group = row
            .community
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "  {:>3}  {:<width$}  {:>8.4}  {}",
            i + 1,
            row.label,
            row.score,
            group
        );
    }
}
