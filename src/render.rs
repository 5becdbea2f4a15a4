// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Presentation: the HTML dashboard and the DOT/JSON exports

use crate::layout::{self, GraphLayout, EDGE_COLOR, FALLBACK_COLOR};
use crate::metrics::Ranked;
use crate::phases::CONCLUSION;
use crate::pipeline::PhaseReport;
use anyhow::{Context, Result};
use chrono::Utc;

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");

/// Escape text for HTML element content and quoted attributes
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Substitute `{{NAME}}` placeholders in a single pass
///
/// Substituted values are never rescanned, so a label containing `{{TITLE}}`
/// stays literal. Unknown placeholders are left as they are.
fn fill(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let value = after
            .find("}}")
            .and_then(|end| {
                let name = &after[..end];
                vars.iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (value, end))
            });
        match value {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

// =============================================================================
// HTML dashboard
// =============================================================================

/// Render the full dashboard document for one phase
pub fn dashboard_html(report: &PhaseReport, layout: &GraphLayout, top_n: usize) -> Result<String> {
    let graph_json = serde_json::to_string(layout)
        .context("Failed to serialize layout")?
        .replace("</", "<\\/");

    let metrics = &report.metrics;
    let vars = [
        ("TITLE", escape_html(&report.phase.name)),
        ("DESCRIPTION", escape_html(&report.phase.description)),
        ("NOTICES", notices_html(report)),
        (
            "CARDS",
            [
                card("Nodes", &metrics.node_count.to_string()),
                card("Edges", &metrics.edge_count.to_string()),
                card("Density", &format!("{:.4}", metrics.density)),
                card("Modularity", &format!("{:.4}", metrics.modularity)),
            ]
            .join("\n"),
        ),
        ("WIDTH", format!("{}", layout.width)),
        ("HEIGHT", format!("{}", layout.height)),
        ("GRAPH_SVG", svg_body(layout)),
        (
            "DEGREE_TABLE",
            ranked_table("Degree", &metrics.top_by_degree(&report.graph, top_n)),
        ),
        (
            "BETWEENNESS_TABLE",
            ranked_table(
                "Betweenness",
                &metrics.top_by_betweenness(&report.graph, top_n),
            ),
        ),
        ("REFLECTION", reflection_html(report)),
        ("PHASE_SUMMARY", summary_html(report)),
        ("CONCLUSION", escape_html(CONCLUSION)),
        (
            "GENERATED_AT",
            Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
        ),
        ("GRAPH_JSON", graph_json),
    ];

    Ok(fill(DASHBOARD_TEMPLATE, &vars))
}

fn card(name: &str, value: &str) -> String {
    format!(
        "<div class=\"metric-card\"><div class=\"name\">{}</div><div class=\"value\">{}</div></div>",
        escape_html(name),
        escape_html(value)
    )
}

fn notices_html(report: &PhaseReport) -> String {
    let mut html = String::new();

    if report.has_no_edges() {
        html.push_str(
            "<div class=\"notice\">This phase has no relationships; centrality and \
             community metrics are all zero.</div>\n",
        );
    }

    if report.build.dangling_edges > 0 {
        html.push_str(&format!(
            "<div class=\"notice\">{} relationship row(s) referenced unknown characters and were dropped.</div>\n",
            report.build.dangling_edges
        ));
    }

    if !report.rejected.is_empty() {
        html.push_str(&format!(
            "<div class=\"notice\"><b>{} row(s) were skipped:</b><ul>\n",
            report.rejected.len()
        ));
        for row in &report.rejected {
            html.push_str(&format!(
                "<li>{} line {}: {}</li>\n",
                row.table,
                row.line,
                escape_html(&row.reason)
            ));
        }
        html.push_str("</ul></div>\n");
    }

    html
}

fn ranked_table(score_name: &str, rows: &[Ranked]) -> String {
    let mut html = format!(
        "<table>\n<thead><tr><th>#</th><th>Character</th><th>{score_name}</th><th>Group</th></tr></thead>\n<tbody>\n"
    );
    for (i, row) in rows.iter().enumerate() {
        let group = row
            .community
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"num\">{:.4}</td><td>{}</td></tr>\n",
            i + 1,
            escape_html(&row.label),
            row.score,
            group
        ));
    }
    html.push_str("</tbody>\n</table>");
    html
}

fn reflection_html(report: &PhaseReport) -> String {
    let Some(reflection) = &report.phase.reflection else {
        return String::new();
    };
    format!(
        "<h2>Reflection</h2>\n<div class=\"reflection\">\n<h4>{}</h4>\n<p><b>Context:</b> {}</p>\n\
         <div class=\"insight\"><b>Network analysis:</b> {}</div>\n</div>",
        escape_html(&reflection.title),
        escape_html(&reflection.context),
        escape_html(&reflection.analysis)
    )
}

fn summary_html(report: &PhaseReport) -> String {
    report
        .phase
        .reflection
        .as_ref()
        .and_then(|r| r.summary.as_deref())
        .map_or_else(String::new, |summary| {
            format!(
                "<div class=\"stage-summary\"><b>This phase:</b><br>{}</div>",
                escape_html(summary)
            )
        })
}

fn stroke_width(weight: f64) -> f64 {
    (1.0 + weight.ln_1p()).min(8.0)
}

fn svg_body(layout: &GraphLayout) -> String {
    let mut svg = String::new();

    let position: std::collections::HashMap<&str, (f64, f64)> = layout
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), (n.x, n.y)))
        .collect();

    svg.push_str("<g class=\"edges\">\n");
    for edge in &layout.edges {
        let (Some(&(x1, y1)), Some(&(x2, y2))) = (
            position.get(edge.source.as_str()),
            position.get(edge.target.as_str()),
        ) else {
            continue;
        };
        svg.push_str(&format!(
            "<line data-source=\"{}\" data-target=\"{}\" x1=\"{x1:.1}\" y1=\"{y1:.1}\" x2=\"{x2:.1}\" y2=\"{y2:.1}\" stroke=\"{EDGE_COLOR}\" stroke-width=\"{:.2}\"><title>{} - {} (weight {})</title></line>\n",
            escape_html(&edge.source),
            escape_html(&edge.target),
            stroke_width(edge.weight),
            escape_html(&edge.source),
            escape_html(&edge.target),
            edge.weight
        ));
    }
    svg.push_str("</g>\n<g class=\"nodes\">\n");

    for node in &layout.nodes {
        let radius = node.size / 2.0;
        let group = node
            .community
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        svg.push_str(&format!(
            "<g class=\"node\" data-id=\"{}\" transform=\"translate({:.1},{:.1})\">\
             <circle r=\"{radius:.1}\" fill=\"{}\" stroke=\"#555\" stroke-width=\"1\"></circle>\
             <text text-anchor=\"middle\" y=\"{:.1}\">{}</text>\
             <title>{}\nDegree: {:.3}\nBetweenness: {:.3}\nGroup: {}</title></g>\n",
            escape_html(&node.id),
            node.x,
            node.y,
            escape_html(&node.color),
            radius + 12.0,
            escape_html(&node.label),
            escape_html(&node.label),
            node.degree,
            node.betweenness,
            group
        ));
    }
    svg.push_str("</g>");
    svg
}

// =============================================================================
// Exports
// =============================================================================

/// Graphviz DOT: communities as fill colours, weights as pen width
#[must_use]
pub fn to_dot(report: &PhaseReport) -> String {
    let colors = layout::community_colors(&report.metrics);

    let mut dot = String::from("graph phase {\n");
    dot.push_str(&format!("  label=\"{}\";\n", escape_dot(&report.phase.name)));
    dot.push_str("  layout=neato;\n");
    dot.push_str("  overlap=false;\n");
    dot.push_str("  node [shape=circle, style=filled, fontsize=10];\n\n");

    for character in report.graph.characters() {
        let color = character
            .community
            .and_then(|c| colors.get(&c))
            .copied()
            .unwrap_or(FALLBACK_COLOR);
        let degree = character.degree_centrality.unwrap_or(0.0);
        dot.push_str(&format!(
            "  \"{}\" [label=\"{}\", fillcolor=\"{}\", width={:.2}, tooltip=\"Degree {:.3}, Betweenness {:.3}\"];\n",
            escape_dot(&character.id),
            escape_dot(&character.label),
            color,
            layout::node_size(degree) / 20.0,
            degree,
            character.betweenness_centrality.unwrap_or(0.0)
        ));
    }

    dot.push('\n');

    for (source, target, weight) in report.graph.relations() {
        dot.push_str(&format!(
            "  \"{}\" -- \"{}\" [penwidth={}, color=\"{}\"];\n",
            escape_dot(source),
            escape_dot(target),
            weight,
            EDGE_COLOR
        ));
    }

    dot.push_str("}\n");
    dot
}

/// Summary, per-character metrics and rankings as a JSON value
#[must_use]
pub fn summary_value(report: &PhaseReport, top_n: usize) -> serde_json::Value {
    let metrics = &report.metrics;

    let characters: Vec<_> = report
        .graph
        .characters()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "label": c.label,
                "degree_centrality": c.degree_centrality.unwrap_or(0.0),
                "betweenness_centrality": c.betweenness_centrality.unwrap_or(0.0),
                "community": c.community,
            })
        })
        .collect();

    serde_json::json!({
        "phase": {
            "key": report.phase.key,
            "name": report.phase.name,
            "description": report.phase.description,
        },
        "summary": {
            "nodes": metrics.node_count,
            "edges": metrics.edge_count,
            "density": metrics.density,
            "modularity": metrics.modularity,
            "communities": metrics.partition.community_count(),
        },
        "characters": characters,
        "communities": metrics.partition.communities(),
        "top_degree": metrics.top_by_degree(&report.graph, top_n),
        "top_betweenness": metrics.top_by_betweenness(&report.graph, top_n),
        "build": {
            "duplicate_nodes": report.build.duplicate_nodes,
            "dangling_edges": report.build.dangling_edges,
            "self_loops": report.build.self_loops,
            "replaced_edges": report.build.replaced_edges,
        },
        "rejected": report.rejected,
    })
}

/// JSON export: the summary plus the positioned diagram
pub fn to_json(report: &PhaseReport, layout: &GraphLayout, top_n: usize) -> Result<String> {
    let mut doc = summary_value(report, top_n);
    doc["layout"] = serde_json::to_value(layout).context("Failed to serialize layout")?;
    serde_json::to_string_pretty(&doc).context("Failed to serialize phase to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::LouvainConfig;
    use crate::layout::LayoutConfig;
    use crate::phases::{PhaseDataset, Reflection};
    use crate::types::{CharacterRow, PhaseTables, RejectedRow, RelationRow, TableKind};

    fn node(id: &str, label: &str) -> CharacterRow {
        CharacterRow {
            id: id.into(),
            label: Some(label.into()),
        }
    }

    fn edge(source: &str, target: &str, weight: f64) -> RelationRow {
        RelationRow {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }

    fn square_report() -> PhaseReport {
        let tables = PhaseTables {
            nodes: vec![
                node("A", "Baoyu"),
                node("B", "Daiyu"),
                node("C", "Baochai"),
                node("D", "<script>alert(1)</script>"),
            ],
            edges: vec![
                edge("A", "B", 3.0),
                edge("B", "C", 1.0),
                edge("C", "D", 1.0),
                edge("D", "A", 1.0),
            ],
            rejected: vec![RejectedRow {
                table: TableKind::Edges,
                line: 6,
                reason: "weight 'x' is not a number".into(),
            }],
        };
        let mut phase = PhaseDataset::ad_hoc("n.csv", "e.csv");
        phase.name = "Square & friends".into();
        phase.reflection = Some(Reflection {
            title: "Reading".into(),
            context: "Context text".into(),
            analysis: "Analysis text".into(),
            summary: Some("Building <the> ideal".into()),
        });
        PhaseReport::from_tables(phase, &tables, &LouvainConfig::default())
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_fill_is_single_pass() {
        let out = fill(
            "{{A}} and {{B}} and {{MISSING}}",
            &[("A", "{{B}}".to_string()), ("B", "b".to_string())],
        );
        assert_eq!(out, "{{B}} and b and {{MISSING}}");
    }

    #[test]
    fn test_dashboard_contents() {
        let report = square_report();
        let layout = report.layout(&LayoutConfig::default());
        let html = dashboard_html(&report, &layout, 10).unwrap();

        assert!(html.contains("<h1>Square &amp; friends</h1>"));
        assert!(html.contains("<div class=\"value\">4</div>"));
        assert!(html.contains("<div class=\"value\">0.6667</div>"));
        assert!(html.contains("Top by Betweenness"));
        assert!(html.contains("Context text"));
        assert!(html.contains("weight &#39;x&#39; is not a number"));
        assert!(html.contains("Degree: 0.667"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_dashboard_summary_beside_conclusion() {
        let report = square_report();
        let layout = report.layout(&LayoutConfig::default());
        let html = dashboard_html(&report, &layout, 10).unwrap();

        let closing = &html[html.find("<div class=\"closing\">").unwrap()..];
        let summary = closing.find("Building &lt;the&gt; ideal").unwrap();
        let conclusion = closing.find("<b>Conclusion:</b>").unwrap();
        assert!(summary < conclusion);

        let mut bare = report.clone();
        bare.phase.reflection = None;
        let html = dashboard_html(&bare, &layout, 10).unwrap();
        assert!(!html.contains("class=\"stage-summary\""));
        assert!(html.contains("<b>Conclusion:</b>"));
    }

    #[test]
    fn test_dashboard_escapes_labels() {
        let report = square_report();
        let layout = report.layout(&LayoutConfig::default());
        let html = dashboard_html(&report, &layout, 10).unwrap();

        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn test_dashboard_notice_without_edges() {
        let tables = PhaseTables {
            nodes: vec![node("A", "Alone")],
            edges: vec![],
            rejected: vec![],
        };
        let report = PhaseReport::from_tables(
            PhaseDataset::ad_hoc("n.csv", "e.csv"),
            &tables,
            &LouvainConfig::default(),
        );
        let layout = report.layout(&LayoutConfig::default());
        let html = dashboard_html(&report, &layout, 10).unwrap();

        assert!(html.contains("no relationships"));
        assert!(html.contains("<div class=\"value\">0.0000</div>"));
    }

    #[test]
    fn test_dot_export() {
        let dot = to_dot(&square_report());

        assert!(dot.starts_with("graph phase {"));
        assert!(dot.contains("\"A\" -- \"B\" [penwidth=3"));
        assert_eq!(dot.matches(" -- ").count(), 4);
        assert!(dot.contains("fillcolor=\"#"));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_json_export() {
        let report = square_report();
        let layout = report.layout(&LayoutConfig::default());
        let json = to_json(&report, &layout, 2).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["nodes"], 4);
        assert_eq!(value["summary"]["edges"], 4);
        assert_eq!(value["characters"].as_array().unwrap().len(), 4);
        assert_eq!(value["top_degree"].as_array().unwrap().len(), 2);
        assert_eq!(value["layout"]["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(value["rejected"][0]["line"], 6);
        assert!(value["characters"][0]["community"].is_u64());
    }
}
