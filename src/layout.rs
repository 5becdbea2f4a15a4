// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Force-directed layout of an annotated phase graph

use crate::graph::CharacterGraph;
use crate::metrics::NetworkMetrics;
use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

/// Tableau 10, assigned to communities in ascending id order
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Colour for characters without a community
pub const FALLBACK_COLOR: &str = "#97c2fc";

/// Edge stroke colour
pub const EDGE_COLOR: &str = "#cccccc";

/// Simulation and viewport parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Simulation steps before positions are read
    pub iterations: usize,
    /// Seconds of simulated time per step
    pub time_step: f32,
    /// Viewport width
    pub width: f64,
    /// Viewport height
    pub height: f64,
    /// Node repulsion
    pub force_charge: f32,
    /// Edge spring stiffness
    pub force_spring: f32,
    /// Clamp on the force applied per step
    pub force_max: f32,
    /// Velocity scale
    pub node_speed: f32,
    /// Velocity kept between steps
    pub damping_factor: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 400,
            time_step: 0.035,
            width: 960.0,
            height: 600.0,
            force_charge: 150.0,
            force_spring: 0.08,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: 0.6,
        }
    }
}

/// A positioned character
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedNode {
    /// Character id
    pub id: String,
    /// Display label
    pub label: String,
    /// Horizontal position in the viewport
    pub x: f64,
    /// Vertical position in the viewport
    pub y: f64,
    /// Radius, driven by degree centrality
    pub size: f64,
    /// Fill colour, driven by community
    pub color: String,
    /// Community id
    pub community: Option<usize>,
    /// Degree centrality
    pub degree: f64,
    /// Betweenness centrality
    pub betweenness: f64,
}

/// A positioned relation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedEdge {
    /// Source character id
    pub source: String,
    /// Target character id
    pub target: String,
    /// Relation weight
    pub weight: f64,
}

/// The whole diagram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLayout {
    /// Viewport width
    pub width: f64,
    /// Viewport height
    pub height: f64,
    /// Positioned characters, in node order
    pub nodes: Vec<PlacedNode>,
    /// Relations, in edge order
    pub edges: Vec<PlacedEdge>,
}

/// Node size for a degree centrality value
#[must_use]
pub fn node_size(degree_centrality: f64) -> f64 {
    degree_centrality * 30.0 + 10.0
}

/// Map each community id to a palette colour, cycling when there are more than ten
#[must_use]
pub fn community_colors(metrics: &NetworkMetrics) -> BTreeMap<usize, &'static str> {
    let communities: std::collections::BTreeSet<usize> =
        metrics.partition.labels().iter().copied().collect();
    communities
        .into_iter()
        .enumerate()
        .map(|(i, c)| (c, PALETTE[i % PALETTE.len()]))
        .collect()
}

/// Run the force simulation and fit the result into the viewport
#[must_use]
pub fn compute(graph: &CharacterGraph, metrics: &NetworkMetrics, config: &LayoutConfig) -> GraphLayout {
    let colors = community_colors(metrics);
    let positions = simulate(graph, config);

    let nodes = graph
        .characters()
        .enumerate()
        .map(|(i, c)| {
            let degree = metrics.degree.get(&c.id).copied().unwrap_or(0.0);
            let community = metrics.partition.label_at(i);
            let (x, y) = positions[i];
            PlacedNode {
                id: c.id.clone(),
                label: c.label.clone(),
                x,
                y,
                size: node_size(degree),
                color: community
                    .and_then(|g| colors.get(&g))
                    .copied()
                    .unwrap_or(FALLBACK_COLOR)
                    .to_string(),
                community,
                degree,
                betweenness: metrics.betweenness.get(&c.id).copied().unwrap_or(0.0),
            }
        })
        .collect();

    let edges = graph
        .relations()
        .map(|(source, target, weight)| PlacedEdge {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        })
        .collect();

    GraphLayout {
        width: config.width,
        height: config.height,
        nodes,
        edges,
    }
}

/// Starting ring; also the fallback when the simulation diverges
fn ring(n: usize, config: &LayoutConfig) -> Vec<(f64, f64)> {
    let radius = config.width.min(config.height) / 3.0;
    (0..n)
        .map(|i| {
            let angle = i as f64 * 2.0 * PI / n.max(1) as f64;
            (
                config.width / 2.0 + radius * angle.cos(),
                config.height / 2.0 + radius * angle.sin(),
            )
        })
        .collect()
}

fn simulate(graph: &CharacterGraph, config: &LayoutConfig) -> Vec<(f64, f64)> {
    let n = graph.node_count();
    let start = ring(n, config);
    if n < 2 {
        return start;
    }

    let mut sim: ForceGraph<usize, ()> = ForceGraph::new(SimulationParameters {
        force_charge: config.force_charge,
        force_spring: config.force_spring,
        force_max: config.force_max,
        node_speed: config.node_speed,
        damping_factor: config.damping_factor,
    });

    #[allow(clippy::cast_possible_truncation)]
    let handles: Vec<_> = start
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| {
            sim.add_node(NodeData {
                x: x as f32,
                y: y as f32,
                mass: 10.0,
                is_anchor: false,
                user_data: i,
            })
        })
        .collect();

    for edge in graph.inner().edge_indices() {
        if let Some((a, b)) = graph.inner().edge_endpoints(edge) {
            sim.add_edge(handles[a.index()], handles[b.index()], EdgeData::default());
        }
    }

    for _ in 0..config.iterations {
        sim.update(config.time_step);
    }

    let mut raw = start.clone();
    sim.visit_nodes(|node| {
        raw[node.data.user_data] = (f64::from(node.x()), f64::from(node.y()));
    });

    if raw.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        debug!("Layout diverged; falling back to ring");
        return start;
    }

    fit(&raw, config)
}

/// Scale positions into the viewport with a margin, keeping the aspect ratio
fn fit(raw: &[(f64, f64)], config: &LayoutConfig) -> Vec<(f64, f64)> {
    let margin = 40.0;
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for &(x, y) in raw {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    let span_x = (max_x - min_x).max(1e-6);
    let span_y = (max_y - min_y).max(1e-6);
    let avail_x = (config.width - 2.0 * margin).max(1.0);
    let avail_y = (config.height - 2.0 * margin).max(1.0);
    let scale = (avail_x / span_x).min(avail_y / span_y);
    let offset_x = margin + (avail_x - span_x * scale) / 2.0;
    let offset_y = margin + (avail_y - span_y * scale) / 2.0;

    raw.iter()
        .map(|&(x, y)| (offset_x + (x - min_x) * scale, offset_y + (y - min_y) * scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::LouvainConfig;
    use crate::metrics;
    use crate::types::{CharacterRow, PhaseTables, RelationRow};

    fn analyzed(n: usize, edges: &[(usize, usize)]) -> (CharacterGraph, NetworkMetrics) {
        let tables = PhaseTables {
            nodes: (0..n)
                .map(|i| CharacterRow {
                    id: format!("c{i}"),
                    label: Some(format!("Character {i}")),
                })
                .collect(),
            edges: edges
                .iter()
                .map(|&(a, b)| RelationRow {
                    source: format!("c{a}"),
                    target: format!("c{b}"),
                    weight: 1.0,
                })
                .collect(),
            rejected: vec![],
        };
        let (mut graph, _) = CharacterGraph::from_tables(&tables);
        let metrics = metrics::analyze(&mut graph, &LouvainConfig::default());
        (graph, metrics)
    }

    #[test]
    fn test_node_size_follows_degree() {
        assert_eq!(node_size(0.0), 10.0);
        assert_eq!(node_size(1.0), 40.0);
    }

    #[test]
    fn test_palette_cycles_past_ten_communities() {
        // 12 isolated characters = 12 singleton communities
        let (_, metrics) = analyzed(12, &[]);
        let colors = community_colors(&metrics);

        assert_eq!(colors.len(), 12);
        assert_eq!(colors[&0], PALETTE[0]);
        assert_eq!(colors[&10], PALETTE[0]);
        assert_eq!(colors[&11], PALETTE[1]);
    }

    #[test]
    fn test_positions_stay_in_viewport() {
        let (graph, metrics) = analyzed(6, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (2, 3)]);
        let config = LayoutConfig::default();
        let layout = compute(&graph, &metrics, &config);

        assert_eq!(layout.nodes.len(), 6);
        assert_eq!(layout.edges.len(), 6);
        for node in &layout.nodes {
            assert!(node.x >= 0.0 && node.x <= config.width, "x out of range: {}", node.x);
            assert!(node.y >= 0.0 && node.y <= config.height, "y out of range: {}", node.y);
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let (graph, metrics) = analyzed(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let config = LayoutConfig::default();

        assert_eq!(compute(&graph, &metrics, &config), compute(&graph, &metrics, &config));
    }

    #[test]
    fn test_single_node_sits_on_ring() {
        let (graph, metrics) = analyzed(1, &[]);
        let layout = compute(&graph, &metrics, &LayoutConfig::default());

        assert_eq!(layout.nodes.len(), 1);
        assert!(layout.nodes[0].x.is_finite());
        assert_eq!(layout.nodes[0].color, PALETTE[0]);
    }
}
