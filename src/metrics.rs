// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Metrics engine - density, centrality and community structure of a phase
//!
//! Graphs with zero or one character are not an error: density and degree
//! centrality are 0, betweenness is 0 for every node, and the partition
//! holds each node on its own.

use crate::community::{self, LouvainConfig, Partition};
use crate::graph::CharacterGraph;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::info;

/// Everything computed for one phase graph
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkMetrics {
    /// Number of characters
    pub node_count: usize,
    /// Number of relations
    pub edge_count: usize,
    /// Actual / possible edges
    pub density: f64,
    /// Degree centrality per character id
    pub degree: BTreeMap<String, f64>,
    /// Weighted betweenness centrality per character id
    pub betweenness: BTreeMap<String, f64>,
    /// Louvain partition
    pub partition: Partition,
    /// Modularity of `partition`
    pub modularity: f64,
}

/// A row of a ranked table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    /// Character id
    pub id: String,
    /// Display label
    pub label: String,
    /// Score the table is sorted by
    pub score: f64,
    /// Community of the character
    pub community: Option<usize>,
}

/// Compute every metric and annotate the graph's nodes with the results
pub fn analyze(graph: &mut CharacterGraph, config: &LouvainConfig) -> NetworkMetrics {
    let density = density(graph);
    let degree = degree_centrality(graph);
    let betweenness = betweenness_centrality(graph);
    let partition = community::louvain(graph, config);
    let modularity = community::modularity(graph, &partition, config.resolution);

    for i in 0..graph.node_count() {
        let idx = NodeIndex::new(i);
        let community = partition.label_at(i);
        if let Some(character) = graph.character_mut(idx) {
            character.degree_centrality = Some(degree[i]);
            character.betweenness_centrality = Some(betweenness[i]);
            character.community = community;
        }
    }

    info!(
        "Metrics: {} nodes, {} edges, density={:.4}, {} communities, Q={:.4}",
        graph.node_count(),
        graph.edge_count(),
        density,
        partition.community_count(),
        modularity
    );

    let keyed = |scores: Vec<f64>| -> BTreeMap<String, f64> {
        graph
            .characters()
            .map(|c| c.id.clone())
            .zip(scores)
            .collect()
    };

    NetworkMetrics {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        density,
        degree: keyed(degree),
        betweenness: keyed(betweenness),
        partition,
        modularity,
    }
}

impl NetworkMetrics {
    /// Top `n` characters by degree centrality
    #[must_use]
    pub fn top_by_degree(&self, graph: &CharacterGraph, n: usize) -> Vec<Ranked> {
        self.rank(graph, &self.degree, n)
    }

    /// Top `n` characters by betweenness centrality
    #[must_use]
    pub fn top_by_betweenness(&self, graph: &CharacterGraph, n: usize) -> Vec<Ranked> {
        self.rank(graph, &self.betweenness, n)
    }

    /// Descending by score; ties keep node insertion order
    fn rank(&self, graph: &CharacterGraph, scores: &BTreeMap<String, f64>, n: usize) -> Vec<Ranked> {
        let mut rows: Vec<Ranked> = graph
            .characters()
            .enumerate()
            .map(|(i, c)| Ranked {
                id: c.id.clone(),
                label: c.label.clone(),
                score: scores.get(&c.id).copied().unwrap_or(0.0),
                community: self.partition.label_at(i),
            })
            .collect();

        rows.sort_by(|a, b| b.score.total_cmp(&a.score));
        rows.truncate(n);
        rows
    }
}

/// Ratio of actual to possible edges in a simple undirected graph
#[must_use]
pub fn density(graph: &CharacterGraph) -> f64 {
    let n = graph.node_count();
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * graph.edge_count() as f64 / (n * (n - 1.0))
}

/// Degree / (N - 1) per node, in node order
#[must_use]
pub fn degree_centrality(graph: &CharacterGraph) -> Vec<f64> {
    let inner = graph.inner();
    let n = inner.node_count();
    if n <= 1 {
        return vec![0.0; n];
    }
    let scale = 1.0 / (n as f64 - 1.0);
    inner
        .node_indices()
        .map(|idx| inner.edges(idx).count() as f64 * scale)
        .collect()
}

/// Heap entry for Dijkstra; ties settle in push order
#[derive(Debug, Clone, Copy)]
struct Visit {
    dist: f64,
    seq: usize,
    node: usize,
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Visit {}

/// Weighted betweenness centrality via Brandes' algorithm, in node order
///
/// Edge weight is the traversal cost. Scores are normalized by
/// 1 / ((N-1)(N-2)), so a node on every shortest path between all other
/// pairs scores 1.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn betweenness_centrality(graph: &CharacterGraph) -> Vec<f64> {
    let inner = graph.inner();
    let n = inner.node_count();
    let mut bc = vec![0.0_f64; n];
    if n <= 2 {
        return bc;
    }

    for s in 0..n {
        let mut stack: Vec<usize> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut settled = vec![false; n];
        let mut seen: Vec<Option<f64>> = vec![None; n];
        let mut heap = BinaryHeap::new();
        let mut seq = 0;

        sigma[s] = 1.0;
        seen[s] = Some(0.0);
        heap.push(Visit { dist: 0.0, seq, node: s });

        while let Some(Visit { dist, node: v, .. }) = heap.pop() {
            if settled[v] {
                continue;
            }
            settled[v] = true;
            stack.push(v);

            for edge in inner.edges(NodeIndex::new(v)) {
                let w = if edge.source().index() == v {
                    edge.target().index()
                } else {
                    edge.source().index()
                };
                if settled[w] {
                    continue;
                }

                let cost = dist + *edge.weight();
                match seen[w] {
                    Some(known) if cost > known => {}
                    Some(known) if cost == known => {
                        sigma[w] += sigma[v];
                        predecessors[w].push(v);
                    }
                    _ => {
                        seen[w] = Some(cost);
                        sigma[w] = sigma[v];
                        predecessors[w] = vec![v];
                        seq += 1;
                        heap.push(Visit { dist: cost, seq, node: w });
                    }
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            let coeff = (1.0 + delta[w]) / sigma[w];
            for &v in &predecessors[w] {
                delta[v] += sigma[v] * coeff;
            }
            if w != s {
                bc[w] += delta[w];
            }
        }
    }

    let scale = 1.0 / ((n as f64 - 1.0) * (n as f64 - 2.0));
    for score in &mut bc {
        *score *= scale;
    }
    bc
}
