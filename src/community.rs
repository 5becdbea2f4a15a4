// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Community detection: seeded multi-level Louvain plus modularity scoring
//!
//! Each level greedily moves nodes to the neighbouring community with the
//! best modularity gain until no move helps, then collapses every community
//! into a single node and repeats on the induced graph. Node visiting order
//! and candidate order come from a seeded RNG, so a given seed always yields
//! the same partition for the same graph.

use crate::graph::CharacterGraph;
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Louvain parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LouvainConfig {
    /// RNG seed for node and candidate ordering
    pub seed: u64,
    /// Resolution; values above 1 favour smaller communities
    pub resolution: f64,
    /// Smallest modularity improvement worth another pass or level
    pub min_gain: f64,
    /// Upper bound on aggregation levels
    pub max_levels: usize,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            resolution: 1.0,
            min_gain: 1e-7,
            max_levels: 32,
        }
    }
}

// =============================================================================
// Partition
// =============================================================================

/// Community assignment for every character of a graph
///
/// Community ids are contiguous from 0 and numbered by first appearance in
/// node insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    ids: Vec<String>,
    /// Character id to position in `ids`
    index: HashMap<String, usize>,
    labels: Vec<usize>,
    community_count: usize,
}

impl Partition {
    /// Build a partition from raw per-node labels (index-aligned with the graph)
    ///
    /// Labels are renumbered; nodes beyond the end of `raw` get their own
    /// community.
    #[must_use]
    pub fn from_labels(graph: &CharacterGraph, raw: &[usize]) -> Self {
        let ids: Vec<String> = graph.characters().map(|c| c.id.clone()).collect();

        let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
        let mut labels = Vec::with_capacity(ids.len());
        let mut next = 0;
        for i in 0..ids.len() {
            let label = match raw.get(i) {
                Some(&l) => *mapping.entry(l).or_insert_with(|| {
                    next += 1;
                    next - 1
                }),
                None => {
                    next += 1;
                    next - 1
                }
            };
            labels.push(label);
        }

        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();

        Self {
            ids,
            index,
            labels,
            community_count: next,
        }
    }

    /// Every character in a single community
    #[must_use]
    pub fn single(graph: &CharacterGraph) -> Self {
        Self::from_labels(graph, &vec![0; graph.node_count()])
    }

    /// Community of a character
    #[must_use]
    pub fn community_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).and_then(|&pos| self.label_at(pos))
    }

    /// Community of the node at `index`
    #[must_use]
    pub fn label_at(&self, index: usize) -> Option<usize> {
        self.labels.get(index).copied()
    }

    /// Labels in node order
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// (character id, community) pairs in node order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.ids.iter().map(String::as_str).zip(self.labels.iter().copied())
    }

    /// Members of each community, keyed by community id
    #[must_use]
    pub fn communities(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut groups: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (id, community) in self.iter() {
            groups.entry(community).or_default().push(id);
        }
        groups
    }

    /// Number of distinct communities
    #[must_use]
    pub fn community_count(&self) -> usize {
        self.community_count
    }

    /// Number of assigned characters
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if nothing is assigned
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// =============================================================================
// Louvain
// =============================================================================

/// Louvain community detection over edge weights
#[must_use]
pub fn louvain(graph: &CharacterGraph, config: &LouvainConfig) -> Partition {
    let n = graph.node_count();
    let mut membership: Vec<usize> = (0..n).collect();

    if graph.edge_count() == 0 {
        return Partition::from_labels(graph, &membership);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut level = Level::from_graph(graph);
    let mut best = f64::NEG_INFINITY;

    for depth in 0..config.max_levels.max(1) {
        let mut status = Status::new(&level);
        status.one_level(&mut rng, config.resolution, config.min_gain);
        let modularity = status.modularity(config.resolution);

        if modularity - best < config.min_gain {
            break;
        }

        let (labels, count) = renumber(&status.node_community);
        for m in &mut membership {
            *m = labels[*m];
        }
        best = modularity;
        debug!("Louvain level {}: {} communities, Q={:.4}", depth, count, modularity);

        if count == level.size {
            break;
        }
        level = level.induced(&labels, count);
    }

    Partition::from_labels(graph, &membership)
}

/// Modularity of a partition over the graph's edge weights
///
/// Returns 0 for graphs without edges.
#[must_use]
pub fn modularity(graph: &CharacterGraph, partition: &Partition, resolution: f64) -> f64 {
    let inner = graph.inner();
    let total: f64 = inner.edge_weights().sum();
    if total <= 0.0 {
        return 0.0;
    }

    let k = partition.community_count();
    let mut internal = vec![0.0_f64; k];
    let mut degree = vec![0.0_f64; k];

    for edge in inner.edge_references() {
        let (Some(a), Some(b)) = (
            partition.label_at(edge.source().index()),
            partition.label_at(edge.target().index()),
        ) else {
            continue;
        };
        let w = *edge.weight();
        degree[a] += w;
        degree[b] += w;
        if a == b {
            internal[a] += w;
        }
    }

    internal
        .iter()
        .zip(&degree)
        .map(|(&inside, &deg)| {
            let share = deg / (2.0 * total);
            inside / total - resolution * share * share
        })
        .sum()
}

/// Renumber labels by first appearance
fn renumber(raw: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: BTreeMap<usize, usize> = BTreeMap::new();
    let labels = raw
        .iter()
        .map(|&l| {
            let next = mapping.len();
            *mapping.entry(l).or_insert(next)
        })
        .collect();
    (labels, mapping.len())
}

/// One level of the aggregation hierarchy; each undirected edge listed once
struct Level {
    size: usize,
    edges: Vec<(usize, usize, f64)>,
}

impl Level {
    fn from_graph(graph: &CharacterGraph) -> Self {
        let inner = graph.inner();
        Self {
            size: inner.node_count(),
            edges: inner
                .edge_references()
                .map(|e| (e.source().index(), e.target().index(), *e.weight()))
                .collect(),
        }
    }

    /// Collapse each community into one node; intra-community weight becomes a self-loop
    fn induced(&self, labels: &[usize], count: usize) -> Self {
        let mut merged: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(u, v, w) in &self.edges {
            let (a, b) = (labels[u], labels[v]);
            let key = if a <= b { (a, b) } else { (b, a) };
            *merged.entry(key).or_default() += w;
        }
        Self {
            size: count,
            edges: merged.into_iter().map(|((a, b), w)| (a, b, w)).collect(),
        }
    }
}

/// Working state of the local-moving phase
struct Status {
    adjacency: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
    node_degree: Vec<f64>,
    total_weight: f64,
    node_community: Vec<usize>,
    community_degree: Vec<f64>,
    community_internal: Vec<f64>,
}

impl Status {
    fn new(level: &Level) -> Self {
        let n = level.size;
        let mut adjacency = vec![Vec::new(); n];
        let mut loops = vec![0.0; n];
        let mut node_degree = vec![0.0; n];
        let mut total_weight = 0.0;

        for &(u, v, w) in &level.edges {
            total_weight += w;
            if u == v {
                loops[u] += w;
                node_degree[u] += 2.0 * w;
            } else {
                adjacency[u].push((v, w));
                adjacency[v].push((u, w));
                node_degree[u] += w;
                node_degree[v] += w;
            }
        }

        Self {
            adjacency,
            community_degree: node_degree.clone(),
            community_internal: loops.clone(),
            loops,
            node_degree,
            total_weight,
            node_community: (0..n).collect(),
        }
    }

    fn modularity(&self, resolution: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let m = self.total_weight;
        self.community_internal
            .iter()
            .zip(&self.community_degree)
            .map(|(&inside, &deg)| inside / m - resolution * (deg / (2.0 * m)).powi(2))
            .sum()
    }

    /// Weight from `node` to each neighbouring community, self-loops excluded
    fn neighbor_weights(&self, node: usize) -> BTreeMap<usize, f64> {
        let mut weights = BTreeMap::new();
        for &(neighbor, w) in &self.adjacency[node] {
            *weights.entry(self.node_community[neighbor]).or_insert(0.0) += w;
        }
        weights
    }

    fn remove(&mut self, node: usize, community: usize, weight: f64) {
        self.community_degree[community] -= self.node_degree[node];
        self.community_internal[community] -= weight + self.loops[node];
    }

    fn insert(&mut self, node: usize, community: usize, weight: f64) {
        self.node_community[node] = community;
        self.community_degree[community] += self.node_degree[node];
        self.community_internal[community] += weight + self.loops[node];
    }

    /// Move nodes until a full pass changes nothing or the gain stalls
    fn one_level(&mut self, rng: &mut StdRng, resolution: f64, min_gain: f64) {
        if self.total_weight <= 0.0 {
            return;
        }

        let mut order: Vec<usize> = (0..self.node_community.len()).collect();
        let mut current = self.modularity(resolution);

        loop {
            let mut moved = false;
            order.shuffle(rng);

            for &node in &order {
                let community = self.node_community[node];
                let degree_share = self.node_degree[node] / (2.0 * self.total_weight);
                let weights = self.neighbor_weights(node);
                let own = weights.get(&community).copied().unwrap_or(0.0);
                let remove_cost = -own
                    + resolution
                        * (self.community_degree[community] - self.node_degree[node])
                        * degree_share;
                self.remove(node, community, own);

                let mut candidates: Vec<(usize, f64)> =
                    weights.iter().map(|(&c, &w)| (c, w)).collect();
                candidates.shuffle(rng);

                let mut best = community;
                let mut best_gain = 0.0;
                for (candidate, w) in candidates {
                    let gain = remove_cost + w
                        - resolution * self.community_degree[candidate] * degree_share;
                    if gain > best_gain {
                        best_gain = gain;
                        best = candidate;
                    }
                }

                let best_weight = weights.get(&best).copied().unwrap_or(0.0);
                self.insert(node, best, best_weight);
                if best != community {
                    moved = true;
                }
            }

            let next = self.modularity(resolution);
            if !moved || next - current < min_gain {
                break;
            }
            current = next;
        }
    }
}
