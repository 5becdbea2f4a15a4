// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Graph builder - the undirected, weighted character graph of one phase

use crate::types::{Character, CharacterRow, PhaseTables, RelationRow};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What happened to a relation row when it was added
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOutcome {
    /// A new edge was created
    Added,
    /// An edge between the same pair existed; its weight was replaced
    Replaced,
    /// One of the endpoints is not a known character
    Dangling,
    /// Source and target are the same character
    SelfLoop,
}

/// Counts of rows the builder did not turn into fresh nodes or edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Node rows whose id was already present
    pub duplicate_nodes: usize,
    /// Edge rows with an unknown endpoint
    pub dangling_edges: usize,
    /// Edge rows connecting a character to itself
    pub self_loops: usize,
    /// Edge rows that overwrote an earlier edge between the same pair
    pub replaced_edges: usize,
}

impl BuildReport {
    /// Total number of rows dropped or merged
    #[must_use]
    pub fn total(&self) -> usize {
        self.duplicate_nodes + self.dangling_edges + self.self_loops + self.replaced_edges
    }
}

/// The character graph with petgraph backing for algorithms
#[derive(Debug, Clone, Default)]
pub struct CharacterGraph {
    /// The underlying undirected graph, edge weight = relation weight
    graph: UnGraph<Character, f64>,
    /// Map from character ID to node index
    node_indices: HashMap<String, NodeIndex>,
}

impl CharacterGraph {
    /// Create a new empty character graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parsed phase tables
    #[must_use]
    pub fn from_tables(tables: &PhaseTables) -> (Self, BuildReport) {
        let mut graph = Self::new();
        let mut report = BuildReport::default();

        for row in &tables.nodes {
            if !graph.add_character(row) {
                report.duplicate_nodes += 1;
            }
        }

        for row in &tables.edges {
            match graph.add_relation(row) {
                RelationOutcome::Added => {}
                RelationOutcome::Replaced => report.replaced_edges += 1,
                RelationOutcome::Dangling => report.dangling_edges += 1,
                RelationOutcome::SelfLoop => report.self_loops += 1,
            }
        }

        debug!(
            "Built graph: {} nodes, {} edges, {} rows dropped or merged",
            graph.node_count(),
            graph.edge_count(),
            report.total()
        );

        (graph, report)
    }

    /// Add a character; returns `false` when the id already existed
    ///
    /// A repeated id keeps its node and takes the newer label.
    pub fn add_character(&mut self, row: &CharacterRow) -> bool {
        if let Some(&idx) = self.node_indices.get(&row.id) {
            let updated = Character::new(row.id.clone(), row.label.clone());
            self.graph[idx].label = updated.label;
            return false;
        }

        let idx = self
            .graph
            .add_node(Character::new(row.id.clone(), row.label.clone()));
        self.node_indices.insert(row.id.clone(), idx);
        true
    }

    /// Add a relation between two known characters
    pub fn add_relation(&mut self, row: &RelationRow) -> RelationOutcome {
        let (Some(&a), Some(&b)) = (
            self.node_indices.get(&row.source),
            self.node_indices.get(&row.target),
        ) else {
            debug!("Dropping edge {} -- {}: unknown endpoint", row.source, row.target);
            return RelationOutcome::Dangling;
        };

        if a == b {
            debug!("Dropping self-loop on {}", row.source);
            return RelationOutcome::SelfLoop;
        }

        if let Some(edge) = self.graph.find_edge(a, b) {
            self.graph[edge] = row.weight;
            RelationOutcome::Replaced
        } else {
            self.graph.add_edge(a, b, row.weight);
            RelationOutcome::Added
        }
    }

    /// Get a character by ID
    #[must_use]
    pub fn character(&self, id: &str) -> Option<&Character> {
        self.node_indices.get(id).map(|&idx| &self.graph[idx])
    }

    /// Node index of a character
    #[must_use]
    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_indices.get(id).copied()
    }

    /// Characters in insertion order
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.graph.node_weights()
    }

    /// Edges as (source id, target id, weight), in insertion order
    pub fn relations(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                *e.weight(),
            )
        })
    }

    /// Weight of the edge between two characters, if any
    #[must_use]
    pub fn weight_between(&self, a: &str, b: &str) -> Option<f64> {
        let a = self.index_of(a)?;
        let b = self.index_of(b)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    /// Number of edges touching a character
    #[must_use]
    pub fn degree(&self, id: &str) -> usize {
        self.index_of(id)
            .map_or(0, |idx| self.graph.edges(idx).count())
    }

    /// Ids of the direct neighbours of a character
    #[must_use]
    pub fn neighbors(&self, id: &str) -> Vec<&str> {
        self.index_of(id)
            .map(|idx| {
                self.graph
                    .neighbors(idx)
                    .map(|n| self.graph[n].id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mutable access to a node's attributes
    pub fn character_mut(&mut self, idx: NodeIndex) -> Option<&mut Character> {
        self.graph.node_weight_mut(idx)
    }

    /// The petgraph backing store
    #[must_use]
    pub fn inner(&self) -> &UnGraph<Character, f64> {
        &self.graph
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the graph has no characters
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }
}
