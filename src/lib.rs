// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Charnet library - character networks of a novel, phase by phase
//!
//! This crate loads per-phase character and relationship tables, builds an
//! undirected weighted graph for each phase, computes density, centrality and
//! community structure, and renders the result as a dashboard.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod commands;
pub mod community;
pub mod config;
pub mod graph;
pub mod layout;
pub mod loader;
pub mod metrics;
pub mod phases;
pub mod pipeline;
pub mod render;
pub mod tui;

/// Core data types shared by the loader, builder and presentation layers
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    // =========================================================================
    // Parsed Table Rows
    // =========================================================================

    /// A character row after column resolution
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CharacterRow {
        /// Identifier from the `Id` column, trimmed
        pub id: String,
        /// Display label; `None` when the cell is empty or the column is absent
        pub label: Option<String>,
    }

    /// A relationship row after column resolution
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct RelationRow {
        /// Source character id
        pub source: String,
        /// Target character id
        pub target: String,
        /// Edge weight, always finite and positive
        pub weight: f64,
    }

    /// Which of the two phase tables a row came from
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TableKind {
        /// Character (node) table
        Nodes,
        /// Relationship (edge) table
        Edges,
    }

    impl fmt::Display for TableKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Nodes => f.write_str("nodes"),
                Self::Edges => f.write_str("edges"),
            }
        }
    }

    /// A row skipped under the lenient row policy
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RejectedRow {
        /// Table the row belongs to
        pub table: TableKind,
        /// 1-based line number in the source file
        pub line: u64,
        /// Why the row was rejected
        pub reason: String,
    }

    /// What the loader does with a malformed row
    #[derive(
        Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
    )]
    #[serde(rename_all = "lowercase")]
    pub enum RowPolicy {
        /// Skip the row, record it and keep loading
        #[default]
        Lenient,
        /// Fail the whole load
        Strict,
    }

    /// Both parsed tables of one phase
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct PhaseTables {
        /// Character rows in file order
        pub nodes: Vec<CharacterRow>,
        /// Relationship rows in file order
        pub edges: Vec<RelationRow>,
        /// Rows skipped under the lenient policy
        #[serde(default)]
        pub rejected: Vec<RejectedRow>,
    }

    // =========================================================================
    // Graph Nodes
    // =========================================================================

    /// A character node in the phase graph
    ///
    /// The computed attributes stay `None` until the metrics engine has run
    /// over the fully built graph.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Character {
        /// Identifier from the node table
        pub id: String,
        /// Display label, defaulting to the id
        pub label: String,
        /// Normalized degree centrality
        pub degree_centrality: Option<f64>,
        /// Normalized weighted betweenness centrality
        pub betweenness_centrality: Option<f64>,
        /// Community id from the Louvain partition
        pub community: Option<usize>,
    }

    impl Character {
        /// Create an unannotated character; an empty label falls back to the id
        #[must_use]
        pub fn new(id: impl Into<String>, label: Option<String>) -> Self {
            let id = id.into();
            let label = label
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| id.clone());
            Self {
                id,
                label,
                degree_centrality: None,
                betweenness_centrality: None,
                community: None,
            }
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::graph::CharacterGraph;
    pub use crate::metrics::NetworkMetrics;
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
