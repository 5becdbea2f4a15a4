// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Phase pipeline: load -> build -> compute

use crate::community::LouvainConfig;
use crate::config::Config;
use crate::graph::{BuildReport, CharacterGraph};
use crate::layout::{self, GraphLayout, LayoutConfig};
use crate::loader::{LoadError, Loader, Source};
use crate::metrics::{self, NetworkMetrics};
use crate::phases::PhaseDataset;
use crate::types::{PhaseTables, RejectedRow};
use chrono::{DateTime, Utc};
use tracing::info;

/// The analysed state of one phase
#[derive(Debug, Clone)]
pub struct PhaseReport {
    /// The selected dataset
    pub phase: PhaseDataset,
    /// Annotated graph
    pub graph: CharacterGraph,
    /// Computed metrics
    pub metrics: NetworkMetrics,
    /// What the builder dropped or merged
    pub build: BuildReport,
    /// Rows skipped by the loader
    pub rejected: Vec<RejectedRow>,
    /// When the tables behind this report were loaded
    pub loaded_at: DateTime<Utc>,
}

impl PhaseReport {
    /// Analyse already-parsed tables
    #[must_use]
    pub fn from_tables(phase: PhaseDataset, tables: &PhaseTables, community: &LouvainConfig) -> Self {
        let (mut graph, build) = CharacterGraph::from_tables(tables);
        let metrics = metrics::analyze(&mut graph, community);
        Self {
            phase,
            graph,
            metrics,
            build,
            rejected: tables.rejected.clone(),
            loaded_at: Utc::now(),
        }
    }

    /// Position the annotated graph for drawing
    #[must_use]
    pub fn layout(&self, config: &LayoutConfig) -> GraphLayout {
        layout::compute(&self.graph, &self.metrics, config)
    }

    /// True when there is nothing to draw an edge between
    #[must_use]
    pub fn has_no_edges(&self) -> bool {
        self.graph.edge_count() == 0
    }
}

/// Runs phases through a shared, cached loader
pub struct Pipeline {
    loader: Loader,
    community: LouvainConfig,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn new(config: &Config) -> Result<Self, LoadError> {
        Ok(Self {
            loader: Loader::new(&config.fetch, config.cache.capacity, config.rows)?,
            community: config.community.clone(),
        })
    }

    /// Load and analyse a phase
    ///
    /// A load failure means no data for this phase; nothing is computed.
    pub fn run(&mut self, phase: &PhaseDataset) -> Result<PhaseReport, LoadError> {
        info!("Running phase {}", phase.key);
        let nodes = Source::parse(&phase.nodes);
        let edges = Source::parse(&phase.edges);
        let tables = self.loader.load(&nodes, &edges)?;
        let mut report = PhaseReport::from_tables(phase.clone(), &tables, &self.community);
        // A cache hit reports the original load time
        if let Some(loaded_at) = self.loader.loaded_at(&nodes, &edges) {
            report.loaded_at = loaded_at;
        }
        Ok(report)
    }

    /// Drop the cached tables of a phase so the next run refetches them
    pub fn invalidate(&mut self, phase: &PhaseDataset) -> bool {
        self.loader
            .invalidate(&Source::parse(&phase.nodes), &Source::parse(&phase.edges))
    }

    /// Override the community seed
    pub fn set_seed(&mut self, seed: u64) {
        self.community.seed = seed;
    }

    /// The shared loader
    #[must_use]
    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}
