// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Sources, lowest precedence first: built-in defaults, the user config file
//! (`<config dir>/charnet/config.toml`), an explicit `--config` file, and
//! `CHARNET_*` environment variables with `__` between sections
//! (`CHARNET_COMMUNITY__SEED=7`).

use crate::community::LouvainConfig;
use crate::layout::LayoutConfig;
use crate::loader::FetchConfig;
use crate::phases::{self, PhaseDataset};
use crate::types::RowPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Table cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Table pairs kept in memory; 0 disables caching
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 8 }
    }
}

/// Report settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows in each ranked table
    pub top_n: usize,
    /// Where `render` writes the dashboard by default
    pub output: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            output: PathBuf::from("charnet_graph.html"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Table cache
    pub cache: CacheConfig,
    /// HTTP fetching
    pub fetch: FetchConfig,
    /// What to do with malformed rows
    pub rows: RowPolicy,
    /// Community detection
    pub community: LouvainConfig,
    /// Diagram layout
    pub layout: LayoutConfig,
    /// Tables and output
    pub report: ReportConfig,
    /// Phase catalog; empty means the built-in phases
    pub phases: Vec<PhaseDataset>,
}

impl Config {
    /// The phase catalog in effect
    #[must_use]
    pub fn phases(&self) -> Vec<PhaseDataset> {
        if self.phases.is_empty() {
            phases::builtin()
        } else {
            self.phases.clone()
        }
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Location of the user config file
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "hyperpolymath", "charnet")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load configuration, layering the user file, an explicit file and the environment
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let mut builder = config::Config::builder();

    if let Some(path) = default_path() {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHARNET")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Look up a dotted key (`community.seed`) in the effective configuration
pub fn get(config: &Config, key: &str) -> Result<String> {
    let value = toml::Value::try_from(config).context("Failed to serialize configuration")?;

    let mut current = &value;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;
    }

    Ok(match current {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
