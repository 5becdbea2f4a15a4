// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Tabular loader - fetches and parses the node and edge tables of a phase
//!
//! Both tables load as a unit: if either fetch or parse fails, the caller
//! gets a single [`LoadError`] and nothing is cached.
//!
//! Column headers are matched case-insensitively (`Id` and `id` both work).
//! The node table needs `id` and may carry `label`; the edge table needs
//! `source` and `target` and may carry `weight`. Weights that are missing,
//! empty or zero become 1.

use crate::cache::{self, TableCache};
use crate::types::{CharacterRow, PhaseTables, RejectedRow, RelationRow, RowPolicy, TableKind};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised while loading a phase
#[derive(Debug, Error)]
pub enum LoadError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request itself failed (DNS, connect, timeout, body)
    #[error("failed to fetch {location}: {source}")]
    Fetch {
        /// Requested URL
        location: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{location} returned HTTP {status}")]
    Status {
        /// Requested URL
        location: String,
        /// Response status
        status: reqwest::StatusCode,
    },

    /// A local table could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Table path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The table is not valid CSV
    #[error("failed to parse {location}: {source}")]
    Csv {
        /// Table location
        location: String,
        /// Underlying CSV error
        #[source]
        source: csv::Error,
    },

    /// A required column is absent
    #[error("{location} has no `{column}` column (found: {headers})")]
    MissingColumn {
        /// Table location
        location: String,
        /// Expected column name
        column: &'static str,
        /// Headers actually present
        headers: String,
    },

    /// A row failed validation under the strict row policy
    #[error("{location} line {line}: {reason}")]
    MalformedRow {
        /// Table location
        location: String,
        /// 1-based line number
        line: u64,
        /// What was wrong with the row
        reason: String,
    },
}

// =============================================================================
// Sources
// =============================================================================

/// Where a table lives
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Remote table fetched over HTTP(S)
    Url(String),
    /// Local file
    Path(PathBuf),
}

impl Source {
    /// Classify a location string
    #[must_use]
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            let path = location.strip_prefix("file://").unwrap_or(location);
            Self::Path(PathBuf::from(path))
        }
    }
}

impl From<&str> for Source {
    fn from(location: &str) -> Self {
        Self::parse(location)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

// =============================================================================
// Loader
// =============================================================================

/// HTTP settings for remote tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds; `None` waits indefinitely
    pub timeout_secs: Option<u64>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(30),
            user_agent: format!("charnet/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Loads phase tables through a bounded cache
pub struct Loader {
    client: reqwest::blocking::Client,
    cache: TableCache,
    policy: RowPolicy,
}

impl Loader {
    /// Create a loader
    pub fn new(
        fetch: &FetchConfig,
        cache_capacity: usize,
        policy: RowPolicy,
    ) -> Result<Self, LoadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(fetch.timeout_secs.map(Duration::from_secs))
            .user_agent(fetch.user_agent.clone())
            .build()
            .map_err(LoadError::Client)?;

        Ok(Self {
            client,
            cache: TableCache::new(cache_capacity),
            policy,
        })
    }

    /// Load both tables of a phase, reusing a cached parse when available
    pub fn load(&mut self, nodes: &Source, edges: &Source) -> Result<Arc<PhaseTables>, LoadError> {
        let key = cache::key_for(nodes, edges);
        if let Some(tables) = self.cache.get(&key) {
            return Ok(tables);
        }

        info!("Loading tables: nodes={} edges={}", nodes, edges);

        // Both reads and both parses must succeed before anything is kept
        let node_bytes = self.read(nodes)?;
        let edge_bytes = self.read(edges)?;

        let (node_rows, mut rejected) =
            parse_nodes(node_bytes.as_slice(), &nodes.to_string(), self.policy)?;
        let (edge_rows, edge_rejected) =
            parse_edges(edge_bytes.as_slice(), &edges.to_string(), self.policy)?;
        rejected.extend(edge_rejected);

        for row in &rejected {
            warn!("Skipped {} row at line {}: {}", row.table, row.line, row.reason);
        }

        let tables = Arc::new(PhaseTables {
            nodes: node_rows,
            edges: edge_rows,
            rejected,
        });
        self.cache.insert(key, Arc::clone(&tables));

        Ok(tables)
    }

    /// Forget the cached parse for a location pair
    pub fn invalidate(&mut self, nodes: &Source, edges: &Source) -> bool {
        self.cache.invalidate(&cache::key_for(nodes, edges))
    }

    /// The underlying cache
    #[must_use]
    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    /// When the cached parse of a location pair was loaded
    #[must_use]
    pub fn loaded_at(&self, nodes: &Source, edges: &Source) -> Option<DateTime<Utc>> {
        self.cache.loaded_at(&cache::key_for(nodes, edges))
    }

    fn read(&self, source: &Source) -> Result<Vec<u8>, LoadError> {
        match source {
            Source::Url(url) => {
                let response = self.client.get(url).send().map_err(|source| LoadError::Fetch {
                    location: url.clone(),
                    source,
                })?;

                let status = response.status();
                if !status.is_success() {
                    return Err(LoadError::Status {
                        location: url.clone(),
                        status,
                    });
                }

                response
                    .bytes()
                    .map(|body| body.to_vec())
                    .map_err(|source| LoadError::Fetch {
                        location: url.clone(),
                        source,
                    })
            }
            Source::Path(path) => fs::read(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

/// Parse a node table
pub fn parse_nodes<R: Read>(
    reader: R,
    location: &str,
    policy: RowPolicy,
) -> Result<(Vec<CharacterRow>, Vec<RejectedRow>), LoadError> {
    let mut reader = csv_reader(reader);
    let headers = read_headers(&mut reader, location)?;
    let id_col = require_column(&headers, "id", location)?;
    let label_col = find_column(&headers, "label");

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| csv_error(location, source))?;
        let line = line_of(&record);

        let id = cell(&record, Some(id_col));
        if id.is_empty() {
            reject(
                &mut rejected,
                policy,
                location,
                TableKind::Nodes,
                line,
                "empty id".into(),
            )?;
            continue;
        }

        let label = Some(cell(&record, label_col))
            .filter(|l| !l.is_empty())
            .map(str::to_string);

        rows.push(CharacterRow {
            id: id.to_string(),
            label,
        });
    }

    Ok((rows, rejected))
}

/// Parse an edge table
pub fn parse_edges<R: Read>(
    reader: R,
    location: &str,
    policy: RowPolicy,
) -> Result<(Vec<RelationRow>, Vec<RejectedRow>), LoadError> {
    let mut reader = csv_reader(reader);
    let headers = read_headers(&mut reader, location)?;
    let source_col = require_column(&headers, "source", location)?;
    let target_col = require_column(&headers, "target", location)?;
    let weight_col = find_column(&headers, "weight");

    let mut rows = Vec::new();
    let mut rejected = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|source| csv_error(location, source))?;
        let line = line_of(&record);

        let source = cell(&record, Some(source_col));
        let target = cell(&record, Some(target_col));
        let checked = if source.is_empty() || target.is_empty() {
            Err("empty source or target".to_string())
        } else {
            parse_weight(cell(&record, weight_col))
        };

        match checked {
            Ok(weight) => rows.push(RelationRow {
                source: source.to_string(),
                target: target.to_string(),
                weight,
            }),
            Err(reason) => {
                reject(&mut rejected, policy, location, TableKind::Edges, line, reason)?;
            }
        }
    }

    Ok((rows, rejected))
}

/// Resolve an edge weight cell: missing, empty or zero means 1
fn parse_weight(raw: &str) -> Result<f64, String> {
    if raw.is_empty() {
        return Ok(1.0);
    }

    let weight: f64 = raw
        .parse()
        .map_err(|_| format!("weight `{raw}` is not a number"))?;

    if !weight.is_finite() || weight < 0.0 {
        return Err(format!("weight `{raw}` must be finite and non-negative"));
    }

    Ok(if weight == 0.0 { 1.0 } else { weight })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader)
}

fn read_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    location: &str,
) -> Result<StringRecord, LoadError> {
    reader
        .headers()
        .cloned()
        .map_err(|source| csv_error(location, source))
}

fn normalize_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| normalize_header(h).eq_ignore_ascii_case(name))
}

fn require_column(
    headers: &StringRecord,
    name: &'static str,
    location: &str,
) -> Result<usize, LoadError> {
    find_column(headers, name).ok_or_else(|| LoadError::MissingColumn {
        location: location.to_string(),
        column: name,
        headers: headers
            .iter()
            .map(normalize_header)
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn cell(record: &StringRecord, column: Option<usize>) -> &str {
    column
        .and_then(|c| record.get(c))
        .map_or("", str::trim)
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

fn csv_error(location: &str, source: csv::Error) -> LoadError {
    LoadError::Csv {
        location: location.to_string(),
        source,
    }
}

fn reject(
    rejected: &mut Vec<RejectedRow>,
    policy: RowPolicy,
    location: &str,
    table: TableKind,
    line: u64,
    reason: String,
) -> Result<(), LoadError> {
    match policy {
        RowPolicy::Strict => Err(LoadError::MalformedRow {
            location: location.to_string(),
            line,
            reason,
        }),
        RowPolicy::Lenient => {
            rejected.push(RejectedRow {
                table,
                line,
                reason,
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;
    use tempfile::TempDir;

    fn nodes(csv: &str) -> Result<(Vec<CharacterRow>, Vec<RejectedRow>), LoadError> {
        parse_nodes(csv.as_bytes(), "nodes.csv", RowPolicy::Lenient)
    }

    fn edges(csv: &str) -> Result<(Vec<RelationRow>, Vec<RejectedRow>), LoadError> {
        parse_edges(csv.as_bytes(), "edges.csv", RowPolicy::Lenient)
    }

    #[test]
    fn test_source_classification() {
        assert!(matches!(
            Source::parse(" https://example.org/n.csv"),
            Source::Url(url) if url == "https://example.org/n.csv"
        ));
        assert_eq!(
            Source::parse("data/n.csv"),
            Source::Path(PathBuf::from("data/n.csv"))
        );
        assert_eq!(
            Source::parse("file:///tmp/n.csv"),
            Source::Path(PathBuf::from("/tmp/n.csv"))
        );
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let (upper, _) = nodes("Id,Label\n1,Baoyu\n").unwrap();
        let (lower, _) = nodes("id,label\n1,Baoyu\n").unwrap();
        let (shout, _) = nodes("ID,LABEL\n1,Baoyu\n").unwrap();

        assert_eq!(upper, lower);
        assert_eq!(lower, shout);
        assert_eq!(upper[0].label.as_deref(), Some("Baoyu"));
    }

    #[test]
    fn test_bom_and_padding_in_headers() {
        let (rows, _) = nodes("\u{feff}Id , Label\n 7 , Daiyu \n").unwrap();
        assert_eq!(rows[0].id, "7");
        assert_eq!(rows[0].label.as_deref(), Some("Daiyu"));
    }

    #[test]
    fn test_missing_label_column_is_allowed() {
        let (rows, rejected) = nodes("Id\nA\nB\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.label.is_none()));
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_missing_id_column_fails() {
        let err = nodes("Name,Label\nA,B\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "id", .. }));
    }

    #[test]
    fn test_missing_target_column_fails() {
        let err = edges("Source,Weight\nA,1\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { column: "target", .. }));
    }

    #[test]
    fn test_weight_defaults() {
        let (rows, rejected) =
            edges("Source,Target,Weight\nA,B,\nA,C,0\nA,D,2.5\nA,E,0.0\n").unwrap();

        let weights: Vec<f64> = rows.iter().map(|r| r.weight).collect();
        assert_eq!(weights, vec![1.0, 1.0, 2.5, 1.0]);
        assert!(rejected.is_empty());
    }

    #[test]
    fn test_weight_column_optional() {
        let (rows, _) = edges("source,target\nA,B\n").unwrap();
        assert_eq!(rows[0].weight, 1.0);
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let (rows, _) = edges("Source,Target,Weight\nA,B\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weight, 1.0);
    }

    #[test]
    fn test_lenient_policy_skips_malformed_rows() {
        let (rows, rejected) =
            edges("Source,Target,Weight\nA,B,heavy\n,C,1\nA,C,-2\nB,C,3\n").unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, "B");
        assert_eq!(rejected.len(), 3);
        assert!(rejected.iter().all(|r| r.table == TableKind::Edges));
        assert_eq!(rejected[0].line, 2);
        assert!(rejected[0].reason.contains("heavy"));
    }

    #[test]
    fn test_strict_policy_fails_on_malformed_row() {
        let err = parse_nodes("Id,Label\nA,x\n,y\n".as_bytes(), "n.csv", RowPolicy::Strict)
            .unwrap_err();

        match err {
            LoadError::MalformedRow { line, reason, .. } => {
                assert_eq!(line, 3);
                assert_eq!(reason, "empty id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_non_finite_weight_rejected() {
        let (rows, rejected) = edges("Source,Target,Weight\nA,B,inf\nA,B,NaN\n").unwrap();
        assert!(rows.is_empty());
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_load_from_files_and_cache() {
        let dir = TempDir::new().unwrap();
        let nodes_path = dir.path().join("nodes.csv");
        let edges_path = dir.path().join("edges.csv");
        fs::write(&nodes_path, "Id,Label\nA,Alpha\nB,Beta\n").unwrap();
        fs::write(&edges_path, "Source,Target,Weight\nA,B,2\n").unwrap();

        let mut loader = Loader::new(&FetchConfig::default(), 4, RowPolicy::Lenient).unwrap();
        let n = Source::Path(nodes_path.clone());
        let e = Source::Path(edges_path.clone());

        let first = loader.load(&n, &e).unwrap();
        assert_eq!(first.nodes.len(), 2);
        assert_eq!(first.edges.len(), 1);

        // Change the file: the cached parse is still served until invalidated
        fs::write(&nodes_path, "Id\nA\nB\nC\n").unwrap();
        assert_eq!(loader.load(&n, &e).unwrap().nodes.len(), 2);

        assert!(loader.invalidate(&n, &e));
        assert_eq!(loader.load(&n, &e).unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let nodes_path = dir.path().join("nodes.csv");
        fs::write(&nodes_path, "Id\nA\n").unwrap();

        let mut loader = Loader::new(&FetchConfig::default(), 4, RowPolicy::Lenient).unwrap();
        let n = Source::Path(nodes_path);
        let e = Source::Path(dir.path().join("missing.csv"));

        let err = loader.load(&n, &e).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(loader.cache().is_empty());
    }

    /// Answer every request on a local port from a fixed (path, status, body) table
    fn serve(routes: &'static [(&'static str, u16, &'static str)]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let Ok(read_half) = stream.try_clone() else { break };
                let mut reader = BufReader::new(read_half);

                let mut request_line = String::new();
                let _ = reader.read_line(&mut request_line);
                let mut header = String::new();
                loop {
                    header.clear();
                    match reader.read_line(&mut header) {
                        Ok(n) if n > 0 && !header.trim().is_empty() => {}
                        _ => break,
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = routes
                    .iter()
                    .find(|(route, _, _)| *route == path)
                    .map_or((404, ""), |&(_, status, body)| (status, body));
                let reason = match status {
                    200 => "OK",
                    500 => "Internal Server Error",
                    _ => "Not Found",
                };
                let _ = write!(
                    stream,
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
            }
        });

        base
    }

    #[test]
    fn test_remote_tables_load_and_cache() {
        let base = serve(&[
            ("/nodes.csv", 200, "Id,Label\nA,Alpha\nB,Beta\n"),
            ("/edges.csv", 200, "Source,Target\nA,B\n"),
        ]);
        let n = Source::parse(&format!("{base}/nodes.csv"));
        let e = Source::parse(&format!("{base}/edges.csv"));
        let mut loader = Loader::new(&FetchConfig::default(), 4, RowPolicy::Lenient).unwrap();

        let tables = loader.load(&n, &e).unwrap();
        assert_eq!(tables.nodes.len(), 2);
        assert_eq!(tables.edges[0].weight, 1.0);

        let stamp = loader.loaded_at(&n, &e).unwrap();
        loader.load(&n, &e).unwrap();
        assert_eq!(loader.loaded_at(&n, &e), Some(stamp));
        assert_eq!(loader.cache().stats().hits, 1);
    }

    #[test]
    fn test_remote_error_status_is_not_cached() {
        let base = serve(&[
            ("/nodes.csv", 200, "Id,Label\nA,Alpha\n"),
            ("/edges.csv", 500, "boom"),
        ]);
        let n = Source::parse(&format!("{base}/nodes.csv"));
        let e = Source::parse(&format!("{base}/edges.csv"));
        let mut loader = Loader::new(&FetchConfig::default(), 4, RowPolicy::Lenient).unwrap();

        let err = loader.load(&n, &e).unwrap_err();
        match &err {
            LoadError::Status { location, status } => {
                assert!(location.ends_with("/edges.csv"));
                assert_eq!(status.as_u16(), 500);
            }
            other => panic!("expected a status error, got {other:?}"),
        }
        assert!(err.to_string().contains("returned HTTP 500"));
        assert!(loader.cache().is_empty());
        assert!(loader.loaded_at(&n, &e).is_none());
    }
}
