// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use charnet::graph::CharacterGraph;
use charnet::loader::{parse_edges, parse_nodes};
use charnet::types::{PhaseTables, RowPolicy};
use libfuzzer_sys::fuzz_target;

// Split the input at the first NUL into a node table and an edge table
fuzz_target!(|data: &[u8]| {
    let split = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let (node_bytes, edge_bytes) = data.split_at(split);
    let edge_bytes = edge_bytes.get(1..).unwrap_or_default();

    for policy in [RowPolicy::Lenient, RowPolicy::Strict] {
        let nodes = parse_nodes(node_bytes, "fuzz-nodes", policy);
        let edges = parse_edges(edge_bytes, "fuzz-edges", policy);

        if let (Ok((nodes, mut rejected)), Ok((edges, edge_rejected))) = (nodes, edges) {
            assert!(edges.iter().all(|e| e.weight.is_finite() && e.weight > 0.0));
            rejected.extend(edge_rejected);
            if policy == RowPolicy::Strict {
                assert!(rejected.is_empty());
            }

            let (graph, _) = CharacterGraph::from_tables(&PhaseTables {
                nodes,
                edges,
                rejected,
            });
            assert!(graph.edge_count() <= graph.node_count().saturating_mul(graph.node_count()));
        }
    }
});
