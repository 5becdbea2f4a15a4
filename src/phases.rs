// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Phase catalog - the datasets a user can select, with their commentary

use serde::{Deserialize, Serialize};

const DATA_ROOT: &str = "https://raw.githubusercontent.com/seblee424/jiabaoyu_social_network/main";

/// Close-reading commentary shown under a phase's metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Heading
    pub title: String,
    /// Textual background for the chapters
    pub context: String,
    /// What the network metrics say about it
    pub analysis: String,
    /// Where this phase sits in the overall arc, shown beside the conclusion
    #[serde(default)]
    pub summary: Option<String>,
}

/// One selectable dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDataset {
    /// Short selector, e.g. `phase1`
    pub key: String,
    /// Display name
    pub name: String,
    /// Location of the node table (URL or path)
    pub nodes: String,
    /// Location of the edge table (URL or path)
    pub edges: String,
    /// One-line description shown under the title
    #[serde(default)]
    pub description: String,
    /// Optional commentary
    #[serde(default)]
    pub reflection: Option<Reflection>,
}

impl PhaseDataset {
    /// An ad-hoc phase for a pair of table locations
    #[must_use]
    pub fn ad_hoc(nodes: &str, edges: &str) -> Self {
        Self {
            key: "custom".into(),
            name: "Custom dataset".into(),
            nodes: nodes.into(),
            edges: edges.into(),
            description: format!("Nodes from {nodes}, edges from {edges}"),
            reflection: None,
        }
    }
}

/// Closing remarks shown after every phase
pub const CONCLUSION: &str = "Read together, the three phases trace Jia Baoyu's growth as a \
tragedy: an egalitarian utopia built inside the Grand View Garden is first strained by \
emotional entanglement and then cut apart and rearranged by the household's patriarchal \
order. He starts as the architect of his own circle and ends as its most disciplined member.";

fn table_url(kind: &str, file: &str) -> String {
    format!("{DATA_ROOT}/{kind}_{file}.csv")
}

/// The three built-in phases
#[must_use]
pub fn builtin() -> Vec<PhaseDataset> {
    vec![
        PhaseDataset {
            key: "phase1".into(),
            name: "Phase 1: Innocent Youth (ch. 19-23)".into(),
            nodes: table_url("nodes", "phase1_%E5%A4%A9%E7%9C%9F%E5%B0%91%E5%B9%B4(19-23%E5%9B%9E)"),
            edges: table_url("edges", "phase1_%E5%A4%A9%E7%9C%9F%E5%B0%91%E5%B9%B4(19-23%E5%9B%9E)"),
            description: "Early days in the Grand View Garden: Baoyu lives carefree and tries \
                          to build a pure kingdom of girls."
                .into(),
            reflection: Some(Reflection {
                title: "1. Universal Love".into(),
                context: "The garden has just opened; chapter 23's reading of The Western \
                          Chamber is the high point. Baoyu tries to build a world where maids \
                          and young ladies mix freely across rank."
                    .into(),
                analysis: "The network is dense and egocentric: every tie runs through Baoyu. \
                           Maids such as Xiren and Qingwen sit about as close to him as Daiyu \
                           and Baochai do, an unusual flatness for a rigidly ranked household \
                           that mirrors his indiscriminate sympathy at this age."
                    .into(),
                summary: Some(
                    "Building the ideal. \"I will make an equal world.\" Baoyu acts as a \
                     romantic social reformer, raising a new order above the feudal ranks \
                     inside the garden. The dense, rank-blind network is that utopia in \
                     numbers, and his growth begins as something active and constructive."
                        .into(),
                ),
            }),
        },
        PhaseDataset {
            key: "phase2".into(),
            name: "Phase 2: Emotional Awakening (ch. 26-29)".into(),
            nodes: table_url("nodes", "phase2_%E6%83%85%E6%84%9F%E8%A7%89%E9%86%92(26-29%E5%9B%9E)"),
            edges: table_url("edges", "phase2_%E6%83%85%E6%84%9F%E8%A7%89%E9%86%92(26-29%E5%9B%9E)"),
            description: "Feelings deepen; the Baoyu-Daiyu-Baochai triangle becomes the core \
                          and the network starts to show emotional tension."
                .into(),
            reflection: Some(Reflection {
                title: "2. Differentiation and Tension".into(),
                context: "Chapter 27 at Dripping Emerald Pavilion and chapter 29 at the Taoist \
                          temple sharpen the conflict between the gold-and-jade match and the \
                          bond of wood and stone."
                    .into(),
                analysis: "Modularity rises as communities separate. Baoyu's strongest ties \
                           lean toward Daiyu while Baochai bridges groups and keeps a strong \
                           structural position. The triangle absorbs most of his attention and \
                           his ties to the periphery thin out."
                    .into(),
                summary: Some(
                    "Faltering belief. \"Cracks are opening in my world.\" Deep feeling \
                     for Daiyu and outside pressure from the gold-and-jade match expose the \
                     flaws in the ideal. Modularity rises as small groups form, and Baoyu is \
                     no longer an easy centre but a torn figure whose social capacity is \
                     spent on entanglement."
                        .into(),
                ),
            }),
        },
        PhaseDataset {
            key: "phase3".into(),
            name: "Phase 3: Collision with Reality (ch. 32-36)".into(),
            nodes: table_url("nodes", "phase3_%E7%8E%B0%E5%AE%9E%E5%86%B2%E5%87%BB(32-36%E5%9B%9E)"),
            edges: table_url("edges", "phase3_%E7%8E%B0%E5%AE%9E%E5%86%B2%E5%87%BB(32-36%E5%9B%9E)"),
            description: "Jinchuan's death and Baoyu's beating: harsh outside reality breaks \
                          the calm of the ideal world."
                .into(),
            reflection: Some(Reflection {
                title: "3. Intrusion and Structural Collapse".into(),
                context: "Chapter 33 Baoyu is beaten; chapter 34 Xiren counsels Lady Wang. \
                          Jia Zheng and Lady Wang, the voices of patriarchal order, gain weight \
                          and press directly on the garden's network."
                    .into(),
                analysis: "Xiren's betweenness centrality is the key reading: she becomes the \
                           hub between Baoyu's utopia and the household hierarchy. Once Lady \
                           Wang's will flows through her, outside power enters the network and \
                           Baoyu is no longer its sole centre."
                    .into(),
                summary: Some(
                    "Loss of the ideal. \"Reality binds me and I cannot resist.\" \
                     Patriarchal power breaks in through Xiren as gatekeeper and rewrites \
                     the rules of the network. Baoyu loses command of his circle as it is \
                     cut apart and regrouped, and growth becomes a painful, passive \
                     acceptance."
                        .into(),
                ),
            }),
        },
    ]
}

/// Pick a phase by key, 1-based position, or case-insensitive name fragment
#[must_use]
pub fn find<'a>(phases: &'a [PhaseDataset], selector: &str) -> Option<&'a PhaseDataset> {
    let selector = selector.trim();

    if let Some(phase) = phases.iter().find(|p| p.key.eq_ignore_ascii_case(selector)) {
        return Some(phase);
    }

    if let Ok(position) = selector.parse::<usize>() {
        return position.checked_sub(1).and_then(|i| phases.get(i));
    }

    let needle = selector.to_lowercase();
    phases
        .iter()
        .find(|p| p.name.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let phases = builtin();
        assert_eq!(phases.len(), 3);
        assert!(phases.iter().all(|p| p.nodes.starts_with("https://")));
        assert!(phases.iter().all(|p| p.nodes.contains("/nodes_phase")));
        assert!(phases.iter().all(|p| p.edges.contains("/edges_phase")));
        assert!(phases.iter().all(|p| p.reflection.is_some()));
    }

    #[test]
    fn test_builtin_summaries_follow_the_arc() {
        let phases = builtin();
        let headings: Vec<&str> = phases
            .iter()
            .filter_map(|p| p.reflection.as_ref()?.summary.as_deref())
            .filter_map(|s| s.split('.').next())
            .collect();
        assert_eq!(
            headings,
            ["Building the ideal", "Faltering belief", "Loss of the ideal"]
        );
    }

    #[test]
    fn test_reflection_summary_is_optional() {
        let reflection: Reflection =
            toml::from_str("title = \"T\"\ncontext = \"C\"\nanalysis = \"A\"\n").unwrap();
        assert!(reflection.summary.is_none());
    }

    #[test]
    fn test_find_by_key_index_and_name() {
        let phases = builtin();

        assert_eq!(find(&phases, "phase2").map(|p| p.key.as_str()), Some("phase2"));
        assert_eq!(find(&phases, "PHASE3").map(|p| p.key.as_str()), Some("phase3"));
        assert_eq!(find(&phases, "1").map(|p| p.key.as_str()), Some("phase1"));
        assert_eq!(find(&phases, "awakening").map(|p| p.key.as_str()), Some("phase2"));
        assert!(find(&phases, "0").is_none());
        assert!(find(&phases, "4").is_none());
        assert!(find(&phases, "epilogue").is_none());
    }

    #[test]
    fn test_ad_hoc_phase() {
        let phase = PhaseDataset::ad_hoc("n.csv", "e.csv");
        assert_eq!(phase.nodes, "n.csv");
        assert_eq!(phase.edges, "e.csv");
        assert!(phase.reflection.is_none());
    }
}
