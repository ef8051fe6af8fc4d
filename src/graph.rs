//! Reference/replacement graph over the document set.
//!
//! Computed on demand from the current collection; nothing here is
//! persisted. Edges are typed: `replaces` comes from the explicit
//! replaces/replaced-by metadata, `references` from free-text `BIP-123` /
//! `BIP 123` mentions in the content. Deduplication is per (source,
//! target) pair within a type only, and edges may point at numbers with
//! no corresponding node.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{Bip, BipStatus};

static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bBIP[-\s]0*(\d+)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Replaces,
    References,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub number: u32,
    pub title: String,
    pub status: BipStatus,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: u32,
    pub target: u32,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub replaces_edges: usize,
    pub references_edges: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub stats: GraphStats,
}

/// Build the graph from the current document set.
pub fn build_graph(bips: &[Bip]) -> DependencyGraph {
    let nodes: Vec<GraphNode> = bips
        .iter()
        .map(|b| GraphNode {
            number: b.number,
            title: b.title.clone(),
            status: b.status,
            categories: b.categories.clone(),
        })
        .collect();

    let mut edges: Vec<GraphEdge> = Vec::new();
    let mut seen: HashSet<GraphEdge> = HashSet::new();

    let mut push = |edges: &mut Vec<GraphEdge>, edge: GraphEdge| {
        if seen.insert(edge) {
            edges.push(edge);
        }
    };

    // Explicit replacement metadata. Both lists emit from the owning
    // document, so dangling targets are preserved rather than resolved.
    for bip in bips {
        for &target in bip.replaces.iter().chain(bip.replaced_by.iter()) {
            push(
                &mut edges,
                GraphEdge {
                    source: bip.number,
                    target,
                    kind: EdgeKind::Replaces,
                },
            );
        }
    }

    // Free-text mentions.
    for bip in bips {
        for caps in MENTION_RE.captures_iter(&bip.content) {
            let Ok(target) = caps[1].parse::<u32>() else {
                continue;
            };
            if target == bip.number {
                continue;
            }
            push(
                &mut edges,
                GraphEdge {
                    source: bip.number,
                    target,
                    kind: EdgeKind::References,
                },
            );
        }
    }

    let replaces_edges = edges.iter().filter(|e| e.kind == EdgeKind::Replaces).count();
    let references_edges = edges.len() - replaces_edges;

    DependencyGraph {
        stats: GraphStats {
            node_count: nodes.len(),
            edge_count: edges.len(),
            replaces_edges,
            references_edges,
        },
        nodes,
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BipType;

    fn bip(number: u32, content: &str, replaces: Vec<u32>, replaced_by: Vec<u32>) -> Bip {
        Bip {
            number,
            title: format!("BIP {}", number),
            authors: vec!["A".to_string()],
            status: BipStatus::Draft,
            kind: BipType::StandardsTrack,
            created: String::new(),
            layer: None,
            abstract_text: String::new(),
            content: content.to_string(),
            explanation: None,
            source_filename: format!("bip-{:04}.mediawiki", number),
            source_url: String::new(),
            replaces,
            replaced_by,
            categories: vec!["general".to_string()],
        }
    }

    #[test]
    fn dangling_replacement_targets_are_kept() {
        let docs = vec![bip(141, "", vec![], vec![1000])];
        let graph = build_graph(&docs);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(
            graph.edges,
            vec![GraphEdge {
                source: 141,
                target: 1000,
                kind: EdgeKind::Replaces,
            }]
        );
    }

    #[test]
    fn mentions_become_reference_edges() {
        let docs = vec![bip(
            143,
            "Builds on BIP-141 and BIP 0016; see also bip-141 again.",
            vec![],
            vec![],
        )];
        let graph = build_graph(&docs);

        assert_eq!(graph.edges.len(), 2);
        assert!(graph.edges.contains(&GraphEdge {
            source: 143,
            target: 141,
            kind: EdgeKind::References,
        }));
        assert!(graph.edges.contains(&GraphEdge {
            source: 143,
            target: 16,
            kind: EdgeKind::References,
        }));
    }

    #[test]
    fn self_mentions_are_ignored() {
        let docs = vec![bip(9, "This document is BIP 9.", vec![], vec![])];
        assert!(build_graph(&docs).edges.is_empty());
    }

    #[test]
    fn dedup_is_per_type_only() {
        // An explicit replacement and a textual mention of the same pair
        // both survive; duplicate mentions collapse.
        let docs = vec![bip(16, "Replaces BIP 12. Again: BIP-12.", vec![12], vec![])];
        let graph = build_graph(&docs);

        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.stats.replaces_edges, 1);
        assert_eq!(graph.stats.references_edges, 1);
    }

    #[test]
    fn edge_type_serializes_lowercase() {
        let docs = vec![bip(141, "", vec![], vec![1000])];
        let json = serde_json::to_value(build_graph(&docs)).unwrap();
        assert_eq!(json["edges"][0]["type"], "replaces");
        assert_eq!(json["stats"]["nodeCount"], 1);
    }
}
