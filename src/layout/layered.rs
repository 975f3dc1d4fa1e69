// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::StepId;
use crate::projection::{GraphEdge, GraphNode, Position};

const DEFAULT_SWEEPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutDirection {
    #[default]
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "BT")]
    BottomToTop,
    #[serde(rename = "RL")]
    RightToLeft,
}

impl LayoutDirection {
    fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftToRight | Self::RightToLeft)
    }

    fn is_reversed(self) -> bool {
        matches!(self, Self::BottomToTop | Self::RightToLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: LayoutDirection,
    /// Gap between neighbours within a rank.
    pub node_spacing: f64,
    /// Gap between consecutive ranks.
    pub rank_spacing: f64,
    pub node_width: f64,
    pub node_height: f64,
    pub margin: f64,
    pub sweeps: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            node_spacing: 150.0,
            rank_spacing: 200.0,
            node_width: 280.0,
            node_height: 120.0,
            margin: 50.0,
            sweeps: DEFAULT_SWEEPS,
        }
    }
}

impl LayoutOptions {
    /// Roomier spacing for branching workflows.
    pub fn workflow(direction: LayoutDirection) -> Self {
        Self { direction, node_spacing: 180.0, rank_spacing: 220.0, ..Self::default() }
    }

    /// Left-to-right with reduced spacing for dense graphs.
    pub fn compact() -> Self {
        Self {
            direction: LayoutDirection::LeftToRight,
            node_spacing: 100.0,
            rank_spacing: 150.0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayeredLayout {
    layers: Vec<Vec<StepId>>,
    positions: IndexMap<StepId, Position>,
    reversed_edges: usize,
}

impl LayeredLayout {
    pub fn layers(&self) -> &[Vec<StepId>] {
        &self.layers
    }

    /// Top-left position per node, in input node order.
    pub fn positions(&self) -> &IndexMap<StepId, Position> {
        &self.positions
    }

    pub fn position(&self, node_id: &str) -> Option<Position> {
        self.positions.get(node_id).copied()
    }

    /// Number of edges reversed to break cycles.
    pub fn reversed_edges(&self) -> usize {
        self.reversed_edges
    }
}

/// Deterministic layered layout.
///
/// - Breaks cycles by reversing DFS back edges.
/// - Assigns ranks by longest path from the sources.
/// - Orders each rank with alternating barycenter sweeps.
/// - Centres every rank on the widest one.
///
/// Edges whose endpoints are not among `nodes` are ignored. Prior positions are not consulted.
pub fn layout_graph(
    nodes: &[GraphNode],
    edges: &[GraphEdge],
    options: &LayoutOptions,
) -> LayeredLayout {
    let index_of = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect::<HashMap<_, _>>();

    let mut outgoing = vec![BTreeSet::<usize>::new(); nodes.len()];
    for edge in edges {
        let (Some(&from), Some(&to)) =
            (index_of.get(edge.source.as_str()), index_of.get(edge.target.as_str()))
        else {
            continue;
        };
        if from != to {
            outgoing[from].insert(to);
        }
    }

    let reversed_edges = break_cycles(&mut outgoing);
    let ranks = assign_ranks(&outgoing);

    let max_rank = ranks.iter().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::<usize>::new(); if nodes.is_empty() { 0 } else { max_rank + 1 }];
    for (idx, rank) in ranks.iter().enumerate() {
        layers[*rank].push(idx);
    }

    let mut incoming = vec![Vec::<usize>::new(); nodes.len()];
    for (from, tos) in outgoing.iter().enumerate() {
        for to in tos {
            incoming[*to].push(from);
        }
    }
    let outgoing =
        outgoing.into_iter().map(|tos| tos.into_iter().collect()).collect::<Vec<Vec<_>>>();

    for _ in 0..options.sweeps {
        for layer_idx in 1..layers.len() {
            let (before, rest) = layers.split_at_mut(layer_idx);
            sort_layer_by_barycenter(&mut rest[0], &before[layer_idx - 1], &incoming);
        }
        for layer_idx in (0..layers.len().saturating_sub(1)).rev() {
            let (head, after) = layers.split_at_mut(layer_idx + 1);
            sort_layer_by_barycenter(&mut head[layer_idx], &after[0], &outgoing);
        }
    }

    let positions = assign_coordinates(&layers, options);
    let mut ordered = IndexMap::with_capacity(nodes.len());
    for (idx, node) in nodes.iter().enumerate() {
        ordered.insert(node.id.clone(), positions[idx]);
    }

    LayeredLayout {
        layers: layers
            .iter()
            .map(|layer| layer.iter().map(|idx| nodes[*idx].id.clone()).collect())
            .collect(),
        positions: ordered,
        reversed_edges,
    }
}

/// Overwrites every node position present in `layout`.
pub fn apply_layout(nodes: &mut [GraphNode], layout: &LayeredLayout) {
    for node in nodes {
        if let Some(position) = layout.position(node.id.as_str()) {
            node.position = position;
        }
    }
}

/// Reverses every edge that closes a cycle during an input-ordered DFS.
fn break_cycles(outgoing: &mut [BTreeSet<usize>]) -> usize {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; outgoing.len()];
    let mut back_edges = Vec::<(usize, usize)>::new();

    for start in 0..outgoing.len() {
        if marks[start] != Mark::New {
            continue;
        }
        marks[start] = Mark::Active;
        let mut stack = vec![(start, outgoing[start].iter().copied().collect::<Vec<_>>(), 0usize)];

        while let Some((node, children, cursor)) = stack.last_mut() {
            let Some(&child) = children.get(*cursor) else {
                marks[*node] = Mark::Done;
                stack.pop();
                continue;
            };
            *cursor += 1;
            let from = *node;
            match marks[child] {
                Mark::Active => back_edges.push((from, child)),
                Mark::Done => {}
                Mark::New => {
                    marks[child] = Mark::Active;
                    let grandchildren = outgoing[child].iter().copied().collect();
                    stack.push((child, grandchildren, 0));
                }
            }
        }
    }

    for (from, to) in &back_edges {
        outgoing[*from].remove(to);
        outgoing[*to].insert(*from);
    }
    back_edges.len()
}

/// Longest-path ranks over an acyclic adjacency, via a deterministic topological order.
fn assign_ranks(outgoing: &[BTreeSet<usize>]) -> Vec<usize> {
    let mut indegree = vec![0usize; outgoing.len()];
    for tos in outgoing {
        for to in tos {
            indegree[*to] += 1;
        }
    }

    let mut ready = indegree
        .iter()
        .enumerate()
        .filter_map(|(idx, degree)| (*degree == 0).then_some(idx))
        .collect::<BTreeSet<_>>();
    let mut ranks = vec![0usize; outgoing.len()];

    while let Some(next) = ready.pop_first() {
        for to in &outgoing[next] {
            ranks[*to] = ranks[*to].max(ranks[next] + 1);
            indegree[*to] -= 1;
            if indegree[*to] == 0 {
                ready.insert(*to);
            }
        }
    }

    ranks
}

fn sort_layer_by_barycenter(layer: &mut [usize], fixed: &[usize], neighbors: &[Vec<usize>]) {
    let fixed_positions = fixed
        .iter()
        .enumerate()
        .map(|(pos, idx)| (*idx, pos))
        .collect::<HashMap<_, _>>();
    let current = layer
        .iter()
        .enumerate()
        .map(|(pos, idx)| (*idx, pos))
        .collect::<HashMap<_, _>>();

    let barycenter = |idx: usize| -> Option<(usize, usize)> {
        let (sum, count) = neighbors[idx]
            .iter()
            .filter_map(|n| fixed_positions.get(n).copied())
            .fold((0usize, 0usize), |(sum, count), pos| (sum + pos, count + 1));
        (count > 0).then_some((sum, count))
    };

    // Nodes without neighbours in the fixed layer move behind the others, keeping their order.
    layer.sort_by(|a, b| match (barycenter(*a), barycenter(*b)) {
        (None, None) => current[a].cmp(&current[b]),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some((sum_a, count_a)), Some((sum_b, count_b))) => {
            // Compare sum_a/count_a vs sum_b/count_b without floats.
            let left = (sum_a as u128) * (count_b as u128);
            let right = (sum_b as u128) * (count_a as u128);
            left.cmp(&right).then_with(|| current[a].cmp(&current[b]))
        }
    });
}

fn assign_coordinates(layers: &[Vec<usize>], options: &LayoutOptions) -> Vec<Position> {
    let node_count = layers.iter().map(Vec::len).sum::<usize>();
    let mut positions = vec![Position::default(); node_count];

    let (main_size, cross_size) = if options.direction.is_horizontal() {
        (options.node_width, options.node_height)
    } else {
        (options.node_height, options.node_width)
    };
    let rank_extent = |count: usize| {
        count as f64 * cross_size + count.saturating_sub(1) as f64 * options.node_spacing
    };
    let widest = layers.iter().map(|layer| rank_extent(layer.len())).fold(0.0, f64::max);
    let last_rank = layers.len().saturating_sub(1);

    for (rank, layer) in layers.iter().enumerate() {
        let slot = if options.direction.is_reversed() { last_rank - rank } else { rank };
        let main = options.margin + slot as f64 * (main_size + options.rank_spacing);
        let start = options.margin + (widest - rank_extent(layer.len())) / 2.0;

        for (order, idx) in layer.iter().enumerate() {
            let cross = start + order as f64 * (cross_size + options.node_spacing);
            positions[*idx] = if options.direction.is_horizontal() {
                Position::new(main, cross)
            } else {
                Position::new(cross, main)
            };
        }
    }

    positions
}

#[cfg(test)]
mod tests {
    use super::{apply_layout, layout_graph, LayoutDirection, LayoutOptions};
    use crate::model::fixtures;
    use crate::projection::{project, Position, ProjectionConfig};

    fn layer_ids(layout: &super::LayeredLayout) -> Vec<Vec<&str>> {
        layout
            .layers()
            .iter()
            .map(|layer| layer.iter().map(|id| id.as_str()).collect())
            .collect()
    }

    #[test]
    fn linear_flow_stacks_top_to_bottom() {
        let doc = fixtures::linear_flow(&["a", "b", "c"]);
        let graph = project(&doc, None, &ProjectionConfig::default());
        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::default());

        assert_eq!(layer_ids(&layout), vec![vec!["a"], vec!["b"], vec!["c"]]);
        assert_eq!(layout.position("a"), Some(Position::new(50.0, 50.0)));
        // rank step = node height 120 + rank spacing 200
        assert_eq!(layout.position("b"), Some(Position::new(50.0, 370.0)));
        assert_eq!(layout.position("c"), Some(Position::new(50.0, 690.0)));
    }

    #[test]
    fn branches_share_a_rank_and_are_centred() {
        let graph = project(&fixtures::decision_branch(), None, &ProjectionConfig::default());
        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::default());

        assert_eq!(layer_ids(&layout), vec![vec!["a"], vec!["b", "c"]]);
        // Widest rank: 2 * 280 + 150 = 710; the single root is centred on it.
        assert_eq!(layout.position("a"), Some(Position::new(50.0 + 215.0, 50.0)));
        assert_eq!(layout.position("b"), Some(Position::new(50.0, 370.0)));
        assert_eq!(layout.position("c"), Some(Position::new(480.0, 370.0)));
    }

    #[test]
    fn left_to_right_swaps_axes() {
        let doc = fixtures::linear_flow(&["a", "b"]);
        let graph = project(&doc, None, &ProjectionConfig::default());
        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::compact());

        assert_eq!(layout.position("a"), Some(Position::new(50.0, 50.0)));
        // rank step = node width 280 + rank spacing 150
        assert_eq!(layout.position("b"), Some(Position::new(480.0, 50.0)));
    }

    #[test]
    fn bottom_to_top_mirrors_ranks() {
        let doc = fixtures::linear_flow(&["a", "b"]);
        let graph = project(&doc, None, &ProjectionConfig::default());
        let options = LayoutOptions::workflow(LayoutDirection::BottomToTop);
        let layout = layout_graph(&graph.nodes, &graph.edges, &options);

        let a = layout.position("a").expect("a");
        let b = layout.position("b").expect("b");
        assert!(a.y > b.y);
        assert_eq!(b.y, 50.0);
    }

    #[test]
    fn cycles_are_broken_instead_of_rejected() {
        let mut doc = fixtures::linear_flow(&["a", "b", "c"]);
        doc.step_mut("c")
            .expect("c")
            .set_next_step(Some(crate::model::StepId::new("a").expect("id")));
        let graph = project(&doc, None, &ProjectionConfig::default());
        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::default());

        assert_eq!(layout.reversed_edges(), 1);
        assert_eq!(layer_ids(&layout), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn barycenter_sweeps_untangle_crossings() {
        // a1 -> b2 and a2 -> b1; the node list puts b1 first so the initial order crosses.
        let text = "\
flow_id: crossing
name: Crossing
steps:
  root:
    name: Root
    type: decision_point
    config:
      prompt: Pick
      options:
        - { label: L, value: l, next_step: a1 }
        - { label: R, value: r, next_step: a2 }
  a1: { name: A1, type: execute_action, next_step: b2 }
  a2: { name: A2, type: execute_action, next_step: b1 }
  b1: { name: B1, type: execute_action }
  b2: { name: B2, type: execute_action }
";
        let doc = crate::format::parse_document(text).expect("parse");
        let mut graph = project(&doc, None, &ProjectionConfig::default());
        let order = graph.nodes.iter().map(|n| n.id.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["root", "a1", "a2", "b2", "b1"]);
        graph.nodes.swap(3, 4);

        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::default());
        assert_eq!(layer_ids(&layout)[1], vec!["a1", "a2"]);
        assert_eq!(layer_ids(&layout)[2], vec!["b2", "b1"]);
    }

    #[test]
    fn apply_layout_overwrites_manual_positions() {
        let mut graph =
            project(&fixtures::linear_flow(&["a", "b"]), None, &ProjectionConfig::default());
        graph.nodes[0].position = Position::new(-999.0, -999.0);
        let layout = layout_graph(&graph.nodes, &graph.edges, &LayoutOptions::default());
        apply_layout(&mut graph.nodes, &layout);
        assert_eq!(graph.nodes[0].position, Position::new(50.0, 50.0));
    }

    #[test]
    fn empty_graph_has_no_layers() {
        let layout = layout_graph(&[], &[], &LayoutOptions::default());
        assert!(layout.layers().is_empty());
        assert!(layout.positions().is_empty());
    }
}
