// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Derives a renderable node/edge graph from a workflow document.
//!
//! The projection is recomputed wholesale after every document change. Node ids are the step
//! ids, so callers can carry manually placed positions across recomputation.

mod graph;

pub use graph::{
    EdgeStyle, GraphEdge, GraphNode, NodeCategory, Position, PositionMap, ProjectedGraph,
};

use serde::{Deserialize, Serialize};

use crate::model::{ReferenceVia, Step, StepConfig, StepId, WorkflowDocument};
use crate::query::reachable_from_root;

/// Spacing of the projector's own level-based placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub column_spacing: f64,
    pub row_spacing: f64,
    /// Horizontal centre every level is laid out around.
    pub center_x: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self { column_spacing: 300.0, row_spacing: 150.0, center_x: 400.0 }
    }
}

/// Projects `doc` into nodes and edges.
///
/// Nodes come in BFS order from the root, followed by unreached steps as one trailing level.
/// Unreached steps always carry a warning. Edges to missing steps are not emitted. A position
/// found in `previous` replaces the computed one.
pub fn project(
    doc: &WorkflowDocument,
    previous: Option<&PositionMap>,
    config: &ProjectionConfig,
) -> ProjectedGraph {
    let reached = reachable_from_root(doc);
    let root = doc.root();

    let mut placed = reached
        .iter()
        .map(|(step_id, level)| (step_id.clone(), *level, false))
        .collect::<Vec<_>>();
    let orphan_level = reached.values().max().map_or(0, |max| max + 1);
    placed.extend(
        doc.step_ids()
            .filter(|id| !reached.contains_key(*id))
            .map(|id| (id.clone(), orphan_level, true)),
    );

    let mut level_sizes = Vec::<usize>::new();
    for (_, level, _) in &placed {
        if level_sizes.len() <= *level {
            level_sizes.resize(*level + 1, 0);
        }
        level_sizes[*level] += 1;
    }

    let mut level_cursor = vec![0usize; level_sizes.len()];
    let mut nodes = Vec::with_capacity(placed.len());
    for (step_id, level, orphan) in placed {
        let Some(step) = doc.step(step_id.as_str()) else {
            continue;
        };
        let index = level_cursor[level];
        level_cursor[level] += 1;

        let computed = level_position(config, level, index, level_sizes[level]);
        let position = previous.and_then(|map| map.get(&step_id)).copied().unwrap_or(computed);
        let configured = step.is_configured();
        let is_root = root == Some(&step_id);

        nodes.push(GraphNode {
            label: step.name().to_owned(),
            category: category_for(step, is_root),
            kind: step.kind(),
            level,
            position,
            summary: step.summary(),
            configured,
            warning: orphan || !configured,
            id: step_id,
        });
    }

    let edges = reached
        .keys()
        .filter_map(|step_id| doc.step(step_id.as_str()))
        .flat_map(|step| edges_for(doc, step))
        .collect();

    ProjectedGraph { nodes, edges }
}

/// Visual category. The root is always `start`.
pub fn category_for(step: &Step, is_root: bool) -> NodeCategory {
    if is_root {
        return NodeCategory::Start;
    }
    match step.config() {
        StepConfig::DecisionPoint(_) => NodeCategory::Decision,
        StepConfig::EvaluateCondition(_) => NodeCategory::BranchCondition,
        StepConfig::CollectInformation(_) => NodeCategory::CollectInput,
        StepConfig::ExecuteAction(action) if action.is_closing() => NodeCategory::End,
        StepConfig::ExecuteAction(_) | StepConfig::ProvideInstructions(_) => NodeCategory::Action,
    }
}

fn level_position(config: &ProjectionConfig, level: usize, index: usize, count: usize) -> Position {
    let offset = index as f64 - (count.saturating_sub(1) as f64) / 2.0;
    Position::new(
        config.center_x + offset * config.column_spacing,
        level as f64 * config.row_spacing,
    )
}

fn edges_for(doc: &WorkflowDocument, step: &Step) -> Vec<GraphEdge> {
    let source = step.step_id();
    let mut index_buf = itoa::Buffer::new();
    step.references()
        .into_iter()
        .filter(|reference| doc.contains_step(reference.target.as_str()))
        .map(|reference| {
            let (id, label, style) = match &reference.via {
                ReferenceVia::Next => {
                    (edge_id(source, &reference.target, None), None, EdgeStyle::Direct)
                }
                ReferenceVia::Option { index, label } => (
                    edge_id(source, &reference.target, Some(index_buf.format(*index))),
                    Some(label.clone()),
                    EdgeStyle::Option,
                ),
                ReferenceVia::Condition { index, label } => (
                    edge_id(source, &reference.target, Some(index_buf.format(*index))),
                    Some(label.clone()),
                    EdgeStyle::Condition,
                ),
                ReferenceVia::Default => (
                    edge_id(source, &reference.target, Some("default")),
                    Some("Default".to_owned()),
                    EdgeStyle::Default,
                ),
            };
            GraphEdge { id, source: source.clone(), target: reference.target, label, style }
        })
        .collect()
}

fn edge_id(source: &StepId, target: &StepId, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{source}-{target}-{suffix}"),
        None => format!("{source}-{target}"),
    }
}
