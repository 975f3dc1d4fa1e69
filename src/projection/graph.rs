// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{StepId, StepKind};

/// Top-left canvas coordinate of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Previously known node positions, keyed by step id.
pub type PositionMap = IndexMap<StepId, Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Start,
    Decision,
    BranchCondition,
    CollectInput,
    Action,
    End,
}

impl NodeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Decision => "decision",
            Self::BranchCondition => "branch_condition",
            Self::CollectInput => "collect_input",
            Self::Action => "action",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStyle {
    Direct,
    Option,
    Condition,
    Default,
}

impl EdgeStyle {
    /// Fallback edges render differently from explicit branches.
    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: StepId,
    pub label: String,
    pub category: NodeCategory,
    pub kind: StepKind,
    pub level: usize,
    pub position: Position,
    pub summary: String,
    pub configured: bool,
    pub warning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: StepId,
    pub target: StepId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProjectedGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl ProjectedGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id.as_str() == id)
    }

    /// Current node positions, in node order.
    pub fn positions(&self) -> PositionMap {
        self.nodes.iter().map(|node| (node.id.clone(), node.position)).collect()
    }

    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.source.as_str() == source)
    }
}
