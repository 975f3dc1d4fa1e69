// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{ReferenceVia, StepId, WorkflowDocument};

const CLOSEST_MIN_RATIO: f64 = 0.6;

/// A reference whose target id is not a step of the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokenConnection {
    pub from: StepId,
    pub to: StepId,
    pub via: String,
    pub reason: String,
    /// Most similar existing step id, offered as a repair hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<StepId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FlowAnalysis {
    pub orphaned_steps: Vec<StepId>,
    pub broken_connections: Vec<BrokenConnection>,
    pub terminal_steps: Vec<StepId>,
    pub suggestions: Vec<String>,
}

impl FlowAnalysis {
    pub fn is_clean(&self) -> bool {
        self.orphaned_steps.is_empty() && self.broken_connections.is_empty()
    }
}

/// Structural analysis of a document. Read-only; never fails.
pub fn analyze(doc: &WorkflowDocument) -> FlowAnalysis {
    let orphaned_steps = orphaned_steps(doc);
    let broken_connections = broken_connections(doc);
    let terminal_steps = terminal_steps(doc);

    let mut suggestions = Vec::new();
    if !orphaned_steps.is_empty() {
        suggestions.push(format!(
            "{} step(s) are not connected to the flow",
            orphaned_steps.len()
        ));
    }
    if !broken_connections.is_empty() {
        suggestions.push(format!(
            "{} connection(s) point to steps that do not exist",
            broken_connections.len()
        ));
    }
    if terminal_steps.is_empty() && !doc.steps().is_empty() {
        suggestions.push("The flow has no terminal steps; every step continues".to_owned());
    }

    FlowAnalysis { orphaned_steps, broken_connections, terminal_steps, suggestions }
}

/// Steps no step references, excluding the root. Document order.
pub fn orphaned_steps(doc: &WorkflowDocument) -> Vec<StepId> {
    let referenced = doc
        .steps()
        .values()
        .flat_map(|step| step.references())
        .map(|reference| reference.target)
        .collect::<HashSet<_>>();
    let root = doc.root();

    doc.step_ids()
        .filter(|id| Some(*id) != root && !referenced.contains(*id))
        .cloned()
        .collect()
}

pub fn broken_connections(doc: &WorkflowDocument) -> Vec<BrokenConnection> {
    let mut out = Vec::new();
    for step in doc.steps().values() {
        for reference in step.references() {
            if doc.contains_step(reference.target.as_str()) {
                continue;
            }
            let (via, reason) = match &reference.via {
                ReferenceVia::Next => {
                    ("next_step".to_owned(), "target step does not exist".to_owned())
                }
                ReferenceVia::Option { label, .. } => (
                    "option".to_owned(),
                    format!("option {label:?} points to a missing step"),
                ),
                ReferenceVia::Condition { label, .. } => (
                    "condition".to_owned(),
                    format!("condition {label:?} points to a missing step"),
                ),
                ReferenceVia::Default => (
                    "default".to_owned(),
                    "default target points to a missing step".to_owned(),
                ),
            };
            let closest = closest_step(doc, reference.target.as_str());
            out.push(BrokenConnection {
                from: step.step_id().clone(),
                to: reference.target,
                via,
                reason,
                closest,
            });
        }
    }
    out
}

/// Steps with no outgoing reference at all.
pub fn terminal_steps(doc: &WorkflowDocument) -> Vec<StepId> {
    doc.steps()
        .values()
        .filter(|step| step.references().is_empty())
        .map(|step| step.step_id().clone())
        .collect()
}

/// Breadth-first levels from the root over every outgoing reference, in visitation order.
///
/// References to missing steps are skipped.
pub fn reachable_from_root(doc: &WorkflowDocument) -> IndexMap<StepId, usize> {
    let mut levels = IndexMap::<StepId, usize>::new();
    let Some(root) = doc.root() else {
        return levels;
    };

    let mut queue = VecDeque::<StepId>::new();
    levels.insert(root.clone(), 0);
    queue.push_back(root.clone());

    while let Some(step_id) = queue.pop_front() {
        let level = levels.get(&step_id).copied().unwrap_or_default();
        let Some(step) = doc.step(step_id.as_str()) else {
            continue;
        };
        for reference in step.references() {
            if !doc.contains_step(reference.target.as_str())
                || levels.contains_key(&reference.target)
            {
                continue;
            }
            levels.insert(reference.target.clone(), level + 1);
            queue.push_back(reference.target);
        }
    }

    levels
}

/// Steps the root traversal never reaches, in document order.
pub fn unreachable_steps(doc: &WorkflowDocument) -> Vec<StepId> {
    let reachable = reachable_from_root(doc);
    doc.step_ids().filter(|id| !reachable.contains_key(*id)).cloned().collect()
}

fn closest_step(doc: &WorkflowDocument, missing: &str) -> Option<StepId> {
    doc.step_ids()
        .map(|id| (id, rapidfuzz::fuzz::ratio(missing.chars(), id.as_str().chars())))
        .filter(|(_, ratio)| *ratio >= CLOSEST_MIN_RATIO)
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(id, _)| id.clone())
}
