// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

#![allow(dead_code)]

// Shared deterministic benchmark fixtures (no RNG).

use stepgraph::model::{
    DecisionOption, DecisionPoint, ExecuteAction, FlowId, Step, StepConfig, StepId,
    WorkflowDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Small,
    MediumBranching,
    LargeWide,
}

pub const CASES: [(&str, Case); 3] = [
    ("small", Case::Small),
    ("medium_branching", Case::MediumBranching),
    ("large_wide", Case::LargeWide),
];

fn sid(value: &str) -> StepId {
    StepId::new(value).expect("valid step id")
}

/// `levels` rows of `width` decision steps, each branching into two steps of the next row.
/// The last row closes the flow.
pub fn branching(levels: usize, width: usize) -> WorkflowDocument {
    let mut doc = WorkflowDocument::new(FlowId::new("bench").expect("valid flow id"), "Bench");
    for level in 0..levels {
        for index in 0..width {
            let step_id = sid(&format!("s{level}_{index}"));
            let name = format!("Step {level}.{index}");
            let config = if level + 1 == levels {
                StepConfig::ExecuteAction(ExecuteAction {
                    action_type: "close_case".to_owned(),
                    ..ExecuteAction::default()
                })
            } else {
                let options = [index, (index + 1) % width]
                    .into_iter()
                    .enumerate()
                    .map(|(n, target)| DecisionOption {
                        label: format!("Option {n}"),
                        value: format!("o{n}"),
                        next_step: Some(sid(&format!("s{}_{target}", level + 1))),
                    })
                    .collect();
                StepConfig::DecisionPoint(DecisionPoint {
                    prompt: "Which way?".to_owned(),
                    options,
                })
            };
            doc.upsert_step(Step::new(step_id, name, config));
        }
    }
    doc
}

pub fn fixture(case: Case) -> WorkflowDocument {
    match case {
        Case::Small => stepgraph::model::fixtures::support_flow(),
        Case::MediumBranching => branching(8, 6),
        Case::LargeWide => branching(20, 25),
    }
}
