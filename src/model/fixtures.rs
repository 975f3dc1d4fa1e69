// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Sample documents shared by the `demo` command, benches and tests.

use indexmap::IndexMap;

use super::document::WorkflowDocument;
use super::ids::{FlowId, StepId};
use super::step::{
    CollectInformation, Condition, ConditionOperator, DecisionOption, DecisionPoint,
    EvaluateCondition, ExecuteAction, InputValidation, ProvideInstructions, ScalarValue, Step,
    StepConfig, StepKind, ValidationKind,
};

fn sid(value: &str) -> StepId {
    StepId::new(value).expect("fixture step id")
}

fn fid(value: &str) -> FlowId {
    FlowId::new(value).expect("fixture flow id")
}

fn option(label: &str, value: &str, target: &str) -> DecisionOption {
    DecisionOption {
        label: label.to_owned(),
        value: value.to_owned(),
        next_step: Some(sid(target)),
    }
}

fn condition(
    field: &str,
    operator: ConditionOperator,
    value: ScalarValue,
    target: &str,
) -> Condition {
    Condition { field: field.to_owned(), operator, value, next_step: Some(sid(target)) }
}

fn close_case(id: &str, name: &str, disposition: Option<&str>) -> Step {
    let mut action_params = IndexMap::new();
    if let Some(disposition) = disposition {
        action_params.insert("disposition".to_owned(), serde_json::Value::from(disposition));
    }
    Step::new(
        sid(id),
        name,
        StepConfig::ExecuteAction(ExecuteAction {
            action_type: "close_case".to_owned(),
            action_params,
        }),
    )
}

/// A connectivity troubleshooting flow exercising every step kind.
pub fn support_flow() -> WorkflowDocument {
    let mut doc = WorkflowDocument::new(fid("support_connection"), "Connection Troubleshooting");
    doc.set_version("2.0.0");
    doc.set_description(Some("Diagnoses intermittent connection drops"));
    doc.set_keywords(vec!["wifi".to_owned(), "support".to_owned()]);
    doc.constants_mut().insert("rssi_threshold".to_owned(), ScalarValue::Integer(-65));
    doc.constants_mut().insert("wifi_ultra_price".to_owned(), ScalarValue::Float(50.0));

    doc.upsert_step(
        Step::new(
            sid("check_connection"),
            "Check Connection",
            StepConfig::CollectInformation(CollectInformation {
                prompt: "Is the device connected over Wi-Fi or Ethernet?".to_owned(),
                field_name: "connection_type".to_owned(),
                validation: Some(InputValidation {
                    kind: ValidationKind::Choice,
                    options: vec!["wifi".to_owned(), "ethernet".to_owned()],
                    ..Default::default()
                }),
            }),
        )
        .with_next_step(Some(sid("route_connection"))),
    );
    doc.upsert_step(Step::new(
        sid("route_connection"),
        "Route Connection",
        StepConfig::EvaluateCondition(EvaluateCondition {
            conditions: vec![
                condition(
                    "connection_type",
                    ConditionOperator::Eq,
                    "ethernet".into(),
                    "restart_device",
                ),
                condition("connection_type", ConditionOperator::Eq, "wifi".into(), "collect_rssi"),
            ],
            default_next_step: Some(sid("restart_device")),
        }),
    ));
    doc.upsert_step(
        Step::new(
            sid("collect_rssi"),
            "Collect RSSI",
            StepConfig::CollectInformation(CollectInformation {
                prompt: "Enter the Wi-Fi RSSI value (for example -60)".to_owned(),
                field_name: "rssi_value".to_owned(),
                validation: Some(InputValidation {
                    kind: ValidationKind::Number,
                    ..Default::default()
                }),
            }),
        )
        .with_next_step(Some(sid("evaluate_rssi"))),
    );
    doc.upsert_step(Step::new(
        sid("evaluate_rssi"),
        "Evaluate Threshold",
        StepConfig::EvaluateCondition(EvaluateCondition {
            conditions: vec![condition(
                "rssi_value",
                ConditionOperator::Lt,
                ScalarValue::Integer(-65),
                "offer_upgrade",
            )],
            default_next_step: Some(sid("restart_device")),
        }),
    ));
    doc.upsert_step(Step::new(
        sid("offer_upgrade"),
        "Offer Upgrade",
        StepConfig::DecisionPoint(DecisionPoint {
            prompt: "Weak signal detected. Does the customer accept the upgrade?".to_owned(),
            options: vec![
                option("Accept", "accept", "close_upgrade"),
                option("Decline", "decline", "offer_wifi_ultra"),
            ],
        }),
    ));
    doc.upsert_step(Step::new(
        sid("offer_wifi_ultra"),
        "Offer Wifi Ultra",
        StepConfig::DecisionPoint(DecisionPoint {
            prompt: "Would the customer like Wifi Ultra for $50.00?".to_owned(),
            options: vec![
                option("Subscribe", "accept", "close_wifi_ultra"),
                option("Continue", "decline", "restart_device"),
            ],
        }),
    ));
    doc.upsert_step(
        Step::new(
            sid("restart_device"),
            "Restart Device",
            StepConfig::ProvideInstructions(ProvideInstructions {
                instructions_text: "Hold power for 5 seconds, then wait 2 minutes.".to_owned(),
                confirmation_required: Some(true),
            }),
        )
        .with_next_step(Some(sid("end_process"))),
    );
    doc.upsert_step(close_case("close_upgrade", "Close - Upgrade Sold", Some("sale_upgrade")));
    doc.upsert_step(close_case(
        "close_wifi_ultra",
        "Close - Wifi Ultra Sold",
        Some("sale_wifi_ultra"),
    ));
    doc.upsert_step(close_case("end_process", "End of Process", None));

    doc
}

/// `ids[0] -> ids[1] -> ...` made of instruction steps.
pub fn linear_flow(ids: &[&str]) -> WorkflowDocument {
    let mut doc = WorkflowDocument::new(fid("linear"), "Linear");
    for (idx, id) in ids.iter().enumerate() {
        let next = ids.get(idx + 1).map(|next| sid(next));
        let step = Step::new(
            sid(id),
            id.to_uppercase(),
            StepConfig::ProvideInstructions(ProvideInstructions {
                instructions_text: format!("Do {id}"),
                confirmation_required: None,
            }),
        )
        .with_next_step(next);
        doc.upsert_step(step);
    }
    doc
}

/// `a` is a decision with `Yes -> b` and `No -> c`.
pub fn decision_branch() -> WorkflowDocument {
    let mut doc = WorkflowDocument::new(fid("branch"), "Branch");
    doc.upsert_step(Step::new(
        sid("a"),
        "A",
        StepConfig::DecisionPoint(DecisionPoint {
            prompt: "Continue?".to_owned(),
            options: vec![option("Yes", "yes", "b"), option("No", "no", "c")],
        }),
    ));
    doc.upsert_step(Step::unconfigured(sid("b"), "B", StepKind::ExecuteAction));
    doc.upsert_step(Step::unconfigured(sid("c"), "C", StepKind::ExecuteAction));
    doc
}

/// `a.next_step` names a step that does not exist.
pub fn dangling_reference() -> WorkflowDocument {
    let mut doc = WorkflowDocument::new(fid("dangling"), "Dangling");
    doc.upsert_step(
        Step::unconfigured(sid("a"), "A", StepKind::ProvideInstructions)
            .with_next_step(Some(sid("ghost"))),
    );
    doc
}
