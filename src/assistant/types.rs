// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// An action exactly as proposed by the assistant, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_required: Option<bool>,
}

impl RawAction {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind: kind.into(), data, reasoning: None, confirmation_required: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddStepData {
    pub step_id: String,
    /// Step body in the document shape (`name`, `type`, `config`, `next_step`).
    pub step: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Changing the type without a `config` resets the step to an unconfigured one.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// `null` clears the successor; absent leaves it untouched.
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub next_step: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModifyStepData {
    pub step_id: String,
    pub updates: StepUpdates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DeleteStepData {
    pub step_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    #[default]
    NextStep,
    Option,
    Condition,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Connection {
    pub from_step: String,
    /// Target step; `null` or empty clears the connection.
    #[serde(default)]
    pub to_step: Option<String>,
    #[serde(default)]
    pub connection_type: ConnectionType,
    /// Option or condition position for `option`/`condition` connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Option label for `option` connections, matched case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModifyConnectionsData {
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddMultipleStepsData {
    /// Step bodies; each must carry its own `step_id`.
    pub steps: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadataUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub language: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub initial_step: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UpdateMetadataData {
    pub metadata: MetadataUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ModifyConstantsData {
    /// Scalar values (string, number or boolean) keyed by snake_case name.
    pub constants: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddTemplateData {
    pub template_name: String,
    pub template_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RestructureFlowData {
    pub new_order: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoData {}

/// A validated assistant action. Serialized as `{ "type": ..., "data": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AssistantAction {
    AddStep(AddStepData),
    ModifyStep(ModifyStepData),
    DeleteStep(DeleteStepData),
    ModifyConnections(ModifyConnectionsData),
    AddMultipleSteps(AddMultipleStepsData),
    UpdateMetadata(UpdateMetadataData),
    ModifyConstants(ModifyConstantsData),
    AddTemplate(AddTemplateData),
    /// Attaches every orphaned step to the nearest open end of the reachable flow.
    FixOrphans(NoData),
    /// Moves the listed steps to the front of the document.
    RestructureFlow(RestructureFlowData),
    /// Runs the flow analysis without changing anything.
    AnalyzeFlow(NoData),
    #[serde(skip)]
    Unknown(String),
}

impl AssistantAction {
    pub const KINDS: [&'static str; 11] = [
        "add_step",
        "modify_step",
        "delete_step",
        "modify_connections",
        "add_multiple_steps",
        "update_metadata",
        "modify_constants",
        "add_template",
        "fix_orphans",
        "restructure_flow",
        "analyze_flow",
    ];

    /// Validates a raw action. Unknown kinds become [`AssistantAction::Unknown`]; known kinds
    /// with a malformed payload are an error carrying the reason.
    pub fn from_raw(raw: &RawAction) -> Result<Self, serde_json::Error> {
        let kind = raw.kind.trim();
        if !Self::KINDS.contains(&kind) {
            return Ok(Self::Unknown(raw.kind.clone()));
        }
        let data = match &raw.data {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            data => data.clone(),
        };
        serde_json::from_value(serde_json::json!({ "type": kind, "data": data }))
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::AddStep(_) => "add_step",
            Self::ModifyStep(_) => "modify_step",
            Self::DeleteStep(_) => "delete_step",
            Self::ModifyConnections(_) => "modify_connections",
            Self::AddMultipleSteps(_) => "add_multiple_steps",
            Self::UpdateMetadata(_) => "update_metadata",
            Self::ModifyConstants(_) => "modify_constants",
            Self::AddTemplate(_) => "add_template",
            Self::FixOrphans(_) => "fix_orphans",
            Self::RestructureFlow(_) => "restructure_flow",
            Self::AnalyzeFlow(_) => "analyze_flow",
            Self::Unknown(kind) => kind,
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AssistantAction, ConnectionType, RawAction};

    #[test]
    fn unknown_kinds_are_preserved() {
        let raw = RawAction::new("optimize_flow", json!({ "optimizations": [] }));
        assert_eq!(
            AssistantAction::from_raw(&raw).expect("action"),
            AssistantAction::Unknown("optimize_flow".to_owned())
        );
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let raw = RawAction::new("add_step", json!({ "step_id": "x" }));
        let err = AssistantAction::from_raw(&raw).unwrap_err();
        assert!(err.to_string().contains("step"), "{err}");

        let raw = RawAction::new("delete_step", serde_json::Value::Null);
        AssistantAction::from_raw(&raw).unwrap_err();
    }

    #[test]
    fn payload_free_kinds_accept_missing_data() {
        let raw = RawAction::new("fix_orphans", serde_json::Value::Null);
        assert_eq!(AssistantAction::from_raw(&raw).expect("action").kind(), "fix_orphans");
    }

    #[test]
    fn next_step_null_differs_from_absent() {
        let raw = RawAction::new(
            "modify_step",
            json!({ "step_id": "a", "updates": { "next_step": null } }),
        );
        let AssistantAction::ModifyStep(data) = AssistantAction::from_raw(&raw).expect("action")
        else {
            panic!("expected modify_step");
        };
        assert_eq!(data.updates.next_step, Some(None));

        let raw =
            RawAction::new("modify_step", json!({ "step_id": "a", "updates": { "name": "N" } }));
        let AssistantAction::ModifyStep(data) = AssistantAction::from_raw(&raw).expect("action")
        else {
            panic!("expected modify_step");
        };
        assert_eq!(data.updates.next_step, None);
    }

    #[test]
    fn connection_type_defaults_to_next_step() {
        let raw = RawAction::new(
            "modify_connections",
            json!({ "connections": [{ "from_step": "a", "to_step": "b" }] }),
        );
        let AssistantAction::ModifyConnections(data) =
            AssistantAction::from_raw(&raw).expect("action")
        else {
            panic!("expected modify_connections");
        };
        assert_eq!(data.connections[0].connection_type, ConnectionType::NextStep);
    }
}
