// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::step::deserialize_target;
use crate::model::{
    FlowId, IdError, ScalarValue, Step, StepConfig, StepId, StepKind, WorkflowDocument,
    DEFAULT_VERSION,
};

const FALLBACK_EXPORT_STEM: &str = "flow";

#[derive(Debug, thiserror::Error)]
pub enum DocumentParseError {
    #[error("invalid YAML: {0}")]
    Syntax(#[source] serde_yaml::Error),
    #[error("document must be a mapping")]
    NotAMapping,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid step `{step_id}`: {source}")]
    InvalidStep {
        step_id: String,
        #[source]
        source: StepDecodeError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentExportError {
    #[error("failed to serialize document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StepDecodeError {
    #[error("step body must be a mapping: {0}")]
    Shape(#[source] serde_yaml::Error),
    #[error("step has no id")]
    MissingId,
    #[error("invalid step id: {0}")]
    InvalidId(#[from] IdError),
    #[error("unknown step type `{0}`")]
    UnknownKind(String),
    #[error("config does not match `{kind}`: {source}")]
    InvalidConfig {
        kind: StepKind,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Exports a document as deterministic YAML.
///
/// Keys keep their insertion order, so exporting an unchanged document is byte-identical.
pub fn export_document(doc: &WorkflowDocument) -> Result<String, DocumentExportError> {
    let steps = doc
        .steps()
        .iter()
        .map(|(key, step)| (key.as_str(), StepOut::from(step)))
        .collect::<IndexMap<_, _>>();

    let out = DocumentOut {
        flow_id: doc.flow_id().as_str(),
        name: doc.name(),
        version: doc.version(),
        description: doc.description(),
        language: doc.language(),
        keywords: doc.keywords(),
        initial_step: doc.initial_step(),
        constants: doc.constants(),
        steps,
        registration_templates: doc.registration_templates(),
    };
    Ok(serde_yaml::to_string(&out)?)
}

/// Parses YAML text into a document.
///
/// Requires `flow_id`, `name` and a `steps` mapping. A step body without `step_id` inherits
/// its map key; when both are present the key wins.
pub fn parse_document(text: &str) -> Result<WorkflowDocument, DocumentParseError> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(DocumentParseError::Syntax)?;
    if !value.is_mapping() {
        return Err(DocumentParseError::NotAMapping);
    }
    let raw: DocumentIn = serde_yaml::from_value(value).map_err(DocumentParseError::Syntax)?;

    let flow_id = raw
        .flow_id
        .filter(|value| !value.trim().is_empty())
        .ok_or(DocumentParseError::MissingField("flow_id"))?;
    let flow_id = FlowId::new(flow_id.trim()).map_err(|err| DocumentParseError::InvalidField {
        field: "flow_id",
        reason: err.to_string(),
    })?;
    let name = raw.name.ok_or(DocumentParseError::MissingField("name"))?;
    let raw_steps = raw.steps.ok_or(DocumentParseError::MissingField("steps"))?;

    let mut doc = WorkflowDocument::new(flow_id, name);
    doc.set_version(raw.version.unwrap_or_else(|| DEFAULT_VERSION.to_owned()));
    doc.set_description(raw.description);
    doc.set_language(raw.language);
    doc.set_keywords(raw.keywords);
    doc.set_initial_step(raw.initial_step);
    *doc.constants_mut() = raw.constants;
    *doc.registration_templates_mut() = raw.registration_templates;

    for (key, body) in raw_steps {
        let step = decode_step_body(body, Some(&key))
            .map_err(|source| DocumentParseError::InvalidStep { step_id: key.clone(), source })?;
        doc.upsert_step(step);
    }

    Ok(doc)
}

/// File name for the exported artifact: `<flow_id>.yaml`.
pub fn export_file_name(doc: &WorkflowDocument) -> String {
    let stem = doc.flow_id().as_str().trim();
    let stem = if stem.is_empty() { FALLBACK_EXPORT_STEM } else { stem };
    format!("{stem}.yaml")
}

/// Decodes one step from a JSON value. `key` (the map key, when known) overrides the
/// body's own `step_id`.
pub fn decode_step(value: serde_json::Value, key: Option<&str>) -> Result<Step, StepDecodeError> {
    let value = serde_yaml::to_value(value).map_err(StepDecodeError::Shape)?;
    decode_step_body(value, key)
}

/// Decodes a kind-specific config payload. `null` yields an unconfigured payload.
pub fn decode_config(
    kind: StepKind,
    value: serde_json::Value,
) -> Result<StepConfig, StepDecodeError> {
    let invalid = |source| StepDecodeError::InvalidConfig { kind, source };
    decode_config_body(kind, serde_yaml::to_value(value).map_err(invalid)?)
}

fn decode_step_body(value: serde_yaml::Value, key: Option<&str>) -> Result<Step, StepDecodeError> {
    let raw: StepIn = serde_yaml::from_value(value).map_err(StepDecodeError::Shape)?;

    let step_id = match (key, raw.step_id.as_deref()) {
        (Some(key), body) => {
            if body.is_some_and(|body| body != key) {
                debug!(key, body = body.unwrap_or_default(), "step key overrides body step_id");
            }
            StepId::new(key)?
        }
        (None, Some(body)) => StepId::new(body.trim())?,
        (None, None) => return Err(StepDecodeError::MissingId),
    };
    let kind = raw.kind.parse::<StepKind>().map_err(|err| StepDecodeError::UnknownKind(err.0))?;
    let config = decode_config_body(kind, raw.config)?;
    let name = raw.name.unwrap_or_else(|| step_id.as_str().to_owned());

    Ok(Step::new(step_id, name, config).with_next_step(raw.next_step))
}

fn decode_config_body(
    kind: StepKind,
    value: serde_yaml::Value,
) -> Result<StepConfig, StepDecodeError> {
    if value.is_null() {
        return Ok(StepConfig::empty(kind));
    }
    let invalid = |source| StepDecodeError::InvalidConfig { kind, source };
    let config = match kind {
        StepKind::CollectInformation => {
            StepConfig::CollectInformation(serde_yaml::from_value(value).map_err(invalid)?)
        }
        StepKind::DecisionPoint => {
            StepConfig::DecisionPoint(serde_yaml::from_value(value).map_err(invalid)?)
        }
        StepKind::EvaluateCondition => {
            StepConfig::EvaluateCondition(serde_yaml::from_value(value).map_err(invalid)?)
        }
        StepKind::ProvideInstructions => {
            StepConfig::ProvideInstructions(serde_yaml::from_value(value).map_err(invalid)?)
        }
        StepKind::ExecuteAction => {
            StepConfig::ExecuteAction(serde_yaml::from_value(value).map_err(invalid)?)
        }
    };
    Ok(config)
}

#[derive(Serialize)]
struct DocumentOut<'a> {
    flow_id: &'a str,
    name: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "is_empty_slice")]
    keywords: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_step: Option<&'a StepId>,
    #[serde(skip_serializing_if = "is_empty_map")]
    constants: &'a IndexMap<String, ScalarValue>,
    steps: IndexMap<&'a str, StepOut<'a>>,
    #[serde(skip_serializing_if = "is_empty_map")]
    registration_templates: &'a IndexMap<String, String>,
}

fn is_empty_slice(values: &&[String]) -> bool {
    values.is_empty()
}

fn is_empty_map<V>(map: &&IndexMap<String, V>) -> bool {
    map.is_empty()
}

#[derive(Serialize)]
struct StepOut<'a> {
    step_id: &'a StepId,
    name: &'a str,
    #[serde(rename = "type")]
    kind: StepKind,
    config: ConfigOut<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_step: Option<&'a StepId>,
}

impl<'a> From<&'a Step> for StepOut<'a> {
    fn from(step: &'a Step) -> Self {
        Self {
            step_id: step.step_id(),
            name: step.name(),
            kind: step.kind(),
            config: ConfigOut::from(step.config()),
            next_step: step.next_step(),
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ConfigOut<'a> {
    CollectInformation(&'a crate::model::CollectInformation),
    DecisionPoint(&'a crate::model::DecisionPoint),
    EvaluateCondition(&'a crate::model::EvaluateCondition),
    ProvideInstructions(&'a crate::model::ProvideInstructions),
    ExecuteAction(&'a crate::model::ExecuteAction),
}

impl<'a> From<&'a StepConfig> for ConfigOut<'a> {
    fn from(config: &'a StepConfig) -> Self {
        match config {
            StepConfig::CollectInformation(c) => Self::CollectInformation(c),
            StepConfig::DecisionPoint(c) => Self::DecisionPoint(c),
            StepConfig::EvaluateCondition(c) => Self::EvaluateCondition(c),
            StepConfig::ProvideInstructions(c) => Self::ProvideInstructions(c),
            StepConfig::ExecuteAction(c) => Self::ExecuteAction(c),
        }
    }
}

#[derive(Deserialize)]
struct DocumentIn {
    #[serde(default)]
    flow_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_target")]
    initial_step: Option<StepId>,
    #[serde(default)]
    constants: IndexMap<String, ScalarValue>,
    #[serde(default)]
    steps: Option<IndexMap<String, serde_yaml::Value>>,
    #[serde(default)]
    registration_templates: IndexMap<String, String>,
}

#[derive(Deserialize)]
struct StepIn {
    #[serde(default)]
    step_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    config: serde_yaml::Value,
    #[serde(default, deserialize_with = "deserialize_target")]
    next_step: Option<StepId>,
}

#[cfg(test)]
mod tests {
    use super::{
        decode_step, export_document, export_file_name, parse_document, DocumentParseError,
        StepDecodeError,
    };
    use crate::model::{
        fixtures, Condition, ConditionOperator, EvaluateCondition, ScalarValue, Step, StepConfig,
        StepId, StepKind,
    };

    fn sid(value: &str) -> StepId {
        StepId::new(value).expect("step id")
    }

    #[test]
    fn exports_and_parses_back_the_support_flow() {
        let doc = fixtures::support_flow();
        let text = export_document(&doc).expect("export");
        let parsed = parse_document(&text).expect("parse");
        assert_eq!(parsed, doc);
    }

    #[test]
    fn export_is_byte_identical_when_unchanged() {
        let doc = fixtures::support_flow();
        let first = export_document(&doc).expect("export");
        let second = export_document(&parse_document(&first).expect("parse")).expect("export");
        assert_eq!(first, second);
    }

    #[test]
    fn export_keeps_step_insertion_order() {
        let doc = fixtures::linear_flow(&["zeta", "alpha", "mid"]);
        let text = export_document(&doc).expect("export");
        let zeta = text.find("zeta:").expect("zeta");
        let alpha = text.find("alpha:").expect("alpha");
        let mid = text.find("mid:").expect("mid");
        assert!(zeta < alpha && alpha < mid, "{text}");
    }

    #[test]
    fn export_writes_top_level_keys_in_document_order() {
        let doc = fixtures::support_flow();
        let text = export_document(&doc).expect("export");
        let flow_id = text.find("flow_id:").expect("flow_id");
        let name = text.find("\nname:").expect("name");
        let version = text.find("\nversion:").expect("version");
        let steps = text.find("\nsteps:").expect("steps");
        assert!(flow_id < name && name < version && version < steps);
    }

    #[test]
    fn missing_step_id_is_inherited_from_the_key() {
        let text = "\
flow_id: demo
name: Demo
steps:
  greet:
    name: Greet
    type: provide_instructions
    config:
      instructions_text: Hello
";
        let doc = parse_document(text).expect("parse");
        let step = doc.step("greet").expect("step");
        assert_eq!(step.step_id().as_str(), "greet");
        assert_eq!(doc.version(), "1.0.0");
        assert!(step.is_configured());
    }

    #[test]
    fn map_key_wins_over_body_step_id() {
        let text = "\
flow_id: demo
name: Demo
steps:
  real:
    step_id: stale
    name: Real
    type: execute_action
";
        let doc = parse_document(text).expect("parse");
        assert_eq!(doc.step("real").map(|s| s.step_id().as_str()), Some("real"));
        assert!(doc.step("real").is_some_and(|s| !s.is_configured()));
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let no_flow = parse_document("name: x\nsteps: {}\n").unwrap_err();
        assert!(matches!(no_flow, DocumentParseError::MissingField("flow_id")));

        let no_name = parse_document("flow_id: x\nsteps: {}\n").unwrap_err();
        assert!(matches!(no_name, DocumentParseError::MissingField("name")));

        let no_steps = parse_document("flow_id: x\nname: X\n").unwrap_err();
        assert!(matches!(no_steps, DocumentParseError::MissingField("steps")));
    }

    #[test]
    fn malformed_text_is_a_syntax_error() {
        let err = parse_document("flow_id: [unclosed\nname: x").unwrap_err();
        assert!(matches!(err, DocumentParseError::Syntax(_)));

        let err = parse_document("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, DocumentParseError::NotAMapping));
    }

    #[test]
    fn unknown_step_type_names_the_step() {
        let text = "\
flow_id: demo
name: Demo
steps:
  odd:
    name: Odd
    type: teleport
";
        match parse_document(text).unwrap_err() {
            DocumentParseError::InvalidStep { step_id, source } => {
                assert_eq!(step_id, "odd");
                assert!(matches!(source, StepDecodeError::UnknownKind(kind) if kind == "teleport"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_values_keep_integer_and_float_types() {
        let text = "\
flow_id: demo
name: Demo
constants:
  threshold: -65
  price: 50.0
  label: '50'
  enabled: true
steps: {}
";
        let doc = parse_document(text).expect("parse");
        let constants = doc.constants();
        assert_eq!(constants["threshold"], ScalarValue::Integer(-65));
        assert_eq!(constants["price"], ScalarValue::Float(50.0));
        assert_eq!(constants["label"], ScalarValue::Text("50".to_owned()));
        assert_eq!(constants["enabled"], ScalarValue::Bool(true));

        let again = parse_document(&export_document(&doc).expect("export")).expect("parse");
        assert_eq!(again.constants(), doc.constants());
    }

    #[test]
    fn decode_step_without_key_needs_a_body_id() {
        let value = serde_json::json!({ "name": "X", "type": "decision_point" });
        assert!(matches!(decode_step(value, None), Err(StepDecodeError::MissingId)));

        let value = serde_json::json!({
            "step_id": "ask",
            "name": "Ask",
            "type": "decision_point",
            "config": {
                "prompt": "Go?",
                "options": [{ "label": "Yes", "value": "y", "next_step": "b" }]
            }
        });
        let step = decode_step(value, None).expect("step");
        assert_eq!(step.kind(), StepKind::DecisionPoint);
        match step.config() {
            StepConfig::DecisionPoint(c) => {
                assert_eq!(c.options[0].next_step.as_ref().map(|id| id.as_str()), Some("b"))
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn config_shape_must_match_kind() {
        let value = serde_json::json!({
            "step_id": "x",
            "name": "X",
            "type": "decision_point",
            "config": { "options": "not-a-list" }
        });
        assert!(matches!(
            decode_step(value, None),
            Err(StepDecodeError::InvalidConfig { kind: StepKind::DecisionPoint, .. })
        ));
    }

    #[test]
    fn non_finite_condition_values_survive_a_round_trip() {
        let mut doc = fixtures::decision_branch();
        doc.upsert_step(Step::new(
            sid("limits"),
            "Limits",
            StepConfig::EvaluateCondition(EvaluateCondition {
                conditions: vec![
                    Condition {
                        field: "latency".to_owned(),
                        operator: ConditionOperator::Lt,
                        value: ScalarValue::Float(f64::INFINITY),
                        next_step: Some(sid("b")),
                    },
                    Condition {
                        field: "score".to_owned(),
                        operator: ConditionOperator::Ne,
                        value: ScalarValue::Float(f64::NAN),
                        next_step: Some(sid("c")),
                    },
                ],
                default_next_step: None,
            }),
        ));

        let text = export_document(&doc).expect("export");
        assert!(text.contains(".inf") && text.contains(".nan"), "{text}");
        let parsed = parse_document(&text).expect("parse");
        assert_eq!(parsed, doc);
        assert_eq!(export_document(&parsed).expect("export again"), text);
    }

    #[test]
    fn decision_options_accept_numeric_and_boolean_values() {
        let text = "\
flow_id: demo
name: Demo
steps:
  ask:
    name: Ask
    type: decision_point
    config:
      prompt: How many?
      options:
        - label: One
          value: 1
          next_step: b
        - label: Sure
          value: true
        - label: Half
          value: 0.5
";
        let doc = parse_document(text).expect("parse");
        match doc.step("ask").map(|step| step.config()) {
            Some(StepConfig::DecisionPoint(config)) => {
                let values: Vec<&str> =
                    config.options.iter().map(|option| option.value.as_str()).collect();
                assert_eq!(values, ["1", "true", "0.5"]);
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn export_file_name_uses_flow_id() {
        let doc = fixtures::support_flow();
        assert_eq!(export_file_name(&doc), "support_connection.yaml");
    }
}
