// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use smallvec::SmallVec;

use super::ids::StepId;

const SUMMARY_MAX_CHARS: usize = 50;

/// The closed set of step kinds a workflow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    CollectInformation,
    DecisionPoint,
    EvaluateCondition,
    ProvideInstructions,
    ExecuteAction,
}

impl StepKind {
    pub const ALL: [StepKind; 5] = [
        StepKind::CollectInformation,
        StepKind::DecisionPoint,
        StepKind::EvaluateCondition,
        StepKind::ProvideInstructions,
        StepKind::ExecuteAction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CollectInformation => "collect_information",
            Self::DecisionPoint => "decision_point",
            Self::EvaluateCondition => "evaluate_condition",
            Self::ProvideInstructions => "provide_instructions",
            Self::ExecuteAction => "execute_action",
        }
    }

    /// Branching kinds route through their config targets rather than `next_step`.
    pub fn is_branching(self) -> bool {
        matches!(self, Self::DecisionPoint | Self::EvaluateCondition)
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step kind: {0}")]
pub struct UnknownStepKind(pub String);

impl FromStr for StepKind {
    type Err = UnknownStepKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownStepKind(s.to_owned()))
    }
}

/// A string, number or boolean, as used by constants and condition comparison values.
///
/// Equality treats two NaN floats as equal so documents holding `.nan` still compare equal
/// after a YAML round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Default for ScalarValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "startsWith")]
    StartsWith,
}

impl ConditionOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Contains => "contains",
            Self::StartsWith => "startsWith",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationKind {
    #[default]
    Text,
    Number,
    Email,
    Choice,
    Regex,
}

/// Input validation descriptor attached to a `collect_information` step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputValidation {
    #[serde(rename = "type", default)]
    pub kind: ValidationKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionOption {
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "deserialize_option_value")]
    pub value: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_target"
    )]
    pub next_step: Option<StepId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: ScalarValue,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_target"
    )]
    pub next_step: Option<StepId>,
}

impl Condition {
    /// Edge label in the `field operator value` form.
    pub fn label(&self) -> String {
        format!("{} {} {}", self.field, self.operator, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectInformation {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub field_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<InputValidation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPoint {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prompt: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<DecisionOption>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateCondition {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "deserialize_target")]
    pub default_next_step: Option<StepId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvideInstructions {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub instructions_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteAction {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action_type: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub action_params: IndexMap<String, serde_json::Value>,
}

impl ExecuteAction {
    /// Whether the action type closes the workflow (rendered as an end node).
    pub fn is_closing(&self) -> bool {
        self.action_type.contains("close")
    }
}

/// Kind-specific step configuration. The variant *is* the step kind.
#[derive(Debug, Clone, PartialEq)]
pub enum StepConfig {
    CollectInformation(CollectInformation),
    DecisionPoint(DecisionPoint),
    EvaluateCondition(EvaluateCondition),
    ProvideInstructions(ProvideInstructions),
    ExecuteAction(ExecuteAction),
}

impl StepConfig {
    /// An unconfigured payload for `kind`; representable, but reported as not configured.
    pub fn empty(kind: StepKind) -> Self {
        match kind {
            StepKind::CollectInformation => Self::CollectInformation(Default::default()),
            StepKind::DecisionPoint => Self::DecisionPoint(Default::default()),
            StepKind::EvaluateCondition => Self::EvaluateCondition(Default::default()),
            StepKind::ProvideInstructions => Self::ProvideInstructions(Default::default()),
            StepKind::ExecuteAction => Self::ExecuteAction(Default::default()),
        }
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Self::CollectInformation(_) => StepKind::CollectInformation,
            Self::DecisionPoint(_) => StepKind::DecisionPoint,
            Self::EvaluateCondition(_) => StepKind::EvaluateCondition,
            Self::ProvideInstructions(_) => StepKind::ProvideInstructions,
            Self::ExecuteAction(_) => StepKind::ExecuteAction,
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            Self::CollectInformation(c) => !c.prompt.is_empty() && !c.field_name.is_empty(),
            Self::DecisionPoint(c) => !c.prompt.is_empty() && !c.options.is_empty(),
            Self::EvaluateCondition(c) => !c.conditions.is_empty(),
            Self::ProvideInstructions(c) => !c.instructions_text.is_empty(),
            Self::ExecuteAction(c) => !c.action_type.is_empty(),
        }
    }
}

/// How a reference leaves its source step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceVia {
    Next,
    Option { index: usize, label: String },
    Condition { index: usize, label: String },
    Default,
}

impl ReferenceVia {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Next => None,
            Self::Option { label, .. } | Self::Condition { label, .. } => Some(label),
            Self::Default => Some("Default"),
        }
    }
}

/// One outgoing soft reference of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: StepId,
    pub via: ReferenceVia,
}

pub type References = SmallVec<[Reference; 4]>;

/// A single workflow unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    step_id: StepId,
    name: String,
    config: StepConfig,
    next_step: Option<StepId>,
}

impl Step {
    pub fn new(step_id: StepId, name: impl Into<String>, config: StepConfig) -> Self {
        Self {
            step_id,
            name: name.into(),
            config,
            next_step: None,
        }
    }

    pub fn unconfigured(step_id: StepId, name: impl Into<String>, kind: StepKind) -> Self {
        Self::new(step_id, name, StepConfig::empty(kind))
    }

    pub fn with_next_step(mut self, next_step: Option<StepId>) -> Self {
        self.next_step = next_step;
        self
    }

    pub fn step_id(&self) -> &StepId {
        &self.step_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StepKind {
        self.config.kind()
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut StepConfig {
        &mut self.config
    }

    pub fn next_step(&self) -> Option<&StepId> {
        self.next_step.as_ref()
    }

    pub fn set_step_id(&mut self, step_id: StepId) {
        self.step_id = step_id;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_config(&mut self, config: StepConfig) {
        self.config = config;
    }

    pub fn set_next_step(&mut self, next_step: Option<StepId>) {
        self.next_step = next_step;
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Outgoing references in emission order: `next_step`, options, conditions, default.
    pub fn references(&self) -> References {
        let mut refs = References::new();
        if let Some(next) = &self.next_step {
            refs.push(Reference { target: next.clone(), via: ReferenceVia::Next });
        }
        match &self.config {
            StepConfig::DecisionPoint(c) => {
                for (index, option) in c.options.iter().enumerate() {
                    if let Some(target) = &option.next_step {
                        refs.push(Reference {
                            target: target.clone(),
                            via: ReferenceVia::Option { index, label: option.label.clone() },
                        });
                    }
                }
            }
            StepConfig::EvaluateCondition(c) => {
                for (index, condition) in c.conditions.iter().enumerate() {
                    if let Some(target) = &condition.next_step {
                        refs.push(Reference {
                            target: target.clone(),
                            via: ReferenceVia::Condition { index, label: condition.label() },
                        });
                    }
                }
                if let Some(target) = &c.default_next_step {
                    refs.push(Reference { target: target.clone(), via: ReferenceVia::Default });
                }
            }
            StepConfig::CollectInformation(_)
            | StepConfig::ProvideInstructions(_)
            | StepConfig::ExecuteAction(_) => {}
        }
        refs
    }

    /// Short human-readable configuration summary for node cards.
    pub fn summary(&self) -> String {
        let (prompt, instructions) = match &self.config {
            StepConfig::CollectInformation(c) => (c.prompt.as_str(), ""),
            StepConfig::DecisionPoint(c) => (c.prompt.as_str(), ""),
            StepConfig::ProvideInstructions(c) => ("", c.instructions_text.as_str()),
            StepConfig::EvaluateCondition(_) | StepConfig::ExecuteAction(_) => ("", ""),
        };
        if !prompt.is_empty() {
            return truncate_summary(prompt);
        }
        if !instructions.is_empty() {
            return truncate_summary(instructions);
        }

        match &self.config {
            StepConfig::CollectInformation(c) if !c.field_name.is_empty() => {
                format!("Field: {}", c.field_name)
            }
            StepConfig::ExecuteAction(c) if !c.action_type.is_empty() => {
                format!("Action: {}", c.action_type)
            }
            StepConfig::EvaluateCondition(c) if !c.conditions.is_empty() => {
                format!("{} condition(s)", c.conditions.len())
            }
            StepConfig::DecisionPoint(c) if !c.options.is_empty() => {
                format!("{} option(s)", c.options.len())
            }
            _ => String::new(),
        }
    }
}

fn truncate_summary(text: &str) -> String {
    if text.chars().count() <= SUMMARY_MAX_CHARS {
        return text.to_owned();
    }
    let mut out = text.chars().take(SUMMARY_MAX_CHARS).collect::<String>();
    out.push_str("...");
    out
}

/// Deserializes an optional step reference, treating blank strings as "not connected".
pub(crate) fn deserialize_target<'de, D>(deserializer: D) -> Result<Option<StepId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => StepId::new(value).map(Some).map_err(serde::de::Error::custom),
    }
}

/// Deserializes an option value, accepting numbers and booleans as their text form.
fn deserialize_option_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<ScalarValue>::deserialize(deserializer)?;
    Ok(raw.map(|value| value.to_string()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{
        CollectInformation, Condition, ConditionOperator, DecisionOption, DecisionPoint,
        EvaluateCondition, ExecuteAction, ProvideInstructions, ReferenceVia, ScalarValue, Step,
        StepConfig, StepKind,
    };
    use crate::model::StepId;

    fn sid(value: &str) -> StepId {
        StepId::new(value).expect("step id")
    }

    #[rstest]
    #[case(StepKind::CollectInformation, "collect_information")]
    #[case(StepKind::DecisionPoint, "decision_point")]
    #[case(StepKind::EvaluateCondition, "evaluate_condition")]
    #[case(StepKind::ProvideInstructions, "provide_instructions")]
    #[case(StepKind::ExecuteAction, "execute_action")]
    fn step_kind_names_parse_back(#[case] kind: StepKind, #[case] name: &str) {
        assert_eq!(kind.as_str(), name);
        assert_eq!(name.parse::<StepKind>().expect("kind"), kind);
    }

    #[test]
    fn unknown_step_kind_is_rejected() {
        "send_email".parse::<StepKind>().unwrap_err();
    }

    #[test]
    fn empty_configs_are_not_configured() {
        for kind in StepKind::ALL {
            let step = Step::unconfigured(sid("s"), "S", kind);
            assert_eq!(step.kind(), kind);
            assert!(!step.is_configured(), "{kind} should start unconfigured");
        }
    }

    #[test]
    fn decision_point_needs_prompt_and_option() {
        let mut config = DecisionPoint { prompt: "Continue?".to_owned(), options: Vec::new() };
        assert!(!StepConfig::DecisionPoint(config.clone()).is_configured());

        config.options.push(DecisionOption {
            label: "Yes".to_owned(),
            value: "yes".to_owned(),
            next_step: None,
        });
        assert!(StepConfig::DecisionPoint(config.clone()).is_configured());

        config.prompt.clear();
        assert!(!StepConfig::DecisionPoint(config).is_configured());
    }

    #[test]
    fn references_follow_next_options_conditions_then_default() {
        let step = Step::new(
            sid("route"),
            "Route",
            StepConfig::EvaluateCondition(EvaluateCondition {
                conditions: vec![
                    Condition {
                        field: "rssi".to_owned(),
                        operator: ConditionOperator::Lt,
                        value: ScalarValue::Integer(-65),
                        next_step: Some(sid("weak")),
                    },
                    Condition {
                        field: "rssi".to_owned(),
                        operator: ConditionOperator::Ge,
                        value: ScalarValue::Integer(-65),
                        next_step: None,
                    },
                ],
                default_next_step: Some(sid("fallback")),
            }),
        )
        .with_next_step(Some(sid("after")));

        let refs = step.references();
        let targets = refs.iter().map(|r| r.target.as_str()).collect::<Vec<_>>();
        assert_eq!(targets, vec!["after", "weak", "fallback"]);
        assert_eq!(refs[0].via, ReferenceVia::Next);
        assert_eq!(refs[1].via.label(), Some("rssi < -65"));
        assert_eq!(refs[2].via, ReferenceVia::Default);
        assert_eq!(refs[2].via.label(), Some("Default"));
    }

    #[test]
    fn summary_prefers_prompt_and_truncates() {
        let long_prompt = "x".repeat(60);
        let step = Step::new(
            sid("ask"),
            "Ask",
            StepConfig::CollectInformation(CollectInformation {
                prompt: long_prompt,
                field_name: "answer".to_owned(),
                validation: None,
            }),
        );
        let summary = step.summary();
        assert_eq!(summary.len(), 53);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn summary_falls_back_to_field_action_and_counts() {
        let field_only = Step::new(
            sid("a"),
            "A",
            StepConfig::CollectInformation(CollectInformation {
                prompt: String::new(),
                field_name: "email".to_owned(),
                validation: None,
            }),
        );
        assert_eq!(field_only.summary(), "Field: email");

        let action = Step::new(
            sid("b"),
            "B",
            StepConfig::ExecuteAction(ExecuteAction {
                action_type: "close_case".to_owned(),
                ..Default::default()
            }),
        );
        assert_eq!(action.summary(), "Action: close_case");

        let instructions = Step::new(
            sid("c"),
            "C",
            StepConfig::ProvideInstructions(ProvideInstructions {
                instructions_text: "Restart the router".to_owned(),
                confirmation_required: Some(true),
            }),
        );
        assert_eq!(instructions.summary(), "Restart the router");

        let empty = Step::unconfigured(sid("d"), "D", StepKind::EvaluateCondition);
        assert_eq!(empty.summary(), "");
    }

    #[test]
    fn closing_actions_are_detected_by_substring() {
        let close = ExecuteAction { action_type: "close_case".to_owned(), ..Default::default() };
        let notify = ExecuteAction { action_type: "notify".to_owned(), ..Default::default() };
        assert!(close.is_closing());
        assert!(!notify.is_closing());
    }

    #[test]
    fn blank_targets_deserialize_as_unconnected() {
        let option: DecisionOption =
            serde_json::from_str(r#"{"label":"Yes","value":"y","next_step":"  "}"#)
                .expect("option");
        assert_eq!(option.next_step, None);
    }

    #[test]
    fn scalar_values_keep_their_type() {
        let values: Vec<ScalarValue> =
            serde_json::from_str(r#"[true, -65, 50.5, "wifi"]"#).expect("values");
        assert_eq!(
            values,
            vec![
                ScalarValue::Bool(true),
                ScalarValue::Integer(-65),
                ScalarValue::Float(50.5),
                ScalarValue::Text("wifi".to_owned()),
            ]
        );
    }

    #[test]
    fn nan_floats_compare_equal() {
        assert_eq!(ScalarValue::Float(f64::NAN), ScalarValue::Float(f64::NAN));
        assert_eq!(ScalarValue::Float(f64::INFINITY), ScalarValue::Float(f64::INFINITY));
        assert_ne!(ScalarValue::Float(f64::NAN), ScalarValue::Float(0.0));
        assert_ne!(ScalarValue::Integer(1), ScalarValue::Float(1.0));
    }

    #[rstest]
    #[case(r#"{"label":"One","value":1}"#, "1")]
    #[case(r#"{"label":"Yes","value":true}"#, "true")]
    #[case(r#"{"label":"Half","value":0.5}"#, "0.5")]
    #[case(r#"{"label":"Text","value":"y"}"#, "y")]
    #[case(r#"{"label":"Blank"}"#, "")]
    fn option_values_accept_scalars_as_text(#[case] json: &str, #[case] expected: &str) {
        let option: DecisionOption = serde_json::from_str(json).expect("option");
        assert_eq!(option.value, expected);
    }
}
