// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use indexmap::IndexMap;

use super::ids::{FlowId, StepId};
use super::step::{ScalarValue, Step};

pub const DEFAULT_VERSION: &str = "1.0.0";

/// The complete serializable state of one workflow: metadata, constants and steps.
///
/// `steps` keeps insertion order; the map key is the authoritative step id.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDocument {
    flow_id: FlowId,
    name: String,
    version: String,
    description: Option<String>,
    language: Option<String>,
    keywords: Vec<String>,
    initial_step: Option<StepId>,
    constants: IndexMap<String, ScalarValue>,
    steps: IndexMap<StepId, Step>,
    registration_templates: IndexMap<String, String>,
}

impl WorkflowDocument {
    pub fn new(flow_id: FlowId, name: impl Into<String>) -> Self {
        Self {
            flow_id,
            name: name.into(),
            version: DEFAULT_VERSION.to_owned(),
            description: None,
            language: None,
            keywords: Vec::new(),
            initial_step: None,
            constants: IndexMap::new(),
            steps: IndexMap::new(),
            registration_templates: IndexMap::new(),
        }
    }

    pub fn flow_id(&self) -> &FlowId {
        &self.flow_id
    }

    pub fn set_flow_id(&mut self, flow_id: FlowId) {
        self.flow_id = flow_id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description<T: Into<String>>(&mut self, description: Option<T>) {
        self.description = description.map(Into::into);
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language<T: Into<String>>(&mut self, language: Option<T>) {
        self.language = language.map(Into::into);
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn set_keywords(&mut self, keywords: Vec<String>) {
        self.keywords = keywords;
    }

    pub fn initial_step(&self) -> Option<&StepId> {
        self.initial_step.as_ref()
    }

    pub fn set_initial_step(&mut self, initial_step: Option<StepId>) {
        self.initial_step = initial_step;
    }

    pub fn constants(&self) -> &IndexMap<String, ScalarValue> {
        &self.constants
    }

    pub fn constants_mut(&mut self) -> &mut IndexMap<String, ScalarValue> {
        &mut self.constants
    }

    pub fn steps(&self) -> &IndexMap<StepId, Step> {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut IndexMap<StepId, Step> {
        &mut self.steps
    }

    pub fn registration_templates(&self) -> &IndexMap<String, String> {
        &self.registration_templates
    }

    pub fn registration_templates_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.registration_templates
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.get(step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut Step> {
        self.steps.get_mut(step_id)
    }

    pub fn contains_step(&self, step_id: &str) -> bool {
        self.steps.contains_key(step_id)
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &StepId> + '_ {
        self.steps.keys()
    }

    /// Traversal root: `initial_step` when it names an existing step, else the first step.
    pub fn root(&self) -> Option<&StepId> {
        self.initial_step
            .as_ref()
            .and_then(|id| self.steps.get_key_value(id.as_str()).map(|(key, _)| key))
            .or_else(|| self.steps.keys().next())
    }

    /// Inserts `step` under its own id. Existing entries keep their position.
    pub fn upsert_step(&mut self, step: Step) {
        self.steps.insert(step.step_id().clone(), step);
    }

    pub fn remove_step(&mut self, step_id: &str) -> Option<Step> {
        self.steps.shift_remove(step_id)
    }

    /// Moves the listed steps to the front in the given order.
    ///
    /// Unknown ids are ignored; steps not listed keep their relative order after the listed ones.
    pub fn reorder_steps(&mut self, order: &[StepId]) {
        let mut reordered = IndexMap::with_capacity(self.steps.len());
        for step_id in order {
            if let Some((key, step)) = self.steps.shift_remove_entry(step_id.as_str()) {
                reordered.insert(key, step);
            }
        }
        reordered.extend(self.steps.drain(..));
        self.steps = reordered;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("flow id must use lowercase letters, digits and underscores: {0:?}")]
    FlowId(String),
    #[error("version must follow the x.y.z format: {0:?}")]
    Version(String),
    #[error("constant key must be snake_case: {0:?}")]
    ConstantKey(String),
}

pub fn validate_flow_id(value: &str) -> Result<(), MetadataError> {
    let valid = !value.is_empty()
        && value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(MetadataError::FlowId(value.to_owned()))
    }
}

pub fn validate_version(value: &str) -> Result<(), MetadataError> {
    let parts = value.split('.').collect::<Vec<_>>();
    let valid = parts.len() == 3
        && parts.iter().all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()));
    if valid {
        Ok(())
    } else {
        Err(MetadataError::Version(value.to_owned()))
    }
}

pub fn validate_constant_key(value: &str) -> Result<(), MetadataError> {
    let mut chars = value.chars();
    let starts_lower = chars.next().is_some_and(|ch| ch.is_ascii_lowercase());
    let valid = starts_lower
        && chars.all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(MetadataError::ConstantKey(value.to_owned()))
    }
}
