// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Serialize;
use tracing::{debug, warn};

use super::types::{
    AddMultipleStepsData, AddStepData, AddTemplateData, AssistantAction, Connection,
    ConnectionType, DeleteStepData, MetadataUpdate, ModifyConnectionsData, ModifyConstantsData,
    ModifyStepData, RawAction, RestructureFlowData, StepUpdates,
};
use crate::format::{decode_config, decode_step};
use crate::model::{
    validate_constant_key, validate_flow_id, validate_version, FlowId, ScalarValue, Step,
    StepConfig, StepId, StepKind, WorkflowDocument,
};
use crate::query::{analyze, orphaned_steps, reachable_from_root, FlowAnalysis};
use crate::store::{FlowStore, MetadataPatch, StepPatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied { message: String },
    Skipped { reason: String },
}

impl ActionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    fn applied(message: impl Into<String>) -> Self {
        Self::Applied { message: message.into() }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped { reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult {
    pub kind: String,
    pub outcome: ActionOutcome,
}

/// Result of applying a batch of actions. Skipped actions never stop the batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApplyReport {
    pub results: Vec<ActionResult>,
    pub created_steps: Vec<StepId>,
    pub modified_steps: Vec<StepId>,
    pub deleted_steps: Vec<StepId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<FlowAnalysis>,
}

impl ApplyReport {
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_applied()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.len() - self.applied_count()
    }

    /// One line per action: the applied message or the skip reason.
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.results.iter().map(|result| match &result.outcome {
            ActionOutcome::Applied { message } => message.clone(),
            ActionOutcome::Skipped { reason } => format!("Skipped {}: {reason}", result.kind),
        })
    }

    fn created(&mut self, step_id: &StepId) {
        push_unique(&mut self.created_steps, step_id);
    }

    fn modified(&mut self, step_id: &StepId) {
        if !self.created_steps.contains(step_id) {
            push_unique(&mut self.modified_steps, step_id);
        }
    }
}

fn push_unique(ids: &mut Vec<StepId>, step_id: &StepId) {
    if !ids.contains(step_id) {
        ids.push(step_id.clone());
    }
}

/// Validates and applies each action in order against the live store.
///
/// The caller is expected to have called [`FlowStore::push_history`] beforehand; a partially
/// applied batch is undone as a whole.
pub fn apply_actions(store: &mut FlowStore, actions: &[RawAction]) -> ApplyReport {
    let mut report = ApplyReport::default();
    for raw in actions {
        let (kind, outcome) = match AssistantAction::from_raw(raw) {
            Ok(action) => {
                let outcome = apply_action(store, &action, &mut report);
                (action.kind().to_owned(), outcome)
            }
            Err(err) => {
                (raw.kind.clone(), ActionOutcome::skipped(format!("invalid payload: {err}")))
            }
        };
        match &outcome {
            ActionOutcome::Applied { message } => debug!(kind = %kind, %message, "applied action"),
            ActionOutcome::Skipped { reason } => warn!(kind = %kind, %reason, "skipped action"),
        }
        report.results.push(ActionResult { kind, outcome });
    }
    report
}

/// Applies one validated action and records it in the store's modification log.
pub fn apply_action(
    store: &mut FlowStore,
    action: &AssistantAction,
    report: &mut ApplyReport,
) -> ActionOutcome {
    let mut affected = Vec::new();
    let outcome = match action {
        AssistantAction::AddStep(data) => add_step(store, data, &mut affected, report),
        AssistantAction::ModifyStep(data) => modify_step(store, data, &mut affected, report),
        AssistantAction::DeleteStep(data) => delete_step(store, data, &mut affected, report),
        AssistantAction::ModifyConnections(data) => {
            modify_connections(store, data, &mut affected, report)
        }
        AssistantAction::AddMultipleSteps(data) => {
            add_multiple_steps(store, data, &mut affected, report)
        }
        AssistantAction::UpdateMetadata(data) => update_metadata(store, &data.metadata),
        AssistantAction::ModifyConstants(data) => modify_constants(store, data),
        AssistantAction::AddTemplate(data) => add_template(store, data),
        AssistantAction::FixOrphans(_) => fix_orphans(store, &mut affected, report),
        AssistantAction::RestructureFlow(data) => restructure_flow(store, data),
        AssistantAction::AnalyzeFlow(_) => {
            let analysis = analyze(store.document());
            let message = format!(
                "Analysis: {} orphaned step(s), {} broken connection(s), {} terminal step(s)",
                analysis.orphaned_steps.len(),
                analysis.broken_connections.len(),
                analysis.terminal_steps.len()
            );
            report.analysis = Some(analysis);
            return ActionOutcome::applied(message);
        }
        AssistantAction::Unknown(kind) => {
            return ActionOutcome::skipped(format!("unknown action kind {kind:?}"));
        }
    };
    if outcome.is_applied() {
        store.modifications_mut().record(action.kind(), affected);
    }
    outcome
}

fn parse_step_id(value: &str) -> Result<StepId, String> {
    StepId::new(value.trim()).map_err(|err| format!("invalid step id {value:?}: {err}"))
}

/// Blank targets clear the reference.
fn parse_target(value: Option<&str>) -> Result<Option<StepId>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_step_id(value).map(Some),
    }
}

fn add_step(
    store: &mut FlowStore,
    data: &AddStepData,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    let step_id = match parse_step_id(&data.step_id) {
        Ok(step_id) => step_id,
        Err(reason) => return ActionOutcome::skipped(reason),
    };
    let step = match decode_step(data.step.clone(), Some(step_id.as_str())) {
        Ok(step) => step,
        Err(err) => return ActionOutcome::skipped(format!("invalid step {step_id}: {err}")),
    };
    let existed = store.document().contains_step(step_id.as_str());
    let name = step.name().to_owned();
    store.add_step(step);
    if existed {
        report.modified(&step_id);
    } else {
        report.created(&step_id);
    }
    affected.push(step_id);
    ActionOutcome::applied(format!("Added step \"{name}\""))
}

fn step_patch(current: &Step, updates: &StepUpdates) -> Result<StepPatch, String> {
    let kind = match updates.kind.as_deref() {
        Some(kind) => Some(kind.parse::<StepKind>().map_err(|err| err.to_string())?),
        None => None,
    };
    let config = match (kind, &updates.config) {
        (None, None) => None,
        (Some(kind), None) if kind == current.kind() => None,
        (Some(kind), None) => Some(StepConfig::empty(kind)),
        (kind, Some(config)) => {
            let kind = kind.unwrap_or_else(|| current.kind());
            Some(decode_config(kind, config.clone()).map_err(|err| err.to_string())?)
        }
    };
    let next_step = match &updates.next_step {
        Some(target) => Some(parse_target(target.as_deref())?),
        None => None,
    };
    Ok(StepPatch { name: updates.name.clone(), config, next_step })
}

fn modify_step(
    store: &mut FlowStore,
    data: &ModifyStepData,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    let Some(current) = store.document().step(data.step_id.trim()) else {
        return ActionOutcome::skipped(format!("step {:?} does not exist", data.step_id));
    };
    let step_id = current.step_id().clone();
    let patch = match step_patch(current, &data.updates) {
        Ok(patch) => patch,
        Err(reason) => return ActionOutcome::skipped(reason),
    };
    if patch == StepPatch::default() {
        return ActionOutcome::skipped(format!("no updates for step {step_id}"));
    }
    store.update_step(step_id.as_str(), patch);
    report.modified(&step_id);
    affected.push(step_id.clone());
    ActionOutcome::applied(format!("Modified step \"{step_id}\""))
}

fn delete_step(
    store: &mut FlowStore,
    data: &DeleteStepData,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    let Some(removed) = store.delete_step(data.step_id.trim()) else {
        return ActionOutcome::skipped(format!("step {:?} does not exist", data.step_id));
    };
    let step_id = removed.step_id().clone();
    report.created_steps.retain(|id| id != &step_id);
    report.modified_steps.retain(|id| id != &step_id);
    push_unique(&mut report.deleted_steps, &step_id);
    affected.push(step_id.clone());
    ActionOutcome::applied(format!("Deleted step \"{step_id}\""))
}

/// Rewires one reference of `step` in place.
fn connect(step: &mut Step, connection: &Connection, target: Option<StepId>) -> Result<(), String> {
    let from = step.step_id().clone();
    match connection.connection_type {
        ConnectionType::NextStep => {
            step.set_next_step(target);
            Ok(())
        }
        ConnectionType::Option => {
            let StepConfig::DecisionPoint(config) = step.config_mut() else {
                return Err(format!("step {from} is not a decision point"));
            };
            let option = match (connection.index, connection.label.as_deref()) {
                (Some(index), _) => config.options.get_mut(index),
                (None, Some(label)) => config
                    .options
                    .iter_mut()
                    .find(|option| option.label.trim().eq_ignore_ascii_case(label.trim())),
                (None, None) => return Err("option connection needs an index or a label".into()),
            };
            let option = option.ok_or_else(|| format!("step {from} has no such option"))?;
            option.next_step = target;
            Ok(())
        }
        ConnectionType::Condition => {
            let StepConfig::EvaluateCondition(config) = step.config_mut() else {
                return Err(format!("step {from} does not evaluate conditions"));
            };
            let index = connection.index.ok_or("condition connection needs an index")?;
            let condition = config
                .conditions
                .get_mut(index)
                .ok_or_else(|| format!("step {from} has no condition {index}"))?;
            condition.next_step = target;
            Ok(())
        }
        ConnectionType::Default => {
            let StepConfig::EvaluateCondition(config) = step.config_mut() else {
                return Err(format!("step {from} does not evaluate conditions"));
            };
            config.default_next_step = target;
            Ok(())
        }
    }
}

fn modify_connections(
    store: &mut FlowStore,
    data: &ModifyConnectionsData,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    if data.connections.is_empty() {
        return ActionOutcome::skipped("no connections given");
    }

    let mut failures = Vec::new();
    for connection in &data.connections {
        let result = parse_target(connection.to_step.as_deref()).and_then(|target| {
            let mut step = store
                .document()
                .step(connection.from_step.trim())
                .cloned()
                .ok_or_else(|| format!("step {:?} does not exist", connection.from_step))?;
            connect(&mut step, connection, target)?;
            Ok(step)
        });
        match result {
            Ok(step) => {
                let step_id = step.step_id().clone();
                store.update_step(
                    step_id.as_str(),
                    StepPatch {
                        config: Some(step.config().clone()),
                        next_step: Some(step.next_step().cloned()),
                        ..StepPatch::default()
                    },
                );
                report.modified(&step_id);
                push_unique(affected, &step_id);
            }
            Err(reason) => failures.push(reason),
        }
    }

    let total = data.connections.len();
    let applied = total - failures.len();
    if applied == 0 {
        return ActionOutcome::skipped(failures.join("; "));
    }
    if failures.is_empty() {
        ActionOutcome::applied(format!("Updated {total} connection(s)"))
    } else {
        ActionOutcome::applied(format!(
            "Updated {applied} of {total} connection(s); {}",
            failures.join("; ")
        ))
    }
}

fn add_multiple_steps(
    store: &mut FlowStore,
    data: &AddMultipleStepsData,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    if data.steps.is_empty() {
        return ActionOutcome::skipped("no steps given");
    }

    let mut failures = Vec::new();
    let mut added = 0usize;
    for body in &data.steps {
        match decode_step(body.clone(), None) {
            Ok(step) => {
                let step_id = step.step_id().clone();
                let existed = store.document().contains_step(step_id.as_str());
                store.add_step(step);
                if existed {
                    report.modified(&step_id);
                } else {
                    report.created(&step_id);
                }
                affected.push(step_id);
                added += 1;
            }
            Err(err) => failures.push(err.to_string()),
        }
    }

    if added == 0 {
        return ActionOutcome::skipped(failures.join("; "));
    }
    ActionOutcome::applied(format!("Added {added} step(s)"))
}

fn metadata_patch(update: &MetadataUpdate) -> Result<MetadataPatch, String> {
    let flow_id = match update.flow_id.as_deref().map(str::trim) {
        Some(flow_id) => {
            validate_flow_id(flow_id).map_err(|err| err.to_string())?;
            Some(FlowId::new(flow_id).map_err(|err| err.to_string())?)
        }
        None => None,
    };
    if let Some(version) = update.version.as_deref() {
        validate_version(version.trim()).map_err(|err| err.to_string())?;
    }
    let initial_step = match &update.initial_step {
        Some(target) => Some(parse_target(target.as_deref())?),
        None => None,
    };
    Ok(MetadataPatch {
        flow_id,
        name: update.name.clone(),
        version: update.version.as_deref().map(|version| version.trim().to_owned()),
        description: update.description.clone(),
        language: update.language.clone(),
        keywords: update.keywords.clone(),
        initial_step,
    })
}

fn update_metadata(store: &mut FlowStore, update: &MetadataUpdate) -> ActionOutcome {
    let patch = match metadata_patch(update) {
        Ok(patch) => patch,
        Err(reason) => return ActionOutcome::skipped(reason),
    };
    if patch.is_empty() {
        return ActionOutcome::skipped("no metadata fields given");
    }
    store.update_metadata(patch);
    ActionOutcome::applied("Updated flow metadata")
}

fn modify_constants(store: &mut FlowStore, data: &ModifyConstantsData) -> ActionOutcome {
    let mut failures = Vec::new();
    let mut changed = 0usize;

    for (key, value) in &data.constants {
        if let Err(err) = validate_constant_key(key) {
            failures.push(err.to_string());
            continue;
        }
        match serde_json::from_value::<ScalarValue>(value.clone()) {
            Ok(value) => {
                store.set_constant(key.as_str(), value);
                changed += 1;
            }
            Err(_) => failures.push(format!("constant {key} must be a string, number or boolean")),
        }
    }
    for key in &data.remove {
        if store.delete_constant(key) {
            changed += 1;
        }
    }

    if changed == 0 {
        let reason = if failures.is_empty() {
            "no constants changed".to_owned()
        } else {
            failures.join("; ")
        };
        return ActionOutcome::skipped(reason);
    }
    ActionOutcome::applied(format!("Updated {changed} constant(s)"))
}

fn add_template(store: &mut FlowStore, data: &AddTemplateData) -> ActionOutcome {
    let name = data.template_name.trim();
    if name.is_empty() || data.template_content.trim().is_empty() {
        return ActionOutcome::skipped("template name and content are required");
    }
    store.set_template(name, data.template_content.as_str());
    ActionOutcome::applied(format!("Added template \"{name}\""))
}

/// Reachable step that can take a successor: no outgoing reference, not a branch, not closing.
fn is_open_end(step: &Step) -> bool {
    step.references().is_empty()
        && !step.kind().is_branching()
        && !matches!(step.config(), StepConfig::ExecuteAction(action) if action.is_closing())
}

/// Nearest open end to `orphan` in document order, preferring steps before it.
fn anchor_for(doc: &WorkflowDocument, orphan: &StepId) -> Option<StepId> {
    let reachable = reachable_from_root(doc);
    let position = doc.steps().get_index_of(orphan.as_str())?;
    let is_anchor = |step: &&Step| reachable.contains_key(step.step_id()) && is_open_end(step);

    let before = doc.steps().values().take(position).rev().find(is_anchor);
    before
        .or_else(|| doc.steps().values().skip(position + 1).find(is_anchor))
        .map(|step| step.step_id().clone())
}

fn fix_orphans(
    store: &mut FlowStore,
    affected: &mut Vec<StepId>,
    report: &mut ApplyReport,
) -> ActionOutcome {
    let orphans = orphaned_steps(store.document());
    if orphans.is_empty() {
        return ActionOutcome::applied("No orphaned steps to fix");
    }

    let mut fixed = Vec::new();
    let mut stranded = Vec::new();
    for orphan in orphans {
        let Some(anchor) = anchor_for(store.document(), &orphan) else {
            stranded.push(orphan);
            continue;
        };
        store.update_step(
            anchor.as_str(),
            StepPatch { next_step: Some(Some(orphan.clone())), ..StepPatch::default() },
        );
        report.modified(&anchor);
        push_unique(affected, &anchor);
        push_unique(affected, &orphan);
        fixed.push(format!("{anchor} -> {orphan}"));
    }

    if fixed.is_empty() {
        return ActionOutcome::skipped(format!(
            "no open end of the flow to attach {} orphaned step(s) to",
            stranded.len()
        ));
    }
    ActionOutcome::applied(format!(
        "Connected {} orphaned step(s): {}",
        fixed.len(),
        fixed.join(", ")
    ))
}

fn restructure_flow(store: &mut FlowStore, data: &RestructureFlowData) -> ActionOutcome {
    let order = data
        .new_order
        .iter()
        .filter_map(|id| store.document().step(id.trim()).map(|step| step.step_id().clone()))
        .collect::<Vec<_>>();
    if order.is_empty() {
        return ActionOutcome::skipped("new_order names no existing steps");
    }
    store.reorder_steps(&order);
    ActionOutcome::applied(format!("Reordered {} step(s)", order.len()))
}
