// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use tracing::{debug, warn};

use super::history::History;
use super::modifications::ModificationLog;
use crate::config::EditorConfig;
use crate::format::{export_document, parse_document, DocumentParseError};
use crate::model::{FlowId, ScalarValue, Step, StepConfig, StepId, WorkflowDocument};
use crate::query::orphaned_steps;

/// What caused a [`StoreEvent::DocumentChanged`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeCause {
    Replaced,
    Metadata,
    Constants,
    Templates,
    StepAdded(StepId),
    StepUpdated(StepId),
    StepDeleted(StepId),
    Reordered,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DocumentChanged { cause: ChangeCause },
    /// Edited text failed to parse; the document is unchanged.
    TextRejected { reason: String },
    Undone { remaining: usize },
}

/// Outcome of [`FlowStore::set_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSync {
    Applied,
    Rejected { reason: String },
}

/// Partial metadata update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataPatch {
    pub flow_id: Option<FlowId>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<Option<String>>,
    pub language: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    pub initial_step: Option<Option<StepId>>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Partial step update. `next_step: Some(None)` clears the successor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepPatch {
    pub name: Option<String>,
    pub config: Option<StepConfig>,
    pub next_step: Option<Option<StepId>>,
}

impl StepPatch {
    pub fn apply(self, step: &mut Step) {
        if let Some(name) = self.name {
            step.set_name(name);
        }
        if let Some(config) = self.config {
            step.set_config(config);
        }
        if let Some(next_step) = self.next_step {
            step.set_next_step(next_step);
        }
    }
}

pub type Subscriber = Box<dyn FnMut(&StoreEvent)>;

/// Single owner of the current document, its YAML text, and the undo history.
///
/// Mutators never snapshot on their own: callers that want an undo point call
/// [`FlowStore::push_history`] first.
pub struct FlowStore {
    document: WorkflowDocument,
    text: String,
    history: History,
    modifications: ModificationLog,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for FlowStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowStore")
            .field("document", &self.document)
            .field("text_len", &self.text.len())
            .field("history", &self.history.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl FlowStore {
    pub fn new(document: WorkflowDocument, config: &EditorConfig) -> Self {
        let mut store = Self {
            document,
            text: String::new(),
            history: History::new(config.history_depth),
            modifications: ModificationLog::default(),
            subscribers: Vec::new(),
        };
        store.refresh_text();
        store
    }

    /// Builds a store from YAML text, keeping the text verbatim.
    pub fn from_text(text: &str, config: &EditorConfig) -> Result<Self, DocumentParseError> {
        let document = parse_document(text)?;
        let mut store = Self::new(document, config);
        store.text = text.to_owned();
        Ok(store)
    }

    pub fn document(&self) -> &WorkflowDocument {
        &self.document
    }

    /// Current YAML text. May lag the document while the user is typing invalid text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn modifications(&self) -> &ModificationLog {
        &self.modifications
    }

    pub fn modifications_mut(&mut self) -> &mut ModificationLog {
        &mut self.modifications
    }

    pub fn orphan_steps(&self) -> Vec<StepId> {
        orphaned_steps(&self.document)
    }

    pub fn step_ids(&self) -> Vec<StepId> {
        self.document.step_ids().cloned().collect()
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&StoreEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    /// Snapshots the current document onto the undo history.
    pub fn push_history(&mut self) {
        self.history.push(self.document.clone());
        debug!(depth = self.history.len(), "history snapshot");
    }

    /// Restores the most recent snapshot. Returns `false` when the history is empty.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            debug!("undo with empty history");
            return false;
        };
        self.document = snapshot;
        self.refresh_text();
        let remaining = self.history.len();
        self.emit(&StoreEvent::Undone { remaining });
        true
    }

    pub fn set_document(&mut self, document: WorkflowDocument) {
        self.commit(document, ChangeCause::Replaced);
    }

    pub fn update_metadata(&mut self, patch: MetadataPatch) {
        if patch.is_empty() {
            return;
        }
        let mut next = self.document.clone();
        if let Some(flow_id) = patch.flow_id {
            next.set_flow_id(flow_id);
        }
        if let Some(name) = patch.name {
            next.set_name(name);
        }
        if let Some(version) = patch.version {
            next.set_version(version);
        }
        if let Some(description) = patch.description {
            next.set_description(description);
        }
        if let Some(language) = patch.language {
            next.set_language(language);
        }
        if let Some(keywords) = patch.keywords {
            next.set_keywords(keywords);
        }
        if let Some(initial_step) = patch.initial_step {
            next.set_initial_step(initial_step);
        }
        self.commit(next, ChangeCause::Metadata);
    }

    pub fn set_constant(&mut self, key: impl Into<String>, value: ScalarValue) {
        let mut next = self.document.clone();
        next.constants_mut().insert(key.into(), value);
        self.commit(next, ChangeCause::Constants);
    }

    /// Removes a constant. Returns `false` if it did not exist.
    pub fn delete_constant(&mut self, key: &str) -> bool {
        if !self.document.constants().contains_key(key) {
            return false;
        }
        let mut next = self.document.clone();
        next.constants_mut().shift_remove(key);
        self.commit(next, ChangeCause::Constants);
        true
    }

    pub fn set_template(&mut self, name: impl Into<String>, content: impl Into<String>) {
        let mut next = self.document.clone();
        next.registration_templates_mut().insert(name.into(), content.into());
        self.commit(next, ChangeCause::Templates);
    }

    /// Inserts `step` under its own id, replacing any step with that id in place.
    pub fn add_step(&mut self, step: Step) {
        let step_id = step.step_id().clone();
        let mut next = self.document.clone();
        next.upsert_step(step);
        self.commit(next, ChangeCause::StepAdded(step_id));
    }

    /// Applies `patch` to an existing step. Unknown ids are a no-op returning `false`.
    pub fn update_step(&mut self, step_id: &str, patch: StepPatch) -> bool {
        let mut next = self.document.clone();
        let Some(step) = next.step_mut(step_id) else {
            debug!(step_id, "update for unknown step ignored");
            return false;
        };
        patch.apply(step);
        let step_id = step.step_id().clone();
        self.commit(next, ChangeCause::StepUpdated(step_id));
        true
    }

    /// Removes a step. References to it elsewhere are left dangling.
    pub fn delete_step(&mut self, step_id: &str) -> Option<Step> {
        let mut next = self.document.clone();
        let removed = next.remove_step(step_id)?;
        self.commit(next, ChangeCause::StepDeleted(removed.step_id().clone()));
        Some(removed)
    }

    pub fn reorder_steps(&mut self, order: &[StepId]) {
        let mut next = self.document.clone();
        next.reorder_steps(order);
        self.commit(next, ChangeCause::Reordered);
    }

    /// Accepts user-edited text. Valid text replaces the document; invalid text is kept
    /// as-is and reported.
    pub fn set_text(&mut self, text: impl Into<String>) -> TextSync {
        let text = text.into();
        match parse_document(&text) {
            Ok(document) => {
                self.document = document;
                self.text = text;
                self.emit(&StoreEvent::DocumentChanged { cause: ChangeCause::Text });
                TextSync::Applied
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(%reason, "rejected document text");
                self.text = text;
                self.emit(&StoreEvent::TextRejected { reason: reason.clone() });
                TextSync::Rejected { reason }
            }
        }
    }

    /// Regenerates the text from the document, discarding any pending invalid edit.
    pub fn refresh_text(&mut self) {
        match export_document(&self.document) {
            Ok(text) => self.text = text,
            Err(err) => {
                warn!(error = %err, "failed to export document");
                self.text.clear();
            }
        }
    }

    fn commit(&mut self, document: WorkflowDocument, cause: ChangeCause) {
        self.document = document;
        self.refresh_text();
        debug!(?cause, steps = self.document.steps().len(), "document changed");
        self.emit(&StoreEvent::DocumentChanged { cause });
    }

    fn emit(&mut self, event: &StoreEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }
}
