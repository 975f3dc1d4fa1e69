// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Selection and editing session.
//!
//! Focus, multi-selection, quick edit and the clipboard are pure UI state. Only the explicit
//! actions (paste, duplicate, delete, undo) reach the [`FlowStore`], and each of them snapshots
//! history before its first mutation.

pub mod minter;

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::model::{Step, StepId};
use crate::projection::{Position, PositionMap};
use crate::store::FlowStore;

pub use minter::{ClockIdMinter, IdMinter, SequentialIdMinter};

/// Offset applied to duplicated nodes relative to their source.
pub const DUPLICATE_OFFSET: f64 = 50.0;

/// Where a paste lands when the canvas was never clicked.
pub const DEFAULT_PASTE_POSITION: Position = Position { x: 100.0, y: 100.0 };

#[derive(Debug, Clone, PartialEq)]
pub struct Clipboard {
    step: Step,
    position: Option<Position>,
}

impl Clipboard {
    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }
}

pub struct EditingSession {
    focused: Option<StepId>,
    selected: BTreeSet<StepId>,
    quick_edit: Option<StepId>,
    clipboard: Option<Clipboard>,
    minter: Box<dyn IdMinter>,
}

impl fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditingSession")
            .field("focused", &self.focused)
            .field("selected", &self.selected)
            .field("quick_edit", &self.quick_edit)
            .field("clipboard", &self.clipboard)
            .finish_non_exhaustive()
    }
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditingSession {
    pub fn new() -> Self {
        Self::with_minter(ClockIdMinter)
    }

    pub fn with_minter(minter: impl IdMinter + 'static) -> Self {
        Self {
            focused: None,
            selected: BTreeSet::new(),
            quick_edit: None,
            clipboard: None,
            minter: Box::new(minter),
        }
    }

    pub fn focused(&self) -> Option<&StepId> {
        self.focused.as_ref()
    }

    pub fn focus(&mut self, step_id: Option<StepId>) {
        self.focused = step_id;
    }

    pub fn selected(&self) -> &BTreeSet<StepId> {
        &self.selected
    }

    pub fn is_selected(&self, step_id: &str) -> bool {
        self.selected.iter().any(|id| id.as_str() == step_id)
    }

    /// Replaces the selection.
    pub fn select(&mut self, step_ids: impl IntoIterator<Item = StepId>) {
        self.selected = step_ids.into_iter().collect();
    }

    pub fn add_to_selection(&mut self, step_id: StepId) {
        self.selected.insert(step_id);
    }

    pub fn toggle_selection(&mut self, step_id: StepId) {
        if !self.selected.remove(&step_id) {
            self.selected.insert(step_id);
        }
    }

    pub fn select_all(&mut self, store: &FlowStore) {
        self.selected = store.document().step_ids().cloned().collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    pub fn quick_edit(&self) -> Option<&StepId> {
        self.quick_edit.as_ref()
    }

    pub fn open_quick_edit(&mut self, step_id: StepId) {
        self.quick_edit = Some(step_id);
    }

    pub fn close_quick_edit(&mut self) {
        self.quick_edit = None;
    }

    pub fn clipboard(&self) -> Option<&Clipboard> {
        self.clipboard.as_ref()
    }

    /// Copies the focused step and its last known position. Returns `false` when nothing
    /// is focused or the focused id no longer resolves.
    pub fn copy_focused(&mut self, store: &FlowStore, position: Option<Position>) -> bool {
        let Some(step) = self.focused.as_ref().and_then(|id| store.document().step(id.as_str()))
        else {
            return false;
        };
        self.clipboard = Some(Clipboard { step: step.clone(), position });
        true
    }

    /// Inserts a copy of the clipboard step at `at` (or the default paste position).
    pub fn paste(
        &mut self,
        store: &mut FlowStore,
        at: Option<Position>,
        positions: &mut PositionMap,
    ) -> Option<StepId> {
        let source = self.clipboard.as_ref()?.step.clone();
        store.push_history();
        let step_id = self.insert_copy(store, &source);
        positions.insert(step_id.clone(), at.unwrap_or(DEFAULT_PASTE_POSITION));
        debug!(source = %source.step_id(), step_id = %step_id, "pasted step");
        Some(step_id)
    }

    /// Duplicates every selected step next to its source and selects the copies.
    pub fn duplicate_selected(
        &mut self,
        store: &mut FlowStore,
        positions: &mut PositionMap,
    ) -> Vec<StepId> {
        let sources = store
            .document()
            .steps()
            .values()
            .filter(|step| self.selected.contains(step.step_id()))
            .cloned()
            .collect::<Vec<_>>();
        if sources.is_empty() {
            return Vec::new();
        }

        store.push_history();
        let created = sources
            .iter()
            .map(|source| {
                let step_id = self.insert_copy(store, source);
                if let Some(position) = positions.get(source.step_id()).copied() {
                    positions.insert(
                        step_id.clone(),
                        position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET),
                    );
                }
                step_id
            })
            .collect::<Vec<_>>();
        debug!(count = created.len(), "duplicated selection");
        self.select(created.iter().cloned());
        created
    }

    pub fn duplicate_focused(
        &mut self,
        store: &mut FlowStore,
        positions: &mut PositionMap,
    ) -> Option<StepId> {
        let source =
            self.focused.as_ref().and_then(|id| store.document().step(id.as_str()))?.clone();
        store.push_history();
        let step_id = self.insert_copy(store, &source);
        if let Some(position) = positions.get(source.step_id()).copied() {
            positions.insert(step_id.clone(), position.offset(DUPLICATE_OFFSET, DUPLICATE_OFFSET));
        }
        Some(step_id)
    }

    /// Deletes every selected step that exists and clears the selection.
    pub fn delete_selected(&mut self, store: &mut FlowStore) -> Vec<StepId> {
        let targets = self
            .selected
            .iter()
            .filter(|id| store.document().contains_step(id.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        self.selected.clear();
        if targets.is_empty() {
            return targets;
        }

        store.push_history();
        for step_id in &targets {
            store.delete_step(step_id.as_str());
            self.forget(step_id);
        }
        targets
    }

    pub fn delete_focused(&mut self, store: &mut FlowStore) -> Option<StepId> {
        let step_id = self.focused.clone()?;
        if !store.document().contains_step(step_id.as_str()) {
            return None;
        }
        store.push_history();
        store.delete_step(step_id.as_str());
        self.forget(&step_id);
        Some(step_id)
    }

    /// Undoes the last store change and drops UI state pointing at steps that no longer exist.
    pub fn undo(&mut self, store: &mut FlowStore) -> bool {
        if !store.undo() {
            return false;
        }
        let doc = store.document();
        self.selected.retain(|id| doc.contains_step(id.as_str()));
        if self.focused.as_ref().is_some_and(|id| !doc.contains_step(id.as_str())) {
            self.focused = None;
        }
        if self.quick_edit.as_ref().is_some_and(|id| !doc.contains_step(id.as_str())) {
            self.quick_edit = None;
        }
        true
    }

    fn insert_copy(&mut self, store: &mut FlowStore, source: &Step) -> StepId {
        let step_id = self.minter.mint(store.document());
        let copy = Step::new(
            step_id.clone(),
            format!("{} (Copy)", source.name()),
            source.config().clone(),
        );
        store.add_step(copy);
        step_id
    }

    fn forget(&mut self, step_id: &StepId) {
        self.selected.remove(step_id);
        if self.focused.as_ref() == Some(step_id) {
            self.focused = None;
        }
        if self.quick_edit.as_ref() == Some(step_id) {
            self.quick_edit = None;
        }
    }
}
