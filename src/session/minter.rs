// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::Utc;

use crate::model::{StepId, WorkflowDocument};

const DEFAULT_PREFIX: &str = "step";

/// Source of fresh step ids for copies. Minted ids never collide with `doc`.
pub trait IdMinter {
    fn mint(&mut self, doc: &WorkflowDocument) -> StepId;
}

/// Mints `step_<millis>`, then `step_<millis>_<n>` while the id is taken.
#[derive(Debug, Default, Clone)]
pub struct ClockIdMinter;

impl IdMinter for ClockIdMinter {
    fn mint(&mut self, doc: &WorkflowDocument) -> StepId {
        let millis = Utc::now().timestamp_millis();
        let mut buf = itoa::Buffer::new();
        let base = format!("step_{}", buf.format(millis));
        first_free(doc, &base)
    }
}

/// Mints `<prefix>_1`, `<prefix>_2`, ... skipping ids already in the document.
///
/// The prefix is trimmed; a blank prefix falls back to `step`.
#[derive(Debug, Clone)]
pub struct SequentialIdMinter {
    prefix: String,
    next: u64,
}

impl SequentialIdMinter {
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim();
        let prefix = if trimmed.is_empty() { DEFAULT_PREFIX } else { trimmed };
        Self { prefix: prefix.to_owned(), next: 1 }
    }
}

impl IdMinter for SequentialIdMinter {
    fn mint(&mut self, doc: &WorkflowDocument) -> StepId {
        let mut buf = itoa::Buffer::new();
        loop {
            let candidate = format!("{}_{}", self.prefix, buf.format(self.next));
            self.next += 1;
            if !doc.contains_step(&candidate) {
                return StepId::from_generated(&candidate);
            }
        }
    }
}

fn first_free(doc: &WorkflowDocument, base: &str) -> StepId {
    if !doc.contains_step(base) {
        return StepId::from_generated(base);
    }
    let mut buf = itoa::Buffer::new();
    let mut suffix = 1u64;
    loop {
        let candidate = format!("{base}_{}", buf.format(suffix));
        if !doc.contains_step(&candidate) {
            return StepId::from_generated(&candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{first_free, ClockIdMinter, IdMinter, SequentialIdMinter};
    use crate::model::fixtures;

    #[test]
    fn clock_ids_are_prefixed_and_free() {
        let doc = fixtures::linear_flow(&["a"]);
        let id = ClockIdMinter.mint(&doc);
        assert!(id.as_str().starts_with("step_"));
        assert!(!doc.contains_step(id.as_str()));
    }

    #[test]
    fn collisions_get_a_numeric_suffix() {
        let doc = fixtures::linear_flow(&["step_7", "step_7_1"]);
        assert_eq!(first_free(&doc, "step_7").as_str(), "step_7_2");
    }

    #[test]
    fn sequential_minter_skips_taken_ids() {
        let doc = fixtures::linear_flow(&["copy_1"]);
        let mut minter = SequentialIdMinter::new("copy");
        assert_eq!(minter.mint(&doc).as_str(), "copy_2");
        assert_eq!(minter.mint(&doc).as_str(), "copy_3");
    }

    #[test]
    fn sequential_prefix_is_trimmed_or_defaulted() {
        let doc = fixtures::linear_flow(&["a"]);
        assert_eq!(SequentialIdMinter::new(" copy ").mint(&doc).as_str(), "copy_1");
        assert_eq!(SequentialIdMinter::new("\t").mint(&doc).as_str(), "step_1");
        assert_eq!(SequentialIdMinter::new("").mint(&doc).as_str(), "step_1");
    }
}
