// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::StepId;

pub const DEFAULT_MODIFICATION_CAP: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Modification {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub affected_steps: Vec<StepId>,
}

/// Recent applied assistant actions, newest last.
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationLog {
    cap: usize,
    entries: VecDeque<Modification>,
}

impl Default for ModificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_MODIFICATION_CAP)
    }
}

impl ModificationLog {
    pub fn new(cap: usize) -> Self {
        Self { cap: cap.max(1), entries: VecDeque::new() }
    }

    pub fn record(&mut self, action: impl Into<String>, affected_steps: Vec<StepId>) {
        if self.entries.len() == self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(Modification {
            timestamp: Utc::now(),
            action: action.into(),
            affected_steps,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Modification> + '_ {
        self.entries.iter()
    }

    /// The `count` most recent entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &Modification> + '_ {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }
}

#[cfg(test)]
mod tests {
    use super::ModificationLog;

    #[test]
    fn keeps_the_newest_entries() {
        let mut log = ModificationLog::new(2);
        log.record("add_step", Vec::new());
        log.record("delete_step", Vec::new());
        log.record("fix_orphans", Vec::new());

        let actions = log.iter().map(|m| m.action.as_str()).collect::<Vec<_>>();
        assert_eq!(actions, vec!["delete_step", "fix_orphans"]);
        let recent = log.recent(1).map(|m| m.action.as_str()).collect::<Vec<_>>();
        assert_eq!(recent, vec!["fix_orphans"]);
    }
}
