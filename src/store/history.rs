// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::VecDeque;

use crate::model::WorkflowDocument;

/// Bounded stack of document snapshots. The oldest snapshot is evicted past `depth`.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    depth: usize,
    snapshots: VecDeque<WorkflowDocument>,
}

impl History {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self { depth, snapshots: VecDeque::with_capacity(depth) }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn push(&mut self, snapshot: WorkflowDocument) {
        if self.snapshots.len() == self.depth {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
    }

    pub fn pop(&mut self) -> Option<WorkflowDocument> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
