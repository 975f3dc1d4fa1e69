// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! On-demand automatic layout.
//!
//! Re-layout is topology-only: it ignores and overwrites every existing node position, so it is
//! only run as an explicit user action.

pub mod layered;

pub use layered::{apply_layout, layout_graph, LayeredLayout, LayoutDirection, LayoutOptions};

use serde::{Deserialize, Serialize};

/// Configurable layout presets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPresets {
    pub workflow: LayoutOptions,
    pub compact: LayoutOptions,
}

impl Default for LayoutPresets {
    fn default() -> Self {
        Self {
            workflow: LayoutOptions::workflow(LayoutDirection::TopToBottom),
            compact: LayoutOptions::compact(),
        }
    }
}

impl LayoutPresets {
    /// The compact preset keeps its own direction unless one is given.
    pub fn options(&self, direction: Option<LayoutDirection>, compact: bool) -> LayoutOptions {
        let preset = if compact { self.compact } else { self.workflow };
        match direction {
            Some(direction) => LayoutOptions { direction, ..preset },
            None => preset,
        }
    }
}
