// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over workflow documents.
//!
//! Reference defects (orphans, dangling targets) are reported here; they are never errors.

pub mod analysis;

pub use analysis::{
    analyze, broken_connections, orphaned_steps, reachable_from_root, terminal_steps,
    unreachable_steps, BrokenConnection, FlowAnalysis,
};
