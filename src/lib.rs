// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Stepgraph: workflow documents made of steps, kept in sync with their YAML text and a
//! projected graph.
//!
//! - [`model`] holds the typed document.
//! - [`format`] decodes and encodes the YAML text form.
//! - [`projection`] and [`layout`] turn a document into positioned nodes and edges.
//! - [`store`] owns the live document with undo, while [`session`] layers selection and
//!   clipboard editing on top.
//! - [`assistant`] applies structured actions proposed by an external assistant.

pub mod assistant;
pub mod config;
pub mod format;
pub mod layout;
pub mod model;
pub mod projection;
pub mod query;
pub mod session;
pub mod store;
