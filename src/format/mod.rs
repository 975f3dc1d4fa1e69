// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Document text format.
//!
//! Workflow documents are exchanged as YAML. Export is deterministic; parsing is strict about
//! the required top-level fields and lenient about missing step config.

pub mod yaml;

pub use yaml::{
    decode_config, decode_step, export_document, export_file_name, parse_document,
    DocumentExportError, DocumentParseError, StepDecodeError,
};
