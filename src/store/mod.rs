// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! State owned by an editing session.
//!
//! [`FlowStore`] holds the document, its YAML text and the bounded undo history. The chat
//! [`Transcript`] and [`ModificationLog`] sit next to it, and [`fs::write_atomic`] is the one
//! way anything here touches disk.

pub mod flow_store;
pub mod fs;
pub mod history;
pub mod modifications;
pub mod transcript;

pub use flow_store::{
    ChangeCause, FlowStore, MetadataPatch, StepPatch, StoreEvent, Subscriber, TextSync,
};
pub use fs::{write_atomic, WriteDurability};
pub use history::History;
pub use modifications::{Modification, ModificationLog, DEFAULT_MODIFICATION_CAP};
pub use transcript::{
    ChatMessage, ChatRole, FileStorage, MemoryStorage, MessageAnalysis, Transcript,
    TranscriptError, TranscriptStorage,
};
