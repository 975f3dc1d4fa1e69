// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Assistant integration.
//!
//! Replies from an external assistant are parsed permissively into [`RawAction`]s, validated
//! into [`AssistantAction`]s and applied one by one against the [`crate::store::FlowStore`].
//! An action that fails validation is skipped with a reason; the rest of the batch still runs.

pub mod apply;
pub mod context;
pub mod conversation;
pub mod reply;
pub mod types;

pub use apply::{apply_action, apply_actions, ActionOutcome, ActionResult, ApplyReport};
pub use context::{action_schema, build_context, smart_suggestions, system_prompt};
pub use conversation::{
    Assistant, AssistantError, AssistantRequest, Conversation, Exchange, OutboundMessage,
    DEFAULT_FAILURE_MESSAGE,
};
pub use reply::{parse_reply, ParsedReply};
pub use types::{
    AddMultipleStepsData, AddStepData, AddTemplateData, AssistantAction, Connection,
    ConnectionType, DeleteStepData, MetadataUpdate, ModifyConnectionsData, ModifyConstantsData,
    ModifyStepData, NoData, RawAction, RestructureFlowData, StepUpdates, UpdateMetadataData,
};
