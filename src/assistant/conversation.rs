// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Serialize;
use tracing::{info, warn};

use super::apply::{apply_actions, ApplyReport};
use super::context::{build_context, smart_suggestions, system_prompt};
use super::reply::parse_reply;
use crate::model::MessageId;
use crate::store::{ChatMessage, ChatRole, FlowStore, Transcript};

pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Sorry, the assistant request failed. Check the assistant configuration and try again.";

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant is not configured")]
    NotConfigured,
    #[error("assistant request failed: {0}")]
    Request(String),
    #[error(transparent)]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Everything the assistant sees for one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantRequest {
    pub system: String,
    pub messages: Vec<OutboundMessage>,
}

/// The outbound transport. Implementations own timeouts and cancellation.
pub trait Assistant {
    fn complete(&mut self, request: &AssistantRequest) -> Result<String, AssistantError>;
}

impl<F> Assistant for F
where
    F: FnMut(&AssistantRequest) -> Result<String, AssistantError>,
{
    fn complete(&mut self, request: &AssistantRequest) -> Result<String, AssistantError> {
        self(request)
    }
}

#[derive(Debug)]
pub struct Exchange {
    pub user_message: MessageId,
    pub reply_message: MessageId,
    /// `None` when the request failed and nothing was applied.
    pub report: Option<ApplyReport>,
    pub error: Option<AssistantError>,
}

/// Runs one chat turn: record the user message, snapshot history, ask, apply, reply.
#[derive(Debug, Clone)]
pub struct Conversation {
    failure_message: String,
}

impl Default for Conversation {
    fn default() -> Self {
        Self { failure_message: DEFAULT_FAILURE_MESSAGE.to_owned() }
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the message shown when the assistant call fails.
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn request(&self, store: &FlowStore, transcript: &Transcript) -> AssistantRequest {
        let mut system = system_prompt();
        system.push('\n');
        system.push_str(&build_context(
            store.document(),
            transcript.messages(),
            Some(store.modifications()),
        ));
        let messages = transcript
            .messages()
            .iter()
            .map(|message| OutboundMessage { role: message.role, content: message.content.clone() })
            .collect();
        AssistantRequest { system, messages }
    }

    /// Sends `text` and applies the reply. Blank input is ignored.
    ///
    /// On failure the document is left as it was and a failure message is appended.
    pub fn send(
        &self,
        store: &mut FlowStore,
        transcript: &mut Transcript,
        assistant: &mut dyn Assistant,
        text: &str,
    ) -> Option<Exchange> {
        if text.trim().is_empty() {
            return None;
        }
        let user_message = transcript.push(ChatMessage::user(text)).id.clone();
        let request = self.request(store, transcript);
        store.push_history();

        match assistant.complete(&request) {
            Ok(reply) => {
                let parsed = parse_reply(&reply);
                let report = apply_actions(store, &parsed.actions);
                info!(
                    applied = report.applied_count(),
                    skipped = report.skipped_count(),
                    "assistant turn applied"
                );
                let suggestions = if parsed.suggestions.is_empty() {
                    smart_suggestions(store.document())
                } else {
                    parsed.suggestions
                };
                let message = ChatMessage::assistant(parsed.message)
                    .with_suggestions(suggestions)
                    .with_created_steps(report.created_steps.clone())
                    .with_analysis(parsed.analysis);
                let reply_message = transcript.push(message).id.clone();
                Some(Exchange { user_message, reply_message, report: Some(report), error: None })
            }
            Err(err) => {
                warn!(error = %err, "assistant request failed");
                let failure = ChatMessage::assistant(self.failure_message.as_str());
                let reply_message = transcript.push(failure).id.clone();
                Some(Exchange { user_message, reply_message, report: None, error: Some(err) })
            }
        }
    }
}
