// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::types::RawAction;
use crate::store::MessageAnalysis;

/// Assistant reply split into its structured parts.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    pub actions: Vec<RawAction>,
    pub message: String,
    pub suggestions: Vec<String>,
    pub analysis: Option<MessageAnalysis>,
    pub requires_confirmation: bool,
    /// `false` when the reply had no usable structured block and is shown verbatim.
    pub structured: bool,
}

impl ParsedReply {
    fn plain(text: &str) -> Self {
        Self {
            actions: Vec::new(),
            message: text.to_owned(),
            suggestions: Vec::new(),
            analysis: None,
            requires_confirmation: false,
            structured: false,
        }
    }
}

#[derive(Deserialize)]
struct ReplyIn {
    #[serde(default)]
    actions: Vec<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    analysis: Option<MessageAnalysis>,
    #[serde(default)]
    requires_confirmation: bool,
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid fenced block regex"))
}

fn bare_object() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid object regex"))
}

/// Extracts the structured block from an assistant reply.
///
/// A fenced `json` block wins; otherwise the widest `{...}` span is tried. A block without a
/// non-empty `message` (or one that is not valid JSON) makes the whole reply a plain message.
/// Individual malformed actions are dropped; the rest of the reply survives.
pub fn parse_reply(text: &str) -> ParsedReply {
    let block = fenced_block()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .or_else(|| bare_object().find(text));
    let Some(block) = block else {
        debug!("assistant reply has no structured block");
        return ParsedReply::plain(text);
    };

    let reply: ReplyIn = match serde_json::from_str(block.as_str()) {
        Ok(reply) => reply,
        Err(err) => {
            warn!(error = %err, "assistant reply block is not valid JSON");
            return ParsedReply::plain(text);
        }
    };
    let Some(message) = reply.message.filter(|message| !message.trim().is_empty()) else {
        warn!("assistant reply block has no message");
        return ParsedReply::plain(text);
    };

    let actions = reply
        .actions
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<RawAction>(value) {
            Ok(action) => Some(action),
            Err(err) => {
                warn!(error = %err, "dropping malformed action");
                None
            }
        })
        .collect();

    ParsedReply {
        actions,
        message,
        suggestions: reply.suggestions,
        analysis: reply.analysis,
        requires_confirmation: reply.requires_confirmation,
        structured: true,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_reply;

    #[test]
    fn fenced_block_with_surrounding_prose() {
        let text = r#"Sure!
```json
{"message": "Added it",
 "actions": [{"type": "delete_step", "data": {"step_id": "a"}}],
 "suggestions": ["Next"]}
```
Bye"#;
        let reply = parse_reply(text);
        assert!(reply.structured);
        assert_eq!(reply.message, "Added it");
        assert_eq!(reply.actions.len(), 1);
        assert_eq!(reply.actions[0].kind, "delete_step");
        assert_eq!(reply.suggestions, vec!["Next".to_owned()]);
    }

    #[test]
    fn bare_object_is_accepted() {
        let reply = parse_reply(
            "Here you go {\"message\": \"ok\", \"analysis\": {\"problems_found\": [\"x\"]}} done",
        );
        assert!(reply.structured);
        assert_eq!(reply.analysis.expect("analysis").problems_found, vec!["x".to_owned()]);
    }

    #[test]
    fn missing_message_falls_back_to_plain_text() {
        let text = "{\"actions\": []}";
        let reply = parse_reply(text);
        assert!(!reply.structured);
        assert_eq!(reply.message, text);
        assert!(reply.actions.is_empty());
    }

    #[test]
    fn invalid_json_and_prose_fall_back() {
        assert!(!parse_reply("just words").structured);
        assert!(!parse_reply("{not: json}").structured);
    }

    #[test]
    fn malformed_actions_are_dropped_individually() {
        let reply = parse_reply(
            r#"{"message": "m",
                "actions": [{"data": {}}, {"type": "fix_orphans"}],
                "requires_confirmation": true}"#,
        );
        assert_eq!(reply.actions.len(), 1);
        assert_eq!(reply.actions[0].kind, "fix_orphans");
        assert!(reply.requires_confirmation);
    }
}
