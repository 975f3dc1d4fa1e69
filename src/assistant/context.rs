// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt::Write as _;

use super::types::AssistantAction;
use crate::model::{StepKind, WorkflowDocument};
use crate::query::analyze;
use crate::store::{ChatMessage, ChatRole, ModificationLog};

const LISTED_STEPS: usize = 10;
const LISTED_BROKEN: usize = 3;
const LISTED_TERMINAL: usize = 3;
const RECENT_MESSAGES: usize = 4;
const RECENT_MODIFICATIONS: usize = 3;
const PREVIEW_CHARS: usize = 60;
const MAX_SUGGESTIONS: usize = 5;

const INSTRUCTIONS: &str = "\
You edit workflow documents made of steps. Step types: collect_information, decision_point, \
evaluate_condition, provide_instructions, execute_action.

Analyse the current flow before acting, ask when the request is ambiguous and explain what you \
changed. Always answer with one JSON object in a ```json fenced block:

{
  \"analysis\": { \"problems_found\": [], \"improvements\": [], \"affected_steps\": [] },
  \"actions\": [ { \"type\": \"add_step\", \"data\": { ... }, \"reasoning\": \"...\" } ],
  \"message\": \"what you did, for the user\",
  \"suggestions\": [\"next thing the user may want\"],
  \"requires_confirmation\": false
}

`message` is required. Each action must match this schema:
";

/// JSON Schema of [`AssistantAction`], pretty-printed.
pub fn action_schema() -> String {
    let schema = schemars::schema_for!(AssistantAction);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Fixed instructions plus the action schema.
pub fn system_prompt() -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str(&action_schema());
    prompt.push('\n');
    prompt
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_owned(),
    }
}

/// Describes the current document, its analysis and the recent conversation.
pub fn build_context(
    doc: &WorkflowDocument,
    history: &[ChatMessage],
    modifications: Option<&ModificationLog>,
) -> String {
    let mut out = String::new();

    out.push_str("## Current flow\n\n");
    let _ = writeln!(out, "- flow_id: {}", doc.flow_id());
    let _ = writeln!(out, "- name: {}", doc.name());
    let _ = writeln!(out, "- version: {}", doc.version());
    if let Some(description) = doc.description() {
        let _ = writeln!(out, "- description: {description}");
    }
    if let Some(root) = doc.root() {
        let _ = writeln!(out, "- initial step: {root}");
    }

    let total = doc.steps().len();
    let _ = writeln!(out, "\n### Steps ({total} total)");
    for (index, step) in doc.steps().values().take(LISTED_STEPS).enumerate() {
        let _ =
            write!(out, "{}. [{}] {} ({})", index + 1, step.kind(), step.name(), step.step_id());
        if let Some(next) = step.next_step() {
            let _ = write!(out, " -> {next}");
        }
        out.push('\n');
    }
    if total > LISTED_STEPS {
        let _ = writeln!(out, "... and {} more step(s)", total - LISTED_STEPS);
    }

    let analysis = analyze(doc);
    if analysis.is_clean() && analysis.suggestions.is_empty() {
        out.push_str("\n### Analysis\nNo problems detected.\n");
    } else {
        out.push_str("\n### Analysis\n");
        if !analysis.orphaned_steps.is_empty() {
            let ids = analysis.orphaned_steps.iter().map(|id| id.as_str()).collect::<Vec<_>>();
            let _ = writeln!(out, "- {} orphaned step(s): {}", ids.len(), ids.join(", "));
        }
        if !analysis.broken_connections.is_empty() {
            let _ = writeln!(
                out,
                "- {} broken connection(s):",
                analysis.broken_connections.len()
            );
            for broken in analysis.broken_connections.iter().take(LISTED_BROKEN) {
                let _ = write!(out, "  - {} -> {}: {}", broken.from, broken.to, broken.reason);
                if let Some(closest) = &broken.closest {
                    let _ = write!(out, " (did you mean {closest}?)");
                }
                out.push('\n');
            }
        }
        if !analysis.terminal_steps.is_empty() {
            let ids = analysis
                .terminal_steps
                .iter()
                .take(LISTED_TERMINAL)
                .map(|id| id.as_str())
                .collect::<Vec<_>>();
            let _ = writeln!(
                out,
                "- {} terminal step(s): {}",
                analysis.terminal_steps.len(),
                ids.join(", ")
            );
        }
        for suggestion in &analysis.suggestions {
            let _ = writeln!(out, "- {suggestion}");
        }
    }

    if !doc.constants().is_empty() {
        out.push_str("\n### Constants\n");
        for (key, value) in doc.constants() {
            let _ = writeln!(out, "- {key}: {value}");
        }
    }

    if let Some(log) = modifications.filter(|log| !log.is_empty()) {
        out.push_str("\n### Recent changes\n");
        for entry in log.recent(RECENT_MODIFICATIONS) {
            let ids = entry.affected_steps.iter().map(|id| id.as_str()).collect::<Vec<_>>();
            let _ = writeln!(out, "- {} ({})", entry.action, ids.join(", "));
        }
    }

    if history.len() > 2 {
        let recent = &history[history.len().saturating_sub(RECENT_MESSAGES)..];
        let _ = writeln!(out, "\n### Recent conversation (last {} messages)", recent.len());
        for message in recent {
            let who = match message.role {
                ChatRole::User => "User",
                ChatRole::Assistant => "You",
            };
            let _ = writeln!(out, "- {who}: {}", preview(&message.content));
        }
    }

    out
}

/// Up to five quick follow-ups that fit the document's current state.
pub fn smart_suggestions(doc: &WorkflowDocument) -> Vec<String> {
    let step_count = doc.steps().len();
    if step_count == 0 {
        return vec![
            "Create the first step".to_owned(),
            "Set the flow metadata".to_owned(),
            "Import a flow from a document".to_owned(),
        ];
    }

    let analysis = analyze(doc);
    let mut suggestions = Vec::new();
    if !analysis.orphaned_steps.is_empty() {
        suggestions.push("Fix orphaned steps");
    }
    if !analysis.broken_connections.is_empty() {
        suggestions.push("Repair broken connections");
    }
    if step_count < 5 {
        suggestions.push("Add more steps");
    }
    let has_decisions = doc.steps().values().any(|step| step.kind() == StepKind::DecisionPoint);
    if !has_decisions && step_count > 2 {
        suggestions.push("Add a decision point");
    }
    if analysis.terminal_steps.is_empty() {
        suggestions.push("Add a closing step");
    }
    suggestions.push("Analyse and optimise the flow");
    suggestions.push("Add a registration template");

    suggestions.into_iter().take(MAX_SUGGESTIONS).map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use super::{action_schema, build_context, preview, smart_suggestions, system_prompt};
    use crate::model::{fixtures, FlowId, WorkflowDocument};
    use crate::store::{ChatMessage, ModificationLog};

    #[test]
    fn context_lists_steps_and_problems() {
        let context = build_context(&fixtures::dangling_reference(), &[], None);
        assert!(context.contains("- flow_id: dangling"));
        assert!(context.contains("1. [provide_instructions] A (a) -> ghost"));
        assert!(context.contains("1 broken connection(s):"));
        assert!(context.contains("  - a -> ghost:"));
        assert!(!context.contains("Recent conversation"));
    }

    #[test]
    fn context_truncates_long_step_lists_and_messages() {
        let ids = (0..12).map(|i| format!("s{i}")).collect::<Vec<_>>();
        let refs = ids.iter().map(String::as_str).collect::<Vec<_>>();
        let doc = fixtures::linear_flow(&refs);
        let history = (0..5)
            .map(|i| ChatMessage::user(format!("{i}{}", "x".repeat(80))))
            .collect::<Vec<_>>();
        let mut log = ModificationLog::default();
        log.record("fix_orphans", Vec::new());

        let context = build_context(&doc, &history, Some(&log));
        assert!(context.contains("... and 2 more step(s)"));
        assert!(!context.contains("(s10)"));
        assert!(context.contains("Recent conversation (last 4 messages)"));
        assert!(!context.contains("- User: 0x"));
        assert!(context.contains("- fix_orphans ()"));
        assert!(context.contains("No problems detected.") || context.contains("terminal step(s)"));
    }

    #[test]
    fn preview_cuts_on_char_boundaries() {
        let text = "é".repeat(70);
        assert_eq!(preview(&text).chars().count(), 63);
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn schema_names_every_action_kind() {
        let schema = action_schema();
        for kind in ["add_step", "modify_connections", "fix_orphans", "analyze_flow"] {
            assert!(schema.contains(kind), "{kind} missing from schema");
        }
        assert!(!schema.contains("Unknown"));
        assert!(system_prompt().contains("`message` is required"));
    }

    #[test]
    fn suggestions_follow_document_state() {
        let empty = WorkflowDocument::new(FlowId::new("empty").expect("flow id"), "Empty");
        assert_eq!(smart_suggestions(&empty)[0], "Create the first step");

        let dangling = smart_suggestions(&fixtures::dangling_reference());
        assert_eq!(dangling[0], "Repair broken connections");
        assert!(dangling.len() <= 5);

        let support = smart_suggestions(&fixtures::support_flow());
        assert_eq!(support, vec!["Analyse and optimise the flow", "Add a registration template"]);
    }
}
