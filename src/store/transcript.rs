// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nereid-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stepgraph and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use super::fs::{write_atomic, WriteDurability};
use crate::config::EditorConfig;
use crate::model::{MessageId, StepId};

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("transcript io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode transcript: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageAnalysis {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub problems_found: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub improvements: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub affected_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(rename = "createdSteps", default, skip_serializing_if = "Vec::is_empty")]
    pub created_steps: Vec<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MessageAnalysis>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            suggestions: Vec::new(),
            created_steps: Vec::new(),
            analysis: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_created_steps(mut self, created_steps: Vec<StepId>) -> Self {
        self.created_steps = created_steps;
        self
    }

    pub fn with_analysis(mut self, analysis: Option<MessageAnalysis>) -> Self {
        self.analysis = analysis;
        self
    }
}

fn new_message_id() -> MessageId {
    let mut buf = Uuid::encode_buffer();
    MessageId::from_generated(Uuid::new_v4().hyphenated().encode_lower(&mut buf))
}

/// Raw key-value slot the transcript is persisted into.
pub trait TranscriptStorage {
    fn load(&self) -> Result<Option<String>, TranscriptError>;
    fn save(&mut self, contents: &str) -> Result<(), TranscriptError>;
    fn clear(&mut self) -> Result<(), TranscriptError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    path: PathBuf,
    durability: WriteDurability,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), durability: WriteDurability::BestEffort }
    }

    pub fn with_durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> TranscriptError {
        TranscriptError::Io { path: self.path.clone(), source }
    }
}

impl TranscriptStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, TranscriptError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(self.io_error(err)),
        }
    }

    fn save(&mut self, contents: &str) -> Result<(), TranscriptError> {
        write_atomic(&self.path, contents.as_bytes(), self.durability)
            .map_err(|err| self.io_error(err))
    }

    fn clear(&mut self) -> Result<(), TranscriptError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.io_error(err)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    contents: Option<String>,
}

impl MemoryStorage {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self { contents: Some(contents.into()) }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl TranscriptStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, TranscriptError> {
        Ok(self.contents.clone())
    }

    fn save(&mut self, contents: &str) -> Result<(), TranscriptError> {
        self.contents = Some(contents.to_owned());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), TranscriptError> {
        self.contents = None;
        Ok(())
    }
}

/// Chat transcript. Every message is kept in memory; only the newest `cap` are persisted.
///
/// Storage failures are logged and never surface to callers.
pub struct Transcript {
    storage: Box<dyn TranscriptStorage>,
    messages: Vec<ChatMessage>,
    cap: usize,
}

impl fmt::Debug for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("messages", &self.messages.len())
            .field("cap", &self.cap)
            .finish_non_exhaustive()
    }
}

impl Transcript {
    /// Opens a transcript backed by `storage`. Unreadable or corrupt contents start it empty.
    pub fn open(storage: impl TranscriptStorage + 'static, cap: usize) -> Self {
        let messages = match storage.load() {
            Ok(Some(contents)) => match serde_json::from_str::<Vec<ChatMessage>>(&contents) {
                Ok(messages) => messages,
                Err(err) => {
                    warn!(error = %err, "discarding corrupt transcript");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to load transcript");
                Vec::new()
            }
        };
        debug!(messages = messages.len(), "transcript opened");
        Self { storage: Box::new(storage), messages, cap: cap.max(1) }
    }

    pub fn in_memory(cap: usize) -> Self {
        Self::open(MemoryStorage::default(), cap)
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        match &config.transcript_path {
            Some(path) => {
                let durability = if config.durable_writes {
                    WriteDurability::Durable
                } else {
                    WriteDurability::BestEffort
                };
                let storage = FileStorage::new(path).with_durability(durability);
                Self::open(storage, config.transcript_cap)
            }
            None => Self::in_memory(config.transcript_cap),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The `count` most recent messages, oldest first.
    pub fn recent(&self, count: usize) -> &[ChatMessage] {
        &self.messages[self.messages.len().saturating_sub(count)..]
    }

    pub fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        self.persist();
        &self.messages[self.messages.len() - 1]
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        if let Err(err) = self.storage.clear() {
            warn!(error = %err, "failed to clear transcript storage");
        }
    }

    fn persist(&mut self) {
        let persisted = self.recent(self.cap);
        let contents = match serde_json::to_string(persisted) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(error = %err, "failed to encode transcript");
                return;
            }
        };
        if let Err(err) = self.storage.save(&contents) {
            warn!(error = %err, "failed to persist transcript");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{ChatMessage, ChatRole, FileStorage, MemoryStorage, MessageAnalysis, Transcript};
    use crate::config::EditorConfig;
    use crate::model::StepId;
    use crate::store::WriteDurability;

    #[test]
    fn persists_only_the_newest_messages() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("chat.json");

        let mut transcript = Transcript::open(FileStorage::new(&path), 2);
        for text in ["one", "two", "three"] {
            transcript.push(ChatMessage::user(text));
        }
        assert_eq!(transcript.len(), 3);

        let reopened = Transcript::open(FileStorage::new(&path), 2);
        let contents = reopened.messages().iter().map(|m| m.content.as_str()).collect::<Vec<_>>();
        assert_eq!(contents, vec!["two", "three"]);
    }

    #[test]
    fn durable_file_storage_persists_like_best_effort() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("nested").join("chat.json");
        let storage = FileStorage::new(&path).with_durability(WriteDurability::Durable);
        assert_eq!(storage.path(), path.as_path());

        let mut transcript = Transcript::open(storage, 50);
        transcript.push(ChatMessage::user("keep me"));

        let reopened = Transcript::open(FileStorage::new(&path), 50);
        assert_eq!(reopened.messages()[0].content, "keep me");
    }

    #[test]
    fn durable_config_opens_a_file_transcript() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("chat.json");
        let config = EditorConfig {
            transcript_path: Some(path.clone()),
            durable_writes: true,
            ..EditorConfig::default()
        };

        Transcript::from_config(&config).push(ChatMessage::assistant("synced"));
        assert!(path.exists());
        assert_eq!(Transcript::from_config(&config).messages()[0].content, "synced");
    }

    #[test]
    fn corrupt_storage_starts_empty() {
        let transcript = Transcript::open(MemoryStorage::with_contents("{not json"), 50);
        assert!(transcript.is_empty());
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("chat.json");
        let mut transcript = Transcript::open(FileStorage::new(&path), 50);
        transcript.push(ChatMessage::assistant("hello"));
        assert!(path.exists());

        transcript.clear();
        assert!(transcript.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn message_json_uses_stored_field_names() {
        let message = ChatMessage::assistant("done")
            .with_created_steps(vec![StepId::new("greet").expect("step id")])
            .with_analysis(Some(MessageAnalysis {
                problems_found: vec!["orphan".to_owned()],
                ..MessageAnalysis::default()
            }));
        let json = serde_json::to_value(&message).expect("json");

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["createdSteps"], serde_json::json!(["greet"]));
        assert_eq!(json["analysis"], serde_json::json!({ "problems_found": ["orphan"] }));
        assert!(json.get("suggestions").is_none());
        assert_eq!(json["id"].as_str().map(str::len), Some(36));

        let back: ChatMessage = serde_json::from_value(json).expect("decode");
        assert_eq!(back, message);
        assert_eq!(back.role, ChatRole::Assistant);
    }
}
