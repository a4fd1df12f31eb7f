//! Extract the latest assistant reply from a conversation transcript.
//!
//! Two layouts are accepted: a JSON array of entries, or JSON lines with one
//! entry per line. An entry names its author with `role`, `type`, or
//! `message.role`; `message.content` is either a string or a list of
//! `{type, text}` blocks.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::text::ellipsize;

/// Maximum characters kept from a reply before `...` is appended.
pub const SUMMARY_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    #[serde(default)]
    role: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Blocks(Vec<Block>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct Block {
    #[serde(default)]
    text: Option<String>,
}

impl TranscriptEntry {
    fn is_assistant(&self) -> bool {
        let message_role = self.message.as_ref().and_then(|m| m.role.as_deref());
        [self.role.as_deref(), self.kind.as_deref(), message_role]
            .into_iter()
            .flatten()
            .any(|r| r == "assistant")
    }

    fn text(&self) -> Option<&str> {
        let text = match self.message.as_ref()?.content.as_ref()? {
            Content::Text(text) => Some(text.as_str()),
            Content::Blocks(blocks) => blocks
                .iter()
                .find_map(|b| b.text.as_deref().filter(|t| !t.is_empty())),
            Content::Other(_) => None,
        };
        text.filter(|t| !t.is_empty())
    }
}

fn parse_entries(data: &str) -> Vec<TranscriptEntry> {
    if let Ok(entries) = serde_json::from_str::<Vec<TranscriptEntry>>(data) {
        return entries;
    }
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Summary of the last assistant reply in `data`, or `None` when there is none.
pub fn last_assistant_summary(data: &str) -> Option<String> {
    let entries = parse_entries(data);
    let text = entries
        .iter()
        .rev()
        .filter(|e| e.is_assistant())
        .find_map(TranscriptEntry::text)?;

    let summary = ellipsize(text, SUMMARY_CHARS);
    let summary = summary.trim();
    (!summary.is_empty()).then(|| summary.to_string())
}

/// Read a transcript file and summarize its last assistant reply.
///
/// Unreadable files yield `None`; the hook carries on without a new summary.
pub fn last_assistant_message(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(data) => last_assistant_summary(&data),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Transcript not readable");
            None
        }
    }
}
