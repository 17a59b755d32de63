use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s]+").expect("valid URL pattern"));

/// A timestamped free-text annotation on a goal.
///
/// Notes are listed newest first. Pinning is purely for emphasis and is
/// toggled independently of the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_pinned: bool,
}

impl Note {
    /// URLs embedded in the content, in order of appearance.
    ///
    /// Boards render these as clickable links.
    pub fn links(&self) -> Vec<&str> {
        URL.find_iter(&self.content).map(|m| m.as_str()).collect()
    }
}

/// Note as supplied inside a goal write.
///
/// `created_at` is kept when present so a full-replace update does not
/// re-stamp existing notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInput {
    pub id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&Note> for NoteInput {
    fn from(note: &Note) -> Self {
        Self {
            id: Some(note.id),
            content: note.content.clone(),
            is_pinned: note.is_pinned,
            created_at: Some(note.created_at),
        }
    }
}
