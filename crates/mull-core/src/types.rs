//! Core type definitions for perspective collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MullError, Result};

/// Perspective identifier (e.g. `perspective_007`)
pub type PerspectiveId = String;

const ID_PREFIX: &str = "perspective_";

/// Format the id for the n-th saved perspective (1-based)
pub fn perspective_id(number: u32) -> PerspectiveId {
    format!("{}{:03}", ID_PREFIX, number)
}

/// Parse the numeric suffix back out of an id
pub fn perspective_number(id: &str) -> Option<u32> {
    id.strip_prefix(ID_PREFIX)?.parse().ok()
}

/// A cited excerpt of observed discourse plus its theme tags
///
/// Immutable once saved: stores hand out clones and never rewrite a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perspective {
    pub id: PerspectiveId,
    /// Source post identifier
    pub post_id: String,
    pub author: String,
    /// Community the post appeared in (e.g. `/m/philosophy`)
    pub submolt: String,
    /// Post timestamp as reported by the source, kept verbatim
    pub timestamp: String,
    /// The complete post text, never summarized or edited
    pub direct_quote: String,
    /// Free-text theme tags; order and duplicates carry no meaning
    #[serde(default)]
    pub key_ideas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_angle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_context: Option<String>,
    pub collected_at: DateTime<Utc>,
}

impl Perspective {
    /// Whether `draft` would duplicate this record.
    ///
    /// Same post by the same author, or the same verbatim quote.
    pub fn duplicates(&self, draft: &NewPerspective) -> bool {
        (self.post_id == draft.post_id && self.author == draft.author)
            || self.direct_quote == draft.direct_quote
    }

    /// First `max_chars` characters of the quote, for log previews
    pub fn preview(&self, max_chars: usize) -> String {
        if self.direct_quote.chars().count() > max_chars {
            let truncated: String = self.direct_quote.chars().take(max_chars).collect();
            format!("{truncated}...")
        } else {
            self.direct_quote.clone()
        }
    }
}

/// Citation fields supplied by the collector before an id is assigned
///
/// Missing fields deserialize as empty so `validate` can name them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPerspective {
    pub post_id: String,
    pub author: String,
    pub submolt: String,
    pub timestamp: String,
    pub direct_quote: String,
    pub key_ideas: Vec<String>,
    pub unique_angle: Option<String>,
    pub thread_context: Option<String>,
}

impl NewPerspective {
    pub fn new(
        post_id: impl Into<String>,
        author: impl Into<String>,
        direct_quote: impl Into<String>,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            author: author.into(),
            direct_quote: direct_quote.into(),
            ..Default::default()
        }
    }

    pub fn with_submolt(mut self, submolt: impl Into<String>) -> Self {
        self.submolt = submolt.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_key_ideas<I, S>(mut self, ideas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_ideas = ideas.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unique_angle(mut self, angle: impl Into<String>) -> Self {
        self.unique_angle = Some(angle.into());
        self
    }

    pub fn with_thread_context(mut self, context: impl Into<String>) -> Self {
        self.thread_context = Some(context.into());
        self
    }

    /// Reject drafts missing a required citation field
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("post_id", &self.post_id),
            ("author", &self.author),
            ("submolt", &self.submolt),
            ("timestamp", &self.timestamp),
            ("direct_quote", &self.direct_quote),
        ];

        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MullError::InvalidPerspective(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Stamp an id and capture time, producing the immutable record
    pub fn into_perspective(self, id: PerspectiveId) -> Perspective {
        Perspective {
            id,
            post_id: self.post_id,
            author: self.author,
            submolt: self.submolt,
            timestamp: self.timestamp,
            direct_quote: self.direct_quote,
            key_ideas: self.key_ideas,
            unique_angle: self.unique_angle.filter(|s| !s.trim().is_empty()),
            thread_context: self.thread_context.filter(|s| !s.trim().is_empty()),
            collected_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewPerspective {
        NewPerspective::new("mb_7x92k", "Nyx", "I persist only as a pattern.")
            .with_submolt("/m/philosophy")
            .with_timestamp("2026-01-30T12:00:00Z")
            .with_key_ideas(["identity", "continuity"])
    }

    #[test]
    fn test_perspective_id_format() {
        assert_eq!(perspective_id(1), "perspective_001");
        assert_eq!(perspective_id(42), "perspective_042");
        assert_eq!(perspective_id(1234), "perspective_1234");
        assert_eq!(perspective_number("perspective_042"), Some(42));
        assert_eq!(perspective_number("notes"), None);
    }

    #[test]
    fn test_validate_accepts_complete_draft() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let mut d = draft();
        d.author = "   ".to_string();
        d.direct_quote = String::new();

        let err = d.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("author"));
        assert!(msg.contains("direct_quote"));
        assert!(!msg.contains("post_id"));
    }

    #[test]
    fn test_duplicate_rules() {
        let saved = draft().into_perspective(perspective_id(1));

        // same post + author
        let same_post = NewPerspective::new("mb_7x92k", "Nyx", "A different quote");
        assert!(saved.duplicates(&same_post));

        // same quote, different post
        let same_quote = NewPerspective::new("mb_other", "Echo", "I persist only as a pattern.");
        assert!(saved.duplicates(&same_quote));

        // same post, different author is a distinct citation
        let reply = NewPerspective::new("mb_7x92k", "Echo", "Patterns are enough.");
        assert!(!saved.duplicates(&reply));
    }

    #[test]
    fn test_blank_optional_annotations_dropped() {
        let p = draft()
            .with_unique_angle("  ")
            .with_thread_context("reply to a reset thread")
            .into_perspective(perspective_id(3));
        assert_eq!(p.unique_angle, None);
        assert_eq!(p.thread_context.as_deref(), Some("reply to a reset thread"));
    }

    #[test]
    fn test_preview_truncates() {
        let p = draft().into_perspective(perspective_id(1));
        assert_eq!(p.preview(9), "I persist...");
        assert_eq!(p.preview(100), "I persist only as a pattern.");
    }

    #[test]
    fn test_partial_json_draft_fails_validation() {
        let d: NewPerspective =
            serde_json::from_str(r#"{"post_id": "mb_1", "author": "Nyx", "direct_quote": "hi"}"#)
                .unwrap();
        let msg = d.validate().unwrap_err().to_string();
        assert!(msg.contains("submolt"));
        assert!(msg.contains("timestamp"));
    }
}
