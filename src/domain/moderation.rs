use serde::Serialize;

/// AI moderation result attached to an upload for admin review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModerationMark {
    pub flagged: bool,
    pub reason: Option<String>,
    pub classification: Option<String>,
}

impl ModerationMark {
    pub fn safe() -> Self {
        Self {
            flagged: false,
            reason: None,
            classification: Some("safe".to_string()),
        }
    }

    pub fn flagged(reason: Option<String>, classification: impl Into<String>) -> Self {
        Self {
            flagged: true,
            reason,
            classification: Some(classification.into()),
        }
    }
}
