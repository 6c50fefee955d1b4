//! Seam to the external generative-AI collaborator.
//!
//! Implementations return the collaborator's raw JSON. Nothing here is
//! trusted: `app::ai` validates every shape before it reaches the store.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::video::VideoId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryDetail {
    #[default]
    Short,
    Detailed,
}

/// Compact description of a searchable video handed to the collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct SearchCandidate {
    pub id: VideoId,
    pub title: String,
    pub keywords: Vec<String>,
    pub file_path: Option<String>,
}

#[async_trait]
pub trait AiCollaborator: Send + Sync {
    /// Expected: `{"isSafe": bool, "reason": string|null, "classification": string}`.
    async fn moderate(&self, title: &str) -> Result<Value>;

    /// Expected: `["keyword", ...]`.
    async fn keywords(&self, title: &str) -> Result<Value>;

    /// Expected: `[{"timestamp": int, "description": string}, ...]`.
    async fn scene_tags(&self, title: &str) -> Result<Value>;

    async fn summarize(&self, title: &str, detail: SummaryDetail) -> Result<String>;

    /// Expected: `[id, ...]` drawn from `candidates`.
    async fn search(&self, query: &str, candidates: &[SearchCandidate]) -> Result<Value>;
}

/// Collaborator used when no AI backend is configured. Moderation passes
/// everything and keyword generation yields nothing; the interactive features
/// fail so callers surface a notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAi;

#[async_trait]
impl AiCollaborator for DisabledAi {
    async fn moderate(&self, _title: &str) -> Result<Value> {
        Ok(json!({
            "isSafe": true,
            "reason": "AI disabled (no API key).",
            "classification": "safe",
        }))
    }

    async fn keywords(&self, _title: &str) -> Result<Value> {
        Ok(json!([]))
    }

    async fn scene_tags(&self, _title: &str) -> Result<Value> {
        Err(anyhow!("AI features are disabled"))
    }

    async fn summarize(&self, _title: &str, _detail: SummaryDetail) -> Result<String> {
        Err(anyhow!("AI features are disabled"))
    }

    async fn search(&self, _query: &str, _candidates: &[SearchCandidate]) -> Result<Value> {
        Err(anyhow!("AI features are disabled"))
    }
}
