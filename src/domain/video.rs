use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::comment::{Comment, CommentId};
use crate::domain::media::{is_blob_handle, ContentKind};
use crate::domain::moderation::ModerationMark;
use crate::domain::tier::Tier;
use crate::domain::user::UserId;

pub type VideoId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Approved,
    Pending,
}

/// Exactly one set of media references per content kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaRefs {
    Video {
        #[serde(skip_serializing_if = "String::is_empty")]
        video_url: String,
        file_path: String,
    },
    Image {
        #[serde(skip_serializing_if = "String::is_empty")]
        image_url: String,
        file_path: String,
    },
    Link {
        external_url: String,
    },
}

impl MediaRefs {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Video { .. } => ContentKind::Video,
            Self::Image { .. } => ContentKind::Image,
            Self::Link { .. } => ContentKind::Link,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Video { video_url, .. } => video_url,
            Self::Image { image_url, .. } => image_url,
            Self::Link { external_url } => external_url,
        }
    }

    /// Copy without the primary file's handle. Links are returned unchanged.
    pub fn without_handle(&self) -> Self {
        match self {
            Self::Video { file_path, .. } => Self::Video {
                video_url: String::new(),
                file_path: file_path.clone(),
            },
            Self::Image { file_path, .. } => Self::Image {
                image_url: String::new(),
                file_path: file_path.clone(),
            },
            Self::Link { .. } => self.clone(),
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::Video { file_path, .. } | Self::Image { file_path, .. } => Some(file_path),
            Self::Link { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneTag {
    pub timestamp: u32,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Video {
    pub id: VideoId,
    pub title: String,
    pub status: VideoStatus,
    pub media: MediaRefs,
    pub thumbnail_url: Option<String>,
    pub tier: Tier,
    pub password: Option<String>,
    pub likes: u64,
    pub dislikes: u64,
    pub views: u64,
    pub views_by_date: BTreeMap<String, u64>,
    pub comments: Vec<Comment>,
    pub uploader_id: UserId,
    pub uploaded_at: OffsetDateTime,
    pub keywords: Vec<String>,
    pub scene_tags: Vec<SceneTag>,
    pub moderation: ModerationMark,
}

impl Video {
    pub fn kind(&self) -> ContentKind {
        self.media.kind()
    }

    /// Distinct blob handles this record owns. An image upload shares one
    /// handle between image and thumbnail; it is listed once.
    pub fn owned_blobs(&self) -> Vec<String> {
        let mut handles: Vec<String> = Vec::new();
        let candidates = [Some(self.media.url()), self.thumbnail_url.as_deref()];
        for candidate in candidates.into_iter().flatten() {
            if is_blob_handle(candidate) && !handles.iter().any(|h| h == candidate) {
                handles.push(candidate.to_string());
            }
        }
        handles
    }

    pub fn record_view(&mut self, day: &str) {
        self.views = self.views.saturating_add(1);
        *self.views_by_date.entry(day.to_string()).or_insert(0) += 1;
    }

    pub fn pinned_comment(&self) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.is_pinned)
    }

    /// Toggle the pin on `comment_id` and clear it on every other comment.
    /// Returns the new pin state of the target, or `None` if it is unknown.
    pub fn toggle_pin(&mut self, comment_id: CommentId) -> Option<bool> {
        let target_pinned = self
            .comments
            .iter()
            .find(|comment| comment.id == comment_id)
            .map(|comment| comment.is_pinned)?;

        for comment in &mut self.comments {
            comment.is_pinned = comment.id == comment_id && !target_pinned;
        }
        Some(!target_pinned)
    }

    pub fn apply(&mut self, patch: &VideoPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(tier) = patch.tier {
            self.tier = tier;
        }
        if let Some(password) = &patch.password {
            self.password = password.clone();
        }
        if let Some(keywords) = &patch.keywords {
            self.keywords = keywords.clone();
        }
        if let Some(scene_tags) = &patch.scene_tags {
            self.scene_tags = scene_tags.clone();
        }
    }
}

/// Partial update merged into a video wherever it currently lives.
#[derive(Debug, Clone, Default)]
pub struct VideoPatch {
    pub title: Option<String>,
    pub tier: Option<Tier>,
    pub password: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    pub scene_tags: Option<Vec<SceneTag>>,
}
