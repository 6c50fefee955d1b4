use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::tier::Tier;
use crate::domain::video::VideoId;

pub type UserId = u64;

/// Most-recent-first watch history never grows past this many entries.
pub const WATCH_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentStyle {
    Color { color: String },
    Gradient { from: String, to: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub track_history: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            track_history: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_digest: String,
    pub display_name: String,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    pub role: Role,
    pub tier: Tier,
    pub is_banned: bool,
    pub is_verified: bool,
    pub liked_video_ids: BTreeSet<VideoId>,
    pub watch_history: Vec<VideoId>,
    pub pinned_video_id: Option<VideoId>,
    pub comment_style: Option<CommentStyle>,
    pub preferences: Preferences,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(id: UserId, username: String, password_digest: String) -> Self {
        Self {
            id,
            display_name: username.clone(),
            avatar_url: format!("https://api.dicebear.com/8.x/bottts-neutral/svg?seed={}", id),
            username,
            password_digest,
            banner_url: None,
            role: Role::Member,
            tier: Tier::Normal,
            is_banned: false,
            is_verified: false,
            liked_video_ids: BTreeSet::new(),
            watch_history: Vec::new(),
            pinned_video_id: None,
            comment_style: None,
            preferences: Preferences::default(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Move `video_id` to the front of the history, dropping older duplicates
    /// and anything past [`WATCH_HISTORY_LIMIT`].
    pub fn record_watch(&mut self, video_id: VideoId) {
        self.watch_history.retain(|id| *id != video_id);
        self.watch_history.insert(0, video_id);
        self.watch_history.truncate(WATCH_HISTORY_LIMIT);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    pub avatar_url: String,
    pub banner_url: Option<String>,
    pub tier: Tier,
    pub is_verified: bool,
    pub pinned_video_id: Option<VideoId>,
    pub comment_style: Option<CommentStyle>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            banner_url: user.banner_url.clone(),
            tier: user.tier,
            is_verified: user.is_verified,
            pinned_video_id: user.pinned_video_id,
            comment_style: user.comment_style.clone(),
            created_at: user.created_at,
        }
    }
}
