use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::domain::tier::Tier;
use crate::domain::user::UserId;

/// Prefix of every transient media handle created by the blob registry.
pub const BLOB_SCHEME: &str = "blob:";

pub fn is_blob_handle(value: &str) -> bool {
    value.starts_with(BLOB_SCHEME)
}

/// Where a granted playback fetches its media.
pub const PLAYBACK_PATH: &str = "/v1/playback/";

pub const PLAYBACK_TICKET_TTL: Duration = Duration::minutes(15);

/// Short-lived capability handed out with a playback grant. Resolves to the
/// media handle without any further gate check until it expires.
#[derive(Debug, Clone)]
pub struct PlaybackTicket {
    pub handle: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Image,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileSlot {
    Primary,
    Thumbnail,
}

#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    pub handle: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: usize,
}

/// An open upload form. Owns the handles of every file currently selected
/// into it until it is submitted or discarded.
#[derive(Debug, Clone, Serialize)]
pub struct UploadDraft {
    pub id: Uuid,
    pub owner_id: UserId,
    pub kind: ContentKind,
    pub title: String,
    pub external_url: Option<String>,
    pub tier: Tier,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub primary: Option<StagedFile>,
    pub thumbnail: Option<StagedFile>,
    /// Set while a submission is waiting on moderation. The draft keeps its
    /// handles until the video record takes them over.
    pub submitting: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UploadDraft {
    pub fn new(owner_id: UserId, kind: ContentKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            kind,
            title: String::new(),
            external_url: None,
            tier: Tier::Normal,
            password: None,
            primary: None,
            thumbnail: None,
            submitting: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn slot_mut(&mut self, slot: FileSlot) -> &mut Option<StagedFile> {
        match slot {
            FileSlot::Primary => &mut self.primary,
            FileSlot::Thumbnail => &mut self.thumbnail,
        }
    }

    pub fn owns(&self, handle: &str) -> bool {
        self.primary
            .iter()
            .chain(self.thumbnail.iter())
            .any(|file| file.handle == handle)
    }

    pub fn handles(&self) -> Vec<String> {
        self.primary
            .iter()
            .chain(self.thumbnail.iter())
            .map(|file| file.handle.clone())
            .collect()
    }
}
