use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::user::UserId;
use crate::domain::video::VideoId;

pub type CommentId = u64;

pub const MAX_COMMENT_LEN: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub video_id: VideoId,
    pub author_id: UserId,
    pub text: String,
    pub is_pinned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
