use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::app::access::{requires_password, viewer_tier};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::comment::{Comment, CommentId};
use crate::domain::media::ContentKind;
use crate::domain::moderation::ModerationMark;
use crate::domain::tier::{capabilities_for, Tier};
use crate::domain::user::{PublicUser, UserId};
use crate::domain::video::{MediaRefs, SceneTag, Video, VideoId, VideoStatus};
use crate::infra::blobs::Blob;
use crate::infra::store::{Store, StoreHandle};

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: CommentId,
    pub text: String,
    pub is_pinned: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub author: Option<PublicUser>,
}

/// A video as presented to clients, with uploader and comment authors
/// resolved from the current user records. Password-protected media is
/// listed without its handle; playback goes through a grant.
#[derive(Debug, Clone, Serialize)]
pub struct VideoView {
    pub id: VideoId,
    pub title: String,
    pub status: VideoStatus,
    pub media: MediaRefs,
    pub thumbnail_url: Option<String>,
    pub tier: Tier,
    pub has_password: bool,
    pub likes: u64,
    pub dislikes: u64,
    pub views: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub uploader: Option<PublicUser>,
    pub keywords: Vec<String>,
    pub scene_tags: Vec<SceneTag>,
    pub moderation: ModerationMark,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyViews {
    pub date: String,
    pub views: u64,
}

pub fn comment_view(store: &Store, comment: &Comment) -> CommentView {
    CommentView {
        id: comment.id,
        text: comment.text.clone(),
        is_pinned: comment.is_pinned,
        created_at: comment.created_at,
        author: store.user(comment.author_id).map(PublicUser::from),
    }
}

pub fn video_view(store: &Store, video: &Video) -> VideoView {
    // pinned comment first, the rest in posting order
    let comments = video
        .comments
        .iter()
        .filter(|comment| comment.is_pinned)
        .chain(video.comments.iter().filter(|comment| !comment.is_pinned))
        .map(|comment| comment_view(store, comment))
        .collect();

    let locked = video.password.is_some() && video.kind() != ContentKind::Link;
    let (media, thumbnail_url) = if locked {
        // an image is its own thumbnail
        let thumbnail = video
            .thumbnail_url
            .clone()
            .filter(|thumbnail| thumbnail != video.media.url());
        (video.media.without_handle(), thumbnail)
    } else {
        (video.media.clone(), video.thumbnail_url.clone())
    };

    VideoView {
        id: video.id,
        title: video.title.clone(),
        status: video.status,
        media,
        thumbnail_url,
        tier: video.tier,
        has_password: video.password.is_some(),
        likes: video.likes,
        dislikes: video.dislikes,
        views: video.views,
        uploaded_at: video.uploaded_at,
        uploader: store.user(video.uploader_id).map(PublicUser::from),
        keywords: video.keywords.clone(),
        scene_tags: video.scene_tags.clone(),
        moderation: video.moderation.clone(),
        comments,
    }
}

/// `YYYY-MM-DD` key of the view histogram for `at`.
pub fn day_key(at: OffsetDateTime) -> String {
    at.date().to_string()
}

pub fn is_admin(store: &Store, viewer: Option<UserId>) -> bool {
    viewer
        .and_then(|id| store.user(id))
        .map(|user| user.is_admin())
        .unwrap_or(false)
}

/// Approved videos are public; pending ones exist only for admins.
pub fn visible_video(store: &Store, viewer: Option<UserId>, id: VideoId) -> ServiceResult<&Video> {
    let video = store.video(id).ok_or(ServiceError::NotFound("video"))?;
    match video.status {
        VideoStatus::Approved => Ok(video),
        VideoStatus::Pending if is_admin(store, viewer) => Ok(video),
        VideoStatus::Pending => Err(ServiceError::NotFound("video")),
    }
}

/// Count a view and, for members whose tier tracks history and who have not
/// opted out, push the video onto their watch history.
pub(crate) fn apply_view(store: &mut Store, viewer: Option<UserId>, id: VideoId) -> Option<u64> {
    let day = day_key(OffsetDateTime::now_utc());
    let views = {
        let video = store.video_mut(id)?;
        video.record_view(&day);
        video.views
    };

    if let Some(user) = viewer.and_then(|user_id| store.user_mut(user_id)) {
        if capabilities_for(user.tier).can_track_history && user.preferences.track_history {
            user.record_watch(id);
        }
    }

    Some(views)
}

#[derive(Clone)]
pub struct VideoService {
    store: StoreHandle,
}

impl VideoService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn get(&self, viewer: Option<UserId>, id: VideoId) -> ServiceResult<VideoView> {
        self.store.read(|store| {
            let video = visible_video(store, viewer, id)?;
            Ok(video_view(store, video))
        })
    }

    /// View events need no session.
    pub fn record_view(&self, viewer: Option<UserId>, id: VideoId) -> ServiceResult<u64> {
        self.store.write(|store| {
            visible_video(store, viewer, id)?;
            apply_view(store, viewer, id).ok_or(ServiceError::NotFound("video"))
        })
    }

    /// Views per day over the last week, oldest first. Only the uploader and
    /// admins can read it.
    pub fn analytics(&self, viewer: UserId, id: VideoId) -> ServiceResult<Vec<DailyViews>> {
        self.store.read(|store| {
            let video = visible_video(store, Some(viewer), id)?;
            if video.uploader_id != viewer && !is_admin(store, Some(viewer)) {
                return Err(ServiceError::Forbidden(
                    "only the uploader can view analytics",
                ));
            }

            let today = OffsetDateTime::now_utc();
            Ok((0..7)
                .rev()
                .map(|days_ago| {
                    let date = day_key(today - Duration::days(days_ago));
                    let views = video.views_by_date.get(&date).copied().unwrap_or(0);
                    DailyViews { date, views }
                })
                .collect())
        })
    }

    /// Serve a handle by what holds it. Draft files are visible to their
    /// owner only. A video's thumbnail follows the video's visibility; its
    /// primary media additionally needs the viewer to pass the password gate
    /// without a password, otherwise it is reachable only through a playback
    /// ticket.
    pub fn media(&self, viewer: Option<UserId>, handle: &str) -> ServiceResult<Blob> {
        self.store.read(|store| {
            if let Some(draft) = store.draft_owning(handle) {
                if Some(draft.owner_id) != viewer {
                    return Err(ServiceError::NotFound("media"));
                }
            } else {
                let id = store
                    .video_owning(handle)
                    .map(|video| video.id)
                    .ok_or(ServiceError::NotFound("media"))?;
                let video = visible_video(store, viewer, id)
                    .map_err(|_| ServiceError::NotFound("media"))?;
                if video.media.url() == handle
                    && requires_password(video, viewer_tier(store, viewer))
                {
                    return Err(ServiceError::Forbidden("this video requires a password"));
                }
            }
            store
                .blobs()
                .get(handle)
                .cloned()
                .ok_or(ServiceError::NotFound("media"))
        })
    }

    pub fn playback(&self, ticket: &str) -> ServiceResult<Blob> {
        let now = OffsetDateTime::now_utc();
        self.store.read(|store| {
            let handle = store
                .ticket_handle(ticket, now)
                .ok_or(ServiceError::NotFound("media"))?;
            store
                .blobs()
                .get(handle)
                .cloned()
                .ok_or(ServiceError::NotFound("media"))
        })
    }

    pub fn download(&self, viewer: UserId, id: VideoId) -> ServiceResult<Blob> {
        self.store.read(|store| {
            let video = visible_video(store, Some(viewer), id)?;
            let user = store.user(viewer).ok_or(ServiceError::Unauthenticated)?;
            if !capabilities_for(user.tier).can_download {
                return Err(ServiceError::Forbidden(
                    "downloads require a Vip or SVip membership",
                ));
            }
            if video.media.file_path().is_none() {
                return Err(ServiceError::validation("links cannot be downloaded"));
            }
            if requires_password(video, Some(user.tier)) {
                return Err(ServiceError::Forbidden("this video requires a password"));
            }
            store
                .blobs()
                .get(video.media.url())
                .cloned()
                .ok_or(ServiceError::NotFound("media"))
        })
    }
}
