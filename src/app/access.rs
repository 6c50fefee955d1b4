use serde::Serialize;
use time::OffsetDateTime;

use crate::app::auth::generate_token;
use crate::app::videos::{apply_view, video_view, visible_video, VideoView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::media::{ContentKind, PLAYBACK_PATH};
use crate::domain::tier::{
    can_skip_password, capabilities_for, guest_capabilities, Capabilities, PlaybackQuality, Tier,
};
use crate::domain::user::UserId;
use crate::domain::video::{Video, VideoId};
use crate::infra::store::{Store, StoreHandle};

pub(crate) fn viewer_tier(store: &Store, viewer: Option<UserId>) -> Option<Tier> {
    viewer.and_then(|id| store.user(id)).map(|user| user.tier)
}

/// Whether playing `video` asks this viewer for its password. Links never
/// do; otherwise a password applies unless the viewer's tier bypasses it.
pub(crate) fn requires_password(video: &Video, viewer_tier: Option<Tier>) -> bool {
    video.kind() != ContentKind::Link
        && video.password.is_some()
        && !can_skip_password(viewer_tier, video.tier)
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackGrant {
    pub video: VideoView,
    pub media_url: String,
    pub external: bool,
    pub capabilities: Capabilities,
    pub max_quality: PlaybackQuality,
    pub show_ads: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlayDecision {
    Granted(PlaybackGrant),
    PasswordRequired { video_id: VideoId, title: String },
}

#[derive(Clone)]
pub struct AccessService {
    store: StoreHandle,
}

impl AccessService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Start playback of a video.
    ///
    /// Links always open directly. Otherwise, a password-protected video whose
    /// tier the viewer does not reach asks for the password; a correct one
    /// grants this request only and nothing is remembered. A wrong one
    /// changes nothing. Every grant counts a view and carries a fresh
    /// playback ticket for the media.
    pub fn play(
        &self,
        viewer: Option<UserId>,
        video_id: VideoId,
        password: Option<&str>,
    ) -> ServiceResult<PlayDecision> {
        self.store.write(|store| {
            let video = visible_video(store, viewer, video_id)?;
            let tier = viewer_tier(store, viewer);
            let capabilities = tier.map(capabilities_for).unwrap_or_else(guest_capabilities);

            if requires_password(video, tier) {
                match password {
                    None => {
                        return Ok(PlayDecision::PasswordRequired {
                            video_id,
                            title: video.title.clone(),
                        });
                    }
                    Some(given) if Some(given) == video.password.as_deref() => {}
                    Some(_) => {
                        tracing::debug!(video_id, "wrong video password");
                        return Err(ServiceError::WrongPassword);
                    }
                }
            }

            let external = video.kind() == ContentKind::Link;
            let handle = video.media.url().to_string();
            let media_url = if external {
                handle
            } else {
                let ticket = generate_token();
                store.issue_ticket(ticket.clone(), handle, OffsetDateTime::now_utc());
                format!("{}{}", PLAYBACK_PATH, ticket)
            };

            apply_view(store, viewer, video_id).ok_or(ServiceError::NotFound("video"))?;
            let video = store.video(video_id).ok_or(ServiceError::NotFound("video"))?;

            Ok(PlayDecision::Granted(PlaybackGrant {
                video: video_view(store, video),
                media_url,
                external,
                max_quality: capabilities.max_quality(),
                show_ads: !capabilities.ad_free,
                capabilities,
            }))
        })
    }
}
