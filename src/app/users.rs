use serde::Serialize;

use crate::app::videos::{video_view, VideoView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::tier::{capabilities_for, CommentStyleAllowance};
use crate::domain::user::{CommentStyle, PublicUser, User, UserId};
use crate::domain::video::VideoId;
use crate::infra::store::StoreHandle;

const MAX_DISPLAY_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: PublicUser,
    pub pinned_video_id: Option<VideoId>,
    pub uploads: Vec<VideoView>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub banner_url: Option<Option<String>>,
    pub comment_style: Option<Option<CommentStyle>>,
    pub track_history: Option<bool>,
}

#[derive(Clone)]
pub struct UserService {
    store: StoreHandle,
}

impl UserService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Public profile with the user's approved uploads, pinned one first.
    pub fn profile(&self, user_id: UserId) -> ServiceResult<ProfileView> {
        self.store.read(|store| {
            let user = store.user(user_id).ok_or(ServiceError::NotFound("user"))?;
            let mut uploads: Vec<VideoView> = store
                .approved()
                .iter()
                .filter(|video| video.uploader_id == user_id)
                .map(|video| video_view(store, video))
                .collect();
            if let Some(index) = uploads
                .iter()
                .position(|video| Some(video.id) == user.pinned_video_id)
            {
                let pinned = uploads.remove(index);
                uploads.insert(0, pinned);
            }
            Ok(ProfileView {
                user: PublicUser::from(user),
                pinned_video_id: user.pinned_video_id,
                uploads,
            })
        })
    }

    pub fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> ServiceResult<User> {
        if let Some(name) = &update.display_name {
            let length = name.trim().chars().count();
            if length == 0 || length > MAX_DISPLAY_NAME_LEN {
                return Err(ServiceError::validation(format!(
                    "display name must be between 1 and {} characters",
                    MAX_DISPLAY_NAME_LEN
                )));
            }
        }

        let user = self.store.write(|store| {
            let user = store.user_mut(user_id).ok_or(ServiceError::NotFound("user"))?;
            let capabilities = capabilities_for(user.tier);

            if matches!(update.banner_url, Some(Some(_))) && !capabilities.can_set_banner {
                return Err(ServiceError::Forbidden("profile banners require Vip or SVip"));
            }
            match (&update.comment_style, capabilities.comment_style) {
                (Some(Some(CommentStyle::Color { .. })), CommentStyleAllowance::None) => {
                    return Err(ServiceError::Forbidden("comment colors require Vip or SVip"));
                }
                (Some(Some(CommentStyle::Gradient { .. })), allowance)
                    if allowance != CommentStyleAllowance::Gradient =>
                {
                    return Err(ServiceError::Forbidden("comment gradients require SVip"));
                }
                _ => {}
            }

            if let Some(name) = update.display_name {
                user.display_name = name.trim().to_string();
            }
            if let Some(avatar_url) = update.avatar_url {
                user.avatar_url = avatar_url;
            }
            if let Some(banner_url) = update.banner_url {
                user.banner_url = banner_url;
            }
            if let Some(style) = update.comment_style {
                user.comment_style = style;
            }
            if let Some(track_history) = update.track_history {
                user.preferences.track_history = track_history;
            }
            Ok(user.clone())
        })?;

        tracing::info!(user_id, "profile updated");
        Ok(user)
    }

    /// Pin one of the user's own approved uploads to their profile, or unpin
    /// it if it already is. Returns the pinned video after the toggle.
    pub fn toggle_pinned_video(
        &self,
        user_id: UserId,
        video_id: VideoId,
    ) -> ServiceResult<Option<VideoId>> {
        self.store.write(|store| {
            let owns_video = store
                .approved()
                .iter()
                .any(|video| video.id == video_id && video.uploader_id == user_id);
            let user = store.user_mut(user_id).ok_or(ServiceError::NotFound("user"))?;
            if !capabilities_for(user.tier).can_pin_profile_video {
                return Err(ServiceError::Forbidden("pinning videos requires Vip or SVip"));
            }
            if !owns_video {
                return Err(ServiceError::NotFound("video"));
            }

            user.pinned_video_id = if user.pinned_video_id == Some(video_id) {
                None
            } else {
                Some(video_id)
            };
            Ok(user.pinned_video_id)
        })
    }

    /// Own history only, for tiers that keep one. Videos deleted or no longer
    /// public since they were watched are skipped.
    pub fn watch_history(&self, viewer: UserId, user_id: UserId) -> ServiceResult<Vec<VideoView>> {
        if viewer != user_id {
            return Err(ServiceError::Forbidden("watch history is private"));
        }

        self.store.read(|store| {
            let user = store.user(user_id).ok_or(ServiceError::NotFound("user"))?;
            if !capabilities_for(user.tier).can_track_history {
                return Err(ServiceError::Forbidden("watch history requires Vip or SVip"));
            }
            Ok(user
                .watch_history
                .iter()
                .filter_map(|id| store.approved().iter().find(|video| video.id == *id))
                .map(|video| video_view(store, video))
                .collect())
        })
    }
}
