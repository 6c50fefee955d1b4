use tokio::task::JoinHandle;

use crate::app::ai::AiService;
use crate::app::videos::{video_view, VideoView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::tier::Tier;
use crate::domain::user::{User, UserId};
use crate::domain::video::{VideoId, VideoPatch, VideoStatus};
use crate::infra::store::{Store, StoreHandle};

/// Admin edit of an existing video. `password: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct VideoEdit {
    pub title: Option<String>,
    pub tier: Option<Tier>,
    pub password: Option<Option<String>>,
}

/// Gated tiers must carry a password.
pub fn validate_gate(tier: Tier, password: Option<&str>) -> ServiceResult<()> {
    let has_password = password.map(|p| !p.trim().is_empty()).unwrap_or(false);
    if tier.is_premium() && !has_password {
        return Err(ServiceError::validation(
            "a password is required for Vip and SVip content",
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ModerationService {
    store: StoreHandle,
    ai: AiService,
}

impl ModerationService {
    pub fn new(store: StoreHandle, ai: AiService) -> Self {
        Self { store, ai }
    }

    pub fn list_pending(&self) -> Vec<VideoView> {
        self.store.read(|store| {
            store
                .pending()
                .iter()
                .map(|video| video_view(store, video))
                .collect()
        })
    }

    pub fn list_approved(&self) -> Vec<VideoView> {
        self.store.read(|store| {
            store
                .approved()
                .iter()
                .map(|video| video_view(store, video))
                .collect()
        })
    }

    /// Move a pending video into the public collection. Keyword generation
    /// runs in the background; the returned handle resolves once it has been
    /// applied or discarded.
    pub fn approve(&self, id: VideoId) -> ServiceResult<(VideoView, JoinHandle<()>)> {
        let (view, title) = self.store.write(|store| {
            if store.locate(id) != Some(VideoStatus::Pending) {
                return Err(ServiceError::NotFound("pending video"));
            }
            let video = store
                .move_to_approved(id)
                .ok_or(ServiceError::NotFound("pending video"))?;
            let title = video.title.clone();
            let video = video.clone();
            Ok((video_view(store, &video), title))
        })?;

        tracing::info!(video_id = id, "video approved");
        let keywords = self.ai.spawn_keywords(id, title);
        Ok((view, keywords))
    }

    /// Drop a pending video and release its media. Never reaches the public
    /// collection.
    pub fn reject(&self, id: VideoId) -> ServiceResult<()> {
        self.store.write(|store| {
            if store.locate(id) != Some(VideoStatus::Pending) {
                return Err(ServiceError::NotFound("pending video"));
            }
            store.delete_video(id);
            Ok(())
        })?;

        tracing::info!(video_id = id, "video rejected");
        Ok(())
    }

    pub fn delete(&self, id: VideoId) -> ServiceResult<()> {
        let video = self
            .store
            .write(|store| store.delete_video(id))
            .ok_or(ServiceError::NotFound("video"))?;

        tracing::info!(video_id = id, status = ?video.status, "video deleted");
        Ok(())
    }

    pub fn edit(&self, id: VideoId, edit: VideoEdit) -> ServiceResult<VideoView> {
        let title = match &edit.title {
            Some(title) if title.trim().is_empty() => {
                return Err(ServiceError::validation("title is required"));
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };

        self.store.write(|store| {
            let video = store.video(id).ok_or(ServiceError::NotFound("video"))?;
            let tier = edit.tier.unwrap_or(video.tier);
            let password = match &edit.password {
                Some(password) => password.clone().filter(|p| !p.trim().is_empty()),
                None => video.password.clone(),
            };
            validate_gate(tier, password.as_deref())?;

            let patch = VideoPatch {
                title,
                tier: Some(tier),
                password: Some(password),
                ..VideoPatch::default()
            };
            store.update_video_fields(id, &patch);
            let video = store.video(id).ok_or(ServiceError::NotFound("video"))?;
            Ok(video_view(store, video))
        })
    }

    /// Every account except admins.
    pub fn list_users(&self) -> Vec<User> {
        self.store
            .read(|store| store.users().filter(|user| !user.is_admin()).cloned().collect())
    }

    /// Banning also ends every live session of the account.
    pub fn set_banned(&self, user_id: UserId, banned: bool) -> ServiceResult<User> {
        let (user, dropped) = self.store.write(|store| -> ServiceResult<(User, usize)> {
            let user = member_mut(store, user_id)?;
            user.is_banned = banned;
            let user = user.clone();
            let dropped = if banned {
                store.drop_sessions_for(user_id)
            } else {
                0
            };
            Ok((user, dropped))
        })?;

        tracing::info!(user_id, banned, sessions_dropped = dropped, "ban state changed");
        Ok(user)
    }

    pub fn set_verified(&self, user_id: UserId, verified: bool) -> ServiceResult<User> {
        self.store.write(|store| {
            let user = member_mut(store, user_id)?;
            user.is_verified = verified;
            Ok(user.clone())
        })
    }

    pub fn set_tier(&self, user_id: UserId, tier: Tier) -> ServiceResult<User> {
        let user = self.store.write(|store| -> ServiceResult<User> {
            let user = member_mut(store, user_id)?;
            user.tier = tier;
            Ok(user.clone())
        })?;

        tracing::info!(user_id, tier = ?tier, "tier changed");
        Ok(user)
    }

    pub fn announcement(&self) -> String {
        self.store.read(|store| store.announcement().to_string())
    }

    pub fn set_announcement(&self, announcement: &str) {
        let announcement = announcement.trim().to_string();
        self.store
            .write(|store| store.set_announcement(announcement));
    }
}

fn member_mut(store: &mut Store, user_id: UserId) -> ServiceResult<&mut User> {
    match store.user_mut(user_id) {
        Some(user) if !user.is_admin() => Ok(user),
        _ => Err(ServiceError::NotFound("user")),
    }
}
