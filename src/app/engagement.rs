use serde::Serialize;
use time::OffsetDateTime;

use crate::app::videos::{comment_view, visible_video, CommentView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::comment::{Comment, CommentId, MAX_COMMENT_LEN};
use crate::domain::engagement::{apply_delta, transition, Reaction, ReactionRequest};
use crate::domain::tier::capabilities_for;
use crate::domain::user::UserId;
use crate::domain::video::VideoId;
use crate::infra::store::StoreHandle;

#[derive(Debug, Clone, Serialize)]
pub struct ReactionState {
    pub video_id: VideoId,
    pub reaction: Option<Reaction>,
    pub likes: u64,
    pub dislikes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinState {
    pub comment_id: CommentId,
    pub pinned: bool,
}

#[derive(Clone)]
pub struct EngagementService {
    store: StoreHandle,
}

impl EngagementService {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub fn reaction(&self, actor: UserId, video_id: VideoId) -> ServiceResult<ReactionState> {
        self.store.read(|store| {
            let video = visible_video(store, Some(actor), video_id)?;
            Ok(ReactionState {
                video_id,
                reaction: store.reaction(actor, video_id),
                likes: video.likes,
                dislikes: video.dislikes,
            })
        })
    }

    /// Apply a like or dislike. Both counters and the tracker move in one
    /// locked step.
    pub fn react(
        &self,
        actor: Option<UserId>,
        video_id: VideoId,
        request: ReactionRequest,
    ) -> ServiceResult<ReactionState> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;

        self.store.write(|store| {
            visible_video(store, Some(actor), video_id)?;
            if store.user(actor).is_none() {
                return Err(ServiceError::Unauthenticated);
            }

            let step = transition(store.reaction(actor, video_id), request);
            let (likes, dislikes) = {
                let video = store
                    .video_mut(video_id)
                    .ok_or(ServiceError::NotFound("video"))?;
                video.likes = apply_delta(video.likes, step.likes_delta);
                video.dislikes = apply_delta(video.dislikes, step.dislikes_delta);
                (video.likes, video.dislikes)
            };
            store.set_reaction(actor, video_id, step.next);

            if let Some(user) = store.user_mut(actor) {
                if step.next == Some(Reaction::Liked) {
                    user.liked_video_ids.insert(video_id);
                } else {
                    user.liked_video_ids.remove(&video_id);
                }
            }

            tracing::debug!(user_id = actor, video_id, reaction = ?step.next, "reaction updated");

            Ok(ReactionState {
                video_id,
                reaction: step.next,
                likes,
                dislikes,
            })
        })
    }

    pub fn comment(
        &self,
        actor: Option<UserId>,
        video_id: VideoId,
        text: &str,
    ) -> ServiceResult<CommentView> {
        let actor = actor.ok_or(ServiceError::Unauthenticated)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::validation("comment text is required"));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(ServiceError::validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_LEN
            )));
        }

        self.store.write(|store| {
            visible_video(store, Some(actor), video_id)?;
            if store.user(actor).is_none() {
                return Err(ServiceError::Unauthenticated);
            }

            let comment = Comment {
                id: store.next_id(),
                video_id,
                author_id: actor,
                text: text.to_string(),
                is_pinned: false,
                created_at: OffsetDateTime::now_utc(),
            };
            let view = comment_view(store, &comment);
            store
                .video_mut(video_id)
                .ok_or(ServiceError::NotFound("video"))?
                .comments
                .push(comment);
            Ok(view)
        })
    }

    /// Toggle the pin on a comment. Only an uploader whose tier allows it may
    /// pin on their own video; any other pinned comment is unpinned.
    pub fn toggle_pin(
        &self,
        actor: UserId,
        video_id: VideoId,
        comment_id: CommentId,
    ) -> ServiceResult<PinState> {
        self.store.write(|store| {
            let video = visible_video(store, Some(actor), video_id)?;
            let user = store.user(actor).ok_or(ServiceError::Unauthenticated)?;
            if video.uploader_id != actor || !capabilities_for(user.tier).can_pin_comments {
                return Err(ServiceError::Forbidden(
                    "only an SVip uploader can pin comments on their video",
                ));
            }

            let pinned = store
                .video_mut(video_id)
                .and_then(|video| video.toggle_pin(comment_id))
                .ok_or(ServiceError::NotFound("comment"))?;

            Ok(PinState { comment_id, pinned })
        })
    }
}
