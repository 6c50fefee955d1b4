use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::app::videos::visible_video;
use crate::app::{ServiceError, ServiceResult};
use crate::domain::media::ContentKind;
use crate::domain::moderation::ModerationMark;
use crate::domain::tier::{capabilities_for, Capabilities};
use crate::domain::user::UserId;
use crate::domain::video::{SceneTag, VideoId, VideoPatch};
use crate::infra::ai::{AiCollaborator, SearchCandidate, SummaryDetail};
use crate::infra::store::{Store, StoreHandle};

/// Value of an AI-backed action plus an optional user-facing notice when the
/// collaborator failed and the value fell back to its neutral form.
#[derive(Debug, Clone, Serialize)]
pub struct AiOutcome<T> {
    pub value: T,
    pub notice: Option<String>,
}

impl<T> AiOutcome<T> {
    fn ok(value: T) -> Self {
        Self {
            value,
            notice: None,
        }
    }

    fn degraded(value: T, notice: &str) -> Self {
        Self {
            value,
            notice: Some(notice.to_string()),
        }
    }
}

pub fn parse_moderation(value: &Value) -> Option<ModerationMark> {
    let is_safe = value.get("isSafe")?.as_bool()?;
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string);
    let classification = value
        .get("classification")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(ModerationMark {
        flagged: !is_safe,
        reason,
        classification,
    })
}

pub fn parse_keywords(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

pub fn parse_scene_tags(value: &Value) -> Vec<SceneTag> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let timestamp = item.get("timestamp")?.as_u64()?;
            let description = item.get("description")?.as_str()?;
            Some(SceneTag {
                timestamp: u32::try_from(timestamp).ok()?,
                description: description.to_string(),
            })
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

pub fn parse_search_ids(value: &Value) -> Vec<VideoId> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(Value::as_u64)
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

fn viewer_capabilities(store: &Store, viewer: UserId) -> ServiceResult<Capabilities> {
    store
        .user(viewer)
        .map(|user| capabilities_for(user.tier))
        .ok_or(ServiceError::Unauthenticated)
}

/// Validates collaborator responses and patches results into the store only
/// while their target still exists.
#[derive(Clone)]
pub struct AiService {
    store: StoreHandle,
    ai: Arc<dyn AiCollaborator>,
}

impl AiService {
    pub fn new(store: StoreHandle, ai: Arc<dyn AiCollaborator>) -> Self {
        Self { store, ai }
    }

    pub async fn moderate(&self, title: &str) -> ModerationMark {
        match self.ai.moderate(title).await {
            Ok(value) => parse_moderation(&value).unwrap_or_else(|| {
                tracing::warn!(title, "unparseable moderation response, treating as safe");
                ModerationMark::safe()
            }),
            Err(err) => {
                tracing::warn!(error = ?err, title, "moderation call failed");
                ModerationMark::flagged(
                    Some("AI moderation error, manual review required".to_string()),
                    "error",
                )
            }
        }
    }

    pub async fn keywords(&self, title: &str) -> Vec<String> {
        match self.ai.keywords(title).await {
            Ok(value) => parse_keywords(&value),
            Err(err) => {
                tracing::warn!(error = ?err, title, "keyword generation failed");
                Vec::new()
            }
        }
    }

    /// Generate keywords in the background and attach them if the video is
    /// still around when they arrive.
    pub fn spawn_keywords(&self, video_id: VideoId, title: String) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let keywords = service.keywords(&title).await;
            let patch = VideoPatch {
                keywords: Some(keywords),
                ..VideoPatch::default()
            };
            if !service.store.write(|store| store.update_video_fields(video_id, &patch)) {
                tracing::debug!(video_id, "video gone before keywords arrived, discarding");
            }
        })
    }

    pub async fn scene_tags(
        &self,
        viewer: UserId,
        video_id: VideoId,
    ) -> ServiceResult<AiOutcome<Vec<SceneTag>>> {
        let title = self.store.read(|store| {
            let video = visible_video(store, Some(viewer), video_id)?;
            if !viewer_capabilities(store, viewer)?.can_tag_scenes {
                return Err(ServiceError::Forbidden("scene tagging requires SVip"));
            }
            if video.kind() != ContentKind::Video {
                return Err(ServiceError::validation(
                    "scene tags are only available for videos",
                ));
            }
            Ok(video.title.clone())
        })?;

        let tags = match self.ai.scene_tags(&title).await {
            Ok(value) => parse_scene_tags(&value),
            Err(err) => {
                tracing::warn!(error = ?err, video_id, "scene tagging failed");
                return Ok(AiOutcome::degraded(
                    Vec::new(),
                    "Scene analysis is unavailable right now, please try again later.",
                ));
            }
        };

        let patch = VideoPatch {
            scene_tags: Some(tags.clone()),
            ..VideoPatch::default()
        };
        if !self
            .store
            .write(|store| store.update_video_fields(video_id, &patch))
        {
            tracing::debug!(video_id, "video gone before scene tags arrived, discarding");
            return Err(ServiceError::NotFound("video"));
        }

        Ok(AiOutcome::ok(tags))
    }

    pub async fn summarize(
        &self,
        viewer: UserId,
        video_id: VideoId,
        detail: SummaryDetail,
    ) -> ServiceResult<AiOutcome<Option<String>>> {
        let title = self.store.read(|store| {
            let video = visible_video(store, Some(viewer), video_id)?;
            let capabilities = viewer_capabilities(store, viewer)?;
            if !capabilities.can_summarize {
                return Err(ServiceError::Forbidden("summaries require Vip or SVip"));
            }
            if detail == SummaryDetail::Detailed && !capabilities.can_detailed_summary {
                return Err(ServiceError::Forbidden("detailed summaries require SVip"));
            }
            Ok(video.title.clone())
        })?;

        match self.ai.summarize(&title, detail).await {
            Ok(summary) => {
                let summary = summary.trim();
                if summary.is_empty() {
                    Ok(AiOutcome::ok(None))
                } else {
                    Ok(AiOutcome::ok(Some(summary.to_string())))
                }
            }
            Err(err) => {
                tracing::warn!(error = ?err, video_id, "summary generation failed");
                Ok(AiOutcome::degraded(
                    None,
                    "Could not generate a summary, please try again later.",
                ))
            }
        }
    }

    pub async fn search(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
    ) -> AiOutcome<Vec<VideoId>> {
        if candidates.is_empty() {
            return AiOutcome::ok(Vec::new());
        }
        match self.ai.search(query, candidates).await {
            Ok(value) => AiOutcome::ok(parse_search_ids(&value)),
            Err(err) => {
                tracing::warn!(error = ?err, "AI search failed");
                AiOutcome::degraded(
                    Vec::new(),
                    "AI search is unavailable right now, please try again later.",
                )
            }
        }
    }
}
