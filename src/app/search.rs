use serde::Deserialize;

use crate::app::ai::{AiOutcome, AiService};
use crate::app::videos::{video_view, VideoView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::media::ContentKind;
use crate::domain::video::Video;
use crate::infra::ai::SearchCandidate;
use crate::infra::store::{Store, StoreHandle};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFilter {
    #[serde(rename = "type")]
    pub kind: Option<ContentKind>,
    #[serde(rename = "q")]
    pub query: Option<String>,
}

#[derive(Clone)]
pub struct SearchService {
    store: StoreHandle,
    ai: AiService,
}

impl SearchService {
    pub fn new(store: StoreHandle, ai: AiService) -> Self {
        Self { store, ai }
    }

    /// Public listing, newest first.
    pub fn list(&self, filter: &VideoFilter) -> Vec<VideoView> {
        let query = filter
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.store.read(|store| {
            store
                .approved()
                .iter()
                .filter(|video| filter.kind.map_or(true, |kind| video.kind() == kind))
                .filter(|video| {
                    query
                        .as_deref()
                        .map_or(true, |query| matches_query(store, video, query))
                })
                .map(|video| video_view(store, video))
                .collect()
        })
    }

    /// Ask the collaborator to rank approved videos for `query`. Ids it
    /// returns that do not name an approved video are dropped.
    pub async fn ai_search(&self, query: &str) -> ServiceResult<AiOutcome<Vec<VideoView>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ServiceError::validation("search query is required"));
        }

        let candidates: Vec<SearchCandidate> = self.store.read(|store| {
            store
                .approved()
                .iter()
                .map(|video| SearchCandidate {
                    id: video.id,
                    title: video.title.clone(),
                    keywords: video.keywords.clone(),
                    file_path: video.media.file_path().map(str::to_string),
                })
                .collect()
        });

        let ranked = self.ai.search(query, &candidates).await;
        let videos: Vec<VideoView> = self.store.read(|store| {
            ranked
                .value
                .iter()
                .filter_map(|id| store.approved().iter().find(|video| video.id == *id))
                .map(|video| video_view(store, video))
                .collect()
        });

        tracing::debug!(query, results = videos.len(), "AI search");
        Ok(AiOutcome {
            value: videos,
            notice: ranked.notice,
        })
    }
}

fn matches_query(store: &Store, video: &Video, query: &str) -> bool {
    if video.title.to_lowercase().contains(query) {
        return true;
    }
    store
        .user(video.uploader_id)
        .map(|user| user.display_name.to_lowercase().contains(query))
        .unwrap_or(false)
}
