use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::app::ai::AiService;
use crate::app::moderation::validate_gate;
use crate::app::videos::{video_view, VideoView};
use crate::app::{ServiceError, ServiceResult};
use crate::domain::media::{ContentKind, FileSlot, StagedFile, UploadDraft};
use crate::domain::moderation::ModerationMark;
use crate::domain::tier::Tier;
use crate::domain::user::UserId;
use crate::domain::video::{MediaRefs, Video, VideoStatus};
use crate::infra::store::{Store, StoreHandle};

const MAX_TITLE_LEN: usize = 200;

/// Fields of a draft that can be edited before submission. Tier and password
/// are admin-only.
#[derive(Debug, Clone, Default)]
pub struct DraftFields {
    pub title: Option<String>,
    pub external_url: Option<String>,
    pub tier: Option<Tier>,
    pub password: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedUpload {
    pub video: VideoView,
    pub notice: Option<String>,
}

#[derive(Clone)]
pub struct UploadService {
    store: StoreHandle,
    ai: AiService,
    max_bytes: usize,
}

impl UploadService {
    pub fn new(store: StoreHandle, ai: AiService, max_bytes: usize) -> Self {
        Self {
            store,
            ai,
            max_bytes,
        }
    }

    pub fn create_draft(&self, owner: UserId, kind: ContentKind) -> UploadDraft {
        let draft = UploadDraft::new(owner, kind);
        self.store.write(|store| store.insert_draft(draft.clone()));
        draft
    }

    pub fn get_draft(&self, owner: UserId, draft_id: Uuid) -> ServiceResult<UploadDraft> {
        self.store.read(|store| match store.draft(draft_id) {
            Some(draft) if draft.owner_id == owner => Ok(draft.clone()),
            _ => Err(ServiceError::NotFound("upload")),
        })
    }

    /// Stage a file into a draft slot. A file already in the slot is
    /// superseded and its handle released.
    pub fn select_file(
        &self,
        owner: UserId,
        draft_id: Uuid,
        slot: FileSlot,
        bytes: Bytes,
        content_type: &str,
        file_name: &str,
    ) -> ServiceResult<StagedFile> {
        if bytes.is_empty() {
            return Err(ServiceError::validation("file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(ServiceError::validation(format!(
                "file must be at most {} bytes",
                self.max_bytes
            )));
        }
        let file_name = sanitize_file_name(file_name);

        self.store.write(|store| {
            let kind = owned_draft_mut(store, owner, draft_id)?.kind;
            check_content_type(kind, slot, content_type)?;

            let size = bytes.len();
            let handle = store
                .blobs_mut()
                .create(bytes, content_type.to_string(), file_name.clone());
            let staged = StagedFile {
                handle,
                file_name,
                content_type: content_type.to_string(),
                bytes: size,
            };

            let superseded = store
                .draft_mut(draft_id)
                .and_then(|draft| draft.slot_mut(slot).replace(staged.clone()));
            if let Some(previous) = superseded {
                store.blobs_mut().release(&previous.handle);
            }
            Ok(staged)
        })
    }

    pub fn clear_file(&self, owner: UserId, draft_id: Uuid, slot: FileSlot) -> ServiceResult<bool> {
        self.store.write(|store| {
            let cleared = owned_draft_mut(store, owner, draft_id)?.slot_mut(slot).take();
            Ok(cleared
                .map(|file| store.blobs_mut().release(&file.handle))
                .unwrap_or(false))
        })
    }

    pub fn update_draft(
        &self,
        owner: UserId,
        draft_id: Uuid,
        fields: DraftFields,
    ) -> ServiceResult<UploadDraft> {
        self.store.write(|store| {
            let is_admin = store.user(owner).map(|u| u.is_admin()).unwrap_or(false);
            if !is_admin && (fields.tier.is_some() || fields.password.is_some()) {
                return Err(ServiceError::Forbidden(
                    "only admins can set tier or password",
                ));
            }
            let draft = owned_draft_mut(store, owner, draft_id)?;
            if let Some(title) = fields.title {
                draft.title = title;
            }
            if let Some(external_url) = fields.external_url {
                draft.external_url = Some(external_url).filter(|url| !url.trim().is_empty());
            }
            if let Some(tier) = fields.tier {
                draft.tier = tier;
            }
            if let Some(password) = fields.password {
                draft.password = password.filter(|p| !p.trim().is_empty());
            }
            Ok(draft.clone())
        })
    }

    /// Close the form without submitting. Every staged handle is released.
    /// Allowed while a submission is in flight; that submission then fails.
    pub fn discard(&self, owner: UserId, draft_id: Uuid) -> ServiceResult<usize> {
        self.store.write(|store| {
            match store.draft(draft_id) {
                Some(draft) if draft.owner_id == owner => {}
                _ => return Err(ServiceError::NotFound("upload")),
            }
            let draft = store
                .take_draft(draft_id)
                .ok_or(ServiceError::NotFound("upload"))?;
            let released = draft
                .handles()
                .iter()
                .filter(|handle| store.blobs_mut().release(handle))
                .count();
            Ok(released)
        })
    }

    /// Turn a draft into a video. Admin uploads are published immediately
    /// with keywords; member uploads wait in the pending queue. Moderation
    /// runs first and only marks the record.
    ///
    /// The draft stays in the store, marked as submitting, until the record
    /// is inserted. If the request is dropped while moderation runs, the mark
    /// is cleared and the draft can be submitted again or discarded.
    pub async fn submit(&self, owner: UserId, draft_id: Uuid) -> ServiceResult<SubmittedUpload> {
        let (title, is_admin) = self.store.write(|store| -> ServiceResult<(String, bool)> {
            let is_admin = store
                .user(owner)
                .map(|user| user.is_admin())
                .ok_or(ServiceError::Unauthenticated)?;
            let draft = owned_draft_mut(store, owner, draft_id)?;
            validate_draft(draft, is_admin)?;
            draft.submitting = true;
            Ok((draft.title.trim().to_string(), is_admin))
        })?;
        let _in_flight = SubmitGuard {
            store: self.store.clone(),
            draft_id,
        };

        let moderation = self.ai.moderate(&title).await;
        let keywords = if is_admin {
            self.ai.keywords(&title).await
        } else {
            Vec::new()
        };

        let notice = moderation.flagged.then(|| {
            format!(
                "Flagged by AI moderation for review: {}",
                moderation.reason.as_deref().unwrap_or("no reason given")
            )
        });

        // discarded while moderation ran: its handles are already released
        let view = self.store.write(|store| -> ServiceResult<VideoView> {
            let draft = store
                .take_draft(draft_id)
                .ok_or(ServiceError::NotFound("upload"))?;
            let id = store.next_id();
            let video = build_video(id, owner, draft, title, is_admin, keywords, moderation, store);
            let view = video_view(store, &video);
            store.upsert_video(video);
            Ok(view)
        })?;

        tracing::info!(
            video_id = view.id,
            uploader_id = owner,
            status = ?view.status,
            flagged = view.moderation.flagged,
            "upload submitted"
        );

        Ok(SubmittedUpload {
            video: view,
            notice,
        })
    }
}

/// Clears the submitting mark on drop. Once the draft has become a video it
/// is gone from the store and this does nothing.
struct SubmitGuard {
    store: StoreHandle,
    draft_id: Uuid,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        let draft_id = self.draft_id;
        let reset = self.store.write(|store| match store.draft_mut(draft_id) {
            Some(draft) if draft.submitting => {
                draft.submitting = false;
                true
            }
            _ => false,
        });
        if reset {
            tracing::debug!(%draft_id, "submission abandoned, draft kept");
        }
    }
}

/// The caller's draft, refused while a submission of it is in flight.
fn owned_draft_mut(
    store: &mut Store,
    owner: UserId,
    draft_id: Uuid,
) -> ServiceResult<&mut UploadDraft> {
    match store.draft_mut(draft_id) {
        Some(draft) if draft.owner_id == owner => {
            if draft.submitting {
                return Err(ServiceError::Conflict(
                    "upload is already being submitted".to_string(),
                ));
            }
            Ok(draft)
        }
        _ => Err(ServiceError::NotFound("upload")),
    }
}

fn validate_draft(draft: &UploadDraft, is_admin: bool) -> ServiceResult<()> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }

    match draft.kind {
        ContentKind::Video | ContentKind::Image => {
            if draft.primary.is_none() {
                return Err(ServiceError::validation("a media file is required"));
            }
        }
        ContentKind::Link => {
            let external_url = draft
                .external_url
                .as_deref()
                .ok_or_else(|| ServiceError::validation("an external URL is required"))?;
            let parsed = Url::parse(external_url.trim())
                .map_err(|_| ServiceError::validation("external URL is invalid"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ServiceError::validation("external URL must be http or https"));
            }
            if draft.thumbnail.is_none() {
                return Err(ServiceError::validation("a thumbnail is required for links"));
            }
        }
    }

    if is_admin {
        validate_gate(draft.tier, draft.password.as_deref())?;
    }
    Ok(())
}

fn check_content_type(kind: ContentKind, slot: FileSlot, content_type: &str) -> ServiceResult<()> {
    let expected = match (kind, slot) {
        (ContentKind::Video, FileSlot::Primary) => "video/",
        (ContentKind::Image, FileSlot::Primary) => "image/",
        (ContentKind::Link, FileSlot::Primary) => {
            return Err(ServiceError::validation("links take no media file"));
        }
        (_, FileSlot::Thumbnail) => "image/",
    };
    if !content_type.starts_with(expected) {
        return Err(ServiceError::validation(format!(
            "expected a file of type {}*",
            expected
        )));
    }
    Ok(())
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

/// Hand the draft's handles over to the new record. An image is its own
/// thumbnail, so a separately staged thumbnail is released.
#[allow(clippy::too_many_arguments)]
fn build_video(
    id: u64,
    owner: UserId,
    draft: UploadDraft,
    title: String,
    is_admin: bool,
    keywords: Vec<String>,
    moderation: ModerationMark,
    store: &mut Store,
) -> Video {
    let uploaded_at = OffsetDateTime::now_utc();
    let file_path = |file: &StagedFile| {
        format!("/uploads/{}-{}", uploaded_at.unix_timestamp(), file.file_name)
    };

    let (media, thumbnail_url) = match (draft.kind, draft.primary, draft.thumbnail) {
        (ContentKind::Image, Some(image), thumbnail) => {
            if let Some(extra) = thumbnail {
                store.blobs_mut().release(&extra.handle);
            }
            (
                MediaRefs::Image {
                    image_url: image.handle.clone(),
                    file_path: file_path(&image),
                },
                Some(image.handle),
            )
        }
        (ContentKind::Video, Some(video), thumbnail) => (
            MediaRefs::Video {
                video_url: video.handle.clone(),
                file_path: file_path(&video),
            },
            thumbnail.map(|file| file.handle),
        ),
        (_, primary, thumbnail) => {
            if let Some(stray) = primary {
                store.blobs_mut().release(&stray.handle);
            }
            (
                MediaRefs::Link {
                    external_url: draft
                        .external_url
                        .map(|url| url.trim().to_string())
                        .unwrap_or_default(),
                },
                thumbnail.map(|file| file.handle),
            )
        }
    };

    let (status, tier, password) = if is_admin {
        (VideoStatus::Approved, draft.tier, draft.password)
    } else {
        (VideoStatus::Pending, Tier::Normal, None)
    };

    Video {
        id,
        title,
        status,
        media,
        thumbnail_url,
        tier,
        password,
        likes: 0,
        dislikes: 0,
        views: 0,
        views_by_date: BTreeMap::new(),
        comments: Vec::new(),
        uploader_id: owner,
        uploaded_at,
        keywords,
        scene_tags: Vec::new(),
        moderation,
    }
}
