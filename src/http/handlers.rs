use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::app::access::{AccessService, PlayDecision};
use crate::app::ai::AiService;
use crate::app::auth::{AuthService, SignedIn};
use crate::app::engagement::{EngagementService, PinState, ReactionState};
use crate::app::moderation::{ModerationService, VideoEdit};
use crate::app::search::{SearchService, VideoFilter};
use crate::app::uploads::{DraftFields, SubmittedUpload, UploadService};
use crate::app::users::{ProfileUpdate, ProfileView, UserService};
use crate::app::videos::{CommentView, DailyViews, VideoService, VideoView};
use crate::domain::comment::CommentId;
use crate::domain::engagement::ReactionRequest;
use crate::domain::media::{ContentKind, FileSlot, StagedFile, UploadDraft};
use crate::domain::tier::{capabilities_for, Capabilities, Tier};
use crate::domain::user::{CommentStyle, User, UserId};
use crate::domain::video::{SceneTag, VideoId};
use crate::infra::ai::SummaryDetail;
use crate::infra::blobs::Blob;
use crate::http::{AdminUser, AppError, AuthUser};
use crate::AppState;

const FILE_NAME_HEADER: &str = "x-file-name";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn ai_service(state: &AppState) -> AiService {
    AiService::new(state.store.clone(), state.ai.clone())
}

fn viewer_id(auth: &Option<AuthUser>) -> Option<UserId> {
    auth.as_ref().map(|auth| auth.user_id)
}

fn blob_response(blob: Blob, disposition: Option<String>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok(value) = blob.content_type.parse() {
        headers.insert(header::CONTENT_TYPE, value);
    }
    if let Some(value) = disposition.and_then(|d| d.parse().ok()) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    (headers, blob.bytes)
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

impl From<SignedIn> for SessionResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.token,
            user: signed_in.user,
        }
    }
}

#[derive(Serialize)]
pub struct CurrentUserResponse {
    pub user: User,
    pub capabilities: Capabilities,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let service = AuthService::new(state.store.clone());
    let signed_in = service.register(&payload.username, &payload.password)?;
    Ok((StatusCode::CREATED, Json(signed_in.into())))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let service = AuthService::new(state.store.clone());
    let signed_in = service.login(&payload.username, &payload.password)?;
    Ok(Json(signed_in.into()))
}

pub async fn logout(auth: AuthUser, State(state): State<AppState>) -> StatusCode {
    let service = AuthService::new(state.store.clone());
    service.logout(&auth.token);
    StatusCode::NO_CONTENT
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let service = AuthService::new(state.store.clone());
    let user = service
        .current_user(auth.user_id)
        .ok_or_else(|| AppError::not_found("user not found"))?;
    Ok(Json(CurrentUserResponse {
        capabilities: capabilities_for(user.tier),
        user,
    }))
}

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ViewCountResponse {
    pub video_id: VideoId,
    pub views: u64,
}

#[derive(Deserialize, Default)]
pub struct PlayRequest {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct ReactionBody {
    pub reaction: ReactionRequest,
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub text: String,
}

#[derive(Deserialize, Default)]
pub struct SummaryRequest {
    #[serde(default)]
    pub detail: SummaryDetail,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: Option<String>,
    pub notice: Option<String>,
}

#[derive(Serialize)]
pub struct SceneTagsResponse {
    pub scene_tags: Vec<SceneTag>,
    pub notice: Option<String>,
}

#[derive(Serialize)]
pub struct AnnouncementResponse {
    pub announcement: String,
}

pub async fn list_videos(
    State(state): State<AppState>,
    Query(filter): Query<VideoFilter>,
) -> Json<ListResponse<VideoView>> {
    let service = SearchService::new(state.store.clone(), ai_service(&state));
    Json(ListResponse {
        items: service.list(&filter),
    })
}

pub async fn get_video(
    auth: Option<AuthUser>,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<VideoView>, AppError> {
    let service = VideoService::new(state.store.clone());
    Ok(Json(service.get(viewer_id(&auth), id)?))
}

pub async fn record_view(
    auth: Option<AuthUser>,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<ViewCountResponse>, AppError> {
    let service = VideoService::new(state.store.clone());
    let views = service.record_view(viewer_id(&auth), id)?;
    Ok(Json(ViewCountResponse {
        video_id: id,
        views,
    }))
}

pub async fn play_video(
    auth: Option<AuthUser>,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
    payload: Option<Json<PlayRequest>>,
) -> Result<Json<PlayDecision>, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    let service = AccessService::new(state.store.clone());
    let decision = service.play(viewer_id(&auth), id, payload.password.as_deref())?;
    Ok(Json(decision))
}

pub async fn get_reaction(
    auth: AuthUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<ReactionState>, AppError> {
    let service = EngagementService::new(state.store.clone());
    Ok(Json(service.reaction(auth.user_id, id)?))
}

pub async fn react_to_video(
    auth: Option<AuthUser>,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
    Json(payload): Json<ReactionBody>,
) -> Result<Json<ReactionState>, AppError> {
    let service = EngagementService::new(state.store.clone());
    Ok(Json(service.react(viewer_id(&auth), id, payload.reaction)?))
}

pub async fn comment_video(
    auth: Option<AuthUser>,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
    Json(payload): Json<CommentBody>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    let service = EngagementService::new(state.store.clone());
    let comment = service.comment(viewer_id(&auth), id, &payload.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn toggle_comment_pin(
    auth: AuthUser,
    Path((id, comment_id)): Path<(VideoId, CommentId)>,
    State(state): State<AppState>,
) -> Result<Json<PinState>, AppError> {
    let service = EngagementService::new(state.store.clone());
    Ok(Json(service.toggle_pin(auth.user_id, id, comment_id)?))
}

pub async fn video_analytics(
    auth: AuthUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<DailyViews>>, AppError> {
    let service = VideoService::new(state.store.clone());
    Ok(Json(ListResponse {
        items: service.analytics(auth.user_id, id)?,
    }))
}

pub async fn download_video(
    auth: AuthUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let service = VideoService::new(state.store.clone());
    let blob = service.download(auth.user_id, id)?;
    let file_name = blob.file_name.replace('"', "_");
    tracing::info!(video_id = id, user_id = auth.user_id, "video downloaded");
    Ok(blob_response(
        blob,
        Some(format!("attachment; filename=\"{}\"", file_name)),
    ))
}

pub async fn summarize_video(
    auth: AuthUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
    payload: Option<Json<SummaryRequest>>,
) -> Result<Json<SummaryResponse>, AppError> {
    let Json(payload) = payload.unwrap_or_default();
    let outcome = ai_service(&state)
        .summarize(auth.user_id, id, payload.detail)
        .await?;
    Ok(Json(SummaryResponse {
        summary: outcome.value,
        notice: outcome.notice,
    }))
}

pub async fn generate_scene_tags(
    auth: AuthUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<SceneTagsResponse>, AppError> {
    let outcome = ai_service(&state).scene_tags(auth.user_id, id).await?;
    Ok(Json(SceneTagsResponse {
        scene_tags: outcome.value,
        notice: outcome.notice,
    }))
}

pub async fn get_announcement(State(state): State<AppState>) -> Json<AnnouncementResponse> {
    let service = ModerationService::new(state.store.clone(), ai_service(&state));
    Json(AnnouncementResponse {
        announcement: service.announcement(),
    })
}

pub async fn get_media(
    auth: Option<AuthUser>,
    Path(handle): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let service = VideoService::new(state.store.clone());
    let blob = service.media(viewer_id(&auth), &handle)?;
    Ok(blob_response(blob, None))
}

pub async fn get_playback(
    Path(ticket): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let service = VideoService::new(state.store.clone());
    let blob = service.playback(&ticket)?;
    Ok(blob_response(blob, None))
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateUploadRequest {
    pub kind: ContentKind,
}

#[derive(Deserialize)]
pub struct UpdateUploadRequest {
    pub title: Option<String>,
    pub external_url: Option<String>,
    pub tier: Option<Tier>,
    #[serde(default, deserialize_with = "double_option")]
    pub password: Option<Option<String>>,
}

#[derive(Serialize)]
pub struct ClearedFileResponse {
    pub released: bool,
}

#[derive(Serialize)]
pub struct DiscardedUploadResponse {
    pub released: usize,
}

fn upload_service(state: &AppState) -> UploadService {
    UploadService::new(state.store.clone(), ai_service(state), state.upload_max_bytes)
}

pub async fn create_upload(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUploadRequest>,
) -> (StatusCode, Json<UploadDraft>) {
    let draft = upload_service(&state).create_draft(auth.user_id, payload.kind);
    (StatusCode::CREATED, Json(draft))
}

pub async fn get_upload(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<UploadDraft>, AppError> {
    Ok(Json(upload_service(&state).get_draft(auth.user_id, id)?))
}

pub async fn update_upload(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateUploadRequest>,
) -> Result<Json<UploadDraft>, AppError> {
    let fields = DraftFields {
        title: payload.title,
        external_url: payload.external_url,
        tier: payload.tier,
        password: payload.password,
    };
    Ok(Json(upload_service(&state).update_draft(auth.user_id, id, fields)?))
}

pub async fn select_upload_file(
    auth: AuthUser,
    Path((id, slot)): Path<(Uuid, FileSlot)>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<StagedFile>), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Content-Type header is required"))?;
    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("upload");

    let staged = upload_service(&state).select_file(
        auth.user_id,
        id,
        slot,
        body,
        content_type,
        file_name,
    )?;
    Ok((StatusCode::CREATED, Json(staged)))
}

pub async fn clear_upload_file(
    auth: AuthUser,
    Path((id, slot)): Path<(Uuid, FileSlot)>,
    State(state): State<AppState>,
) -> Result<Json<ClearedFileResponse>, AppError> {
    let released = upload_service(&state).clear_file(auth.user_id, id, slot)?;
    Ok(Json(ClearedFileResponse { released }))
}

pub async fn discard_upload(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<DiscardedUploadResponse>, AppError> {
    let released = upload_service(&state).discard(auth.user_id, id)?;
    Ok(Json(DiscardedUploadResponse { released }))
}

pub async fn submit_upload(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SubmittedUpload>), AppError> {
    let submitted = upload_service(&state).submit(auth.user_id, id).await?;
    Ok((StatusCode::CREATED, Json(submitted)))
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct EditVideoRequest {
    pub title: Option<String>,
    pub tier: Option<Tier>,
    #[serde(default, deserialize_with = "double_option")]
    pub password: Option<Option<String>>,
}

#[derive(Deserialize)]
pub struct BanRequest {
    pub banned: bool,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub verified: bool,
}

#[derive(Deserialize)]
pub struct TierRequest {
    pub tier: Tier,
}

#[derive(Deserialize)]
pub struct AnnouncementRequest {
    pub announcement: String,
}

fn moderation_service(state: &AppState) -> ModerationService {
    ModerationService::new(state.store.clone(), ai_service(state))
}

pub async fn list_pending_videos(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<ListResponse<VideoView>> {
    Json(ListResponse {
        items: moderation_service(&state).list_pending(),
    })
}

pub async fn list_approved_videos(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<ListResponse<VideoView>> {
    Json(ListResponse {
        items: moderation_service(&state).list_approved(),
    })
}

pub async fn approve_video(
    _admin: AdminUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<VideoView>, AppError> {
    // keyword generation keeps running after the response
    let (video, _keywords) = moderation_service(&state).approve(id)?;
    Ok(Json(video))
}

pub async fn reject_video(
    _admin: AdminUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    moderation_service(&state).reject(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_video(
    _admin: AdminUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    moderation_service(&state).delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn edit_video(
    _admin: AdminUser,
    Path(id): Path<VideoId>,
    State(state): State<AppState>,
    Json(payload): Json<EditVideoRequest>,
) -> Result<Json<VideoView>, AppError> {
    let edit = VideoEdit {
        title: payload.title,
        tier: payload.tier,
        password: payload.password,
    };
    Ok(Json(moderation_service(&state).edit(id, edit)?))
}

pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Json<ListResponse<User>> {
    Json(ListResponse {
        items: moderation_service(&state).list_users(),
    })
}

pub async fn set_user_banned(
    admin: AdminUser,
    Path(id): Path<UserId>,
    State(state): State<AppState>,
    Json(payload): Json<BanRequest>,
) -> Result<Json<User>, AppError> {
    let user = moderation_service(&state).set_banned(id, payload.banned)?;
    tracing::info!(admin_id = admin.user_id, user_id = id, "admin changed ban state");
    Ok(Json(user))
}

pub async fn set_user_verified(
    _admin: AdminUser,
    Path(id): Path<UserId>,
    State(state): State<AppState>,
    Json(payload): Json<VerifyRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(moderation_service(&state).set_verified(id, payload.verified)?))
}

pub async fn set_user_tier(
    _admin: AdminUser,
    Path(id): Path<UserId>,
    State(state): State<AppState>,
    Json(payload): Json<TierRequest>,
) -> Result<Json<User>, AppError> {
    Ok(Json(moderation_service(&state).set_tier(id, payload.tier)?))
}

pub async fn set_announcement(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<AnnouncementRequest>,
) -> Json<AnnouncementResponse> {
    let service = moderation_service(&state);
    service.set_announcement(&payload.announcement);
    Json(AnnouncementResponse {
        announcement: service.announcement(),
    })
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub banner_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub comment_style: Option<Option<CommentStyle>>,
    pub track_history: Option<bool>,
}

#[derive(Serialize)]
pub struct PinnedVideoResponse {
    pub pinned_video_id: Option<VideoId>,
}

pub async fn get_profile(
    Path(id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<Json<ProfileView>, AppError> {
    let service = UserService::new(state.store.clone());
    Ok(Json(service.profile(id)?))
}

pub async fn update_profile(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let update = ProfileUpdate {
        display_name: payload.display_name,
        avatar_url: payload.avatar_url,
        banner_url: payload.banner_url,
        comment_style: payload.comment_style,
        track_history: payload.track_history,
    };
    let service = UserService::new(state.store.clone());
    Ok(Json(service.update_profile(auth.user_id, update)?))
}

pub async fn toggle_pinned_video(
    auth: AuthUser,
    Path(video_id): Path<VideoId>,
    State(state): State<AppState>,
) -> Result<Json<PinnedVideoResponse>, AppError> {
    let service = UserService::new(state.store.clone());
    let pinned_video_id = service.toggle_pinned_video(auth.user_id, video_id)?;
    Ok(Json(PinnedVideoResponse { pinned_video_id }))
}

pub async fn watch_history(
    auth: AuthUser,
    Path(id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<Json<ListResponse<VideoView>>, AppError> {
    let service = UserService::new(state.store.clone());
    Ok(Json(ListResponse {
        items: service.watch_history(auth.user_id, id)?,
    }))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AiSearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
pub struct AiSearchResponse {
    pub items: Vec<VideoView>,
    pub notice: Option<String>,
}

pub async fn ai_search(
    State(state): State<AppState>,
    Query(query): Query<AiSearchQuery>,
) -> Result<Json<AiSearchResponse>, AppError> {
    let service = SearchService::new(state.store.clone(), ai_service(&state));
    let outcome = service.ai_search(&query.q).await?;
    Ok(Json(AiSearchResponse {
        items: outcome.value,
        notice: outcome.notice,
    }))
}
