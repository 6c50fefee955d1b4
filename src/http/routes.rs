use axum::extract::DefaultBodyLimit;
use axum::{routing::get, routing::patch, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn videos() -> Router<AppState> {
    Router::new()
        .route("/videos", get(handlers::list_videos))
        .route("/videos/:id", get(handlers::get_video))
        .route("/videos/:id/view", post(handlers::record_view))
        .route("/videos/:id/play", post(handlers::play_video))
        .route(
            "/videos/:id/reaction",
            get(handlers::get_reaction).post(handlers::react_to_video),
        )
        .route("/videos/:id/comments", post(handlers::comment_video))
        .route(
            "/videos/:id/comments/:comment_id/pin",
            post(handlers::toggle_comment_pin),
        )
        .route("/videos/:id/analytics", get(handlers::video_analytics))
        .route("/videos/:id/download", get(handlers::download_video))
        .route("/videos/:id/summary", post(handlers::summarize_video))
        .route("/videos/:id/scene-tags", post(handlers::generate_scene_tags))
        .route("/announcement", get(handlers::get_announcement))
}

pub fn media() -> Router<AppState> {
    Router::new()
        .route("/media/:handle", get(handlers::get_media))
        .route("/playback/:ticket", get(handlers::get_playback))
}

pub fn uploads(max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/uploads", post(handlers::create_upload))
        .route(
            "/uploads/:id",
            get(handlers::get_upload)
                .patch(handlers::update_upload)
                .delete(handlers::discard_upload),
        )
        .route(
            "/uploads/:id/files/:slot",
            put(handlers::select_upload_file)
                .delete(handlers::clear_upload_file)
                .layer(DefaultBodyLimit::max(max_bytes)),
        )
        .route("/uploads/:id/submit", post(handlers::submit_upload))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/videos/pending", get(handlers::list_pending_videos))
        .route("/admin/videos/approved", get(handlers::list_approved_videos))
        .route("/admin/videos/:id/approve", post(handlers::approve_video))
        .route("/admin/videos/:id/reject", post(handlers::reject_video))
        .route(
            "/admin/videos/:id",
            patch(handlers::edit_video).delete(handlers::delete_video),
        )
        .route("/admin/users", get(handlers::list_users))
        .route("/admin/users/:id/ban", post(handlers::set_user_banned))
        .route("/admin/users/:id/verify", post(handlers::set_user_verified))
        .route("/admin/users/:id/tier", post(handlers::set_user_tier))
        .route("/admin/announcement", put(handlers::set_announcement))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/me", patch(handlers::update_profile))
        .route(
            "/users/me/pinned-video/:video_id",
            post(handlers::toggle_pinned_video),
        )
        .route("/users/:id", get(handlers::get_profile))
        .route("/users/:id/history", get(handlers::watch_history))
}

pub fn search() -> Router<AppState> {
    Router::new().route("/search/ai", get(handlers::ai_search))
}
