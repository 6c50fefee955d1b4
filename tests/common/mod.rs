#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use time::OffsetDateTime;
use tower::ServiceExt;

use vhub::app::auth::AuthService;
use vhub::config::AppConfig;
use vhub::domain::media::ContentKind;
use vhub::domain::moderation::ModerationMark;
use vhub::domain::tier::Tier;
use vhub::domain::user::UserId;
use vhub::domain::video::{MediaRefs, Video, VideoId, VideoStatus};
use vhub::infra::ai::{AiCollaborator, SearchCandidate, SummaryDetail};
use vhub::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "adminpass";
pub const DEFAULT_PASSWORD: &str = "testpassword123";
pub const UPLOAD_MAX_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// StubAi: scriptable AI collaborator
// ---------------------------------------------------------------------------

/// Each field holds the next answer of the matching call; `Err` makes the
/// call fail with that message.
#[derive(Clone)]
pub struct AiScript {
    pub moderation: Result<Value, String>,
    pub keywords: Result<Value, String>,
    pub scene_tags: Result<Value, String>,
    pub summary: Result<String, String>,
    pub search: Result<Value, String>,
    /// Moderation answers only after this long.
    pub moderation_delay: Option<Duration>,
}

impl Default for AiScript {
    fn default() -> Self {
        Self {
            moderation: Ok(json!({ "isSafe": true, "reason": null, "classification": "safe" })),
            keywords: Ok(json!(["stub", "keywords"])),
            scene_tags: Ok(json!([])),
            summary: Ok("A short summary.".to_string()),
            search: Ok(json!([])),
            moderation_delay: None,
        }
    }
}

#[derive(Default)]
pub struct StubAi {
    script: Mutex<AiScript>,
    search_calls: Mutex<Vec<Vec<SearchCandidate>>>,
}

impl StubAi {
    pub fn script(&self, update: impl FnOnce(&mut AiScript)) {
        update(&mut self.script.lock().unwrap());
    }

    pub fn search_candidates(&self) -> Vec<Vec<SearchCandidate>> {
        self.search_calls.lock().unwrap().clone()
    }

    fn current(&self) -> AiScript {
        self.script.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiCollaborator for StubAi {
    async fn moderate(&self, _title: &str) -> anyhow::Result<Value> {
        let script = self.current();
        if let Some(delay) = script.moderation_delay {
            tokio::time::sleep(delay).await;
        }
        script.moderation.map_err(|err| anyhow!(err))
    }

    async fn keywords(&self, _title: &str) -> anyhow::Result<Value> {
        self.current().keywords.map_err(|err| anyhow!(err))
    }

    async fn scene_tags(&self, _title: &str) -> anyhow::Result<Value> {
        self.current().scene_tags.map_err(|err| anyhow!(err))
    }

    async fn summarize(&self, _title: &str, _detail: SummaryDetail) -> anyhow::Result<String> {
        self.current().summary.map_err(|err| anyhow!(err))
    }

    async fn search(&self, _query: &str, candidates: &[SearchCandidate]) -> anyhow::Result<Value> {
        self.search_calls.lock().unwrap().push(candidates.to_vec());
        self.current().search.map_err(|err| anyhow!(err))
    }
}

// ---------------------------------------------------------------------------
// TestApp: a fresh store per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub ai: Arc<StubAi>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body_bytes
    }
}

pub struct TestUser {
    pub id: UserId,
    pub username: String,
    pub token: String,
}

pub async fn app() -> TestApp {
    TestApp::setup(|_| {})
}

/// A fresh app whose configuration is adjusted before startup.
pub async fn app_with(configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    TestApp::setup(configure)
}

impl TestApp {
    fn setup(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = AppConfig {
            admin_username: ADMIN_USERNAME.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
            upload_max_bytes: UPLOAD_MAX_BYTES,
            seed_demo_users: false,
            ..AppConfig::default()
        };
        configure(&mut config);
        let ai = Arc::new(StubAi::default());
        let state = AppState::from_config(&config, ai.clone());
        let router = vhub::http::router(state.clone());

        TestApp { router, state, ai }
    }

    // ------------------------------------------------------------------
    // Low-level request helpers
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        self.send(request).await
    }

    pub async fn request_raw(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");
        for &(key, value) in headers {
            builder = builder.header(key, value);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, None, &headers).await
    }

    pub async fn patch_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::PATCH, path, Some(body), &headers)
            .await
    }

    pub async fn put_json(&self, path: &str, body: Value, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::PUT, path, Some(body), &headers).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(t) = token {
            auth = format!("Bearer {}", t);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::DELETE, path, None, &headers).await
    }

    /// PUT raw file bytes into a draft slot.
    pub async fn put_file(
        &self,
        draft_id: &str,
        slot: &str,
        bytes: &[u8],
        content_type: &str,
        token: &str,
    ) -> TestResponse {
        let auth = format!("Bearer {}", token);
        let path = format!("/v1/uploads/{}/files/{}", draft_id, slot);
        self.request_raw(
            Method::PUT,
            &path,
            bytes.to_vec(),
            &[
                ("Authorization", auth.as_str()),
                ("content-type", content_type),
                ("x-file-name", "clip.bin"),
            ],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------

    fn auth_service(&self) -> AuthService {
        AuthService::new(self.state.store.clone())
    }

    pub fn admin(&self) -> TestUser {
        let signed_in = self
            .auth_service()
            .login(ADMIN_USERNAME, ADMIN_PASSWORD)
            .expect("admin login failed");
        TestUser {
            id: signed_in.user.id,
            username: signed_in.user.username,
            token: signed_in.token,
        }
    }

    /// Register a member through the auth service.
    pub fn create_user(&self, suffix: &str) -> TestUser {
        let username = format!("user_{}", suffix);
        let signed_in = self
            .auth_service()
            .register(&username, DEFAULT_PASSWORD)
            .expect("register failed");
        TestUser {
            id: signed_in.user.id,
            username,
            token: signed_in.token,
        }
    }

    pub fn create_user_with_tier(&self, suffix: &str, tier: Tier) -> TestUser {
        let user = self.create_user(suffix);
        self.set_tier(user.id, tier);
        user
    }

    pub fn set_tier(&self, user_id: UserId, tier: Tier) {
        self.state.store.write(|store| {
            store.user_mut(user_id).expect("user exists").tier = tier;
        });
    }

    /// Insert a video straight into the store, backed by a live blob.
    pub fn seed_video(
        &self,
        uploader_id: UserId,
        title: &str,
        status: VideoStatus,
        tier: Tier,
        password: Option<&str>,
    ) -> VideoId {
        self.state.store.write(|store| {
            let handle = store.blobs_mut().create(
                bytes::Bytes::from_static(b"fake video bytes"),
                "video/mp4".to_string(),
                "clip.mp4".to_string(),
            );
            let id = store.next_id();
            store.upsert_video(Video {
                id,
                title: title.to_string(),
                status,
                media: MediaRefs::Video {
                    video_url: handle,
                    file_path: "/uploads/clip.mp4".to_string(),
                },
                thumbnail_url: None,
                tier,
                password: password.map(str::to_string),
                likes: 0,
                dislikes: 0,
                views: 0,
                views_by_date: BTreeMap::new(),
                comments: Vec::new(),
                uploader_id,
                uploaded_at: OffsetDateTime::now_utc(),
                keywords: Vec::new(),
                scene_tags: Vec::new(),
                moderation: ModerationMark::safe(),
            });
            id
        })
    }

    pub fn seed_approved(&self, uploader_id: UserId, title: &str) -> VideoId {
        self.seed_video(uploader_id, title, VideoStatus::Approved, Tier::Normal, None)
    }

    pub fn video(&self, id: VideoId) -> Option<Video> {
        self.state.store.read(|store| store.video(id).cloned())
    }

    pub fn blob_is_live(&self, handle: &str) -> bool {
        self.state.store.read(|store| store.blobs().contains(handle))
    }

    pub fn live_blobs(&self) -> usize {
        self.state.store.read(|store| store.blobs().live_count())
    }

    /// Draft → file → title → submit through the HTTP surface. Returns the
    /// submit response.
    pub async fn upload(&self, token: &str, kind: ContentKind, title: &str) -> TestResponse {
        let kind_name = match kind {
            ContentKind::Video => "video",
            ContentKind::Image => "image",
            ContentKind::Link => "link",
        };
        let draft = self
            .post_json("/v1/uploads", json!({ "kind": kind_name }), Some(token))
            .await;
        assert_eq!(draft.status, StatusCode::CREATED);
        let draft_id = draft.json()["id"].as_str().unwrap().to_string();

        match kind {
            ContentKind::Video => {
                let resp = self
                    .put_file(&draft_id, "primary", b"video-bytes", "video/mp4", token)
                    .await;
                assert_eq!(resp.status, StatusCode::CREATED);
            }
            ContentKind::Image => {
                let resp = self
                    .put_file(&draft_id, "primary", b"image-bytes", "image/png", token)
                    .await;
                assert_eq!(resp.status, StatusCode::CREATED);
            }
            ContentKind::Link => {
                let resp = self
                    .put_file(&draft_id, "thumbnail", b"thumb-bytes", "image/jpeg", token)
                    .await;
                assert_eq!(resp.status, StatusCode::CREATED);
                let resp = self
                    .patch_json(
                        &format!("/v1/uploads/{}", draft_id),
                        json!({ "external_url": "https://example.com/watch" }),
                        Some(token),
                    )
                    .await;
                assert_eq!(resp.status, StatusCode::OK);
            }
        }

        let resp = self
            .patch_json(
                &format!("/v1/uploads/{}", draft_id),
                json!({ "title": title }),
                Some(token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK);

        self.post(&format!("/v1/uploads/{}/submit", draft_id), Some(token))
            .await
    }
}
