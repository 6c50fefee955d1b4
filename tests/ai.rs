//! AI Feature Tests
//!
//! Covers scene tagging, summaries and AI search against a scripted
//! collaborator, including failure and malformed-response handling.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use vhub::domain::tier::Tier;
use vhub::domain::video::{MediaRefs, SceneTag, VideoStatus};

// ===========================================================================
// Scene tags
// ===========================================================================

#[tokio::test]
async fn scene_tags_are_stored_on_the_video() {
    let app = app().await;
    let admin = app.admin();
    let viewer = app.create_user_with_tier("tagger", Tier::SVip);
    let id = app.seed_approved(admin.id, "Tour");
    app.ai.script(|s| {
        s.scene_tags = Ok(json!([
            { "timestamp": 0, "description": "Opening shot" },
            { "timestamp": 42, "description": "Harbor" }
        ]))
    });

    let resp = app
        .post(&format!("/v1/videos/{}/scene-tags", id), Some(&viewer.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["notice"].is_null());
    assert_eq!(body["scene_tags"][1]["timestamp"], 42);

    let video = app.video(id).unwrap();
    assert_eq!(
        video.scene_tags,
        vec![
            SceneTag {
                timestamp: 0,
                description: "Opening shot".to_string()
            },
            SceneTag {
                timestamp: 42,
                description: "Harbor".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn scene_tags_need_a_session() {
    let app = app().await;
    let admin = app.admin();
    let id = app.seed_approved(admin.id, "Private tagging");

    let resp = app.post(&format!("/v1/videos/{}/scene-tags", id), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn scene_tags_require_svip() {
    let app = app().await;
    let admin = app.admin();
    let id = app.seed_approved(admin.id, "Members only");
    let path = format!("/v1/videos/{}/scene-tags", id);

    for tier in [Tier::Normal, Tier::Vip] {
        let user = app.create_user_with_tier(&format!("tags_{:?}", tier).to_lowercase(), tier);
        let resp = app.post(&path, Some(&user.token)).await;
        assert_eq!(resp.status, StatusCode::FORBIDDEN);
        assert_eq!(resp.error_message(), "scene tagging requires SVip");
    }
    assert!(app.video(id).unwrap().scene_tags.is_empty());
}

#[tokio::test]
async fn scene_tags_are_only_for_videos() {
    let app = app().await;
    let admin = app.admin();
    let id = app.seed_approved(admin.id, "A link");
    app.state.store.write(|store| {
        store.video_mut(id).unwrap().media = MediaRefs::Link {
            external_url: "https://example.com/watch".to_string(),
        };
    });

    let resp = app
        .post(&format!("/v1/videos/{}/scene-tags", id), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "scene tags are only available for videos");
}

#[tokio::test]
async fn malformed_scene_tags_become_empty() {
    let app = app().await;
    let admin = app.admin();
    let id = app.seed_approved(admin.id, "Odd");
    app.state.store.write(|store| {
        store.video_mut(id).unwrap().scene_tags = vec![SceneTag {
            timestamp: 1,
            description: "Old".to_string(),
        }];
    });
    app.ai.script(|s| s.scene_tags = Ok(json!([{ "timestamp": "soon" }])));

    let body = app
        .post(&format!("/v1/videos/{}/scene-tags", id), Some(&admin.token))
        .await
        .json();
    assert_eq!(body["scene_tags"], json!([]));
    assert!(body["notice"].is_null());
    assert!(app.video(id).unwrap().scene_tags.is_empty());
}

#[tokio::test]
async fn failed_scene_tagging_keeps_existing_tags() {
    let app = app().await;
    let admin = app.admin();
    let id = app.seed_approved(admin.id, "Keep");
    let existing = vec![SceneTag {
        timestamp: 3,
        description: "Existing".to_string(),
    }];
    app.state
        .store
        .write(|store| store.video_mut(id).unwrap().scene_tags = existing.clone());
    app.ai.script(|s| s.scene_tags = Err("quota exceeded".to_string()));

    let resp = app
        .post(&format!("/v1/videos/{}/scene-tags", id), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["scene_tags"], json!([]));
    assert_eq!(
        body["notice"],
        "Scene analysis is unavailable right now, please try again later."
    );
    assert_eq!(app.video(id).unwrap().scene_tags, existing);
}

// ===========================================================================
// Summaries
// ===========================================================================

#[tokio::test]
async fn summaries_follow_tier() {
    let app = app().await;
    let admin = app.admin();
    let normal = app.create_user("summary_normal");
    let vip = app.create_user_with_tier("summary_vip", Tier::Vip);
    let svip = app.create_user_with_tier("summary_svip", Tier::SVip);
    let id = app.seed_approved(admin.id, "Summarize me");
    let path = format!("/v1/videos/{}/summary", id);
    let short = json!({ "detail": "short" });
    let detailed = json!({ "detail": "detailed" });
    app.ai.script(|s| s.summary = Ok("  A tour of the harbor.\n".to_string()));

    let resp = app.post_json(&path, short.clone(), None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app.post_json(&path, short.clone(), Some(&normal.token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "summaries require Vip or SVip");

    let resp = app.post_json(&path, short, Some(&vip.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["summary"], "A tour of the harbor.");
    assert!(body["notice"].is_null());

    let resp = app.post_json(&path, detailed.clone(), Some(&vip.token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "detailed summaries require SVip");

    let resp = app.post_json(&path, detailed, Some(&svip.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["summary"], "A tour of the harbor.");
}

#[tokio::test]
async fn summary_edge_cases() {
    let app = app().await;
    let admin = app.admin();
    let vip = app.create_user_with_tier("summary_edges", Tier::Vip);
    let id = app.seed_approved(admin.id, "Quiet");
    let pending = app.seed_video(admin.id, "Hidden", VideoStatus::Pending, Tier::Normal, None);
    let path = format!("/v1/videos/{}/summary", id);

    app.ai.script(|s| s.summary = Ok("   ".to_string()));
    let body = app.post(&path, Some(&vip.token)).await.json();
    assert!(body["summary"].is_null());
    assert!(body["notice"].is_null());

    app.ai.script(|s| s.summary = Err("timeout".to_string()));
    let body = app.post(&path, Some(&vip.token)).await.json();
    assert!(body["summary"].is_null());
    assert_eq!(
        body["notice"],
        "Could not generate a summary, please try again later."
    );

    let resp = app
        .post(&format!("/v1/videos/{}/summary", pending), Some(&vip.token))
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// AI search
// ===========================================================================

#[tokio::test]
async fn ai_search_keeps_collaborator_order() {
    let app = app().await;
    let admin = app.admin();
    let first = app.seed_approved(admin.id, "Harbor at dawn");
    let second = app.seed_approved(admin.id, "Harbor at dusk");
    let hidden = app.seed_video(admin.id, "Harbor draft", VideoStatus::Pending, Tier::Normal, None);
    app.ai
        .script(|s| s.search = Ok(json!([first, 999_999, hidden, second])));

    let resp = app.get("/v1/search/ai?q=harbor", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let ids: Vec<u64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|video| video["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);
    assert!(body["notice"].is_null());

    let calls = app.ai.search_candidates();
    assert_eq!(calls.len(), 1);
    let mut offered: Vec<u64> = calls[0].iter().map(|candidate| candidate.id).collect();
    offered.sort_unstable();
    assert_eq!(offered, vec![first, second]);
    assert!(calls[0]
        .iter()
        .all(|candidate| candidate.file_path.as_deref() == Some("/uploads/clip.mp4")));
}

#[tokio::test]
async fn ai_search_requires_a_query() {
    let app = app().await;

    for path in ["/v1/search/ai", "/v1/search/ai?q=%20%20"] {
        let resp = app.get(path, None).await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_message(), "search query is required");
    }
}

#[tokio::test]
async fn ai_search_failure_and_malformed_response() {
    let app = app().await;
    let admin = app.admin();
    app.seed_approved(admin.id, "Something");

    app.ai.script(|s| s.search = Err("model offline".to_string()));
    let body = app.get("/v1/search/ai?q=thing", None).await.json();
    assert_eq!(body["items"], json!([]));
    assert_eq!(
        body["notice"],
        "AI search is unavailable right now, please try again later."
    );

    app.ai.script(|s| s.search = Ok(json!({ "ids": [1] })));
    let body = app.get("/v1/search/ai?q=thing", None).await.json();
    assert_eq!(body["items"], json!([]));
    assert!(body["notice"].is_null());
}

#[tokio::test]
async fn ai_search_skips_the_collaborator_without_candidates() {
    let app = app().await;

    let body = app.get("/v1/search/ai?q=anything", None).await.json();
    assert_eq!(body["items"], json!([]));
    assert!(app.ai.search_candidates().is_empty());
}
