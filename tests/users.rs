//! User Profile Tests
//!
//! Covers profile reads and edits, tier-gated profile features, the pinned
//! profile video and watch history.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use vhub::domain::tier::Tier;
use vhub::domain::user::WATCH_HISTORY_LIMIT;
use vhub::domain::video::VideoStatus;

// ===========================================================================
// Profile
// ===========================================================================

#[tokio::test]
async fn profile_lists_approved_uploads_with_pinned_first() {
    let app = app().await;
    let user = app.create_user_with_tier("profile_owner", Tier::Vip);
    let older = app.seed_approved(user.id, "Older");
    let newer = app.seed_approved(user.id, "Newer");
    app.seed_video(user.id, "Queued", VideoStatus::Pending, Tier::Normal, None);

    let body = app.get(&format!("/v1/users/{}", user.id), None).await.json();
    assert_eq!(body["user"]["username"], user.username);
    assert!(body["user"].get("password_digest").is_none());
    let ids: Vec<u64> = body["uploads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|video| video["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![newer, older]);

    let resp = app
        .post(&format!("/v1/users/me/pinned-video/{}", older), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["pinned_video_id"], older);

    let body = app.get(&format!("/v1/users/{}", user.id), None).await.json();
    assert_eq!(body["pinned_video_id"], older);
    assert_eq!(body["uploads"][0]["id"], older);
    assert_eq!(body["uploads"][1]["id"], newer);
}

#[tokio::test]
async fn unknown_profile_is_not_found() {
    let app = app().await;

    let resp = app.get("/v1/users/9999", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "user not found");
}

#[tokio::test]
async fn update_profile_basics() {
    let app = app().await;
    let user = app.create_user("profile_edit");

    let resp = app
        .patch_json(
            "/v1/users/me",
            json!({
                "display_name": "  New Name ",
                "avatar_url": "https://example.com/a.png",
                "track_history": false
            }),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["display_name"], "New Name");
    assert_eq!(body["avatar_url"], "https://example.com/a.png");
    assert_eq!(body["preferences"]["track_history"], false);

    let resp = app
        .patch_json("/v1/users/me", json!({ "display_name": "" }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "display name must be between 1 and 50 characters"
    );
}

// ===========================================================================
// Tier-gated profile features
// ===========================================================================

#[tokio::test]
async fn banner_requires_premium() {
    let app = app().await;
    let user = app.create_user("banner");
    let body = json!({ "banner_url": "https://example.com/banner.png" });

    let resp = app.patch_json("/v1/users/me", body.clone(), Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "profile banners require Vip or SVip");

    app.set_tier(user.id, Tier::Vip);
    let resp = app.patch_json("/v1/users/me", body, Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["banner_url"], "https://example.com/banner.png");

    // clearing is always allowed
    app.set_tier(user.id, Tier::Normal);
    let resp = app
        .patch_json("/v1/users/me", json!({ "banner_url": null }), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["banner_url"].is_null());
}

#[tokio::test]
async fn comment_styles_follow_tier() {
    let app = app().await;
    let user = app.create_user("styles");
    let color = json!({ "comment_style": { "kind": "color", "color": "#ff0000" } });
    let gradient = json!({
        "comment_style": { "kind": "gradient", "from": "#000000", "to": "#ffffff" }
    });

    let resp = app.patch_json("/v1/users/me", color.clone(), Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "comment colors require Vip or SVip");

    app.set_tier(user.id, Tier::Vip);
    let resp = app.patch_json("/v1/users/me", color, Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["comment_style"]["color"], "#ff0000");

    let resp = app
        .patch_json("/v1/users/me", gradient.clone(), Some(&user.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "comment gradients require SVip");

    app.set_tier(user.id, Tier::SVip);
    let resp = app.patch_json("/v1/users/me", gradient, Some(&user.token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["comment_style"]["kind"], "gradient");
}

#[tokio::test]
async fn pinned_video_rules() {
    let app = app().await;
    let normal = app.create_user("pin_normal");
    let vip = app.create_user_with_tier("pin_vip", Tier::Vip);
    let own = app.seed_approved(vip.id, "Own");
    let foreign = app.seed_approved(normal.id, "Foreign");
    let pending = app.seed_video(vip.id, "Pending", VideoStatus::Pending, Tier::Normal, None);

    let resp = app
        .post(&format!("/v1/users/me/pinned-video/{}", foreign), Some(&normal.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "pinning videos requires Vip or SVip");

    for id in [foreign, pending] {
        let resp = app
            .post(&format!("/v1/users/me/pinned-video/{}", id), Some(&vip.token))
            .await;
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
    }

    let path = format!("/v1/users/me/pinned-video/{}", own);
    assert_eq!(app.post(&path, Some(&vip.token)).await.json()["pinned_video_id"], own);
    assert!(app.post(&path, Some(&vip.token)).await.json()["pinned_video_id"].is_null());
}

// ===========================================================================
// Watch history
// ===========================================================================

#[tokio::test]
async fn history_is_recorded_for_premium_viewers() {
    let app = app().await;
    let admin = app.admin();
    let vip = app.create_user_with_tier("history_vip", Tier::Vip);
    let first = app.seed_approved(admin.id, "First");
    let second = app.seed_approved(admin.id, "Second");

    for id in [first, second, first] {
        app.post(&format!("/v1/videos/{}/view", id), Some(&vip.token)).await;
    }

    let resp = app
        .get(&format!("/v1/users/{}/history", vip.id), Some(&vip.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let ids: Vec<u64> = resp.json()["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|video| video["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![first, second]);

    // deleted videos drop out of the resolved history
    app.delete(&format!("/v1/admin/videos/{}", first), Some(&admin.token))
        .await;
    let items = app
        .get(&format!("/v1/users/{}/history", vip.id), Some(&vip.token))
        .await
        .json()["items"]
        .clone();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["id"], second);
}

#[tokio::test]
async fn history_respects_tier_and_preference() {
    let app = app().await;
    let admin = app.admin();
    let normal = app.create_user("history_normal");
    let opted_out = app.create_user_with_tier("history_opt_out", Tier::SVip);
    let id = app.seed_approved(admin.id, "Tracked");

    app.patch_json(
        "/v1/users/me",
        json!({ "track_history": false }),
        Some(&opted_out.token),
    )
    .await;
    app.post(&format!("/v1/videos/{}/view", id), Some(&normal.token)).await;
    app.post(&format!("/v1/videos/{}/view", id), Some(&opted_out.token)).await;

    let histories = app.state.store.read(|store| {
        (
            store.user(normal.id).unwrap().watch_history.clone(),
            store.user(opted_out.id).unwrap().watch_history.clone(),
        )
    });
    assert_eq!(histories, (vec![], vec![]));

    let resp = app
        .get(&format!("/v1/users/{}/history", normal.id), Some(&normal.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "watch history requires Vip or SVip");

    let resp = app
        .get(&format!("/v1/users/{}/history", opted_out.id), Some(&normal.token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_message(), "watch history is private");
}

#[tokio::test]
async fn history_is_capped() {
    let app = app().await;
    let admin = app.admin();
    let vip = app.create_user_with_tier("history_cap", Tier::Vip);
    let ids: Vec<u64> = (0..WATCH_HISTORY_LIMIT + 5)
        .map(|n| app.seed_approved(admin.id, &format!("Video {}", n)))
        .collect();

    for id in &ids {
        app.post(&format!("/v1/videos/{}/view", id), Some(&vip.token)).await;
    }

    let history = app
        .state
        .store
        .read(|store| store.user(vip.id).unwrap().watch_history.clone());
    assert_eq!(history.len(), WATCH_HISTORY_LIMIT);
    assert_eq!(history[0], *ids.last().unwrap());
}
