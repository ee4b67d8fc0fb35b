//! HTTP tests for the comment routes, driven through the full router.

mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;
use tower::ServiceExt;

async fn post_comment(
    app: &axum::Router,
    exercise_id: i64,
    token: Option<&str>,
    body: serde_json::Value,
) -> serde_json::Value {
    let response = send(
        app.clone(),
        Method::POST,
        &format!("/api/v1/exercises/{exercise_id}/comments"),
        token,
        Some(body),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

// ---------------------------------------------------------------------------
// Create and list
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_returns_201_with_view() {
    let app = build_test_app();
    let ada = token(ADA, "learner");

    let data = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "First!" })).await;

    assert_eq!(data["content"], "First!");
    assert_eq!(data["exercise_id"], EXERCISE);
    assert_eq!(data["author_id"], ADA);
    assert_eq!(data["username"], "ada");
    assert_eq!(data["status"], "VISIBLE");
    assert_eq!(data["flags_count"], 0);
    assert!(data["parent_id"].is_null());
}

#[tokio::test]
async fn anonymous_create_records_session() {
    let app = build_test_app();
    let response = app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method(Method::POST)
                .uri(format!("/api/v1/exercises/{EXERCISE}/comments"))
                .header("content-type", "application/json")
                .header("x-session-id", "sess-1")
                .body(axum::body::Body::from(json!({ "content": "hi" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(created["data"]["author_id"].is_null());

    let json = body_json(get(app, "/api/v1/sessions/sess-1/comments").await).await;
    let comments = json["data"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "hi");
}

#[tokio::test]
async fn listing_is_newest_first_and_paged() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    for n in 0..3 {
        post_comment(&app, EXERCISE, Some(&ada), json!({ "content": format!("c{n}") })).await;
    }

    let json = body_json(
        get(
            app.clone(),
            &format!("/api/v1/exercises/{EXERCISE}/comments?page=0&page_size=2"),
        )
        .await,
    )
    .await;
    let page: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(page, vec!["c2", "c1"]);

    let json = body_json(
        get(
            app,
            &format!("/api/v1/exercises/{EXERCISE}/comments?page=1&page_size=2"),
        )
        .await,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["content"], "c0");
}

#[tokio::test]
async fn invalid_paging_rejected() {
    let app = build_test_app();
    let response = get(
        app,
        &format!("/api/v1/exercises/{EXERCISE}/comments?page_size=0"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn replies_listed_oldest_first() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let grace = token(GRACE, "learner");
    let root = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "root" })).await;
    let root_id = root["id"].as_i64().unwrap();

    for text in ["r1", "r2"] {
        post_comment(
            &app,
            EXERCISE,
            Some(&grace),
            json!({ "content": text, "parent_id": root_id }),
        )
        .await;
    }

    let json = body_json(get(app.clone(), &format!("/api/v1/comments/{root_id}/replies")).await).await;
    let replies = json["data"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["content"], "r1");
    assert_eq!(replies[1]["content"], "r2");
    assert_eq!(replies[0]["parent_id"], root_id);

    // Replies are not top-level.
    let json = body_json(get(app, &format!("/api/v1/exercises/{EXERCISE}/comments")).await).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_content_rejected() {
    let app = build_test_app();
    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/exercises/{EXERCISE}/comments"),
        None,
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_CONTENT");
}

#[tokio::test]
async fn reply_to_parent_in_other_exercise_rejected() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let root = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "root" })).await;

    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/exercises/{OTHER_EXERCISE}/comments"),
        Some(&ada),
        Some(json!({ "content": "reply", "parent_id": root["id"] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "PARENT_NOT_FOUND");
}

#[tokio::test]
async fn closed_exercise_rejected() {
    let app = build_test_app();
    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/exercises/{CLOSED_EXERCISE}/comments"),
        None,
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "EXERCISE_UNAVAILABLE");
}

#[tokio::test]
async fn live_viewer_refused_for_closed_exercise() {
    let response = get(
        build_test_app(),
        &format!("/api/v1/exercises/{CLOSED_EXERCISE}/comments/live"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "EXERCISE_UNAVAILABLE");
}

#[tokio::test]
async fn invalid_token_rejected_even_on_open_route() {
    let app = build_test_app();
    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/exercises/{EXERCISE}/comments"),
        Some("not-a-jwt"),
        Some(json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_comment_returns_404() {
    let app = build_test_app();
    let response = get(app, "/api/v1/comments/12345").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}

#[tokio::test]
async fn rate_limit_applies_to_signed_in_author() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let limit = test_config().comments.rate_limit;
    for n in 0..limit {
        post_comment(&app, EXERCISE, Some(&ada), json!({ "content": format!("c{n}") })).await;
    }

    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/exercises/{EXERCISE}/comments"),
        Some(&ada),
        Some(json!({ "content": "one too many" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body_json(response).await["code"], "RATE_LIMITED");
}

// ---------------------------------------------------------------------------
// Edit and delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn author_edits_and_others_are_forbidden() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let grace = token(GRACE, "learner");
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "typo" })).await;
    let uri = format!("/api/v1/comments/{}", created["id"]);

    let response = send(
        app.clone(),
        Method::PUT,
        &uri,
        Some(&grace),
        Some(json!({ "content": "hijack" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        app.clone(),
        Method::PUT,
        &uri,
        Some(&ada),
        Some(json!({ "content": "fixed" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["content"], "fixed");
    assert!(!json["data"]["edited_at"].is_null());
}

#[tokio::test]
async fn edit_requires_authentication() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "x" })).await;

    let response = send(
        app,
        Method::PUT,
        &format!("/api/v1/comments/{}", created["id"]),
        None,
        Some(json!({ "content": "y" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn delete_leaves_tombstone_and_is_idempotent() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "oops" })).await;
    let uri = format!("/api/v1/comments/{}", created["id"]);

    for _ in 0..2 {
        let response = send(app.clone(), Method::DELETE, &uri, Some(&ada), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["status"], "DELETED");
        assert_eq!(json["data"]["content"], "[deleted]");
    }

    let json = body_json(get(app.clone(), &uri).await).await;
    assert_eq!(json["data"]["status"], "DELETED");

    // Gone from the listing, and no longer editable.
    let json = body_json(get(app.clone(), &format!("/api/v1/exercises/{EXERCISE}/comments")).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let response = send(app, Method::PUT, &uri, Some(&ada), Some(json!({ "content": "back" }))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_DELETED");
}

#[tokio::test]
async fn moderator_deletes_any_comment() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let moderator = token(MODERATOR, "moderator");
    let grace = token(GRACE, "learner");
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "spam" })).await;
    let uri = format!("/api/v1/comments/{}", created["id"]);

    let response = send(app.clone(), Method::DELETE, &uri, Some(&grace), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(app, Method::DELETE, &uri, Some(&moderator), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Flags and moderation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_flag_rejected() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let grace = token(GRACE, "learner");
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "meh" })).await;
    let uri = format!("/api/v1/comments/{}/flags", created["id"]);

    let response = send(app.clone(), Method::POST, &uri, Some(&grace), None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["comment"]["flags_count"], 1);
    assert_eq!(json["data"]["became_hidden"], false);
    assert_eq!(json["data"]["flag"]["flagger_id"], GRACE);

    let response = send(app, Method::POST, &uri, Some(&grace), None).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ALREADY_FLAGGED");
}

#[tokio::test]
async fn threshold_hides_and_moderator_restores() {
    let app = build_test_app();
    let ada = token(ADA, "learner");
    let moderator = token(MODERATOR, "moderator");
    let threshold = test_config().comments.flag_threshold;
    let created = post_comment(&app, EXERCISE, Some(&ada), json!({ "content": "rude" })).await;
    let id = created["id"].as_i64().unwrap();

    let mut last = serde_json::Value::Null;
    for flagger in 100..100 + i64::from(threshold) {
        let response = send(
            app.clone(),
            Method::POST,
            &format!("/api/v1/comments/{id}/flags"),
            Some(&token(flagger, "learner")),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        last = body_json(response).await;
    }
    assert_eq!(last["data"]["became_hidden"], true);
    assert_eq!(last["data"]["comment"]["status"], "HIDDEN");

    let json = body_json(get(app.clone(), &format!("/api/v1/exercises/{EXERCISE}/comments")).await).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    // Queue shows it to moderators only.
    let response = send(
        app.clone(),
        Method::GET,
        "/api/v1/moderation/comments?min_flags=1",
        Some(&ada),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        app.clone(),
        Method::GET,
        "/api/v1/moderation/comments",
        Some(&moderator),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let queue = body_json(response).await;
    assert_eq!(queue["data"][0]["id"], id);

    // A learner cannot restore; a moderator can.
    let restore = format!("/api/v1/comments/{id}/restore");
    let response = send(app.clone(), Method::POST, &restore, Some(&ada), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(app.clone(), Method::POST, &restore, Some(&moderator), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "VISIBLE");

    let json = body_json(get(app, &format!("/api/v1/exercises/{EXERCISE}/comments")).await).await;
    assert_eq!(json["data"][0]["id"], id);
}

#[tokio::test]
async fn flag_requires_authentication() {
    let app = build_test_app();
    let created = post_comment(&app, EXERCISE, None, json!({ "content": "anon" })).await;

    let response = send(
        app,
        Method::POST,
        &format!("/api/v1/comments/{}/flags", created["id"]),
        None,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
