mod common;

use axum::http::StatusCode;
use common::{login, register, register_and_verify, send, spawn_app};
use serde_json::json;

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let test_app = spawn_app().await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "whatever" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_unverified_account() {
    let test_app = spawn_app().await;
    register(&test_app.app, "alice", "a@x.com", "Secret123!").await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "Secret123!" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_stamps_last_login() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;

    let before = common::admin_view_of(&test_app, "alice").await;
    assert!(before["last_login"].is_null());

    login(&test_app.app, "alice", "Secret123!").await;

    let after = common::admin_view_of(&test_app, "alice").await;
    assert!(after["last_login"].is_string());
}

#[tokio::test]
async fn test_refresh_mints_usable_access_token() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;
    let (_, refresh) = login(&test_app.app, "alice", "Secret123!").await;

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let access = body["data"]["access"].as_str().unwrap();

    // The minted token authenticates a protected route
    let (status, _) = send(
        &test_app.app,
        "PUT",
        "/api/auth/change-password",
        Some(access),
        Some(json!({
            "current_password": "Secret123!",
            "new_password": "NewSecret123!",
            "confirm_password": "NewSecret123!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;
    let (access, _) = login(&test_app.app, "alice", "Secret123!").await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh": access })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_block_token_rejects_garbage() {
    let test_app = spawn_app().await;

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/api/auth/block-token",
        None,
        Some(json!({ "refresh": "not-a-token" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["refresh"].is_string());

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/api/auth/block-token",
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["refresh"].is_string());
}

#[tokio::test]
async fn test_block_token_is_terminal_and_idempotent() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;
    let (_, refresh) = login(&test_app.app, "alice", "Secret123!").await;

    // Block: 204 with no body
    let (status, body) = send(
        &test_app.app,
        "POST",
        "/api/auth/block-token",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    // The blocked token can no longer mint access tokens
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Blocking again produces the same end state without error
    let (status, body) = send(
        &test_app.app,
        "POST",
        "/api/auth/block-token",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blocking_one_token_leaves_others_valid() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;

    let (_, refresh_a) = login(&test_app.app, "alice", "Secret123!").await;
    let (_, refresh_b) = login(&test_app.app, "alice", "Secret123!").await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/block-token",
        None,
        Some(json!({ "refresh": refresh_a })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(json!({ "refresh": refresh_b })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
