mod common;

use askhub::services::MailPurpose;
use axum::http::StatusCode;
use common::{login, register_and_verify, send, spawn_app};
use serde_json::json;

#[tokio::test]
async fn test_change_password_requires_authentication() {
    let test_app = spawn_app().await;

    let (status, _) = send(
        &test_app.app,
        "PUT",
        "/api/auth/change-password",
        None,
        Some(json!({
            "current_password": "Secret123!",
            "new_password": "NewSecret123!",
            "confirm_password": "NewSecret123!",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_change_password_full_flow() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;
    let (access, _) = login(&test_app.app, "alice", "Secret123!").await;

    // Wrong current password
    let (status, _) = send(
        &test_app.app,
        "PUT",
        "/api/auth/change-password",
        Some(&access),
        Some(json!({
            "current_password": "WrongOne1!",
            "new_password": "NewSecret123!",
            "confirm_password": "NewSecret123!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Mismatched confirmation
    let (status, body) = send(
        &test_app.app,
        "PUT",
        "/api/auth/change-password",
        Some(&access),
        Some(json!({
            "current_password": "Secret123!",
            "new_password": "NewSecret123!",
            "confirm_password": "Different123!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["confirm_password"].is_string());

    // Valid change
    let (status, _) = send(
        &test_app.app,
        "PUT",
        "/api/auth/change-password",
        Some(&access),
        Some(json!({
            "current_password": "Secret123!",
            "new_password": "NewSecret123!",
            "confirm_password": "NewSecret123!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Old password no longer works, the new one does
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "Secret123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&test_app.app, "alice", "NewSecret123!").await;
}

#[tokio::test]
async fn test_reset_password_unknown_email_is_404() {
    let test_app = spawn_app().await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": "ghost@x.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reset_password_dispatches_reset_token() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;

    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    assert_eq!(
        test_app.mailer.last_purpose_to("a@x.com"),
        Some(MailPurpose::PasswordReset)
    );
}

#[tokio::test]
async fn test_set_password_with_reset_token() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;

    send(
        &test_app.app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await;
    let token = test_app.mailer.last_token_to("a@x.com").unwrap();

    let (status, _) = send(
        &test_app.app,
        "POST",
        &format!("/api/auth/set-password/{token}"),
        None,
        Some(json!({
            "new_password": "ResetSecret123!",
            "confirm_password": "ResetSecret123!",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    login(&test_app.app, "alice", "ResetSecret123!").await;
}

#[tokio::test]
async fn test_set_password_rejects_bad_tokens() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;
    let user_id = common::lookup_user_id(&test_app, "alice").await;

    let body = json!({
        "new_password": "ResetSecret123!",
        "confirm_password": "ResetSecret123!",
    });

    // Garbage token
    let (status, _) = send(
        &test_app.app,
        "POST",
        "/api/auth/set-password/not-a-token",
        None,
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Expired reset token
    let expired = test_app
        .state
        .tokens()
        .issue_with_ttl(
            i32::try_from(user_id).unwrap(),
            askhub::services::TokenPurpose::ResetPassword,
            -60,
        )
        .unwrap();
    let (status, _) = send(
        &test_app.app,
        "POST",
        &format!("/api/auth/set-password/{expired}"),
        None,
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Verification token must not pass as a reset token
    send(
        &test_app.app,
        "POST",
        "/api/auth/resend-verification",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await;

    // The account is active, so resending dispatched nothing; mint a
    // verification token directly instead
    let verification = test_app
        .state
        .tokens()
        .issue(
            i32::try_from(user_id).unwrap(),
            askhub::services::TokenPurpose::Verification,
        )
        .unwrap();
    let (status, _) = send(
        &test_app.app,
        "POST",
        &format!("/api/auth/set-password/{verification}"),
        None,
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Through all of it the original password still logs in
    login(&test_app.app, "alice", "Secret123!").await;
}

#[tokio::test]
async fn test_set_password_validates_payload() {
    let test_app = spawn_app().await;
    register_and_verify(&test_app, "alice", "a@x.com", "Secret123!").await;

    send(
        &test_app.app,
        "POST",
        "/api/auth/reset-password",
        None,
        Some(json!({ "email": "a@x.com" })),
    )
    .await;
    let token = test_app.mailer.last_token_to("a@x.com").unwrap();

    let (status, body) = send(
        &test_app.app,
        "POST",
        &format!("/api/auth/set-password/{token}"),
        None,
        Some(json!({
            "new_password": "short",
            "confirm_password": "short",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["new_password"].is_string());

    // Validation failures leave the password untouched
    login(&test_app.app, "alice", "Secret123!").await;
}
