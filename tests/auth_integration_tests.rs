//! Sign-in and demo-user seeding against a migrated in-memory database.

use anyhow::Result;
use axum::http::StatusCode;
use leadbook::{
    auth::{AuthError, sign_in},
    crypto::verify_password,
    seeds::{DEMO_EMAIL, DEMO_NAME, DEMO_PASSWORD, seed_demo_user},
};
use serde_json::json;

mod test_utils;
use test_utils::{TEST_PASSWORD, TestApp, create_test_user, relaxed_config, setup_test_db};

#[tokio::test]
async fn signin_returns_token_usable_on_protected_routes() -> Result<()> {
    let app = TestApp::new(relaxed_config(), setup_test_db().await?)?;
    create_test_user(&app.state.db, "agent@example.com").await?;

    let (status, body) = app
        .json(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "Agent@Example.com ", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], "agent@example.com");
    assert!(body["expires_in"].as_i64().unwrap_or_default() > 0);

    let token = body["token"].as_str().expect("token").to_string();
    let (status, _) = app.json("GET", "/leads", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn signin_rejects_wrong_password_and_unknown_email_alike() -> Result<()> {
    let app = TestApp::new(relaxed_config(), setup_test_db().await?)?;
    create_test_user(&app.state.db, "agent@example.com").await?;

    let (status, wrong_password) = app
        .json(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "agent@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = app
        .json(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password["message"], unknown["message"]);
    assert_eq!(unknown["message"], "Invalid email or password");
    Ok(())
}

#[tokio::test]
async fn signin_with_missing_fields_is_bad_request() -> Result<()> {
    let app = TestApp::new(relaxed_config(), setup_test_db().await?)?;

    let (status, _) = app
        .json(
            "POST",
            "/auth/signin",
            None,
            Some(json!({ "email": "agent@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn seeding_demo_user_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;

    let first = seed_demo_user(&db).await?;
    let second = seed_demo_user(&db).await?;

    assert_eq!(first.id, second.id);
    assert_eq!(first.email, DEMO_EMAIL);
    assert_eq!(first.name.as_deref(), Some(DEMO_NAME));
    assert!(verify_password(DEMO_PASSWORD, &first.password_hash)?);
    Ok(())
}

#[tokio::test]
async fn seeded_demo_user_can_sign_in() -> Result<()> {
    let app = TestApp::new(relaxed_config(), setup_test_db().await?)?;
    seed_demo_user(&app.state.db).await?;

    let signed_in = sign_in(
        app.state.db.clone(),
        &app.state.sessions,
        DEMO_EMAIL,
        DEMO_PASSWORD,
    )
    .await?;
    assert_eq!(signed_in.user.email, DEMO_EMAIL);

    let claims = app.state.sessions.verify(&signed_in.token.token)?;
    assert_eq!(claims.sub, signed_in.user.id);

    let rejected = sign_in(app.state.db.clone(), &app.state.sessions, DEMO_EMAIL, "wrong").await;
    assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));
    Ok(())
}
