//! End-to-end smoke test over a real socket.
//!
//! Serves the full router on an ephemeral port with connect-info enabled,
//! then walks sign-in, lead creation, listing, export and the docs endpoint
//! with an HTTP client.

use std::net::SocketAddr;

use anyhow::Result;
use leadbook::{
    seeds::{DEMO_EMAIL, DEMO_PASSWORD, seed_demo_user},
    server::create_app,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

mod test_utils;
use test_utils::{TestApp, lead_body, relaxed_config, setup_test_db};

async fn spawn_server() -> Result<String> {
    let db = setup_test_db().await?;
    seed_demo_user(&db).await?;
    let app = TestApp::new(relaxed_config(), db)?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let router = create_app(app.state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .ok();
    });

    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn e2e_smoke_signin_crud_and_export() -> Result<()> {
    let base = spawn_server().await?;
    let client = reqwest::Client::new();

    let root: Value = client.get(format!("{base}/")).send().await?.json().await?;
    assert_eq!(root["service"], "leadbook");

    let health = client.get(format!("{base}/healthz")).send().await?;
    assert_eq!(health.status(), StatusCode::OK);

    let signin: Value = client
        .post(format!("{base}/auth/signin"))
        .json(&json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }))
        .send()
        .await?
        .json()
        .await?;
    let token = signin["token"].as_str().expect("token issued").to_string();

    let created = client
        .post(format!("{base}/leads"))
        .bearer_auth(&token)
        .json(&lead_body("Smoke Test Buyer"))
        .send()
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await?;
    assert_eq!(created["owner"]["email"], DEMO_EMAIL);

    let listing: Value = client
        .get(format!("{base}/leads"))
        .query(&[("search", "smoke")])
        .bearer_auth(&token)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["leads"][0]["id"], created["id"]);

    let export = client
        .get(format!("{base}/leads/export"))
        .bearer_auth(&token)
        .send()
        .await?;
    assert_eq!(export.status(), StatusCode::OK);
    assert!(export.headers().contains_key("x-trace-id"));
    let csv = export.text().await?;
    assert_eq!(csv.lines().count(), 2);

    let openapi: Value = client
        .get(format!("{base}/openapi.json"))
        .send()
        .await?
        .json()
        .await?;
    assert!(openapi["paths"]["/leads/{id}"].is_object());
    assert!(openapi["components"]["securitySchemes"]["bearer_auth"].is_object());

    let unauthorized = client.get(format!("{base}/leads")).send().await?;
    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        unauthorized.headers()["content-type"],
        "application/problem+json"
    );
    Ok(())
}
