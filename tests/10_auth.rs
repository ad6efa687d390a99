mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server.client.get(server.url("/health")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<Value>().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
    Ok(())
}

#[tokio::test]
async fn protected_routes_need_a_token() -> Result<()> {
    let server = common::spawn_server().await?;

    let res = server.client.get(server.url("/api/listings")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let res = server.get("/api/auth/whoami", "not-a-jwt").await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn register_login_and_whoami() -> Result<()> {
    let server = common::spawn_server().await?;
    let token = server.tenant_token("Ana@Example.com").await?;

    let me = common::data(server.get("/api/auth/whoami", &token).await?).await?;
    assert_eq!(me["email"], "ana@example.com");
    assert_eq!(me["role"], "tenant");
    assert!(me.get("password_hash").is_none());

    let res = server
        .post("/auth/login", None, json!({ "email": "ana@example.com", "password": "wrong password" }))
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = server
        .post("/auth/login", None, json!({ "email": "ana@example.com", "password": "tenant password" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_conflicts() -> Result<()> {
    let server = common::spawn_server().await?;
    server.tenant_token("ben@example.com").await?;

    let res = server
        .post(
            "/auth/register",
            None,
            json!({ "name": "Ben", "email": "BEN@example.com", "password": "another password" }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn registration_reports_field_errors() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server
        .post("/auth/register", None, json!({ "email": "not-an-email", "password": "short" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["name"].is_string());
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server
        .client
        .post(server.url("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    assert_eq!(body["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn password_reset_flow() -> Result<()> {
    let server = common::spawn_server().await?;
    server.tenant_token("cara@example.com").await?;

    let res = server
        .post("/auth/password/forgot", None, json!({ "email": "cara@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let mail = server.outbox.last_to("cara@example.com").await.expect("reset mail sent");
    assert!(mail.html.contains("http://localhost:5173/reset-password?token="));
    let start = mail.html.find("token=").unwrap() + "token=".len();
    let token: String = mail.html[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect();

    let res = server
        .post("/auth/password/reset", None, json!({ "token": token, "password": "a fresh password" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    // tokens are single use
    let res = server
        .post("/auth/password/reset", None, json!({ "token": token, "password": "another password" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .post("/auth/login", None, json!({ "email": "cara@example.com", "password": "a fresh password" }))
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn forgot_password_does_not_reveal_accounts() -> Result<()> {
    let server = common::spawn_server().await?;
    let res = server
        .post("/auth/password/forgot", None, json!({ "email": "ghost@example.com" }))
        .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert!(server.outbox.sent().await.is_empty());
    Ok(())
}
