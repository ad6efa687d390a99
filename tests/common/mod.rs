#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

use chrono::NaiveDate;
use propman_api::auth::AuthUser;
use propman_api::config::AppConfig;
use propman_api::mail::OutboxMailer;
use propman_api::models::lease::TransitionRequest;
use propman_api::models::LeaseAction;
use propman_api::{AppRegistry, AppState};

pub const ADMIN_EMAIL: &str = "admin@propman.test";
pub const ADMIN_PASSWORD: &str = "admin password";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
    pub outbox: Arc<OutboxMailer>,
    pub state: AppState,
}

impl TestServer {
    /// Serves the router in-process over the memory store on a free port
    async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let outbox = Arc::new(OutboxMailer::new());
        let state = AppState::new(AppConfig::development(), AppRegistry::memory(), outbox.clone());

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let app = propman_api::app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            port,
            base_url,
            client: reqwest::Client::new(),
            outbox,
            state,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.get(self.url(path)).bearer_auth(token).send().await?)
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<Response> {
        let mut req = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req.send().await?)
    }

    pub async fn patch(&self, path: &str, token: &str, body: Value) -> Result<Response> {
        Ok(self.client.patch(self.url(path)).bearer_auth(token).json(&body).send().await?)
    }

    pub async fn delete(&self, path: &str, token: &str) -> Result<Response> {
        Ok(self.client.delete(self.url(path)).bearer_auth(token).send().await?)
    }

    /// Registers a tenant and returns its bearer token
    pub async fn tenant_token(&self, email: &str) -> Result<String> {
        let res = self
            .post(
                "/auth/register",
                None,
                json!({ "name": "Test Tenant", "email": email, "password": "tenant password" }),
            )
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());
        token_of(res).await
    }

    /// Seeds the administrator directly and logs in over HTTP
    pub async fn admin_token(&self) -> Result<String> {
        self.state
            .auth()
            .ensure_admin("Test Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await?;
        let res = self
            .post("/auth/login", None, json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "admin login failed: {}", res.status());
        token_of(res).await
    }

    /// Activates a lease through the service as if `today` were the current
    /// date, so later requests see it age
    pub async fn activate_as_of(&self, lease: &Value, today: NaiveDate) -> Result<()> {
        let admin = self
            .state
            .auth()
            .ensure_admin("Test Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
            .await?;
        let request = TransitionRequest {
            action: LeaseAction::Activate,
            start_date: None,
            end_date: None,
        };
        self.state
            .leases()
            .transition(&AuthUser::from(&admin), id_of(lease).parse()?, request, today)
            .await?;
        Ok(())
    }

    pub async fn create_listing(&self, admin: &str, title: &str) -> Result<Value> {
        let res = self
            .post(
                "/api/listings",
                Some(admin),
                json!({
                    "title": title,
                    "address": "12 Harbour Road",
                    "description": "Bright two-bedroom flat",
                    "price": "1450.00",
                    "amenities": ["parking", "balcony"],
                    "images": ["https://img.example.com/1.jpg"]
                }),
            )
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create listing failed: {}", res.status());
        data(res).await
    }

    pub async fn create_booking(&self, token: &str, listing_id: &str, start: &str, end: &str) -> Result<Value> {
        let res = self
            .post(
                "/api/bookings",
                Some(token),
                json!({ "listing_id": listing_id, "start_date": start, "end_date": end }),
            )
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create booking failed: {}", res.status());
        data(res).await
    }
}

pub async fn spawn_server() -> Result<TestServer> {
    let server = TestServer::spawn().await?;
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

/// `data` field of a success envelope
pub async fn data(res: Response) -> Result<Value> {
    let body = res.json::<Value>().await?;
    anyhow::ensure!(body["success"] == true, "not a success envelope: {}", body);
    Ok(body["data"].clone())
}

pub async fn token_of(res: Response) -> Result<String> {
    let data = data(res).await?;
    data["token"]
        .as_str()
        .map(str::to_string)
        .context("response carried no token")
}

pub fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap_or_default().to_string()
}
