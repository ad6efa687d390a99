use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::{AppConfig, StoreBackend};
use crate::database::DatabaseManager;
use crate::state::AppState;

pub async fn migrate(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    if config.database.backend != StoreBackend::Postgres {
        bail!("migrate needs STORE_BACKEND=postgres");
    }
    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::migrate(&pool).await.context("migration failed")?;
    output_success(output_format, "Migrations applied", None)
}

pub async fn refresh_leases(
    config: AppConfig,
    date: Option<NaiveDate>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let today = date.unwrap_or_else(|| Utc::now().date_naive());
    let state = AppState::from_config(config).await?;
    let report = state.leases().refresh(today).await?;
    output_success(
        output_format,
        &format!("Leases refreshed as of {}", today),
        Some(serde_json::to_value(&report)?),
    )
}

pub async fn create_admin(
    mut config: AppConfig,
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    if email.is_some() {
        config.bootstrap.admin_email = email;
    }
    if password.is_some() {
        config.bootstrap.admin_password = password;
    }
    if let Some(name) = name {
        config.bootstrap.admin_name = name;
    }
    if config.bootstrap.admin_email.is_none() || config.bootstrap.admin_password.is_none() {
        bail!("create-admin needs --email and --password (or ADMIN_EMAIL and ADMIN_PASSWORD)");
    }

    let state = AppState::from_config(config).await?;
    match bootstrap_admin(&state).await? {
        Some(admin) => output_success(
            output_format,
            "Administrator ready",
            Some(json!({ "id": admin.id, "email": admin.email })),
        ),
        None => bail!("no administrator configured"),
    }
}

/// Ensures the configured administrator exists. Does nothing when no
/// credentials are configured.
pub async fn bootstrap_admin(state: &AppState) -> anyhow::Result<Option<crate::models::User>> {
    let bootstrap = &state.config.bootstrap;
    let (Some(email), Some(password)) = (&bootstrap.admin_email, &bootstrap.admin_password) else {
        return Ok(None);
    };
    let admin = state
        .auth()
        .ensure_admin(&bootstrap.admin_name, email, password)
        .await
        .context("failed to create administrator")?;
    Ok(Some(admin))
}
