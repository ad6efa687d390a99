use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::error::{ServiceError, ServiceResult};
use crate::auth::{generate_jwt, password, reset, Claims};
use crate::config::{MailConfig, SecurityConfig};
use crate::database::UserRepository;
use crate::mail::template::{render_password_reset, reset_link, PASSWORD_RESET_SUBJECT};
use crate::mail::{Email, Mailer};
use crate::models::user::{normalize_email, validate_password, RegisterRequest};
use crate::models::{PasswordReset, Role, User};

/// Issued on register and login
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    mailer: Arc<dyn Mailer>,
    security: SecurityConfig,
    mail: MailConfig,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, mailer: Arc<dyn Mailer>, security: SecurityConfig, mail: MailConfig) -> Self {
        Self {
            users,
            mailer,
            security,
            mail,
        }
    }

    /// Self-service sign up. New accounts are always tenants.
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthSession> {
        let registration = request.validate(self.security.min_password_length)?;
        if self.users.find_by_email(&registration.email).await?.is_some() {
            return Err(ServiceError::conflict("An account with this email already exists"));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: registration.name,
            email: registration.email,
            password_hash: hash(registration.password).await?,
            role: Role::Tenant,
            created_at: Utc::now(),
        };
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "User registered");
        self.session(user)
    }

    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthSession> {
        let email = request.email.as_deref().map(normalize_email).unwrap_or_default();
        let password = request.password.unwrap_or_default();
        if email.is_empty() || password.is_empty() {
            return Err(ServiceError::validation("Email and password are required"));
        }

        let invalid = || ServiceError::Auth("Invalid email or password".to_string());
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Login attempt for unknown account");
            return Err(invalid());
        };
        if !verify(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid());
        }
        info!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    pub async fn whoami(&self, id: Uuid) -> ServiceResult<User> {
        self.users
            .find(id)
            .await?
            .ok_or_else(|| ServiceError::Auth("Account no longer exists".to_string()))
    }

    /// Mails a reset link if the account exists. The caller cannot tell
    /// whether it did.
    pub async fn request_password_reset(&self, request: ForgotPasswordRequest, now: DateTime<Utc>) -> ServiceResult<()> {
        let email = request.email.as_deref().map(normalize_email).unwrap_or_default();
        if email.is_empty() {
            return Err(ServiceError::field("email", "This field is required"));
        }
        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("Password reset requested for unknown account");
            return Ok(());
        };

        let token = reset::generate_token();
        let ttl = self.security.reset_token_ttl_minutes;
        self.users
            .insert_password_reset(&PasswordReset {
                token_hash: reset::hash_token(&token),
                user_id: user.id,
                expires_at: now + Duration::minutes(ttl),
                used_at: None,
            })
            .await?;

        let link = reset_link(&self.mail.client_url, &token)?;
        let email = Email {
            to: user.email.clone(),
            subject: PASSWORD_RESET_SUBJECT.to_string(),
            html: render_password_reset(&user.name, &link, ttl),
        };
        if let Err(e) = self.mailer.send(email).await {
            error!(user_id = %user.id, "Failed to send password reset mail: {}", e);
        } else {
            info!(user_id = %user.id, "Password reset mail sent");
        }
        Ok(())
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest, now: DateTime<Utc>) -> ServiceResult<()> {
        let token = request.token.unwrap_or_default();
        if token.trim().is_empty() {
            return Err(ServiceError::field("token", "This field is required"));
        }
        let new_password = request.password.unwrap_or_default();
        if let Err(msg) = validate_password(&new_password, self.security.min_password_length) {
            return Err(ServiceError::field("password", msg));
        }

        let Some(user_id) = self.users.consume_password_reset(&reset::hash_token(&token), now).await? else {
            warn!("Rejected unknown or expired password reset token");
            return Err(ServiceError::field("token", "Reset link is invalid or has expired"));
        };
        self.users.update_password(user_id, &hash(new_password).await?).await?;
        info!(user_id = %user_id, "Password reset completed");
        Ok(())
    }

    /// Creates the bootstrap administrator, or returns it if it already exists.
    /// Fails with `Conflict` when the email belongs to a non-admin account.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        if let Some(existing) = self.users.find_by_email(&email).await? {
            if existing.role != Role::Admin {
                warn!(user_id = %existing.id, "Bootstrap admin email belongs to a tenant account");
                return Err(ServiceError::conflict(format!(
                    "{} is registered as a {} account, not an administrator",
                    email, existing.role
                )));
            }
            return Ok(existing);
        }
        if let Err(msg) = validate_password(password, self.security.min_password_length) {
            return Err(ServiceError::field("password", msg));
        }

        let admin = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            password_hash: hash(password.to_string()).await?,
            role: Role::Admin,
            created_at: Utc::now(),
        };
        self.users.insert(&admin).await?;
        info!(user_id = %admin.id, "Administrator account created");
        Ok(admin)
    }

    fn session(&self, user: User) -> ServiceResult<AuthSession> {
        let claims = Claims::for_user(&user, self.security.jwt_expiry_hours);
        let token = generate_jwt(&claims, &self.security).map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(AuthSession {
            token,
            token_type: "Bearer",
            expires_in: self.security.jwt_expiry_hours * 3600,
            user,
        })
    }
}

async fn hash(plain: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

async fn verify(plain: String, stored: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &stored))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validate_jwt;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;
    use crate::mail::OutboxMailer;

    fn service() -> (AuthService, Arc<OutboxMailer>) {
        let config = AppConfig::development();
        let outbox = Arc::new(OutboxMailer::new());
        let svc = AuthService::new(Arc::new(MemoryStore::new()), outbox.clone(), config.security, config.mail);
        (svc, outbox)
    }

    fn register(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Ana Tenant".into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn token_from(html: &str) -> String {
        let start = html.find("token=").unwrap() + "token=".len();
        html[start..].chars().take_while(|c| c.is_ascii_hexdigit()).collect()
    }

    #[tokio::test]
    async fn register_issues_tenant_session() {
        let (svc, _) = service();
        let session = svc.register(register("ana@example.com", "correct horse")).await.unwrap();
        assert_eq!(session.user.role, Role::Tenant);
        assert_eq!(session.token_type, "Bearer");

        let claims = validate_jwt(&session.token, &AppConfig::development().security).unwrap();
        assert_eq!(claims.sub, session.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (svc, _) = service();
        svc.register(register("ana@example.com", "correct horse")).await.unwrap();
        assert!(matches!(
            svc.register(register("ANA@example.com", "another horse")).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let (svc, _) = service();
        svc.register(register("ana@example.com", "correct horse")).await.unwrap();
        let wrong = LoginRequest {
            email: Some("ana@example.com".into()),
            password: Some("wrong horse".into()),
        };
        assert!(matches!(svc.login(wrong).await, Err(ServiceError::Auth(_))));

        let right = LoginRequest {
            email: Some(" Ana@Example.com".into()),
            password: Some("correct horse".into()),
        };
        assert!(svc.login(right).await.is_ok());
    }

    #[tokio::test]
    async fn reset_flow_changes_password_once() {
        let (svc, outbox) = service();
        svc.register(register("ana@example.com", "correct horse")).await.unwrap();
        let now = Utc::now();
        svc.request_password_reset(ForgotPasswordRequest { email: Some("ana@example.com".into()) }, now)
            .await
            .unwrap();

        let mail = outbox.last_to("ana@example.com").await.unwrap();
        assert_eq!(mail.subject, PASSWORD_RESET_SUBJECT);
        assert!(mail.html.contains("Ana Tenant"));
        let token = token_from(&mail.html);
        assert_eq!(token.len(), 64);

        let reset = |t: &str| ResetPasswordRequest {
            token: Some(t.to_string()),
            password: Some("brand new horse".into()),
        };
        svc.reset_password(reset(&token), now).await.unwrap();
        assert!(matches!(
            svc.reset_password(reset(&token), now).await,
            Err(ServiceError::Validation { .. })
        ));

        let login = LoginRequest {
            email: Some("ana@example.com".into()),
            password: Some("brand new horse".into()),
        };
        assert!(svc.login(login).await.is_ok());
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let (svc, outbox) = service();
        svc.register(register("ana@example.com", "correct horse")).await.unwrap();
        let now = Utc::now();
        svc.request_password_reset(ForgotPasswordRequest { email: Some("ana@example.com".into()) }, now)
            .await
            .unwrap();
        let token = token_from(&outbox.last_to("ana@example.com").await.unwrap().html);

        let later = now + Duration::minutes(AppConfig::development().security.reset_token_ttl_minutes + 1);
        let request = ResetPasswordRequest {
            token: Some(token),
            password: Some("brand new horse".into()),
        };
        assert!(matches!(
            svc.reset_password(request, later).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_email_sends_nothing() {
        let (svc, outbox) = service();
        svc.request_password_reset(ForgotPasswordRequest { email: Some("nobody@example.com".into()) }, Utc::now())
            .await
            .unwrap();
        assert!(outbox.sent().await.is_empty());
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let (svc, _) = service();
        let first = svc.ensure_admin("Root", "admin@example.com", "admin password").await.unwrap();
        let second = svc.ensure_admin("Root", "Admin@Example.com", "admin password").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);
    }

    #[tokio::test]
    async fn ensure_admin_refuses_a_tenant_email() {
        let (svc, _) = service();
        let tenant = svc.register(register("boss@example.com", "long enough pw")).await.unwrap();
        assert!(matches!(
            svc.ensure_admin("Boss", "boss@example.com", "admin password").await,
            Err(ServiceError::Conflict(_))
        ));
        // The tenant account is left as it was
        let session = svc
            .login(LoginRequest {
                email: Some("boss@example.com".into()),
                password: Some("long enough pw".into()),
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, tenant.user.id);
        assert_eq!(session.user.role, Role::Tenant);
    }
}
