//! Authentication and user management service

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{LoginRequest, LoginResponse, Role, SignupRequest, User, UserClaims},
    repository::UserStore,
    services::{ids::IdGenerator, password::PasswordHasher},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct UsersService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    ids: Arc<dyn IdGenerator>,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        ids: Arc<dyn IdGenerator>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            hasher,
            ids,
            config,
        }
    }

    /// Register a new reader account
    pub async fn signup(&self, request: SignupRequest) -> AppResult<User> {
        request.validate()?;

        let user = self
            .create_account(&request.email, &request.password, request.name, Role::User)
            .await?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Check an email / password pair. Every failure looks the same to the caller.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> AppResult<User> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !self.hasher.verify(password, hash)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        Ok(user)
    }

    /// Authenticate and issue a session token
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;

        let user = self.verify_credentials(&request.email, &request.password).await?;
        let response = self.issue_token(user)?;

        tracing::info!(user_id = %response.user.id, "User logged in");
        Ok(response)
    }

    /// Session token for an already authenticated user
    pub fn issue_token(&self, user: User) -> AppResult<LoginResponse> {
        let claims = UserClaims::for_user(&user, Utc::now(), self.config.jwt_expiration_hours);
        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in: claims.exp - claims.iat,
            user,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Make sure the configured administrator account exists.
    /// Does nothing when no administrator is configured.
    pub async fn ensure_admin(&self) -> AppResult<()> {
        let (Some(email), Some(password)) = (
            self.config.admin_email.as_deref(),
            self.config.admin_password.as_deref(),
        ) else {
            return Ok(());
        };

        if let Some(existing) = self.users.find_by_email(email).await? {
            if existing.role != Role::Admin {
                tracing::warn!(
                    user_id = %existing.id,
                    "Configured administrator email belongs to a non-admin account"
                );
            }
            return Ok(());
        }

        let admin = self
            .create_account(email, password, Some("Administrator".to_string()), Role::Admin)
            .await?;

        tracing::info!(user_id = %admin.id, "Administrator account created");
        Ok(())
    }

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
        role: Role,
    ) -> AppResult<User> {
        let email = email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(format!("Email {} is already registered", email)));
        }

        let now = Utc::now();
        let user = User {
            id: self.ids.generate(),
            email,
            name,
            password_hash: Some(self.hasher.hash(password)?),
            role,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await
    }
}
