//! Auth orchestrator
//!
//! Composes the credential store, token service and verification engine
//! into the user-facing flows: signup, login, password change, password
//! forget and password reset, plus the HMAC-guarded admin operations.
//!
//! Enumeration safety is a design rule here: "no such user" and "wrong
//! password" are the same external error with a bcrypt compare burned on
//! both paths, and password-forget answers 200 whether or not the account
//! exists.

use crate::collaborators::{CaptchaVerifier, EmailMessage, EmailSender, ProfileCreator};
use crate::db::models::{now_unix, Role, TargetType, UserAuth, UserProfile};
use crate::db::repository::{
    with_transaction, Repository, RepositoryError, TransactionConfig,
};
use crate::db::stores::{ResetTokenStore, UserAuthStore};
use crate::db::models::ResetToken;
use crate::domain::verification::{InitiateRequest, VerificationEngine, VerificationStarted};
use crate::error::{ApiError, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use super::password;
use super::tokens::TokenManager;

/// Tunables for the orchestrated flows.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub web_domain: String,
    pub email_from: String,
    pub reset_token_ttl_secs: i64,
    pub bcrypt_cost: u32,
    /// Opt-in: rotate `access_token_id` on password change/reset so
    /// outstanding tokens stop matching.
    pub rotate_token_on_password_change: bool,
}

/// Signup-form inputs after field validation at the edge.
#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub new_password: String,
    pub verify_type: TargetType,
    pub captcha_token: String,
    pub remote_ip: String,
    pub user_agent: String,
}

/// A logged-in session: the account, its display name and a fresh bearer
/// token. Never carried in cookies.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserAuth,
    pub display_name: String,
    pub access_token: String,
}

pub struct AuthService {
    repo: Arc<dyn Repository>,
    tokens: Arc<TokenManager>,
    engine: Arc<VerificationEngine>,
    captcha: Arc<dyn CaptchaVerifier>,
    email: Arc<dyn EmailSender>,
    profiles: Arc<dyn ProfileCreator>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        repo: Arc<dyn Repository>,
        tokens: Arc<TokenManager>,
        engine: Arc<VerificationEngine>,
        captcha: Arc<dyn CaptchaVerifier>,
        email: Arc<dyn EmailSender>,
        profiles: Arc<dyn ProfileCreator>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            repo,
            tokens,
            engine,
            captcha,
            email,
            profiles,
            settings,
        }
    }

    pub fn verification_engine(&self) -> &VerificationEngine {
        &self.engine
    }

    // =========================================================================
    // SIGNUP
    // =========================================================================

    /// Validates the CAPTCHA and opens a verification. The response carries
    /// no secrets and no token; those arrive only after code verification.
    pub async fn signup(&self, request: SignupRequest) -> Result<VerificationStarted> {
        let captcha_ok = self
            .captcha
            .verify(&request.captcha_token, &request.remote_ip)
            .await?;
        if !captcha_ok {
            return Err(ApiError::validation(
                "CAPTCHA verification failed",
                Some(serde_json::json!({ "field": "g-recaptcha-response" })),
            ));
        }

        self.engine
            .initiate(InitiateRequest {
                user_id: Uuid::new_v4(),
                target: request.email,
                target_type: request.verify_type,
                plaintext_password: request.new_password,
                full_name: request.full_name,
                remote_ip: request.remote_ip,
                user_agent: request.user_agent,
            })
            .await
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    /// Authenticates a username/password pair and mints a session with a
    /// fresh `jti`, which is recorded on the account.
    pub async fn login(&self, username: &str, password_input: &str) -> Result<AuthSession> {
        let user = match UserAuthStore::find_by_username(self.repo.as_ref(), username).await? {
            Some(user) => user,
            None => {
                // Same external error and comparable latency as the
                // wrong-password path.
                password::equalize_timing(password_input).await;
                warn!(username = %username, "Login attempt for unknown username");
                return Err(ApiError::unauthorized("Invalid credentials"));
            }
        };

        if !password::verify_password(password_input, &user.password).await? {
            warn!(user_id = %user.object_id, "Login attempt with wrong password");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        let session = self.mint_session(user).await?;
        info!(user_id = %session.user.object_id, "User logged in");
        Ok(session)
    }

    async fn mint_session(&self, mut user: UserAuth) -> Result<AuthSession> {
        let display_name = self
            .profiles
            .get_profile(self.repo.as_ref(), user.object_id)
            .await?
            .map(|profile| profile.full_name)
            .unwrap_or_else(|| user.username.clone());

        let minted = self.tokens.generate(&user, &display_name)?;
        UserAuthStore::set_access_token_id(self.repo.as_ref(), user.object_id, &minted.jti)
            .await?;
        user.access_token_id = Some(minted.jti);

        Ok(AuthSession {
            user,
            display_name,
            access_token: minted.token,
        })
    }

    // =========================================================================
    // PASSWORD CHANGE
    // =========================================================================

    /// Changes the password of the bearer-authenticated account.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if new_password != confirm_password {
            return Err(ApiError::validation(
                "Passwords do not match",
                Some(serde_json::json!({ "field": "confirmPassword" })),
            ));
        }

        let user = UserAuthStore::find_by_id(self.repo.as_ref(), user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

        if !password::verify_password(current_password, &user.password).await? {
            warn!(user_id = %user_id, "Password change with wrong current password");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        password::validate_strength(new_password, "newPassword")?;
        let new_hash = password::hash_password(new_password, self.settings.bcrypt_cost).await?;
        UserAuthStore::update_password(self.repo.as_ref(), user_id, &new_hash).await?;

        if self.settings.rotate_token_on_password_change {
            UserAuthStore::set_access_token_id(
                self.repo.as_ref(),
                user_id,
                &Uuid::new_v4().to_string(),
            )
            .await?;
        }

        info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    // =========================================================================
    // PASSWORD FORGET / RESET
    // =========================================================================

    /// Opens a reset window for the address. Responds identically whether
    /// or not the account exists; only the log knows.
    pub async fn forget_password(&self, email: &str) -> Result<()> {
        let user = UserAuthStore::find_by_username(self.repo.as_ref(), email).await?;
        let Some(user) = user else {
            // Burn the same hash work as the real path.
            let _ = hash_reset_secret(&generate_reset_secret());
            info!(email = %email, "Password reset requested for unknown email");
            return Ok(());
        };

        let secret = generate_reset_secret();
        let record = ResetToken::new(
            email,
            hash_reset_secret(&secret),
            self.settings.reset_token_ttl_secs,
        );
        ResetTokenStore::insert(self.repo.as_ref(), &record).await?;

        let link = format!("{}/auth/password/reset/{}", self.settings.web_domain, secret);
        let message = EmailMessage {
            from: self.settings.email_from.clone(),
            to: email.to_string(),
            subject: "Reset your password".to_string(),
            body_html: format!(
                "<p>Follow <a href=\"{}\">this link</a> to reset your password. \
                 It expires in {} minutes.</p>",
                link,
                self.settings.reset_token_ttl_secs / 60
            ),
        };
        self.email.send(&message).await.map_err(|e| {
            warn!(error = %e, "Reset email send failed");
            ApiError::internal("Failed to send reset email")
        })?;

        info!(user_id = %user.object_id, "Password reset initiated");
        Ok(())
    }

    /// Completes a reset: single-use, constant-time token match, atomic
    /// consume-and-update.
    pub async fn reset_password(
        &self,
        plaintext_token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if new_password != confirm_password {
            return Err(ApiError::validation(
                "Passwords do not match",
                Some(serde_json::json!({ "field": "confirmPassword" })),
            ));
        }

        let hashed = hash_reset_secret(plaintext_token);
        let record =
            ResetTokenStore::find_live_by_hash(self.repo.as_ref(), &hashed, now_unix())
                .await?
                .ok_or_else(|| invalid_reset_token())?;

        // The index lookup found the row; the constant-time comparison is
        // the authoritative check.
        if !bool::from(record.hashed_token.as_bytes().ct_eq(hashed.as_bytes())) {
            return Err(invalid_reset_token());
        }

        password::validate_strength(new_password, "newPassword")?;

        let user = UserAuthStore::find_by_username(self.repo.as_ref(), &record.email)
            .await?
            .ok_or_else(|| invalid_reset_token())?;

        let new_hash = password::hash_password(new_password, self.settings.bcrypt_cost).await?;
        let rotate = self.settings.rotate_token_on_password_change;
        let record_id = record.object_id;
        let user_id = user.object_id;
        let email = record.email.clone();
        let new_hash_for_tx = new_hash.clone();

        let outcome = with_transaction(
            self.repo.as_ref(),
            TransactionConfig::default(),
            move |tx| {
                let new_hash = new_hash_for_tx.clone();
                let email = email.clone();
                Box::pin(async move {
                    ResetTokenStore::mark_used(tx, record_id).await?;
                    // Two forget requests leave two live rows; completing
                    // with either one consumes them all.
                    ResetTokenStore::consume_all_for_email(tx, &email).await?;
                    UserAuthStore::update_password(tx, user_id, &new_hash).await?;
                    if rotate {
                        UserAuthStore::set_access_token_id(
                            tx,
                            user_id,
                            &Uuid::new_v4().to_string(),
                        )
                        .await?;
                    }
                    Ok(())
                })
            },
        )
        .await;

        match outcome {
            Ok(()) => {
                info!(user_id = %user_id, "Password reset completed");
                Ok(())
            }
            // Of two racing resets, the loser touches zero rows.
            Err(RepositoryError::NotFound) => Err(invalid_reset_token()),
            Err(other) => Err(other.into()),
        }
    }

    // =========================================================================
    // ADMIN
    // =========================================================================

    /// Whether the given account exists and carries the admin role.
    pub async fn admin_check(&self, user_id: Uuid) -> Result<bool> {
        Ok(UserAuthStore::find_by_id(self.repo.as_ref(), user_id)
            .await?
            .map(|user| user.is_admin())
            .unwrap_or(false))
    }

    /// Creates an account without the verification flow. Admin-only
    /// surface behind HMAC auth; the target is considered pre-verified.
    pub async fn admin_signup(
        &self,
        username: &str,
        email: &str,
        password_input: &str,
        role: Role,
    ) -> Result<UserAuth> {
        password::validate_strength(password_input, "password")?;
        let hash = password::hash_password(password_input, self.settings.bcrypt_cost).await?;

        let mut user = UserAuth::new(Uuid::new_v4(), username, hash, role);
        user.email_verified = true;
        let profile = UserProfile::bootstrap(user.object_id, username, email);

        let user_for_tx = user.clone();
        let profiles = Arc::clone(&self.profiles);
        let outcome = with_transaction(
            self.repo.as_ref(),
            TransactionConfig::default(),
            move |tx| {
                let user = user_for_tx.clone();
                let profile = profile.clone();
                let profiles = Arc::clone(&profiles);
                Box::pin(async move {
                    UserAuthStore::insert(tx, &user).await?;
                    profiles
                        .create_profile_on_signup(tx, &profile)
                        .await
                        .map_err(|e| RepositoryError::TransactionFailed(e.to_string()))?;
                    Ok(())
                })
            },
        )
        .await;

        match outcome {
            Ok(()) => {
                info!(user_id = %user.object_id, role = %user.role, "Admin signup");
                Ok(user)
            }
            Err(RepositoryError::DuplicateKey(_)) => {
                Err(ApiError::duplicate_key("Username already exists"))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Login restricted to admin accounts; non-admins get `forbidden`.
    pub async fn admin_login(&self, email: &str, password_input: &str) -> Result<AuthSession> {
        let session = self.login(email, password_input).await?;
        if !session.user.is_admin() {
            warn!(user_id = %session.user.object_id, "Admin login by non-admin account");
            return Err(ApiError::forbidden("Admin role required"));
        }
        Ok(session)
    }
}

fn invalid_reset_token() -> ApiError {
    ApiError::validation("Invalid or expired reset token", None)
}

/// 24 random bytes, hex-encoded: 48 characters of secret.
fn generate_reset_secret() -> String {
    let mut bytes = [0u8; 24];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hex of the plaintext secret; the only form ever persisted.
pub fn hash_reset_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_secret_shape() {
        let secret = generate_reset_secret();
        assert_eq!(secret.len(), 48);
        assert_ne!(secret, generate_reset_secret());
    }

    #[test]
    fn test_reset_secret_hash_is_deterministic() {
        let secret = "a".repeat(48);
        assert_eq!(hash_reset_secret(&secret), hash_reset_secret(&secret));
        assert_eq!(hash_reset_secret(&secret).len(), 64);
        assert_ne!(hash_reset_secret(&secret), secret);
    }
}
