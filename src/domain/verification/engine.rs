//! Verification engine
//!
//! Initiation persists the pending account material (bcrypt hash, full
//! name, target) against a six-digit code; verification consumes the
//! record and materializes `userAuth` + `userProfile` in one transaction.
//! The transaction is the correctness lynchpin: if profile creation
//! fails, the account insert and the record consumption roll back
//! together and the code stays usable.

use crate::collaborators::{EmailMessage, EmailSender, ProfileCreator, SmsSender};
use crate::db::models::{now_unix, Role, TargetType, UserAuth, UserProfile, UserVerification};
use crate::db::repository::{
    with_transaction, Repository, RepositoryError, TransactionConfig,
};
use crate::db::stores::{UserAuthStore, VerificationStore};
use crate::domain::auth::password;
use crate::domain::auth::TokenManager;
use crate::domain::rate_limit::{Action, Quota, RateLimiter};
use crate::error::{ApiError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::code::generate_code;

/// Tunables for the verification flow.
#[derive(Debug, Clone)]
pub struct VerificationSettings {
    /// Lifetime of a code, seconds. New codes from resends get the same.
    pub code_ttl_secs: i64,
    /// Attempts allowed per verification id before 429.
    pub max_attempts: u32,
    /// Verification attempts allowed per IP per window.
    pub ip_limit: u32,
    /// Window for both per-IP and per-id budgets.
    pub window: Duration,
    pub bcrypt_cost: u32,
    /// Origin the emailed verification link points at.
    pub web_domain: String,
    pub email_from: String,
}

/// Signup-time inputs captured into the verification record.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub user_id: Uuid,
    pub target: String,
    pub target_type: TargetType,
    pub plaintext_password: String,
    pub full_name: String,
    pub remote_ip: String,
    pub user_agent: String,
}

/// Outcome of initiation; no secrets, no token.
#[derive(Debug, Clone)]
pub struct VerificationStarted {
    pub verification_id: Uuid,
    pub expires_at: i64,
}

/// Outcome of successful verification.
#[derive(Debug, Clone)]
pub struct SignupCompleted {
    pub user: UserAuth,
}

/// Internal rejection reasons. Externally they all collapse into one
/// generic validation failure; the tag only reaches the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Missing,
    AlreadyVerified,
    AlreadyUsed,
    IpMismatch,
    WrongCode,
    Expired,
}

impl Rejection {
    fn tag(&self) -> &'static str {
        match self {
            Rejection::Missing => "missing",
            Rejection::AlreadyVerified => "already_verified",
            Rejection::AlreadyUsed => "already_used",
            Rejection::IpMismatch => "ip_mismatch",
            Rejection::WrongCode => "wrong_code",
            Rejection::Expired => "expired",
        }
    }
}

pub struct VerificationEngine {
    repo: Arc<dyn Repository>,
    limiter: Arc<RateLimiter>,
    tokens: Arc<TokenManager>,
    profiles: Arc<dyn ProfileCreator>,
    email: Arc<dyn EmailSender>,
    sms: Arc<dyn SmsSender>,
    settings: VerificationSettings,
}

impl VerificationEngine {
    pub fn new(
        repo: Arc<dyn Repository>,
        limiter: Arc<RateLimiter>,
        tokens: Arc<TokenManager>,
        profiles: Arc<dyn ProfileCreator>,
        email: Arc<dyn EmailSender>,
        sms: Arc<dyn SmsSender>,
        settings: VerificationSettings,
    ) -> Self {
        Self {
            repo,
            limiter,
            tokens,
            profiles,
            email,
            sms,
            settings,
        }
    }

    fn ip_quota(&self) -> Quota {
        Quota::new(self.settings.ip_limit, self.settings.window)
    }

    fn attempt_quota(&self) -> Quota {
        Quota::new(self.settings.max_attempts, self.settings.window)
    }

    fn rejection(&self, id: Option<Uuid>, reason: Rejection) -> ApiError {
        warn!(
            verification_id = ?id,
            reason = reason.tag(),
            "Verification rejected"
        );
        ApiError::validation("Verification failed", None)
    }

    /// Starts a verification: validates password strength, hashes it,
    /// persists the record and delivers the code.
    pub async fn initiate(&self, request: InitiateRequest) -> Result<VerificationStarted> {
        password::validate_strength(&request.plaintext_password, "newPassword")?;
        let hashed_password =
            password::hash_password(&request.plaintext_password, self.settings.bcrypt_cost).await?;

        let code = generate_code();
        let record = UserVerification::new(
            request.user_id,
            &code,
            &request.target,
            request.target_type,
            hashed_password,
            &request.full_name,
            &request.remote_ip,
            self.settings.code_ttl_secs,
        );
        let record = VerificationStore::insert(self.repo.as_ref(), &record).await?;

        self.deliver_code(&record, &code).await?;

        info!(
            verification_id = %record.object_id,
            target_type = %record.target_type,
            "Verification initiated"
        );
        Ok(VerificationStarted {
            verification_id: record.object_id,
            expires_at: record.expires_at,
        })
    }

    async fn deliver_code(&self, record: &UserVerification, code: &str) -> Result<()> {
        match record.target_type {
            TargetType::Email => {
                let link = format!(
                    "{}/auth/verify?verificationId={}&code={}",
                    self.settings.web_domain, record.object_id, code
                );
                let message = EmailMessage {
                    from: self.settings.email_from.clone(),
                    to: record.target.clone(),
                    subject: "Verify your account".to_string(),
                    body_html: format!(
                        "<p>Your verification code is <strong>{}</strong>.</p>\
                         <p>Or follow <a href=\"{}\">this link</a>. The code expires in {} minutes.</p>",
                        code,
                        link,
                        self.settings.code_ttl_secs / 60
                    ),
                };
                self.email.send(&message).await
            }
            TargetType::Phone => {
                self.sms
                    .send(&record.target, &format!("Your verification code is {}", code))
                    .await
            }
        }
    }

    /// Verifies a code and completes the signup. On success the limiter
    /// window for the verification id is cleared and a bearer token is
    /// minted for the new account.
    pub async fn verify(
        &self,
        verification_id: Uuid,
        code: &str,
        remote_ip: &str,
    ) -> Result<SignupCompleted> {
        // Keys are prefixed so the engine's buckets stay disjoint from the
        // route-level limiter sharing this state.
        self.limiter
            .check(
                &format!("verify-ip:{}", remote_ip),
                Action::Verification,
                self.ip_quota(),
            )
            .map_err(|retry| ApiError::rate_limited(retry.0))?;
        self.limiter
            .check(
                &format!("verify-id:{}", verification_id),
                Action::Verification,
                self.attempt_quota(),
            )
            .map_err(|retry| ApiError::rate_limited(retry.0))?;

        let record = VerificationStore::find_by_id(self.repo.as_ref(), verification_id)
            .await?
            .ok_or_else(|| self.rejection(Some(verification_id), Rejection::Missing))?;

        if record.is_verified {
            return Err(self.rejection(Some(verification_id), Rejection::AlreadyVerified));
        }
        if record.used {
            return Err(self.rejection(Some(verification_id), Rejection::AlreadyUsed));
        }
        if record.remote_ip != remote_ip {
            return Err(self.rejection(Some(verification_id), Rejection::IpMismatch));
        }
        if record.code != code {
            VerificationStore::increment_counter(self.repo.as_ref(), verification_id).await?;
            return Err(self.rejection(Some(verification_id), Rejection::WrongCode));
        }
        if record.is_expired(now_unix()) {
            return Err(self.rejection(Some(verification_id), Rejection::Expired));
        }

        let user = self.complete_signup(&record).await?;
        self.limiter
            .reset(&format!("verify-id:{}", verification_id), Action::Verification);

        info!(
            verification_id = %verification_id,
            user_id = %user.object_id,
            "Verification completed"
        );
        Ok(SignupCompleted { user })
    }

    /// Consumes the record and creates `userAuth` + `userProfile` in one
    /// transaction. A `duplicate_key` on the username unique index means a
    /// parallel commit already created the account: treat as verified and
    /// return the existing row.
    async fn complete_signup(&self, record: &UserVerification) -> Result<UserAuth> {
        let mut user = UserAuth::new(
            record.user_id,
            &record.target,
            &record.hashed_password,
            Role::User,
        );
        user.email_verified = record.target_type == TargetType::Email;
        user.phone_verified = record.target_type == TargetType::Phone;
        let profile = UserProfile::bootstrap(record.user_id, &record.full_name, &record.target);
        let verification_id = record.object_id;

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
                    VerificationStore::mark_used(tx, verification_id).await?;
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
            Ok(()) => Ok(user),
            // Raced with ourselves: the record was consumed between the
            // pre-checks and the commit.
            Err(RepositoryError::NotFound) => {
                Err(self.rejection(Some(verification_id), Rejection::AlreadyUsed))
            }
            // Double commit: the account exists, proceed to token minting.
            Err(RepositoryError::DuplicateKey(field)) => {
                warn!(
                    verification_id = %verification_id,
                    field = %field,
                    "Duplicate key during signup completion; treating as already verified"
                );
                UserAuthStore::find_by_username(self.repo.as_ref(), &record.target)
                    .await?
                    .ok_or_else(|| ApiError::duplicate_key("Account already exists"))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Installs a fresh code and expiry on an unconsumed record and
    /// re-delivers it.
    pub async fn resend(&self, verification_id: Uuid, remote_ip: &str) -> Result<()> {
        self.limiter
            .check(
                &format!("verify-ip:{}", remote_ip),
                Action::Verification,
                self.ip_quota(),
            )
            .map_err(|retry| ApiError::rate_limited(retry.0))?;

        let record = VerificationStore::find_by_id(self.repo.as_ref(), verification_id)
            .await?
            .ok_or_else(|| self.rejection(Some(verification_id), Rejection::Missing))?;
        if record.used || record.is_verified {
            return Err(self.rejection(Some(verification_id), Rejection::AlreadyUsed));
        }

        let code = generate_code();
        let expires_at = now_unix() + self.settings.code_ttl_secs;
        VerificationStore::refresh_code(self.repo.as_ref(), verification_id, &code, expires_at)
            .await?;

        let mut refreshed = record;
        refreshed.code = code.clone();
        refreshed.expires_at = expires_at;
        self.deliver_code(&refreshed, &code).await?;

        info!(verification_id = %verification_id, "Verification code resent");
        Ok(())
    }

    /// Mints the post-verification bearer token, records its `jti` and
    /// returns the token together with the profile display name.
    pub async fn mint_session(
        &self,
        user: &UserAuth,
    ) -> Result<(crate::domain::auth::MintedToken, String)> {
        let display_name = self
            .profiles
            .get_profile(self.repo.as_ref(), user.object_id)
            .await?
            .map(|profile| profile.full_name)
            .unwrap_or_else(|| user.username.clone());
        let minted = self.tokens.generate(user, &display_name)?;
        UserAuthStore::set_access_token_id(self.repo.as_ref(), user.object_id, &minted.jti)
            .await?;
        Ok((minted, display_name))
    }
}
