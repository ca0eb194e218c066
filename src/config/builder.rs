use super::{defaults::*, environment::Environment, keys::KeyMaterial, logger::Logger};
use crate::error::{ApiError, Result};
use ::sentry::ClientInitGuard as SentryGuard;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_environment")]
    pub environment: Environment,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub sentry_dsn: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Token issuer (`iss` claim).
    #[serde(default = "default_org_name")]
    pub org_name: String,
    /// Web origin (`aud` claim) links in outbound email point at.
    #[serde(default = "default_web_domain")]
    pub web_domain: String,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    /// P-256 private key PEM. Required outside development; development
    /// falls back to an ephemeral key.
    pub jwt_private_key: Option<String>,
    #[serde(default = "default_jwt_kid")]
    pub jwt_kid: String,
    /// Previous public key kept valid through a rotation grace window.
    pub jwt_previous_kid: Option<String>,
    pub jwt_previous_public_key: Option<String>,
    #[serde(default = "default_hmac_secret")]
    pub hmac_secret: String,
    pub bcrypt_cost: Option<u32>,

    #[serde(default = "default_email_from")]
    pub email_from: String,

    #[serde(default = "default_verification_ttl_secs")]
    pub verification_ttl_secs: i64,
    #[serde(default = "default_verification_max_attempts")]
    pub verification_max_attempts: u32,
    #[serde(default = "default_verification_ip_limit")]
    pub verification_ip_limit: u32,
    #[serde(default = "default_verification_ip_window_secs")]
    pub verification_ip_window_secs: u64,
    #[serde(default = "default_reset_token_ttl_secs")]
    pub reset_token_ttl_secs: i64,
    #[serde(default = "default_reaper_interval_secs")]
    pub reaper_interval_secs: u64,
    #[serde(default = "default_reaper_grace_secs")]
    pub reaper_grace_secs: i64,

    /// Opt-in: invalidate outstanding tokens when the password changes by
    /// rotating `access_token_id`.
    #[serde(default)]
    pub rotate_token_on_password_change: bool,

    #[serde(default = "default_action_rate_limit")]
    pub signup_rate_limit: u32,
    #[serde(default = "default_action_rate_limit")]
    pub login_rate_limit: u32,
    #[serde(default = "default_action_rate_limit")]
    pub password_reset_rate_limit: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(skip)]
    _services: Option<Arc<Services>>,
}

struct Services {
    _sentry_guard: Option<SentryGuard>,
}

impl Config {
    pub fn load() -> std::io::Result<Self> {
        let mut config = Self::load_from_env()?;

        // Initialize services
        let services = Services {
            _sentry_guard: super::sentry::init(&config.sentry_dsn, &config.environment),
        };

        // Initialize logger last so it can log service initialization
        Logger::init(&config.log_level);

        config._services = Some(Arc::new(services));
        Ok(config)
    }

    fn load_from_env() -> std::io::Result<Self> {
        Self::from_env().map_err(|e| {
            error!("Configuration error: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, e)
        })
    }

    fn from_env() -> Result<Self> {
        envy::from_env()
            .map_err(|error| ApiError::configuration_error(format!("Configuration error: {}", error)))
    }

    /// Builds the frozen ECDSA key material. Outside development a
    /// missing private key is a startup failure.
    pub fn key_material(&self) -> Result<KeyMaterial> {
        let previous = match (&self.jwt_previous_kid, &self.jwt_previous_public_key) {
            (Some(kid), Some(pem)) => Some((kid.as_str(), pem.as_str())),
            _ => None,
        };
        match &self.jwt_private_key {
            Some(pem) => KeyMaterial::from_private_pem(pem, &self.jwt_kid, previous),
            None if self.environment.is_development() => {
                KeyMaterial::generate_ephemeral(&self.jwt_kid)
            }
            None => Err(ApiError::configuration_error(
                "JWT_PRIVATE_KEY is required outside development",
            )),
        }
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost.unwrap_or(bcrypt::DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_config() -> Config {
        // Deserializing from an empty map exercises every default.
        envy::from_iter::<_, Config>(std::iter::empty::<(String, String)>()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = bare_config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_ttl_secs, 3600);
        assert_eq!(config.verification_ttl_secs, 900);
        assert_eq!(config.verification_max_attempts, 5);
        assert_eq!(config.verification_ip_limit, 10);
        assert!(!config.rotate_token_on_password_change);
    }

    #[test]
    fn test_dev_falls_back_to_ephemeral_keys() {
        let config = bare_config();
        assert!(config.environment.is_development());
        assert!(config.key_material().is_ok());
    }
}
