use super::environment::Environment;

pub fn default_environment() -> Environment {
    Environment::Development
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_org_name() -> String {
    "auth-server".to_string()
}

pub fn default_web_domain() -> String {
    "http://localhost:3000".to_string()
}

pub fn default_access_token_ttl_secs() -> i64 {
    60 * 60
}

pub fn default_jwt_kid() -> String {
    "auth-key-1".to_string()
}

pub fn default_hmac_secret() -> String {
    "development-hmac-secret".to_string()
}

pub fn default_email_from() -> String {
    "no-reply@localhost".to_string()
}

pub fn default_verification_ttl_secs() -> i64 {
    900
}

pub fn default_verification_max_attempts() -> u32 {
    5
}

pub fn default_verification_ip_limit() -> u32 {
    10
}

pub fn default_verification_ip_window_secs() -> u64 {
    900
}

pub fn default_reset_token_ttl_secs() -> i64 {
    900
}

pub fn default_reaper_interval_secs() -> u64 {
    450
}

pub fn default_reaper_grace_secs() -> i64 {
    3600
}

pub fn default_action_rate_limit() -> u32 {
    10
}

pub fn default_rate_limit_window_secs() -> u64 {
    900
}
