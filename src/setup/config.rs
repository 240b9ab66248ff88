use std::env;

use derive_more::Display;

#[derive(Debug, Display)]
pub enum ConfigError {
    Missing(String),
    Invalid(String),
}

impl std::error::Error for ConfigError {}

/// Everything the process reads from the environment, gathered once at
/// startup so a missing variable fails fast instead of mid-request.
#[derive(Debug, Clone)]
pub struct Config {
    pub surreal_url: String,
    pub surreal_username: String,
    pub surreal_password: String,
    pub surreal_namespace: String,
    pub surreal_database: String,

    pub port: u16,
    pub app_env: String,

    pub resend_api_key: String,
    pub email_domain: String,

    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub hashing_secret: String,
    pub access_token_exp_minutes: i64,
    pub refresh_token_exp_days: i64,

    pub otp_exp_minutes: i64,
    pub max_otp_requests_per_day: u32,

    pub avatar_dir: String,
    pub avatar_base_url: String,

    pub admin_emails: Vec<String>,
}

fn required(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    optional(name, default)
        .parse()
        .map_err(|_| ConfigError::Invalid(name.to_string()))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            surreal_url: optional("SURREAL_URL", "127.0.0.1:8000"),
            surreal_username: required("SURREAL_USERNAME")?,
            surreal_password: required("SURREAL_PASSWORD")?,
            surreal_namespace: optional("SURREAL_NAMESPACE", "afrad"),
            surreal_database: optional("SURREAL_DATABASE", "auth"),

            port: parsed("PORT", "8080")?,
            app_env: optional("APP_ENV", "development"),

            resend_api_key: required("RESEND_API_KEY")?,
            email_domain: required("EMAIL_DOMAIN")?,

            access_token_secret: required("ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?,
            hashing_secret: required("HASHING_SECRET")?,
            access_token_exp_minutes: parsed("ACCESS_TOKEN_EXP_IN_MIN", "15")?,
            refresh_token_exp_days: parsed("REFRESH_TOKEN_EXP_IN_DAYS", "30")?,

            otp_exp_minutes: parsed("OTP_EXP_IN_MIN", "10")?,
            max_otp_requests_per_day: parsed("MAX_OTP_REQUESTS_PER_DAY", "5")?,

            avatar_dir: optional("AVATAR_DIR", "uploads/avatars"),
            avatar_base_url: optional("AVATAR_BASE_URL", "/static/avatars"),

            admin_emails: optional("ADMIN_EMAILS", "")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect(),
        })
    }

    pub fn secure_cookies(&self) -> bool {
        self.app_env == "production"
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            surreal_url: "127.0.0.1:8000".into(),
            surreal_username: "root".into(),
            surreal_password: "root".into(),
            surreal_namespace: "afrad".into(),
            surreal_database: "test".into(),
            port: 0,
            app_env: "test".into(),
            resend_api_key: String::new(),
            email_domain: "example.com".into(),
            access_token_secret: "access-secret".into(),
            refresh_token_secret: "refresh-secret".into(),
            hashing_secret: "hash-secret".into(),
            access_token_exp_minutes: 15,
            refresh_token_exp_days: 30,
            otp_exp_minutes: 10,
            max_otp_requests_per_day: 5,
            avatar_dir: "uploads/avatars".into(),
            avatar_base_url: "/static/avatars".into(),
            admin_emails: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookies_are_secure_only_in_production() {
        let mut config = Config::for_tests();
        assert!(!config.secure_cookies());
        config.app_env = "production".into();
        assert!(config.secure_cookies());
    }
}
