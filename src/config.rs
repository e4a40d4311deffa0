// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Everything is read once at
//! startup; the resulting [`Config`] is immutable and shared through
//! [`crate::AppState`].

use std::env;
use std::str::FromStr;

/// Default schedule for the coupon scrape job (02:00 UTC daily).
pub const DEFAULT_SCRAPE_CRON: &str = "0 0 2 * * *";
/// Default schedule for the expiry sweep (04:00 UTC daily).
pub const DEFAULT_CLEANUP_CRON: &str = "0 0 4 * * *";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" => Ok(Self::Development),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::Invalid {
                name: "APP_ENV",
                reason: format!("unknown environment '{other}'"),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Server port
    pub port: u16,
    /// GCP project hosting Firestore
    pub gcp_project_id: String,
    /// Firebase project whose ID tokens we accept. `None` disables verification.
    pub firebase_project_id: Option<String>,
    /// Extra CORS origin (web dashboard)
    pub frontend_url: String,

    // --- Background jobs ---
    pub jobs_enabled: bool,
    pub scrape_cron: String,
    pub cleanup_cron: String,
    /// Coupon feed URLs polled by the scrape job
    pub scrape_sources: Vec<String>,
    /// Expired coupons older than this many days are deleted. 0 keeps them forever.
    pub expired_retention_days: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let environment = match env::var("APP_ENV") {
            Ok(raw) => raw.parse()?,
            Err(_) => Environment::Development,
        };

        let scrape_cron = env::var("SCRAPE_CRON").unwrap_or_else(|_| DEFAULT_SCRAPE_CRON.into());
        let cleanup_cron =
            env::var("CLEANUP_CRON").unwrap_or_else(|_| DEFAULT_CLEANUP_CRON.into());
        check_cron("SCRAPE_CRON", &scrape_cron)?;
        check_cron("CLEANUP_CRON", &cleanup_cron)?;

        Ok(Self {
            environment,
            port: parse_var("PORT", 5000)?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            firebase_project_id: env::var("FIREBASE_PROJECT_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            jobs_enabled: parse_var("JOBS_ENABLED", true)?,
            scrape_cron,
            cleanup_cron,
            scrape_sources: env::var("SCRAPE_SOURCES")
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
            expired_retention_days: parse_var("EXPIRED_RETENTION_DAYS", 30)?,
        })
    }

    /// Config for tests: development mode, no identity provider, jobs off.
    pub fn test_default() -> Self {
        Self {
            environment: Environment::Test,
            port: 5000,
            gcp_project_id: "test-project".to_string(),
            firebase_project_id: None,
            frontend_url: "http://localhost:3000".to_string(),
            jobs_enabled: false,
            scrape_cron: DEFAULT_SCRAPE_CRON.to_string(),
            cleanup_cron: DEFAULT_CLEANUP_CRON.to_string(),
            scrape_sources: Vec::new(),
            expired_retention_days: 30,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Raw user identifiers are accepted as bearer tokens only outside
    /// production and only while no identity project is configured.
    pub fn dev_auth_bypass_enabled(&self) -> bool {
        !self.is_production() && self.firebase_project_id.is_none()
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("cannot parse '{raw}'"),
        }),
        Err(_) => Ok(default),
    }
}

fn check_cron(name: &'static str, expr: &str) -> Result<(), ConfigError> {
    cron::Schedule::from_str(expr)
        .map(|_| ())
        .map_err(|e| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(
            "production".parse::<Environment>().unwrap(),
            Environment::Production
        );
        assert_eq!(" Dev ".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_dev_bypass_only_without_identity_project() {
        let mut config = Config::test_default();
        assert!(config.dev_auth_bypass_enabled());

        config.firebase_project_id = Some("dealora".to_string());
        assert!(!config.dev_auth_bypass_enabled());

        config.firebase_project_id = None;
        config.environment = Environment::Production;
        assert!(!config.dev_auth_bypass_enabled());
    }

    #[test]
    fn test_default_schedules_parse() {
        assert!(check_cron("SCRAPE_CRON", DEFAULT_SCRAPE_CRON).is_ok());
        assert!(check_cron("CLEANUP_CRON", DEFAULT_CLEANUP_CRON).is_ok());
        assert!(check_cron("SCRAPE_CRON", "every day").is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(" https://a.example/feed ,, https://b.example "),
            vec!["https://a.example/feed", "https://b.example"]
        );
        assert!(split_list("").is_empty());
    }
}
