//! Configuration management for Lambda functions.

use std::env;

use crate::{Error, Result};

/// Admin password used when `ADMIN_PASSWORD` is not set.
pub const DEFAULT_ADMIN_PASSWORD: &str = "3325";

/// Table holding the calendar record.
pub const DEFAULT_TABLE: &str = "ccr_data";

/// Where the store service credential comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCredential {
    /// Credential given directly in the environment.
    Key(String),
    /// ARN of a Secrets Manager secret holding the credential.
    SecretArn(String),
    /// No credential (only valid for the in-memory backend or URLs carrying one).
    None,
}

/// Store backend, selected by the scheme of the store URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Rest,
    Memory,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store endpoint URL
    pub store_url: String,
    /// Store service credential
    pub store_credential: StoreCredential,
    /// Shared secret for writes and password checks
    pub admin_password: String,
    /// True when `admin_password` fell back to the built-in default
    pub admin_password_is_default: bool,
    /// Table name
    pub table: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_url = lookup("SUPABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Config("SUPABASE_URL not set".to_string()))?;

        let store_credential = match (
            lookup("SUPABASE_SERVICE_KEY").filter(|v| !v.is_empty()),
            lookup("SUPABASE_SERVICE_KEY_SECRET_ARN").filter(|v| !v.is_empty()),
        ) {
            (Some(key), _) => StoreCredential::Key(key),
            (None, Some(arn)) => StoreCredential::SecretArn(arn),
            (None, None) => StoreCredential::None,
        };

        let (admin_password, admin_password_is_default) = match lookup("ADMIN_PASSWORD") {
            Some(password) if !password.is_empty() => (password, false),
            _ => (DEFAULT_ADMIN_PASSWORD.to_string(), true),
        };

        let config = Self {
            store_url,
            store_credential,
            admin_password,
            admin_password_is_default,
            table: lookup("CCR_TABLE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        };

        if config.backend()? == StoreBackend::Rest && config.store_credential == StoreCredential::None {
            return Err(Error::Config(
                "SUPABASE_SERVICE_KEY or SUPABASE_SERVICE_KEY_SECRET_ARN must be set".to_string(),
            ));
        }

        Ok(config)
    }

    /// Backend implied by the store URL scheme.
    pub fn backend(&self) -> Result<StoreBackend> {
        let scheme = self
            .store_url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();

        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "http" | "https" => Ok(StoreBackend::Rest),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(Error::Config(format!(
                "Unsupported store URL scheme: {:?}",
                scheme
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[
            ("SUPABASE_URL", "https://example.supabase.co"),
            ("SUPABASE_SERVICE_KEY", "service-key"),
        ])
        .unwrap();

        assert_eq!(config.admin_password, "3325");
        assert!(config.admin_password_is_default);
        assert_eq!(config.table, "ccr_data");
        assert_eq!(config.store_credential, StoreCredential::Key("service-key".to_string()));
        assert_eq!(config.backend().unwrap(), StoreBackend::Rest);
    }

    #[test]
    fn test_explicit_admin_password() {
        let config = load(&[
            ("SUPABASE_URL", "memory:"),
            ("ADMIN_PASSWORD", "hunter2"),
        ])
        .unwrap();

        assert_eq!(config.admin_password, "hunter2");
        assert!(!config.admin_password_is_default);
        assert_eq!(config.backend().unwrap(), StoreBackend::Memory);
    }

    #[test]
    fn test_empty_table_falls_back_to_default() {
        let config = load(&[("SUPABASE_URL", "memory:"), ("CCR_TABLE", "")]).unwrap();
        assert_eq!(config.table, "ccr_data");

        let config = load(&[("SUPABASE_URL", "memory:"), ("CCR_TABLE", "ccr_staging")]).unwrap();
        assert_eq!(config.table, "ccr_staging");
    }

    #[test]
    fn test_missing_url() {
        let err = load(&[("SUPABASE_SERVICE_KEY", "k")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_secret_arn_credential() {
        let config = load(&[
            ("SUPABASE_URL", "postgresql://postgres@db.example.com:5432/postgres"),
            ("SUPABASE_SERVICE_KEY_SECRET_ARN", "arn:aws:secretsmanager:us-east-1:1:secret:ccr"),
        ])
        .unwrap();

        assert_eq!(config.backend().unwrap(), StoreBackend::Postgres);
        assert!(matches!(config.store_credential, StoreCredential::SecretArn(_)));
    }

    #[test]
    fn test_rest_requires_credential() {
        let err = load(&[("SUPABASE_URL", "https://example.supabase.co")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = load(&[("SUPABASE_URL", "ftp://example.com")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
