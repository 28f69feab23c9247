//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::config::StoreCredential;
use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Structured form of a store credential secret.
#[derive(Debug, Deserialize)]
struct StoreSecret {
    #[serde(alias = "service_key", alias = "serviceKey")]
    password: String,
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Extract the credential from a secret string.
///
/// Accepts either the bare key or a JSON object with a `password`
/// (or `service_key`) field.
pub fn parse_store_secret(secret: &str) -> Result<String> {
    let trimmed = secret.trim();
    if trimmed.starts_with('{') {
        let parsed: StoreSecret = serde_json::from_str(trimmed)
            .map_err(|e| Error::Aws(format!("Failed to parse store credential: {}", e)))?;
        return Ok(parsed.password);
    }
    if trimmed.is_empty() {
        return Err(Error::Aws("Store credential secret is empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Resolve the configured store credential, fetching it from Secrets Manager if needed.
pub async fn resolve_store_credential(credential: &StoreCredential) -> Result<Option<String>> {
    match credential {
        StoreCredential::Key(key) => Ok(Some(key.clone())),
        StoreCredential::None => Ok(None),
        StoreCredential::SecretArn(arn) => {
            let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            let client = SecretsClient::new(&config);
            let secret = get_secret(&client, arn).await?;
            parse_store_secret(&secret).map(Some)
        }
    }
}
