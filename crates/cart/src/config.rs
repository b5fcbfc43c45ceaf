//! Shop configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_STOREFRONT_TOKEN` - Storefront API access token
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2026-01)
//!
//! Missing required variables are fatal at construction time: no subsequent
//! cart operation can succeed without them, so nothing defers the failure to
//! first use.

use std::collections::HashMap;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Shopify Storefront API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2026-01)
    pub api_version: String,
    /// Storefront API access token
    pub storefront_token: SecretString,
}

impl std::fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("storefront_token", &"[REDACTED]")
            .finish()
    }
}

impl ShopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or if the
    /// access token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// The environment-free entry point used by tests.
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store = require(&lookup, "SHOPIFY_STORE")?;
        let api_version =
            lookup("SHOPIFY_API_VERSION").unwrap_or_else(|| "2026-01".to_string());
        let token = require(&lookup, "SHOPIFY_STOREFRONT_TOKEN")?;
        validate_secret_strength(&token, "SHOPIFY_STOREFRONT_TOKEN")?;

        Ok(Self {
            store,
            api_version,
            storefront_token: SecretString::from(token),
        })
    }

    /// GraphQL endpoint for this store and API version.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}/api/{}/graphql.json",
            self.store, self.api_version
        )
    }
}

fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Token length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a real access token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_missing_store_is_fatal() {
        let result = ShopConfig::from_lookup(env(&[(
            "SHOPIFY_STOREFRONT_TOKEN",
            "aB3xY9mK2nL5pQ7rT0uW4zC6",
        )]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "SHOPIFY_STORE"));
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let result = ShopConfig::from_lookup(env(&[("SHOPIFY_STORE", "test.myshopify.com")]));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "SHOPIFY_STOREFRONT_TOKEN")
        );
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let result = ShopConfig::from_lookup(env(&[
            ("SHOPIFY_STORE", "test.myshopify.com"),
            ("SHOPIFY_STOREFRONT_TOKEN", "your-token-here"),
        ]));
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_low_entropy_token_rejected() {
        let result = ShopConfig::from_lookup(env(&[
            ("SHOPIFY_STORE", "test.myshopify.com"),
            ("SHOPIFY_STOREFRONT_TOKEN", "aaaaaaaaaaaaaaaaaaaaaaaa"),
        ]));
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_valid_config() {
        let config = ShopConfig::from_lookup(env(&[
            ("SHOPIFY_STORE", "test.myshopify.com"),
            ("SHOPIFY_STOREFRONT_TOKEN", "aB3xY9mK2nL5pQ7rT0uW4zC6"),
        ]))
        .unwrap();
        assert_eq!(config.store, "test.myshopify.com");
        assert_eq!(config.api_version, "2026-01");
        assert_eq!(
            config.endpoint(),
            "https://test.myshopify.com/api/2026-01/graphql.json"
        );
    }

    #[test]
    fn test_api_version_override() {
        let config = ShopConfig::from_lookup(env(&[
            ("SHOPIFY_STORE", "test.myshopify.com"),
            ("SHOPIFY_STOREFRONT_TOKEN", "aB3xY9mK2nL5pQ7rT0uW4zC6"),
            ("SHOPIFY_API_VERSION", "2025-07"),
        ]))
        .unwrap();
        assert_eq!(config.api_version, "2025-07");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ShopConfig::from_lookup(env(&[
            ("SHOPIFY_STORE", "test.myshopify.com"),
            ("SHOPIFY_STOREFRONT_TOKEN", "aB3xY9mK2nL5pQ7rT0uW4zC6"),
        ]))
        .unwrap();

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("aB3xY9mK2nL5pQ7rT0uW4zC6"));
    }

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.0);
    }
}
