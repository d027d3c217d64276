//! Provider configuration.
//!
//! The driver hands over the provider block as a JSON object. Every field
//! may be omitted there and supplied through a `JUMPSERVER_*` environment
//! variable instead; an empty string counts as unset.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};

const ENV_BASE_URL: &str = "JUMPSERVER_BASE_URL";
const ENV_USERNAME: &str = "JUMPSERVER_USERNAME";
const ENV_PASSWORD: &str = "JUMPSERVER_PASSWORD";
const ENV_TOKEN: &str = "JUMPSERVER_TOKEN";
const ENV_ACCESS_KEY: &str = "JUMPSERVER_ACCESS_KEY";
const ENV_SECRET_KEY: &str = "JUMPSERVER_SECRET_KEY";
const ENV_SKIP_TLS_VERIFY: &str = "JUMPSERVER_SKIP_TLS_VERIFY";

/// Provider configuration as supplied by the driver, after env fallback.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// JumpServer base URL, e.g. `https://jump.example.com`.
    pub base_url: Option<String>,
    /// Login name for token authentication.
    pub username: Option<String>,
    /// Login password for token authentication.
    pub password: Option<String>,
    /// A pre-issued session token; wins over every other credential.
    pub token: Option<String>,
    /// Access key id for signed requests.
    pub access_key: Option<String>,
    /// Secret for signed requests.
    pub secret_key: Option<String>,
    /// Skip TLS certificate verification (insecure).
    pub skip_tls_verify: Option<bool>,
}

/// The credential material a session is built from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Use a token the caller already holds.
    Token(String),
    /// Sign every request with an access/secret key pair.
    KeyPair {
        /// Access key id.
        access_key: String,
        /// Shared secret.
        secret_key: String,
    },
    /// Log in once with username and password to obtain a token.
    Login {
        /// Login name.
        username: String,
        /// Login password.
        password: String,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::KeyPair { access_key, .. } => f
                .debug_struct("KeyPair")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
            Self::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Decode the provider block and fill gaps from the process environment.
    pub fn from_value(config: Value) -> Result<Self> {
        Self::from_value_with_env(config, |key| std::env::var(key).ok())
    }

    /// Like [`ProviderConfig::from_value`] with an injectable env lookup.
    pub fn from_value_with_env<F>(config: Value, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed: ProviderConfig = match config {
            Value::Null => ProviderConfig::default(),
            other => serde_json::from_value(other).map_err(|e| {
                ProviderError::Configuration(format!("invalid provider configuration: {}", e))
            })?,
        };
        Ok(parsed.with_env(lookup))
    }

    fn with_env<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |current: Option<String>, key: &str| non_empty(current).or_else(|| non_empty(lookup(key)));

        let skip_tls_verify = self
            .skip_tls_verify
            .or_else(|| lookup(ENV_SKIP_TLS_VERIFY).map(|v| parse_bool(&v)));

        Self {
            base_url: env(self.base_url, ENV_BASE_URL),
            username: env(self.username, ENV_USERNAME),
            password: env(self.password, ENV_PASSWORD),
            token: env(self.token, ENV_TOKEN),
            access_key: env(self.access_key, ENV_ACCESS_KEY),
            secret_key: env(self.secret_key, ENV_SECRET_KEY),
            skip_tls_verify,
        }
    }

    /// The base URL with any trailing slash removed.
    pub fn base_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "missing base URL: set base_url or {}",
                    ENV_BASE_URL
                ))
            })
    }

    /// Whether TLS certificate verification is disabled.
    pub fn skip_tls_verify(&self) -> bool {
        self.skip_tls_verify.unwrap_or(false)
    }

    /// Pick exactly one credential mode.
    ///
    /// A token wins, then a complete key pair, then username/password login.
    pub fn credentials(&self) -> Result<CredentialSource> {
        if let Some(token) = &self.token {
            return Ok(CredentialSource::Token(token.clone()));
        }
        if let (Some(access_key), Some(secret_key)) = (&self.access_key, &self.secret_key) {
            return Ok(CredentialSource::KeyPair {
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
            });
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return Ok(CredentialSource::Login {
                username: username.clone(),
                password: password.clone(),
            });
        }
        Err(ProviderError::Configuration(
            "missing credentials: set token, access_key and secret_key, or username and password"
                .to_string(),
        ))
    }

    /// Check the configuration without touching the network.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Err(e) = self.base_url() {
            diagnostics.push(
                Diagnostic::error("Missing base URL")
                    .with_detail(e.message())
                    .with_attribute("base_url"),
            );
        }

        match self.credentials() {
            Err(e) => diagnostics.push(Diagnostic::error("Missing credentials").with_detail(e.message())),
            Ok(CredentialSource::Token(_)) if self.access_key.is_some() && self.secret_key.is_some() => {
                diagnostics.push(
                    Diagnostic::warning("Token takes precedence over access_key/secret_key")
                        .with_attribute("token"),
                );
            },
            Ok(_) => {},
        }

        if self.access_key.is_some() != self.secret_key.is_some() {
            diagnostics.push(
                Diagnostic::warning("Incomplete key pair is ignored")
                    .with_detail("Both access_key and secret_key are needed for signed requests"),
            );
        }

        if self.skip_tls_verify() {
            diagnostics.push(
                Diagnostic::warning("TLS certificate verification is disabled")
                    .with_attribute("skip_tls_verify"),
            );
        }

        diagnostics
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .field("access_key", &self.access_key)
            .field("secret_key", &redact(&self.secret_key))
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    let optional_secret = || Attribute::optional_string().sensitive();

    Schema::v0()
        .with_description("JumpServer connection settings")
        .with_attribute(
            "base_url",
            Attribute::new(AttributeType::String, AttributeFlags::optional())
                .with_description(format!("JumpServer base URL. Falls back to {}.", ENV_BASE_URL)),
        )
        .with_attribute(
            "username",
            Attribute::optional_string()
                .with_description(format!("Login name. Falls back to {}.", ENV_USERNAME)),
        )
        .with_attribute(
            "password",
            optional_secret().with_description(format!("Login password. Falls back to {}.", ENV_PASSWORD)),
        )
        .with_attribute(
            "token",
            optional_secret().with_description(format!("Pre-issued session token. Falls back to {}.", ENV_TOKEN)),
        )
        .with_attribute(
            "access_key",
            optional_secret().with_description(format!("API access key. Falls back to {}.", ENV_ACCESS_KEY)),
        )
        .with_attribute(
            "secret_key",
            optional_secret().with_description(format!("API secret key. Falls back to {}.", ENV_SECRET_KEY)),
        )
        .with_attribute(
            "skip_tls_verify",
            Attribute::optional_bool()
                .with_default(serde_json::json!(false))
                .with_description(format!(
                    "Skip TLS certificate validation (insecure). Falls back to {}.",
                    ENV_SKIP_TLS_VERIFY
                )),
        )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_values_win_over_env() {
        let config = ProviderConfig::from_value_with_env(
            json!({"base_url": "https://jump.example.com/", "username": "admin"}),
            env(&[(ENV_BASE_URL, "https://other"), (ENV_PASSWORD, "pw")]),
        )
        .unwrap();

        assert_eq!(config.base_url().unwrap(), "https://jump.example.com");
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_empty_string_falls_back_to_env() {
        let config = ProviderConfig::from_value_with_env(
            json!({"base_url": ""}),
            env(&[(ENV_BASE_URL, "https://env.example.com")]),
        )
        .unwrap();
        assert_eq!(config.base_url().unwrap(), "https://env.example.com");
    }

    #[test]
    fn test_missing_base_url() {
        let config = ProviderConfig::from_value_with_env(json!({"token": "t"}), env(&[])).unwrap();
        assert!(matches!(config.base_url(), Err(ProviderError::Configuration(_))));

        let diagnostics = config.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("base_url"));
    }

    #[test]
    fn test_skip_tls_env_parsing() {
        for (raw, expected) in [("true", true), ("1", true), ("yes", true), ("no", false)] {
            let config = ProviderConfig::from_value_with_env(
                Value::Null,
                env(&[(ENV_SKIP_TLS_VERIFY, raw)]),
            )
            .unwrap();
            assert_eq!(config.skip_tls_verify(), expected, "value {raw}");
        }
    }

    #[test]
    fn test_credential_precedence() {
        let all = ProviderConfig::from_value_with_env(
            json!({
                "token": "tok",
                "access_key": "ak",
                "secret_key": "sk",
                "username": "u",
                "password": "p"
            }),
            env(&[]),
        )
        .unwrap();
        assert_eq!(all.credentials().unwrap(), CredentialSource::Token("tok".to_string()));

        let keys = ProviderConfig::from_value_with_env(
            json!({"access_key": "ak", "secret_key": "sk", "username": "u", "password": "p"}),
            env(&[]),
        )
        .unwrap();
        assert!(matches!(keys.credentials().unwrap(), CredentialSource::KeyPair { .. }));

        let half_pair = ProviderConfig::from_value_with_env(
            json!({"access_key": "ak", "username": "u", "password": "p"}),
            env(&[]),
        )
        .unwrap();
        assert!(matches!(half_pair.credentials().unwrap(), CredentialSource::Login { .. }));
    }

    #[test]
    fn test_missing_credentials() {
        let config =
            ProviderConfig::from_value_with_env(json!({"base_url": "https://j"}), env(&[])).unwrap();
        assert!(matches!(config.credentials(), Err(ProviderError::Configuration(_))));
        assert!(config.diagnostics().iter().any(|d| d.is_error()));
    }

    #[test]
    fn test_warnings() {
        let config = ProviderConfig::from_value_with_env(
            json!({
                "base_url": "https://j",
                "token": "tok",
                "access_key": "ak",
                "secret_key": "sk",
                "skip_tls_verify": true
            }),
            env(&[]),
        )
        .unwrap();
        let diagnostics = config.diagnostics();
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| !d.is_error()));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ProviderConfig::from_value_with_env(
            json!({"password": "hunter2", "secret_key": "s3cr3t", "token": "tok"}),
            env(&[]),
        )
        .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("tok\""));
        assert!(rendered.contains("<redacted>"));

        let creds = format!("{:?}", config.credentials().unwrap());
        assert_eq!(creds, "Token(<redacted>)");
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = ProviderConfig::from_value_with_env(json!({"skip_tls_verify": "maybe"}), env(&[]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_schema_marks_secrets_sensitive() {
        let schema = provider_config_schema();
        assert!(schema.block.attributes["secret_key"].flags.sensitive);
        assert!(schema.block.attributes["password"].flags.sensitive);
        assert!(!schema.block.attributes["base_url"].flags.sensitive);
    }
}
