//! # Configuration
//!
//! One [`AppConfig`] is built at startup and handed to every component.
//! Nothing reads the environment after that.
//!
//! Precedence, lowest first:
//! 1. built-in defaults
//! 2. the TOML file given with `--config`
//! 3. `CARELINK_*` environment variables
//! 4. CLI flags (`--database`, `--backend`, `server --host/--port`)
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `CARELINK_HOST` / `CARELINK_PORT` | `server.host` / `server.port` |
//! | `CARELINK_CORS_ORIGINS` | `server.cors_origins` (comma-separated, or `*`) |
//! | `CARELINK_RATE_LIMIT` | `server.rate_limit` (requests/second, 0 disables) |
//! | `CARELINK_BACKEND` / `CARELINK_DATABASE` | `storage.backend` / `storage.path` |
//! | `CARELINK_SECRET` | `auth.secret` |
//! | `CARELINK_TOKEN_TTL_SECS` | `auth.token_ttl_secs` |
//! | `CARELINK_HASH_ITERATIONS` | `auth.hash_iterations` |
//! | `CARELINK_PREDICTION_URL` | `prediction.url` |
//! | `CARELINK_PREDICTION_TIMEOUT_MS` | `prediction.timeout_ms` |
//! | `CARELINK_AUTHORITY_POLICY` | `policy.acting_identity` |
//! | `CARELINK_ALERT_TRANSITIONS` | `policy.alert_transitions` |

use crate::error::AppError;
use carelink_core::primitives::{DEFAULT_HASH_ITERATIONS, DEFAULT_TOKEN_TTL_SECS};
use carelink_core::{
    AlertStatus, AlertTransitions, AuthService, AuthorityPolicy, CareError, EntityStore,
    MutationRules, PasswordHasher, TokenSigner, TransitionPreset,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// SECTIONS
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty means localhost only; `"*"` allows all.
    pub cors_origins: Vec<String>,
    /// Global requests per second. 0 disables rate limiting.
    pub rate_limit: u32,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
            rate_limit: 100,
            body_limit_bytes: 2 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile, for development and tests.
    Memory,
    #[default]
    Redb,
}

impl std::str::FromStr for BackendKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "memory" => Ok(Self::Memory),
            "redb" => Ok(Self::Redb),
            other => Err(AppError::ConfigValue {
                key: "storage.backend".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Redb => "redb",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: BackendKind,
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Redb,
            path: PathBuf::from("carelink.redb"),
        }
    }
}

impl StorageConfig {
    /// Open the configured store.
    pub fn open(&self) -> Result<EntityStore, CareError> {
        match self.backend {
            BackendKind::Memory => Ok(EntityStore::in_memory()),
            BackendKind::Redb => EntityStore::with_redb(&self.path),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Token signing secret. Unset means a random per-process secret.
    pub secret: Option<String>,
    pub token_ttl_secs: i64,
    pub hash_iterations: u32,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("hash_iterations", &self.hash_iterations)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: None,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            hash_iterations: DEFAULT_HASH_ITERATIONS,
        }
    }
}

impl AuthConfig {
    /// Build the hasher and signer.
    pub fn service(&self) -> Result<AuthService, CareError> {
        let hasher = PasswordHasher::new(self.hash_iterations)?;
        let signer = match self.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => TokenSigner::new(secret, self.token_ttl_secs)?,
            None => {
                tracing::warn!(
                    "No auth secret configured; using a random secret. \
                     Tokens will not survive a restart. Set CARELINK_SECRET."
                );
                TokenSigner::ephemeral(self.token_ttl_secs)?
            }
        };
        Ok(AuthService::new(hasher, signer))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionConfig {
    /// Base URL of the classifier. Unset means always use the fallback list.
    pub url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: 5_000,
        }
    }
}

impl PredictionConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    pub acting_identity: AuthorityPolicy,
    pub alert_transitions: TransitionPreset,
    /// Explicit `[from, to]` pairs. Replaces the preset when present.
    pub custom_transitions: Option<Vec<(AlertStatus, AlertStatus)>>,
}

impl PolicyConfig {
    #[must_use]
    pub fn mutation_rules(&self) -> MutationRules {
        let transitions = match &self.custom_transitions {
            Some(pairs) => AlertTransitions::from_pairs(pairs.iter().copied()),
            None => AlertTransitions::from_preset(self.alert_transitions),
        };
        MutationRules {
            policy: self.acting_identity,
            transitions,
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub prediction: PredictionConfig,
    pub policy: PolicyConfig,
}

impl AppConfig {
    /// Defaults, then the optional file, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, AppError> {
        Ok(toml::from_str(text)?)
    }

    /// Apply `CARELINK_*` overrides read through `lookup`.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), AppError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("CARELINK_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("CARELINK_PORT") {
            self.server.port = parse_number("CARELINK_PORT", &v)?;
        }
        if let Some(v) = get("CARELINK_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("CARELINK_RATE_LIMIT") {
            self.server.rate_limit = parse_number("CARELINK_RATE_LIMIT", &v)?;
        }
        if let Some(v) = get("CARELINK_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = get("CARELINK_DATABASE") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = get("CARELINK_SECRET") {
            self.auth.secret = Some(v);
        }
        if let Some(v) = get("CARELINK_TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_number("CARELINK_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = get("CARELINK_HASH_ITERATIONS") {
            self.auth.hash_iterations = parse_number("CARELINK_HASH_ITERATIONS", &v)?;
        }
        if let Some(v) = get("CARELINK_PREDICTION_URL") {
            self.prediction.url = Some(v);
        }
        if let Some(v) = get("CARELINK_PREDICTION_TIMEOUT_MS") {
            self.prediction.timeout_ms = parse_number("CARELINK_PREDICTION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("CARELINK_AUTHORITY_POLICY") {
            self.policy.acting_identity = parse_keyword("CARELINK_AUTHORITY_POLICY", &v)?;
        }
        if let Some(v) = get("CARELINK_ALERT_TRANSITIONS") {
            self.policy.alert_transitions = parse_keyword("CARELINK_ALERT_TRANSITIONS", &v)?;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError> {
    value.trim().parse().map_err(|_| AppError::ConfigValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a snake_case enum keyword the same way the TOML file would.
fn parse_keyword<T: DeserializeOwned>(key: &str, value: &str) -> Result<T, AppError> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_string())).map_err(|_| {
        AppError::ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        }
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "127.0.0.1:8080");
        assert_eq!(config.storage.backend, BackendKind::Redb);
        assert_eq!(config.auth.token_ttl_secs, 3600);
        assert_eq!(config.policy.acting_identity, AuthorityPolicy::TrustClient);
        assert!(config.prediction.url.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 9000

            [prediction]
            url = "http://localhost:5000"

            [policy]
            acting_identity = "verified_token"
            alert_transitions = "forward_only"
            "#,
        )
        .expect("parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.prediction.url.as_deref(), Some("http://localhost:5000"));
        let rules = config.policy.mutation_rules();
        assert_eq!(rules.policy, AuthorityPolicy::VerifiedToken);
        assert!(!rules.transitions.permits(AlertStatus::Resolved, AlertStatus::Pending));
    }

    #[test]
    fn custom_transitions_replace_preset() {
        let config = AppConfig::from_toml(
            r#"
            [policy]
            custom_transitions = [["pending", "resolved"]]
            "#,
        )
        .expect("parse");
        let rules = config.policy.mutation_rules();
        assert!(rules.transitions.permits(AlertStatus::Pending, AlertStatus::Resolved));
        assert!(!rules.transitions.permits(AlertStatus::Pending, AlertStatus::Acknowledged));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = AppConfig::from_toml("[server]\nprot = 1\n");
        assert!(matches!(result, Err(AppError::ConfigParse(_))));
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("CARELINK_PORT", "7070"),
            ("CARELINK_BACKEND", "memory"),
            ("CARELINK_CORS_ORIGINS", "http://a.test, http://b.test"),
            ("CARELINK_AUTHORITY_POLICY", "verified_token"),
            ("CARELINK_PREDICTION_URL", ""),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| (*v).to_string()))
            .expect("overrides");

        assert_eq!(config.server.port, 7070);
        assert_eq!(config.storage.backend, BackendKind::Memory);
        assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.policy.acting_identity, AuthorityPolicy::VerifiedToken);
        assert!(config.prediction.url.is_none());
    }

    #[test]
    fn bad_environment_value_is_reported() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|k| (k == "CARELINK_PORT").then(|| "http".to_string()));
        assert!(matches!(result, Err(AppError::ConfigValue { .. })));
    }

    #[test]
    fn auth_debug_hides_secret() {
        let auth = AuthConfig {
            secret: Some("hunter2".to_string()),
            ..AuthConfig::default()
        };
        assert!(!format!("{auth:?}").contains("hunter2"));
    }
}
