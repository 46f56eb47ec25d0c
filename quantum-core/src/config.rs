use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use quantum_auth::{AuthScheme, DEFAULT_API_KEY_HEADER};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

/// Where accepted requests are recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    None,
    Memory,
    Sqlite(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Process-wide settings, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub api_key: String,
    pub auth_scheme: AuthScheme,
    pub bind: SocketAddr,
    pub store: StoreKind,
    pub catalog_file: Option<PathBuf>,
    pub llm: Option<LlmConfig>,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("auth_scheme", &self.auth_scheme)
            .field("bind", &self.bind)
            .field("store", &self.store)
            .field("catalog_file", &self.catalog_file)
            .field("llm", &self.llm.as_ref().map(|l| (&l.base_url, &l.model, l.timeout)))
            .field("cors_origins", &self.cors_origins)
            .finish_non_exhaustive()
    }
}

impl ServiceConfig {
    /// Config with defaults for everything but the secret.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_scheme: AuthScheme::Bearer,
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            store: StoreKind::Memory,
            catalog_file: None,
            llm: None,
            cors_origins: Vec::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get("QUANTUM_API_KEY").ok_or(ConfigError::Missing("QUANTUM_API_KEY"))?;
        let mut cfg = Self::with_api_key(api_key);

        cfg.auth_scheme = match get("QUANTUM_AUTH_SCHEME").as_deref() {
            None | Some("bearer") => AuthScheme::Bearer,
            Some("header") => AuthScheme::Header {
                name: get("QUANTUM_API_KEY_HEADER")
                    .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.into()),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "QUANTUM_AUTH_SCHEME",
                    value: other.into(),
                })
            }
        };

        if let Some(bind) = get("QUANTUM_HTTP_BIND") {
            cfg.bind = bind.parse().map_err(|_| ConfigError::Invalid {
                var: "QUANTUM_HTTP_BIND",
                value: bind.clone(),
            })?;
        }

        cfg.store = match get("QUANTUM_STORE").as_deref() {
            None | Some("memory") => StoreKind::Memory,
            Some("none") => StoreKind::None,
            Some("sqlite") => StoreKind::Sqlite(
                get("QUANTUM_SQLITE_PATH")
                    .unwrap_or_else(|| "./quantum.db".into())
                    .into(),
            ),
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "QUANTUM_STORE",
                    value: other.into(),
                })
            }
        };

        cfg.catalog_file = get("QUANTUM_CATALOG_FILE").map(PathBuf::from);

        if let Some(base_url) = get("QUANTUM_LLM_URL") {
            let timeout_ms = match get("QUANTUM_LLM_TIMEOUT_MS") {
                Some(v) => v.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    var: "QUANTUM_LLM_TIMEOUT_MS",
                    value: v.clone(),
                })?,
                None => 3_000,
            };
            cfg.llm = Some(LlmConfig {
                base_url,
                model: get("QUANTUM_LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".into()),
                api_key: get("QUANTUM_LLM_API_KEY"),
                timeout: Duration::from_millis(timeout_ms),
            });
        }

        cfg.cors_origins = get("QUANTUM_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && *s != "*")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(cfg)
    }
}
