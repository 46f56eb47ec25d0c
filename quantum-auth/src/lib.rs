//! Static-secret authentication for the QuantumRequest API.
//!
//! A single configured secret is compared against the credential the caller
//! presents, either as `Authorization: Bearer <secret>` or as the raw value of
//! a dedicated header such as `X-API-Key`.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

const BEARER_PREFIX: &str = "Bearer ";

/// Where the credential is carried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthScheme {
    Bearer,
    Header { name: String },
}

impl AuthScheme {
    pub fn api_key_header() -> Self {
        AuthScheme::Header {
            name: DEFAULT_API_KEY_HEADER.into(),
        }
    }

    /// Lowercase name of the HTTP header the credential is read from.
    pub fn header_name(&self) -> String {
        match self {
            AuthScheme::Bearer => AUTHORIZATION_HEADER.into(),
            AuthScheme::Header { name } => name.to_ascii_lowercase(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing {0} header")]
    Missing(String),
    #[error("Malformed credential: expected `Bearer <token>`")]
    Malformed,
    #[error("Unauthorized access")]
    Invalid,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("api secret must not be empty")]
pub struct EmptySecret;

/// Binary allow/deny check against one secret.
#[derive(Clone)]
pub struct Authenticator {
    secret_digest: [u8; 32],
    scheme: AuthScheme,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(secret: &str, scheme: AuthScheme) -> Result<Self, EmptySecret> {
        if secret.is_empty() {
            return Err(EmptySecret);
        }
        Ok(Self {
            secret_digest: digest(secret),
            scheme,
        })
    }

    pub fn bearer(secret: &str) -> Result<Self, EmptySecret> {
        Self::new(secret, AuthScheme::Bearer)
    }

    pub fn scheme(&self) -> &AuthScheme {
        &self.scheme
    }

    /// Check the raw header value the caller presented (`None` if absent).
    pub fn verify(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let raw = match presented {
            Some(v) if !v.is_empty() => v,
            _ => return Err(AuthError::Missing(self.display_header())),
        };
        let token = match &self.scheme {
            AuthScheme::Bearer => raw.strip_prefix(BEARER_PREFIX).ok_or(AuthError::Malformed)?,
            AuthScheme::Header { .. } => raw,
        };
        if bool::from(digest(token)[..].ct_eq(&self.secret_digest[..])) {
            Ok(())
        } else {
            Err(AuthError::Invalid)
        }
    }

    fn display_header(&self) -> String {
        match &self.scheme {
            AuthScheme::Bearer => "Authorization".into(),
            AuthScheme::Header { name } => name.clone(),
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
