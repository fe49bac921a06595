//! Upstream authentication configuration.

use crate::error::{GatewayError, GatewayResult};
use http::{HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

const BEARER_PREFIX: &str = "Bearer";

/// How the credential is presented upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>` style
    Bearer,
    /// Raw key in a provider-specific header
    #[serde(alias = "api_key")]
    ApiKey,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer => f.write_str("bearer"),
            Self::ApiKey => f.write_str("apikey"),
        }
    }
}

/// Input used to build an [`AuthConfig`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewAuthConfig {
    /// Auth scheme
    #[serde(rename = "type")]
    pub scheme: AuthScheme,
    /// Header to inject
    pub header: String,
    /// Optional value prefix
    #[serde(default)]
    pub prefix: Option<String>,
    /// Resolved credential
    pub credential: SecretString,
}

/// Validated authentication settings for one provider.
///
/// The credential is already decrypted by whoever loaded the provider; it is
/// never serialized back out.
#[derive(Debug, Clone, Serialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    scheme: AuthScheme,
    header: String,
    prefix: Option<String>,
    #[serde(skip_serializing)]
    credential: SecretString,
}

impl AuthConfig {
    /// Validate and build
    pub fn new(input: NewAuthConfig) -> GatewayResult<Self> {
        let header = input.header.trim().to_string();
        if header.is_empty() {
            return Err(GatewayError::validation(
                "auth header name is required",
                Some("auth.header"),
            ));
        }
        if let Err(e) = HeaderName::from_bytes(header.as_bytes()) {
            return Err(GatewayError::validation(
                format!("invalid auth header name '{header}': {e}"),
                Some("auth.header"),
            ));
        }

        let credential = input.credential.expose_secret().trim();
        if credential.is_empty() {
            return Err(GatewayError::validation(
                "auth credential is required",
                Some("auth.credential"),
            ));
        }
        if input.scheme == AuthScheme::Bearer && credential.eq_ignore_ascii_case(BEARER_PREFIX) {
            return Err(GatewayError::validation(
                "bearer credential must be the token itself, not the word 'Bearer'",
                Some("auth.credential"),
            ));
        }

        let prefix = input
            .prefix
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let auth = Self {
            scheme: input.scheme,
            header,
            prefix,
            credential: SecretString::new(credential.to_string()),
        };
        // The credential itself is never echoed back in the error.
        if HeaderValue::from_str(auth.header_value().expose_secret()).is_err() {
            return Err(GatewayError::validation(
                "auth prefix and credential must be a valid header value",
                Some("auth.credential"),
            ));
        }
        Ok(auth)
    }

    /// Auth scheme
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Header name to inject
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Value prefix, if any
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Credential
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// Full header value: `prefix + " " + credential`, or the bare credential
    pub fn header_value(&self) -> SecretString {
        let credential = self.credential.expose_secret();
        let value = match &self.prefix {
            Some(prefix) => format!("{prefix} {credential}"),
            None => credential.clone(),
        };
        SecretString::new(value)
    }
}
