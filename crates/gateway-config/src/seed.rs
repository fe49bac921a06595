//! Providers declared in the configuration file.

use crate::error::ConfigError;
use gateway_core::{AuthScheme, NewAuthConfig, NewEndpoint, NewModel, NewProvider, ProviderId};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

/// Auth settings as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSeed {
    /// Scheme
    #[serde(rename = "type")]
    pub scheme: AuthScheme,

    /// Header to inject
    pub header: String,

    /// Optional value prefix
    #[serde(default)]
    pub prefix: Option<String>,

    /// Inline credential
    #[serde(default)]
    pub credential: Option<SecretString>,

    /// Environment variable holding the credential
    #[serde(default)]
    pub credential_env: Option<String>,
}

/// A provider definition plus its models and endpoints
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProviderSeed {
    /// Stable identifier; generated when absent
    #[serde(default)]
    pub id: Option<ProviderId>,

    /// Display name
    #[validate(length(min = 1))]
    pub name: String,

    /// Base URL
    #[validate(length(min = 1))]
    pub base_url: String,

    /// Authentication
    pub auth: AuthSeed,

    /// Static headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request template source
    #[validate(length(min = 1))]
    pub request_template: String,

    /// Response template source
    #[validate(length(min = 1))]
    pub response_template: String,

    /// Models to register
    #[serde(default)]
    pub models: Vec<NewModel>,

    /// Endpoints to register
    #[serde(default)]
    pub endpoints: Vec<NewEndpoint>,

    /// Start active; an inactive seed is registered and then deactivated
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl ProviderSeed {
    /// Fill the inline credential from `credential_env` using `lookup`.
    ///
    /// An inline credential wins over the environment.
    pub fn resolve_credential(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let has_inline = self
            .auth
            .credential
            .as_ref()
            .is_some_and(|c| !c.expose_secret().trim().is_empty());
        if has_inline {
            return Ok(());
        }

        let Some(variable) = self.auth.credential_env.as_deref() else {
            return Err(ConfigError::MissingCredential {
                provider: self.name.clone(),
                message: "set auth.credential or auth.credential_env".to_string(),
            });
        };

        match lookup(variable) {
            Some(value) if !value.trim().is_empty() => {
                self.auth.credential = Some(SecretString::new(value));
                Ok(())
            }
            _ => Err(ConfigError::MissingCredential {
                provider: self.name.clone(),
                message: format!("environment variable {variable} is not set"),
            }),
        }
    }

    /// Provider creation input; the credential must already be resolved
    pub fn to_new_provider(&self) -> Result<NewProvider, ConfigError> {
        let credential =
            self.auth
                .credential
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential {
                    provider: self.name.clone(),
                    message: "credential was not resolved".to_string(),
                })?;

        Ok(NewProvider {
            id: self.id,
            name: self.name.clone(),
            base_url: self.base_url.clone(),
            auth: NewAuthConfig {
                scheme: self.auth.scheme,
                header: self.auth.header.clone(),
                prefix: self.auth.prefix.clone(),
                credential,
            },
            headers: self.headers.clone(),
            request_template: self.request_template.clone(),
            response_template: self.response_template.clone(),
        })
    }
}
