//! Endpoints exposed by a provider.

use super::collection::Keyed;
use crate::error::{GatewayError, GatewayResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Endpoint lifecycle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Accepts dispatches
    #[default]
    Active,
    /// Rejected by the dispatch validator
    Inactive,
}

/// Last observed health; informational only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointHealth {
    /// Responding normally
    Healthy,
    /// Responding with errors or high latency
    Degraded,
    /// Not responding
    Unhealthy,
    /// Never checked, or reset on deactivation
    #[default]
    Unknown,
}

/// Input for adding an endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NewEndpoint {
    /// Name used in dispatch requests
    pub name: String,
    /// Path relative to the provider base URL
    pub path: String,
}

/// A provider endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    name: String,
    path: String,
    status: EndpointStatus,
    health: EndpointHealth,
    last_health_check: Option<DateTime<Utc>>,
}

impl Endpoint {
    /// Validate and build; new endpoints start active with unknown health
    pub fn new(input: NewEndpoint) -> GatewayResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(GatewayError::validation("endpoint name is required", Some("name")));
        }
        let path = input.path.trim().to_string();
        if path.is_empty() {
            return Err(GatewayError::validation("endpoint path is required", Some("path")));
        }

        Ok(Self {
            name,
            path,
            status: EndpointStatus::Active,
            health: EndpointHealth::Unknown,
            last_health_check: None,
        })
    }

    /// Name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Status
    pub fn status(&self) -> EndpointStatus {
        self.status
    }

    /// Health
    pub fn health(&self) -> EndpointHealth {
        self.health
    }

    /// Time of the last health check
    pub fn last_health_check(&self) -> Option<DateTime<Utc>> {
        self.last_health_check
    }

    /// Whether the validator will accept this endpoint
    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }

    pub(crate) fn activate(&mut self) -> GatewayResult<()> {
        if self.is_active() {
            return Err(GatewayError::conflict(format!(
                "endpoint '{}' is already active",
                self.name
            )));
        }
        self.status = EndpointStatus::Active;
        Ok(())
    }

    pub(crate) fn deactivate(&mut self) -> GatewayResult<()> {
        if !self.is_active() {
            return Err(GatewayError::conflict(format!(
                "endpoint '{}' is already inactive",
                self.name
            )));
        }
        self.status = EndpointStatus::Inactive;
        self.health = EndpointHealth::Unknown;
        self.last_health_check = None;
        Ok(())
    }

    /// Record an externally observed health result
    pub fn record_health(&mut self, health: EndpointHealth, at: DateTime<Utc>) {
        self.health = health;
        self.last_health_check = Some(at);
    }
}

impl Keyed for Endpoint {
    const ENTITY: &'static str = "Endpoint";

    fn key(&self) -> &str {
        &self.name
    }
}
