//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the stack.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::litellm::settings::LiteLlmSettings;
use crate::topology::ServiceDescriptor;

/// Root configuration, with every required section present.
#[derive(Debug, Clone, Serialize)]
pub struct StackConfig {
    /// Router settings compiled into the router's own config file.
    pub litellm: LiteLlmSettings,

    /// Shared database server.
    pub postgres: PostgresConfig,

    /// Gateway listener and route table.
    pub gateway: GatewayConfig,

    /// Declared services for the external orchestrator.
    pub services: Vec<ServiceDescriptor>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Root configuration as written on disk.
///
/// Required sections are optional here so that a missing one can be
/// reported by name instead of as a generic parse error.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStackConfig {
    pub litellm: Option<LiteLlmSettings>,
    pub postgres: Option<PostgresConfig>,
    pub gateway: Option<GatewayConfig>,
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Database server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PostgresConfig {
    /// Hostname other services reach the database on.
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl PostgresConfig {
    /// Connection URL for one database on this server.
    pub fn connection_url(&self, database: &str) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, database
        )
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "postgres".to_string(),
            port: 5432,
            username: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Path-mounted backends.
    pub routes: Vec<RouteConfig>,

    /// Authorities under which the gateway itself is reachable.
    ///
    /// Absolute redirects to one of these are rewritten like backend ones.
    /// Empty by default: only backend authorities trigger a rewrite.
    pub self_authorities: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            routes: Vec::new(),
            self_authorities: Vec::new(),
        }
    }
}

/// Route configuration mapping a gateway prefix to a backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path prefix the backend is mounted under (e.g. "/litellm").
    pub prefix: String,

    /// Backend authority (e.g. "litellm:4000").
    pub backend: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_defaults() {
        let gateway: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(gateway.bind_address, "0.0.0.0:8080");
        assert_eq!(gateway.request_timeout_secs, 30);
        assert!(gateway.routes.is_empty());
        assert!(gateway.self_authorities.is_empty());
    }

    #[test]
    fn test_postgres_connection_url() {
        let pg = PostgresConfig {
            host: "db".into(),
            port: 6543,
            username: "app".into(),
            password: "pw".into(),
        };
        assert_eq!(pg.connection_url("n8ndb"), "postgresql://app:pw@db:6543/n8ndb");
    }
}
