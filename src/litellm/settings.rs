//! Typed model of the router's settings.
//!
//! These types are loaded once from the `[litellm]` section of the stack
//! configuration, validated, and then only read by the compiler. Input keys
//! are snake_case and do not have to mirror the router's own file layout;
//! the compiler owns that mapping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of the router settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LiteLlmSettings {
    /// Models routed by the proxy, in declared order.
    #[serde(default)]
    pub model_list: Vec<ModelEntry>,

    /// Router-wide secrets.
    pub general_settings: GeneralSettings,

    /// Behavior flags.
    #[serde(default)]
    pub litellm_settings: ProxySettings,

    /// Load-balancing policy.
    #[serde(default)]
    pub router_settings: RouterPolicy,

    /// Where the compiled document is written.
    #[serde(default = "default_output_path")]
    pub output_path: String,

    /// Topology node that runs the router.
    #[serde(default = "default_service")]
    pub service: String,

    /// Path prefix the router is mounted under on the gateway.
    #[serde(default = "default_server_root_path")]
    pub server_root_path: String,

    /// Database the router stores its state in.
    #[serde(default = "default_database")]
    pub database: String,

    /// Router log level (`LITELLM_LOG`).
    #[serde(default = "default_router_log_level")]
    pub log_level: String,
}

fn default_output_path() -> String {
    "litellm-config.yaml".to_string()
}

fn default_service() -> String {
    "litellm".to_string()
}

fn default_server_root_path() -> String {
    "/litellm".to_string()
}

fn default_database() -> String {
    "litellmdb".to_string()
}

fn default_router_log_level() -> String {
    "DEBUG".to_string()
}

/// One model routed by the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelEntry {
    /// Public model name clients ask for.
    #[serde(rename = "model_name", default)]
    pub name: String,

    /// Backend model identifier (e.g. `ollama/qwen3:0.6b`).
    #[serde(default)]
    pub model: String,

    /// Base URL of the backend serving the model.
    #[serde(default)]
    pub api_base: String,

    /// Name of the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl ModelEntry {
    /// Create an entry without optional fields.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            api_base: api_base.into(),
            api_key_env: None,
            api_version: None,
        }
    }

    /// Set the API key reference.
    pub fn with_api_key_env(mut self, name: impl Into<String>) -> Self {
        self.api_key_env = Some(name.into());
        self
    }

    /// Set the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// The API key reference, if one was supplied.
    ///
    /// An empty string counts as absent.
    pub fn api_key_ref(&self) -> Option<SecretRef> {
        self.api_key_env
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(SecretRef::new)
    }

    /// The API version, if one was supplied. Empty counts as absent.
    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref().filter(|v| !v.is_empty())
    }
}

/// Router-wide secrets.
#[derive(Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    /// Absent and empty are both reported by validation.
    #[serde(default)]
    pub master_key: String,
}

impl fmt::Debug for GeneralSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneralSettings")
            .field("master_key", &"<redacted>")
            .finish()
    }
}

/// Router behavior flags.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxySettings {
    /// Drop request parameters the backend does not support.
    pub drop_params: bool,

    /// Verbose router logging.
    pub set_verbose: bool,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            drop_params: true,
            set_verbose: true,
        }
    }
}

/// Load-balancing policy for the router.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterPolicy {
    pub routing_strategy: RoutingStrategy,

    /// Retries per request.
    pub num_retries: u32,

    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for RouterPolicy {
    fn default() -> Self {
        Self {
            routing_strategy: RoutingStrategy::default(),
            num_retries: 3,
            timeout: 600,
        }
    }
}

/// Routing strategies understood by the router.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    SimpleShuffle,
    #[default]
    LeastBusy,
    UsageBasedRouting,
    #[serde(rename = "usage-based-routing-v2")]
    UsageBasedRoutingV2,
    LatencyBasedRouting,
    CostBasedRouting,
}

/// Reference to a secret held in the router's own environment.
///
/// Serializes as `os.environ/<NAME>` so the compiled document never carries
/// the secret itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef(String);

impl SecretRef {
    pub const PREFIX: &'static str = "os.environ/";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// True when the name is a plausible environment variable name.
    pub fn is_valid_name(&self) -> bool {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl Serialize for SecretRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_policy_defaults() {
        let policy = RouterPolicy::default();
        assert_eq!(policy.routing_strategy, RoutingStrategy::LeastBusy);
        assert_eq!(policy.num_retries, 3);
        assert_eq!(policy.timeout, 600);
    }

    #[test]
    fn test_partial_router_policy_keeps_defaults() {
        let policy: RouterPolicy = toml::from_str("num_retries = 5").unwrap();
        assert_eq!(policy.num_retries, 5);
        assert_eq!(policy.timeout, 600);
        assert_eq!(policy.routing_strategy, RoutingStrategy::LeastBusy);
    }

    #[test]
    fn test_routing_strategy_names() {
        let policy: RouterPolicy =
            toml::from_str(r#"routing_strategy = "usage-based-routing-v2""#).unwrap();
        assert_eq!(policy.routing_strategy, RoutingStrategy::UsageBasedRoutingV2);

        assert!(toml::from_str::<RouterPolicy>(r#"routing_strategy = "fastest""#).is_err());
    }

    #[test]
    fn test_empty_api_key_is_absent() {
        let entry = ModelEntry::new("m", "ollama/m", "http://ollama:11434").with_api_key_env("");
        assert!(entry.api_key_ref().is_none());
    }

    #[test]
    fn test_secret_ref_display() {
        assert_eq!(SecretRef::new("FOO_KEY").to_string(), "os.environ/FOO_KEY");
    }

    #[test]
    fn test_secret_ref_name_validation() {
        assert!(SecretRef::new("FOO_KEY").is_valid_name());
        assert!(SecretRef::new("_x1").is_valid_name());
        assert!(!SecretRef::new("1ABC").is_valid_name());
        assert!(!SecretRef::new("sk-1234").is_valid_name());
        assert!(!SecretRef::new("").is_valid_name());
    }

    #[test]
    fn test_absent_required_fields_deserialize_empty() {
        let entry: ModelEntry = toml::from_str(r#"model_name = "qwen3""#).unwrap();
        assert_eq!(entry.name, "qwen3");
        assert!(entry.model.is_empty());
        assert!(entry.api_base.is_empty());

        let general: GeneralSettings = toml::from_str("").unwrap();
        assert!(general.master_key.is_empty());
    }

    #[test]
    fn test_master_key_redacted_in_debug() {
        let general = GeneralSettings {
            master_key: "sk-secret".into(),
        };
        assert!(!format!("{:?}", general).contains("sk-secret"));
    }
}
