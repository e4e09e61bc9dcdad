//! Router config compilation.
//!
//! # Responsibilities
//! - Map validated settings onto the router's file layout in one pass
//! - Omit optional fields instead of emitting empty values
//! - Replace API keys with `os.environ/<NAME>` indirection tokens
//!
//! # Design Decisions
//! - The document is a tree of `Serialize` structs; field order is key order
//! - No I/O here; callers decide where the bytes go

use serde::Serialize;
use thiserror::Error;

use crate::litellm::settings::{LiteLlmSettings, ModelEntry, RoutingStrategy, SecretRef};

/// Error raised while serializing the document.
#[derive(Debug, Error)]
#[error("failed to serialize router config: {0}")]
pub struct CompileError(#[from] serde_yaml::Error);

/// Compiled router config, ready to be written verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedDocument(String);

impl SerializedDocument {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Serialize)]
struct RouterDocument<'a> {
    model_list: Vec<ModelListEntry<'a>>,
    litellm_settings: LiteLlmSection,
    router_settings: RouterSection,
}

#[derive(Debug, Serialize)]
struct ModelListEntry<'a> {
    model_name: &'a str,
    litellm_params: LiteLlmParams<'a>,
}

#[derive(Debug, Serialize)]
struct LiteLlmParams<'a> {
    model: &'a str,
    api_base: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<SecretRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_version: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct LiteLlmSection {
    drop_params: bool,
    set_verbose: bool,
}

#[derive(Debug, Serialize)]
struct RouterSection {
    routing_strategy: RoutingStrategy,
    num_retries: u32,
    timeout: u64,
}

impl<'a> From<&'a ModelEntry> for ModelListEntry<'a> {
    fn from(entry: &'a ModelEntry) -> Self {
        Self {
            model_name: &entry.name,
            litellm_params: LiteLlmParams {
                model: &entry.model,
                api_base: &entry.api_base,
                api_key: entry.api_key_ref(),
                api_version: entry.api_version(),
            },
        }
    }
}

impl<'a> From<&'a LiteLlmSettings> for RouterDocument<'a> {
    fn from(settings: &'a LiteLlmSettings) -> Self {
        let proxy = settings.litellm_settings;
        let policy = settings.router_settings;
        Self {
            model_list: settings.model_list.iter().map(ModelListEntry::from).collect(),
            litellm_settings: LiteLlmSection {
                drop_params: proxy.drop_params,
                set_verbose: proxy.set_verbose,
            },
            router_settings: RouterSection {
                routing_strategy: policy.routing_strategy,
                num_retries: policy.num_retries,
                timeout: policy.timeout,
            },
        }
    }
}

/// Compile validated settings into the router's YAML config.
///
/// Callers are expected to run [`crate::config::validation::validate`] first.
pub fn compile(settings: &LiteLlmSettings) -> Result<SerializedDocument, CompileError> {
    let document = RouterDocument::from(settings);
    let yaml = serde_yaml::to_string(&document)?;

    tracing::debug!(
        models = settings.model_list.len(),
        bytes = yaml.len(),
        "Compiled router config"
    );

    Ok(SerializedDocument(yaml))
}
