//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate router settings and gateway routes
//! - Compile the router document and derive its environment
//! - Build the service topology with that environment merged in
//! - Write the router document without leaving partial files behind
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing touches the filesystem until every check has passed
//! - Listeners start last (traffic only when ready)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::validation::{validate, ValidationError};
use crate::config::{ConfigError, StackConfig};
use crate::litellm::{compile, CompileError, RouterEnvironment, SerializedDocument};
use crate::routing::RouteTable;
use crate::topology::{ServiceDescriptor, TopologyBuilder, TopologyError, TopologyGraph};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to compile router config: {0}")]
    Compile(#[from] CompileError),

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to render topology: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("gateway stopped with error: {0}")]
    Serve(#[source] io::Error),
}

/// Everything derived from a validated configuration.
#[derive(Debug)]
pub struct PreparedStack {
    pub document: SerializedDocument,
    pub environment: RouterEnvironment,
    pub topology: TopologyGraph,
    pub routes: RouteTable,
    /// Where the router document goes unless overridden.
    pub output_path: PathBuf,
}

/// Run every check and derive all artifacts in memory.
pub fn prepare(config: &StackConfig) -> Result<PreparedStack, StartupError> {
    validate(&config.litellm)?;
    let routes = RouteTable::from_gateway(&config.gateway)?;

    let document = compile(&config.litellm)?;
    let environment = RouterEnvironment::from_settings(&config.litellm, &config.postgres);
    let topology = build_topology(&config.services, &config.litellm.service, &environment)?;

    tracing::info!(
        models = config.litellm.model_list.len(),
        routes = routes.rules().len(),
        services = topology.len(),
        "Stack prepared"
    );

    Ok(PreparedStack {
        document,
        environment,
        topology,
        routes,
        output_path: PathBuf::from(&config.litellm.output_path),
    })
}

/// Build the topology, merging router variables into the router service.
///
/// A router service that is not declared is not an error: the document is
/// still useful to an externally managed deployment.
pub fn build_topology(
    services: &[ServiceDescriptor],
    router_service: &str,
    environment: &RouterEnvironment,
) -> Result<TopologyGraph, TopologyError> {
    let mut builder = TopologyBuilder::new();
    for service in services {
        builder.add_service(service.clone())?;
    }

    match builder.handle(router_service) {
        Some(handle) => {
            if let Some(service) = builder.service_mut(handle) {
                environment.apply_to(&mut service.environment);
            }
        }
        None => tracing::debug!(service = %router_service, "Router service not declared"),
    }

    builder.build()
}

/// Write the document atomically: a sibling temp file renamed into place.
pub fn write_document(document: &SerializedDocument, path: &Path) -> Result<(), StartupError> {
    let write_err = |source: io::Error| StartupError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file_name = path
        .file_name()
        .ok_or_else(|| write_err(io::Error::new(io::ErrorKind::InvalidInput, "not a file path")))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Err(e) = fs::write(&temp_path, document.as_bytes()) {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(e));
    }
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(write_err(e));
    }

    tracing::info!(path = %path.display(), bytes = document.as_bytes().len(), "Router config written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::config::ValidationErrorKind;
    use crate::litellm::environment::{DATABASE_URL, LITELLM_MASTER_KEY};

    const CONFIG: &str = r#"
[litellm.general_settings]
master_key = "sk-1234"

[[litellm.model_list]]
model_name = "gpt-4o"
model = "azure/gpt-4o"
api_base = "https://example.openai.azure.com"
api_key_env = "AZURE_API_KEY"

[postgres]

[[gateway.routes]]
name = "litellm"
prefix = "/litellm"
backend = "litellm:4000"

[[services]]
name = "postgres"
image = "postgres:16"

[[services]]
name = "litellm"
image = "ghcr.io/berriai/litellm:main-latest"
depends_on = ["postgres"]
"#;

    #[test]
    fn test_prepare_merges_router_environment() {
        let config = parse_config(CONFIG).unwrap();
        let prepared = prepare(&config).unwrap();

        let router = prepared.topology.service("litellm").unwrap();
        assert_eq!(router.environment[LITELLM_MASTER_KEY], "sk-1234");
        assert!(router.environment[DATABASE_URL].starts_with("postgresql://"));
        assert!(prepared.topology.service("postgres").unwrap().environment.is_empty());
        assert_eq!(prepared.topology.start_order(), vec!["postgres", "litellm"]);
        assert!(prepared.document.as_str().contains("os.environ/AZURE_API_KEY"));
        assert_eq!(prepared.output_path, PathBuf::from("litellm-config.yaml"));
    }

    #[test]
    fn test_prepare_rejects_empty_master_key() {
        let config = parse_config(&CONFIG.replace("sk-1234", "")).unwrap();
        assert!(matches!(prepare(&config), Err(StartupError::Validation(_))));
    }

    #[test]
    fn test_prepare_rejects_invalid_self_authority() {
        let config = parse_config(&CONFIG.replace(
            "[[gateway.routes]]",
            "[gateway]\nself_authorities = [\"gateway.local:8080\", \"user@gateway.local\"]\n\n[[gateway.routes]]",
        ))
        .unwrap();

        match prepare(&config) {
            Err(StartupError::Validation(e)) => {
                assert_eq!(e.kind, ValidationErrorKind::InvalidRoute);
                assert_eq!(e.target, "user@gateway.local");
                assert_eq!(e.field, "self_authorities");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_prepare_rejects_cycle() {
        let config = parse_config(&format!(
            "{}\n[[services]]\nname = \"a\"\nimage = \"a\"\ndepends_on = [\"b\"]\n\n[[services]]\nname = \"b\"\nimage = \"b\"\ndepends_on = [\"a\"]\n",
            CONFIG
        ))
        .unwrap();

        match prepare(&config) {
            Err(StartupError::Topology(TopologyError::CycleDetected { members })) => {
                assert_eq!(members, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_write_document_replaces_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("litellm-config.yaml");
        fs::write(&path, "stale").unwrap();

        let config = parse_config(CONFIG).unwrap();
        let prepared = prepare(&config).unwrap();
        write_document(&prepared.document, &path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), prepared.document.as_str());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_document_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.yaml");
        let config = parse_config(CONFIG).unwrap();
        let prepared = prepare(&config).unwrap();

        assert!(matches!(
            write_document(&prepared.document, &path),
            Err(StartupError::Write { .. })
        ));
        assert!(!path.exists());
    }
}
