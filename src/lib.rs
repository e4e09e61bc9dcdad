//! Stack gateway library.
//!
//! Compiles router settings into the LiteLLM proxy config, describes the
//! deployment as a dependency graph, and fronts the stack's web services
//! with a path-mounting gateway that keeps their redirects on-prefix.

pub mod cli;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod litellm;
pub mod observability;
pub mod routing;
pub mod topology;

pub use config::StackConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
