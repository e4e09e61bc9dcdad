//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! stack.toml
//!     → loader.rs (parse & deserialize, required sections)
//!     → validation.rs (semantic checks)
//!     → StackConfig (validated, immutable)
//!     → lifecycle::startup derives every artifact from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - Every section except `litellm.general_settings` has defaults
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{GatewayConfig, ObservabilityConfig, PostgresConfig, RouteConfig, StackConfig};
pub use validation::{ValidationError, ValidationErrorKind};
