//! Router configuration subsystem.
//!
//! # Data Flow
//! ```text
//! [litellm] section (TOML)
//!     → settings.rs (typed model, defaults applied)
//!     → config::validation (fail-fast checks)
//!     → compiler.rs (YAML document, secrets as os.environ/ tokens)
//!     → lifecycle::startup writes the file the router reads
//!
//! Alongside:
//!     settings + [postgres]
//!     → environment.rs (LITELLM_MASTER_KEY, DATABASE_URL, SERVER_ROOT_PATH)
//!     → merged into the router's service declaration
//! ```

pub mod compiler;
pub mod environment;
pub mod settings;

pub use compiler::{compile, CompileError, SerializedDocument};
pub use environment::RouterEnvironment;
pub use settings::{
    GeneralSettings, LiteLlmSettings, ModelEntry, ProxySettings, RouterPolicy, RoutingStrategy,
    SecretRef,
};
