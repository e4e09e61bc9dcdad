//! Service topology subsystem.
//!
//! # Data Flow
//! ```text
//! [[services]] (TOML)
//!     → descriptor.rs (ServiceDescriptor)
//!     → graph.rs TopologyBuilder (add_service / add_dependency)
//!     → build(): duplicate, dangling and cycle checks
//!     → TopologyGraph (immutable, serializable)
//!     → handed to the external orchestrator
//! ```
//!
//! Nothing here starts, stops or probes a process. The graph only records
//! which service waits for which.

pub mod descriptor;
pub mod graph;

pub use descriptor::{PortMapping, ServiceDescriptor, ServiceHandle};
pub use graph::{TopologyBuilder, TopologyError, TopologyGraph};
