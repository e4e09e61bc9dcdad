//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (longest-prefix lookup)
//!     → matcher.rs (segment-bounded prefix checks)
//!     → Return: matched RouteRule or None
//!
//! Redirect rewriting (per response):
//!     Location host
//!     → router.rs (backend authority lookup)
//!     → matcher.rs (prefix join + duplicate collapse)
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → validate (prefix shape, authority, duplicates)
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins

pub mod matcher;
pub mod router;

pub use matcher::{AuthorityMatcher, PathPrefix};
pub use router::{RouteRule, RouteTable};
