//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → request.rs (request ID, upstream URI, X-Forwarded-*)
//!     → [routing layer picks the mounted backend]
//!     → websocket.rs (upgrade passthrough, when requested)
//!     → response.rs (hop-by-hop cleanup)
//!     → redirect.rs (Location rewriting)
//!     → Send to client
//! ```

pub mod redirect;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use redirect::{RedirectContext, RedirectRewriter, RewriteOutcome, SkipReason};
pub use request::X_REQUEST_ID;
pub use server::GatewayServer;
