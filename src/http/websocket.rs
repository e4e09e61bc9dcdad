//! Protocol upgrade passthrough.
//!
//! # Responsibilities
//! - Detect upgrade requests (WebSocket and friends)
//! - Splice the client and backend connections once both sides switched
//!
//! # Data Flow
//! ```text
//! Client ←──── raw bytes ────→ Gateway ←──── raw bytes ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Byte-level copy, no frame parsing
//! - Upgrade responses never pass through redirect rewriting
//! - Tunnel runs detached from the request task

use axum::http::{
    header::{CONNECTION, UPGRADE},
    HeaderMap,
};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;

/// True when the request asks to switch protocols.
///
/// Requires an `Upgrade` header and the `upgrade` token in `Connection`.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    if !headers.contains_key(UPGRADE) {
        return false;
    }
    headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Copy bytes between both upgraded connections until either side closes.
pub fn spawn_tunnel(client: OnUpgrade, backend: OnUpgrade, route: String) {
    tokio::spawn(async move {
        let (client, backend) = match tokio::try_join!(client, backend) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(route = %route, error = %e, "Upgrade failed");
                return;
            }
        };

        let mut client = TokioIo::new(client);
        let mut backend = TokioIo::new(backend);
        match tokio::io::copy_bidirectional(&mut client, &mut backend).await {
            Ok((sent, received)) => {
                tracing::debug!(route = %route, sent, received, "Tunnel closed");
            }
            Err(e) => {
                tracing::debug!(route = %route, error = %e, "Tunnel aborted");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.append(*k, HeaderValue::from_static(*v));
        }
        h
    }

    #[test]
    fn test_websocket_handshake_detected() {
        let h = headers(&[("connection", "Upgrade"), ("upgrade", "websocket")]);
        assert!(is_upgrade_request(&h));
    }

    #[test]
    fn test_connection_token_list() {
        let h = headers(&[("connection", "keep-alive, Upgrade"), ("upgrade", "websocket")]);
        assert!(is_upgrade_request(&h));
    }

    #[test]
    fn test_plain_requests_are_not_upgrades() {
        assert!(!is_upgrade_request(&headers(&[("connection", "keep-alive")])));
        assert!(!is_upgrade_request(&headers(&[("upgrade", "websocket")])));
        assert!(!is_upgrade_request(&headers(&[("connection", "upgrade")])));
    }

    #[test]
    fn test_non_websocket_upgrade() {
        let h = headers(&[("connection", "upgrade"), ("upgrade", "h2c")]);
        assert!(is_upgrade_request(&h));
    }
}
