//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform backend response for client
//! - Strip hop-by-hop headers
//! - Apply redirect rewriting
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - `101 Switching Protocols` keeps its connection headers

use axum::{
    body::Body,
    http::{
        header::{
            CONNECTION, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING,
            UPGRADE,
        },
        HeaderMap, HeaderName, Response, StatusCode,
    },
};

use crate::http::redirect::{RedirectContext, RedirectRewriter, RewriteOutcome};

static KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");

/// Remove connection-scoped headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        &CONNECTION,
        &KEEP_ALIVE,
        &PROXY_AUTHENTICATE,
        &PROXY_AUTHORIZATION,
        &TE,
        &TRAILER,
        &TRANSFER_ENCODING,
        &UPGRADE,
    ] {
        headers.remove(name);
    }
}

/// Turn a backend response into the client response.
pub fn prepare_response(
    response: Response<Body>,
    rewriter: &RedirectRewriter,
    ctx: &RedirectContext<'_>,
) -> (Response<Body>, RewriteOutcome) {
    let (mut parts, body) = response.into_parts();
    if parts.status != StatusCode::SWITCHING_PROTOCOLS {
        strip_hop_by_hop(&mut parts.headers);
    }
    let outcome = rewriter.rewrite(ctx, parts.status, &mut parts.headers);
    (Response::from_parts(parts, body), outcome)
}
