//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Prepare request for forwarding to backend
//! - Add forwarding headers (`X-Forwarded-*`)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Path and query forwarded unchanged: backends see the mounted path
//! - Host rewritten to the backend authority

use std::net::SocketAddr;

use axum::{
    body::Body,
    http::{
        header::HOST,
        request::Parts,
        uri::{Scheme, Uri},
        HeaderMap, HeaderName, HeaderValue, Request,
    },
};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use uuid::Uuid;

use crate::http::response::strip_hop_by_hop;
use crate::routing::RouteRule;

pub const X_REQUEST_ID: &str = "x-request-id";

static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
static X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
static X_FORWARDED_PREFIX: HeaderName = HeaderName::from_static("x-forwarded-prefix");

/// UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let value = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok()?;
        Some(RequestId::new(value))
    }
}

/// Layer that sets `x-request-id` on requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::x_request_id(UuidRequestId)
}

/// Layer that copies `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Request id of an inbound request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the request sent to the rule's backend.
///
/// Upgrade requests keep `Connection`/`Upgrade` so the backend can switch.
pub fn build_upstream_request(
    parts: Parts,
    body: Body,
    rule: &RouteRule,
    client_addr: Option<SocketAddr>,
    is_upgrade: bool,
) -> Result<Request<Body>, axum::http::Error> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(rule.backend.as_str())
        .path_and_query(path_and_query)
        .build()?;

    let mut headers = parts.headers;
    let original_host = headers.remove(HOST);
    if !is_upgrade {
        strip_hop_by_hop(&mut headers);
    }
    add_forwarded_headers(&mut headers, rule, client_addr, original_host);

    let mut request = Request::new(body);
    *request.method_mut() = parts.method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    Ok(request)
}

fn add_forwarded_headers(
    headers: &mut HeaderMap,
    rule: &RouteRule,
    client_addr: Option<SocketAddr>,
    original_host: Option<HeaderValue>,
) {
    if let Some(addr) = client_addr {
        let ip = addr.ip().to_string();
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, ip),
            None => ip,
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO.clone(), HeaderValue::from_static("http"));
    }
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST.clone(), host);
    }
    if !rule.prefix.is_root() {
        if let Ok(prefix) = HeaderValue::from_str(rule.prefix.as_str()) {
            headers.insert(X_FORWARDED_PREFIX.clone(), prefix);
        }
    }
}
