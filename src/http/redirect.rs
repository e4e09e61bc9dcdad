//! Redirect rewriting for path-mounted backends.
//!
//! Backends mounted under a gateway prefix issue redirects as if they owned
//! the origin: either absolute URLs naming their internal host, or
//! root-relative paths that lose the prefix. This module rewrites the
//! `Location` header so the client stays on the gateway.
//!
//! # Decision order (first match wins)
//! 1. Protocol upgrade → untouched
//! 2. Not a 3xx, or no `Location` → untouched
//! 3. Absolute URL to a known backend (or a configured gateway authority)
//!    → path+query joined with the mount prefix, duplicate prefix collapsed
//! 4. Root-relative path → joined with the prefix serving the request path
//! 5. Anything else → untouched
//!
//! Rewriting never fails a response. Every anomaly is a [`SkipReason`].

use std::fmt;
use std::sync::Arc;

use axum::http::{header::LOCATION, HeaderMap, HeaderValue, Response, StatusCode};
use url::Url;

use crate::routing::{RouteRule, RouteTable};

/// Per-response inputs that do not live in the response itself.
#[derive(Debug, Clone, Copy)]
pub struct RedirectContext<'a> {
    /// Path of the inbound request that produced the response.
    pub request_path: &'a str,
    /// The exchange is a protocol upgrade (e.g. a WebSocket handshake).
    pub is_upgrade: bool,
}

/// Why a response was left as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Upgrade,
    NotRedirect,
    NoLocation,
    /// `Location` is not valid text or the rewritten value is not a valid header.
    Malformed,
    /// Absolute URL to a host outside the route table.
    UnknownHost,
    /// No route applies, or the rewrite would not change the value.
    Unmapped,
    /// Relative, protocol-relative or non-HTTP reference.
    Opaque,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upgrade => "upgrade",
            Self::NotRedirect => "not_redirect",
            Self::NoLocation => "no_location",
            Self::Malformed => "malformed",
            Self::UnknownHost => "unknown_host",
            Self::Unmapped => "unmapped",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one rewrite pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Rewritten { from: String, to: String },
    Skipped(SkipReason),
}

impl RewriteOutcome {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Rewritten { .. } => "rewritten",
            Self::Skipped(reason) => reason.as_str(),
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, Self::Rewritten { .. })
    }
}

/// Stateless `Location` rewriter over a fixed route table.
#[derive(Debug, Clone)]
pub struct RedirectRewriter {
    routes: Arc<RouteTable>,
}

impl RedirectRewriter {
    pub fn new(routes: Arc<RouteTable>) -> Self {
        Self { routes }
    }

    /// Rewrite the response's `Location` header in place.
    pub fn apply<B>(&self, ctx: &RedirectContext<'_>, response: &mut Response<B>) -> RewriteOutcome {
        let status = response.status();
        self.rewrite(ctx, status, response.headers_mut())
    }

    /// Rewrite `Location` in `headers` for a response with `status`.
    ///
    /// Only the first `Location` value is read. A rewrite leaves exactly one.
    pub fn rewrite(
        &self,
        ctx: &RedirectContext<'_>,
        status: StatusCode,
        headers: &mut HeaderMap,
    ) -> RewriteOutcome {
        if ctx.is_upgrade {
            return RewriteOutcome::Skipped(SkipReason::Upgrade);
        }
        if !status.is_redirection() {
            return RewriteOutcome::Skipped(SkipReason::NotRedirect);
        }
        let location = match headers.get(LOCATION).map(HeaderValue::to_str) {
            None => return RewriteOutcome::Skipped(SkipReason::NoLocation),
            Some(Err(_)) => return RewriteOutcome::Skipped(SkipReason::Malformed),
            Some(Ok(value)) => value.to_string(),
        };

        let outcome = self.rewrite_location(ctx.request_path, &location);
        if let RewriteOutcome::Rewritten { to, .. } = &outcome {
            match HeaderValue::from_str(to) {
                Ok(value) => {
                    headers.insert(LOCATION, value);
                }
                Err(_) => return RewriteOutcome::Skipped(SkipReason::Malformed),
            }
        }

        match &outcome {
            RewriteOutcome::Rewritten { from, to } => tracing::debug!(
                request_path = %ctx.request_path,
                from = %from,
                to = %to,
                "Rewrote redirect"
            ),
            RewriteOutcome::Skipped(reason) => tracing::trace!(
                request_path = %ctx.request_path,
                location = %location,
                reason = %reason,
                "Redirect left unchanged"
            ),
        }
        outcome
    }

    /// Decide the new `Location` for a request path, without touching headers.
    pub fn rewrite_location(&self, request_path: &str, location: &str) -> RewriteOutcome {
        let location = location.trim();
        if location.is_empty() {
            return RewriteOutcome::Skipped(SkipReason::NoLocation);
        }
        if location.starts_with("//") {
            return RewriteOutcome::Skipped(SkipReason::Opaque);
        }

        if location.starts_with('/') {
            return match self.routes.match_path(request_path) {
                Some(rule) => mount(rule, location, location),
                None => RewriteOutcome::Skipped(SkipReason::Unmapped),
            };
        }

        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return RewriteOutcome::Skipped(SkipReason::Opaque)
            }
            Err(_) => return RewriteOutcome::Skipped(SkipReason::Malformed),
        };
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return RewriteOutcome::Skipped(SkipReason::Opaque);
        }

        let path = match path_and_query(location) {
            Some(path) => path,
            None => return RewriteOutcome::Skipped(SkipReason::Opaque),
        };
        if let Some(rule) = self.routes.match_backend(&url, request_path) {
            return mount(rule, location, &path);
        }

        if self.routes.is_self_url(&url) {
            // Already a gateway path when it lands under a mounted prefix.
            if let Some(owner) = self.routes.match_path(&path) {
                if !owner.prefix.is_root() {
                    return changed(location, path);
                }
            }
            return match self.routes.match_path(request_path) {
                Some(rule) => mount(rule, location, &path),
                None => changed(location, path),
            };
        }

        RewriteOutcome::Skipped(SkipReason::UnknownHost)
    }
}

/// Join `path` under the rule's prefix and collapse a doubled prefix.
fn mount(rule: &RouteRule, original: &str, path: &str) -> RewriteOutcome {
    let joined = rule.prefix.join(path);
    changed(original, rule.prefix.collapse_duplicate(&joined))
}

fn changed(original: &str, target: String) -> RewriteOutcome {
    if target == original {
        RewriteOutcome::Skipped(SkipReason::Unmapped)
    } else {
        RewriteOutcome::Rewritten {
            from: original.to_string(),
            to: target,
        }
    }
}

/// Everything after the authority of an absolute URL, byte for byte.
///
/// `Url` resolves dot segments and re-encodes the query, so the backend's
/// own bytes are sliced out of the original string instead.
fn path_and_query(location: &str) -> Option<String> {
    let (_, rest) = location.split_once("://")?;
    let tail = match rest.find(|c: char| matches!(c, '/' | '?' | '#')) {
        Some(at) => &rest[at..],
        None => "",
    };
    Some(match tail.chars().next() {
        None => "/".to_string(),
        Some('/') => tail.to_string(),
        Some(_) => format!("/{}", tail),
    })
}
