//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries
//! - Match backend authorities against absolute URLs
//! - Join and de-duplicate mount prefixes
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec)
//! - Path matching is case-sensitive
//! - A prefix matches whole segments only: `/n8n` never matches `/n8nx`
//! - No regex to guarantee O(n) matching

use std::str::FromStr;

use axum::http::uri::Authority;
use url::Url;

/// Normalize a mount prefix: no trailing slash, root stays `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// True when `value` starts with `prefix` followed by a segment boundary.
fn starts_with_segment(value: &str, prefix: &str) -> bool {
    match value.strip_prefix(prefix) {
        Some(rest) => {
            rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#')
        }
        None => false,
    }
}

/// A gateway mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix {
    prefix: String,
}

impl PathPrefix {
    /// Create a path prefix, normalizing trailing slashes.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    pub fn is_root(&self) -> bool {
        self.prefix == "/"
    }

    /// Length used for longest-prefix selection.
    pub fn specificity(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.prefix.len()
        }
    }

    /// True when the path (optionally with query) lies under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if self.is_root() {
            return path.starts_with('/');
        }
        starts_with_segment(path, &self.prefix)
    }

    /// Mount a root-relative path under this prefix.
    pub fn join(&self, path: &str) -> String {
        if self.is_root() {
            path.to_string()
        } else {
            format!("{}{}", self.prefix, path)
        }
    }

    /// Collapse a repeated leading prefix (`/p/p/x` → `/p/x`).
    ///
    /// Any other path structure is returned unchanged.
    pub fn collapse_duplicate(&self, path: &str) -> String {
        if self.is_root() {
            return path.to_string();
        }
        let doubled = format!("{}{}", self.prefix, self.prefix);
        let mut current = path;
        while starts_with_segment(current, &doubled) {
            current = &current[self.prefix.len()..];
        }
        current.to_string()
    }
}

/// Matches the authority of an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityMatcher {
    host: String,
    port: Option<u16>,
}

impl AuthorityMatcher {
    /// Parse `host[:port]`. Returns `None` for anything else.
    pub fn parse(authority: &str) -> Option<Self> {
        let parsed = Authority::from_str(authority).ok()?;
        if parsed.as_str().contains('@') {
            return None;
        }
        let host = parsed
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_lowercase();
        Some(Self {
            host,
            port: parsed.port_u16(),
        })
    }

    /// True when the URL points at this authority.
    ///
    /// Without a configured port any port matches; otherwise the URL's
    /// effective port (explicit or scheme default) must be equal.
    pub fn matches(&self, url: &Url) -> bool {
        let host = match url.host_str() {
            Some(h) => h.trim_start_matches('[').trim_end_matches(']').to_lowercase(),
            None => return false,
        };
        if host != self.host {
            return false;
        }
        match self.port {
            Some(port) => url.port_or_known_default() == Some(port),
            None => true,
        }
    }
}
