//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled route rules
//! - Longest-prefix lookup for request paths
//! - Backend lookup for absolute redirect targets
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scans (acceptable for a handful of mounted services)
//! - Explicit `None` rather than a silent default

use axum::http::Request;
use url::Url;

use crate::config::schema::{GatewayConfig, RouteConfig};
use crate::config::validation::{validate_routes, validate_self_authorities, ValidationError};
use crate::routing::matcher::{AuthorityMatcher, PathPrefix};

/// A gateway prefix mounted onto one backend.
#[derive(Debug, Clone)]
pub struct RouteRule {
    pub name: String,
    pub prefix: PathPrefix,
    /// Backend authority as configured (`host:port`).
    pub backend: String,
    authority: AuthorityMatcher,
}

impl RouteRule {
    /// True when an absolute URL points at this rule's backend.
    pub fn is_backend_url(&self, url: &Url) -> bool {
        self.authority.matches(url)
    }
}

/// Compiled, immutable route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    self_authorities: Vec<AuthorityMatcher>,
}

impl RouteTable {
    /// Compile route configuration. Rules keep their declared order.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ValidationError> {
        validate_routes(routes)?;

        let rules = routes
            .iter()
            .filter_map(|route| {
                AuthorityMatcher::parse(&route.backend).map(|authority| RouteRule {
                    name: route.name.clone(),
                    prefix: PathPrefix::new(&route.prefix),
                    backend: route.backend.clone(),
                    authority,
                })
            })
            .collect();

        Ok(Self {
            rules,
            self_authorities: Vec::new(),
        })
    }

    /// Compile the whole gateway section: routes plus self authorities.
    pub fn from_gateway(gateway: &GatewayConfig) -> Result<Self, ValidationError> {
        validate_self_authorities(&gateway.self_authorities)?;
        Ok(Self::from_config(&gateway.routes)?.with_self_authorities(&gateway.self_authorities))
    }

    /// Authorities the gateway itself answers on. Expects validated input.
    pub fn with_self_authorities(mut self, authorities: &[String]) -> Self {
        self.self_authorities = authorities
            .iter()
            .filter_map(|a| AuthorityMatcher::parse(a))
            .collect();
        self
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Longest-prefix match of a request path.
    ///
    /// Ties cannot occur: duplicate prefixes are rejected at construction.
    pub fn match_path(&self, path: &str) -> Option<&RouteRule> {
        self.rules
            .iter()
            .filter(|rule| rule.prefix.matches(path))
            .max_by_key(|rule| rule.prefix.specificity())
    }

    /// Match a request by its path.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&RouteRule> {
        self.match_path(req.uri().path())
    }

    /// Find the rule whose backend an absolute URL points at.
    ///
    /// When several rules share a backend, the one serving `request_path`
    /// wins; otherwise the first declared.
    pub fn match_backend(&self, url: &Url, request_path: &str) -> Option<&RouteRule> {
        let mut candidates = self.rules.iter().filter(|rule| rule.is_backend_url(url));
        let first = candidates.next()?;

        if let Some(serving) = self.match_path(request_path) {
            if serving.is_backend_url(url) {
                return Some(serving);
            }
        }
        Some(first)
    }

    /// True when an absolute URL points at the gateway itself.
    pub fn is_self_url(&self, url: &Url) -> bool {
        self.self_authorities.iter().any(|a| a.matches(url))
    }
}
