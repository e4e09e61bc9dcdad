//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Required router fields are present and non-empty
//! - Route table is well-formed (prefix shape, backend authority, no duplicates)
//! - Gateway self authorities are plain `host[:port]`
//!
//! # Design Decisions
//! - Fail fast: the first failing rule is returned
//! - Master key is checked before the model list
//! - Validation is a pure function over the loaded config

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::RouteConfig;
use crate::litellm::settings::LiteLlmSettings;
use crate::routing::matcher::{normalize_prefix, AuthorityMatcher};

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required field is empty or absent.
    MissingField,
    /// A name or prefix is declared twice.
    DuplicateName,
    /// A numeric value is outside its allowed range.
    OutOfRange,
    /// An API key reference is not an environment variable name.
    InvalidSecretReference,
    /// A route prefix or backend authority is malformed.
    InvalidRoute,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingField => "missing field",
            Self::DuplicateName => "duplicate name",
            Self::OutOfRange => "value out of range",
            Self::InvalidSecretReference => "invalid secret reference",
            Self::InvalidRoute => "invalid route",
        };
        f.write_str(s)
    }
}

/// A failed validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} `{field}` for `{target}`")]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// What failed: a model name, `model_list[i]`, `masterKey`, a route name.
    pub target: String,
    /// The offending field.
    pub field: &'static str,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, target: impl Into<String>, field: &'static str) -> Self {
        Self {
            kind,
            target: target.into(),
            field,
        }
    }

    fn missing(target: impl Into<String>, field: &'static str) -> Self {
        Self::new(ValidationErrorKind::MissingField, target, field)
    }
}

/// Validate router settings before compilation.
pub fn validate(settings: &LiteLlmSettings) -> Result<(), ValidationError> {
    if settings.general_settings.master_key.is_empty() {
        return Err(ValidationError::missing("masterKey", "master_key"));
    }

    let mut seen = HashSet::new();
    for (index, entry) in settings.model_list.iter().enumerate() {
        if entry.name.is_empty() {
            return Err(ValidationError::missing(
                format!("model_list[{}]", index),
                "model_name",
            ));
        }
        if entry.model.is_empty() {
            return Err(ValidationError::missing(&entry.name, "model"));
        }
        if entry.api_base.is_empty() {
            return Err(ValidationError::missing(&entry.name, "api_base"));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                &entry.name,
                "model_name",
            ));
        }
        if let Some(secret) = entry.api_key_ref() {
            if !secret.is_valid_name() {
                return Err(ValidationError::new(
                    ValidationErrorKind::InvalidSecretReference,
                    &entry.name,
                    "api_key_env",
                ));
            }
        }
    }

    if settings.router_settings.timeout == 0 {
        return Err(ValidationError::new(
            ValidationErrorKind::OutOfRange,
            "router_settings",
            "timeout",
        ));
    }

    Ok(())
}

/// Validate the gateway route table.
pub fn validate_routes(routes: &[RouteConfig]) -> Result<(), ValidationError> {
    let mut prefixes = HashSet::new();
    for route in routes {
        if route.name.is_empty() {
            return Err(ValidationError::missing(route.prefix.clone(), "name"));
        }
        if !route.prefix.starts_with('/') {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidRoute,
                &route.name,
                "prefix",
            ));
        }
        if route.backend.is_empty() {
            return Err(ValidationError::missing(&route.name, "backend"));
        }
        if Authority::from_str(&route.backend).is_err() || route.backend.contains('@') {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidRoute,
                &route.name,
                "backend",
            ));
        }
        if !prefixes.insert(normalize_prefix(&route.prefix)) {
            return Err(ValidationError::new(
                ValidationErrorKind::DuplicateName,
                &route.name,
                "prefix",
            ));
        }
    }
    Ok(())
}

/// Validate the authorities the gateway answers on.
///
/// Same rule as route backends: `host[:port]` with no userinfo.
pub fn validate_self_authorities(authorities: &[String]) -> Result<(), ValidationError> {
    match authorities
        .iter()
        .find(|a| AuthorityMatcher::parse(a).is_none())
    {
        Some(bad) => Err(ValidationError::new(
            ValidationErrorKind::InvalidRoute,
            bad.clone(),
            "self_authorities",
        )),
        None => Ok(()),
    }
}
