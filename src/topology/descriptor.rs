//! Service declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A deployable backend (router, chat UI, workflow engine, database).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Unique service name.
    pub name: String,

    /// Image reference (e.g. "postgres:16").
    pub image: String,

    #[serde(default)]
    pub ports: Vec<PortMapping>,

    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Services this one waits for.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            environment: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_port(mut self, name: impl Into<String>, port: u16, target_port: u16) -> Self {
        self.ports.push(PortMapping {
            name: name.into(),
            port,
            target_port,
        });
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn waits_for(mut self, service: impl Into<String>) -> Self {
        self.depends_on.push(service.into());
        self
    }
}

/// A published port.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PortMapping {
    pub name: String,
    /// Host-side port.
    pub port: u16,
    /// Container-side port.
    pub target_port: u16,
}

/// Opaque reference to a service added to a builder.
///
/// Only valid for the builder that issued it (or a clone of it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceHandle {
    pub(crate) builder: u64,
    pub(crate) index: usize,
}
