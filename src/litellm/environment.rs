//! Environment variables the router reads that this process owns.
//!
//! Everything else in the router's environment comes from the service
//! declaration in the stack config.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::schema::PostgresConfig;
use crate::litellm::settings::LiteLlmSettings;

pub const LITELLM_MASTER_KEY: &str = "LITELLM_MASTER_KEY";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const SERVER_ROOT_PATH: &str = "SERVER_ROOT_PATH";
pub const LITELLM_LOG: &str = "LITELLM_LOG";
pub const STORE_MODEL_IN_DB: &str = "STORE_MODEL_IN_DB";

const REDACTED: [&str; 2] = [LITELLM_MASTER_KEY, DATABASE_URL];

/// Router environment derived from settings.
#[derive(Clone, PartialEq, Eq)]
pub struct RouterEnvironment {
    vars: BTreeMap<String, String>,
}

impl RouterEnvironment {
    pub fn from_settings(settings: &LiteLlmSettings, postgres: &PostgresConfig) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(
            LITELLM_MASTER_KEY.to_string(),
            settings.general_settings.master_key.clone(),
        );
        vars.insert(
            DATABASE_URL.to_string(),
            postgres.connection_url(&settings.database),
        );
        vars.insert(
            SERVER_ROOT_PATH.to_string(),
            settings.server_root_path.clone(),
        );
        vars.insert(LITELLM_LOG.to_string(), settings.log_level.clone());
        vars.insert(STORE_MODEL_IN_DB.to_string(), "True".to_string());
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Variable names, sorted. Values stay out of logs.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Merge into a service environment. Values owned here win.
    pub fn apply_to(&self, env: &mut BTreeMap<String, String>) {
        for (name, value) in &self.vars {
            env.insert(name.clone(), value.clone());
        }
    }
}

impl fmt::Debug for RouterEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.vars {
            if REDACTED.contains(&name.as_str()) {
                map.entry(name, &"<redacted>");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}
