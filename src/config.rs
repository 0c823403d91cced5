//! Optional workspace configuration loaded from `repo-intel.yaml`.
//!
//! Every field has a default, so an absent file and an empty file both yield
//! [`IntelConfig::default`]. The loaded value is immutable and handed to the
//! orchestrator, which passes it on to the ranker and host classifier.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::ServiceContext;
use crate::error::IntelError;

/// File name looked up at the scan root.
pub const CONFIG_FILE: &str = "repo-intel.yaml";

const DEFAULT_STOP_WORDS: &[&str] = &[
    "src",
    "lib",
    "utils",
    "common",
    "api",
    "service",
    "services",
    "controller",
    "controllers",
    "models",
    "model",
    "index",
    "types",
    "type",
    "node",
    "app",
    "core",
    "shared",
    "module",
    "modules",
    "test",
    "tests",
    "spec",
    "impl",
    "internal",
    "external",
    "config",
    "scripts",
    "assets",
    "references",
    "docs",
    "dist",
    "build",
    "public",
    "private",
    "main",
];

const DEFAULT_INTERNAL_HOST_TOKENS: &[&str] =
    &["internal", "svc", "service", "cluster.local", ".local"];

/// Weights and limits for the domain term ranker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RankerConfig {
    /// Weight of a top-level folder name.
    pub folder_weight: u32,
    /// Weight of a route path segment.
    pub route_weight: u32,
    /// Weight of a data entity name.
    pub entity_weight: u32,
    /// Weight of a relationship endpoint name.
    pub relation_weight: u32,
    /// Weight of a declared type name.
    pub type_weight: u32,
    /// Number of terms kept after ranking.
    pub max_terms: usize,
    /// Shortest token kept, in characters.
    pub min_token_len: usize,
    /// Tokens never ranked.
    pub stop_words: Vec<String>,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            folder_weight: 2,
            route_weight: 3,
            entity_weight: 4,
            relation_weight: 3,
            type_weight: 1,
            max_terms: 30,
            min_token_len: 3,
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntelConfig {
    /// Domain term ranker settings.
    pub ranker: RankerConfig,
    /// Substrings marking a host as internal.
    pub internal_host_tokens: Vec<String>,
    /// Number of largest files reported.
    pub hotspot_limit: usize,
    /// Number of deepest folders reported.
    pub deepest_limit: usize,
    /// Directory names the surveyor skips in addition to the built-in set.
    pub extra_ignored_dirs: Vec<String>,
}

impl Default for IntelConfig {
    fn default() -> Self {
        Self {
            ranker: RankerConfig::default(),
            internal_host_tokens: DEFAULT_INTERNAL_HOST_TOKENS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            hotspot_limit: 5,
            deepest_limit: 5,
            extra_ignored_dirs: Vec::new(),
        }
    }
}

impl IntelConfig {
    /// Loads `repo-intel.yaml` from `root`, or returns defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns [`IntelError::Config`] if the file exists but cannot be parsed.
    pub fn load(ctx: &ServiceContext, root: &Path) -> Result<Self, IntelError> {
        let path = root.join(CONFIG_FILE);
        if !ctx.fs.exists(&path) {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = ctx
            .fs
            .read_to_string(&path)
            .map_err(|e| IntelError::Read { path: path.clone(), message: e.to_string() })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents)
            .map_err(|e| IntelError::Config { path, message: e.to_string() })
    }

    /// Returns `true` if `host` contains any internal host token.
    #[must_use]
    pub fn is_internal_host(&self, host: &str) -> bool {
        self.internal_host_tokens.iter().any(|token| host.contains(token.as_str()))
    }
}
