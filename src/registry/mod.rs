//! Downstream registry for authtunnel
//!
//! Maps the path segment of every incoming request to the downstream MCP
//! server definition it addresses. Built once from a validated config and
//! immutable afterwards, so it is shared freely across request tasks.

use crate::config::DownstreamConfig;
use std::collections::HashMap;

/// Immutable name → downstream lookup table
#[derive(Debug)]
pub struct DownstreamRegistry {
    downstreams: HashMap<String, DownstreamConfig>,
}

impl DownstreamRegistry {
    /// Build a registry from validated downstream definitions.
    ///
    /// Name uniqueness is guaranteed by config validation, which runs before
    /// this constructor.
    pub fn new(downstreams: Vec<DownstreamConfig>) -> Self {
        let downstreams = downstreams
            .into_iter()
            .map(|ds| (ds.name.clone(), ds))
            .collect();
        Self { downstreams }
    }

    /// Resolve a path segment to its downstream definition
    pub fn lookup(&self, name: &str) -> Option<&DownstreamConfig> {
        self.downstreams.get(name)
    }

    /// Number of configured downstreams
    pub fn len(&self) -> usize {
        self.downstreams.len()
    }

    /// True when no downstreams are configured
    pub fn is_empty(&self) -> bool {
        self.downstreams.is_empty()
    }

    /// Iterate over all downstream definitions
    pub fn iter(&self) -> impl Iterator<Item = &DownstreamConfig> {
        self.downstreams.values()
    }
}
