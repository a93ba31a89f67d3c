use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::net::reduce::{DEFAULT_MAX_ITERATIONS, ReductionOptions};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChpConfig {
    #[serde(default = "default_reduce_max_iterations")]
    pub reduce_max_iterations: usize,
    #[serde(default = "default_flatten_max_passes")]
    pub flatten_max_passes: usize,
    #[serde(default = "default_reset_walk_limit")]
    pub reset_walk_limit: usize,
    #[serde(default = "default_exploration_state_limit")]
    pub exploration_state_limit: usize,
    #[serde(default = "default_channel_recv")]
    pub channel_recv: Vec<String>,
    #[serde(default = "default_channel_send")]
    pub channel_send: Vec<String>,
    #[serde(default = "default_channel_probe")]
    pub channel_probe: Vec<String>,
}

impl Default for ChpConfig {
    fn default() -> Self {
        Self {
            reduce_max_iterations: default_reduce_max_iterations(),
            flatten_max_passes: default_flatten_max_passes(),
            reset_walk_limit: default_reset_walk_limit(),
            exploration_state_limit: default_exploration_state_limit(),
            channel_recv: default_channel_recv(),
            channel_send: default_channel_send(),
            channel_probe: default_channel_probe(),
        }
    }
}

impl ChpConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: ChpConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    pub fn reduction_options(&self) -> ReductionOptions {
        ReductionOptions {
            max_iterations: self.reduce_max_iterations,
            ..ReductionOptions::default()
        }
    }
}

fn default_reduce_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_flatten_max_passes() -> usize {
    16
}

fn default_reset_walk_limit() -> usize {
    64
}

fn default_exploration_state_limit() -> usize {
    65536
}

fn default_channel_recv() -> Vec<String> {
    vec!["recv".to_string()]
}

fn default_channel_send() -> Vec<String> {
    vec!["send".to_string()]
}

fn default_channel_probe() -> Vec<String> {
    vec!["probe".to_string()]
}
