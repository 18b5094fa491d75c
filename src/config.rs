//! Configuration management for the subgraph counter

use crate::combinatorics::MAX_COLORS;
use crate::error::{Result, SubgraphError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Run parameters; every field has a default so a config file may set any subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Palette size; defaults to the template vertex count
    pub num_colors: Option<usize>,

    /// Number of independent colorings averaged into the estimate
    pub iterations: usize,

    /// Number of workers the big graph is split across
    pub mapper_num: usize,

    /// Largest number of update triples in one message
    pub send_array_limit: usize,

    /// Ship each destination's buffer as soon as it is built, in rotated order
    pub rotation_pipeline: bool,

    /// Worker threads for intra-mapper parallelism (0 = the current rayon pool)
    pub threads: usize,

    /// Fixed seed for reproducible colorings
    pub seed: Option<u64>,

    /// Divide estimates by the template's automorphism count
    pub calculate_automorphism: bool,

    /// Keep per-vertex root counts
    pub vertex_counts: bool,

    /// How long a worker waits on a peer before giving up
    pub recv_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_colors: None,
            iterations: 1,
            mapper_num: 1,
            send_array_limit: 1000,
            rotation_pipeline: false,
            threads: 0,
            seed: None,
            calculate_automorphism: true,
            vertex_counts: false,
            recv_timeout_ms: 30_000,
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(num_colors: Option<usize>, iterations: usize, mapper_num: usize) -> Self {
        Self {
            num_colors,
            iterations,
            mapper_num,
            ..Default::default()
        }
    }

    /// Load a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check the parameters against a template size; returns the palette size to use
    pub fn validate(&self, template_vertices: usize) -> Result<usize> {
        if template_vertices == 0 {
            return Err(SubgraphError::config("template has no vertices"));
        }
        let num_colors = self.num_colors.unwrap_or(template_vertices);
        if num_colors < template_vertices {
            return Err(SubgraphError::config(format!(
                "{} colors cannot color a {}-vertex template",
                num_colors, template_vertices
            )));
        }
        if num_colors > MAX_COLORS {
            return Err(SubgraphError::config(format!(
                "at most {} colors are supported, {} requested",
                MAX_COLORS, num_colors
            )));
        }
        if self.iterations == 0 {
            return Err(SubgraphError::config("iterations must be positive"));
        }
        if self.mapper_num == 0 {
            return Err(SubgraphError::config("mapper_num must be positive"));
        }
        if self.send_array_limit == 0 {
            return Err(SubgraphError::config("send_array_limit must be positive"));
        }
        Ok(num_colors)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_template() {
        let config = Config::default();
        assert_eq!(config.validate(4).unwrap(), 4);
        assert_eq!(config.recv_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::new(Some(2), 1, 1).validate(3).is_err());
        assert!(Config::new(Some(21), 1, 1).validate(3).is_err());
        assert!(Config::new(None, 0, 1).validate(3).is_err());
        assert!(Config::new(None, 1, 0).validate(3).is_err());
        let mut config = Config::default();
        config.send_array_limit = 0;
        assert!(config.validate(3).is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: Config = serde_json::from_str(r#"{"iterations": 5, "seed": 3}"#).unwrap();
        assert_eq!(config.iterations, 5);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.mapper_num, 1);
        assert!(config.calculate_automorphism);
    }
}
