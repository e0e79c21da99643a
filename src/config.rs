use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::blocks::nrzi::{StageKind, DEFAULT_WIDTH};

#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize, Deserialize)]
pub struct CodingConfig {
    /// Prefix of every generated module name.
    #[serde(default = "default_name")]
    pub name: String,
    /// Width of the parallel data bus.
    #[serde(default = "default_width")]
    pub width: usize,
    /// Register the outputs of every stage.
    #[serde(default)]
    pub pipeline: bool,
    #[serde(default = "default_stages")]
    pub stages: Vec<StageKind>,
    /// Length of an optional shift register for aligning control signals.
    #[serde(default)]
    pub shift_register: Option<usize>,
}

fn default_name() -> String {
    "utmi".to_string()
}

fn default_width() -> usize {
    DEFAULT_WIDTH
}

fn default_stages() -> Vec<StageKind> {
    StageKind::ALL.to_vec()
}

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            width: default_width(),
            pipeline: false,
            stages: default_stages(),
            shift_register: None,
        }
    }
}

pub fn parse_coding_config(path: impl AsRef<Path>) -> Result<CodingConfig> {
    let contents = std::fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}
