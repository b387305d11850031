use serde::{Deserialize, Serialize};

use crate::naming::Mode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_style_preset")]
    pub style_preset: String,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub workers: WorkersConfig,
    /// Per render call; 0 disables the limit.
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub generate_proposal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            output_directory: default_output_directory(),
            mode: Mode::default(),
            model: default_model(),
            language: default_language(),
            style_preset: default_style_preset(),
            retry: RetryConfig::default(),
            workers: WorkersConfig::default(),
            generation_timeout_secs: default_generation_timeout_secs(),
            generate_proposal: true,
        }
    }
}

fn default_output_directory() -> String {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("cvforge")
        .display()
        .to_string()
}

fn default_model() -> String {
    "default".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_style_preset() -> String {
    "modern".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkersConfig {
    /// Concurrent artifact generations within one item.
    #[serde(default = "default_generation_workers")]
    pub generation: usize,
    /// Concurrent items in a batch; derived from the CPU count when unset.
    #[serde(default)]
    pub batch: Option<usize>,
}

fn default_generation_workers() -> usize {
    3
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            generation: default_generation_workers(),
            batch: None,
        }
    }
}
