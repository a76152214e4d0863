use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::lifecycle::poller::OnManual;

/// File names looked up in the working directory, in order.
const CANDIDATES: [&str; 4] = [
    "pipeline-trigger.toml",
    "pipeline-trigger.json",
    "pipeline-trigger.yaml",
    "pipeline-trigger.yml",
];

/// Configuration file structure.
///
/// Every value is optional: command-line flags override the file, and the
/// file overrides built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// GitLab instance and credentials
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// Status polling parameters
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GitLabConfig {
    /// GitLab host, with or without scheme
    pub host: Option<String>,

    /// REST path of the projects collection
    pub url_path: Option<String>,

    /// Access token for queries and job control
    pub api_token: Option<String>,

    /// Pipeline trigger token
    pub pipeline_token: Option<String>,

    /// Verify TLS certificates
    pub verify_ssl: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PollingConfig {
    /// Seconds between two status queries
    pub sleep: Option<u64>,

    /// Consecutive status query failures tolerated
    pub max_failures: Option<u32>,

    /// Behavior when the pipeline waits for manual jobs
    pub on_manual: Option<OnManual>,
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipeline-trigger.{toml,json,yaml,yml}
    /// 3. `<config dir>/pipeline-trigger/config.toml`
    ///
    /// Returns default configuration if no file is found. An explicitly
    /// specified path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        match Self::discover(&cwd, dirs::config_dir().as_deref()) {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// First existing candidate file in `dir`, then in `config_dir`.
    fn discover(dir: &Path, config_dir: Option<&Path>) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .chain(config_dir.map(|base| base.join("pipeline-trigger").join("config.toml")))
            .find(|path| path.is_file())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}
