// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_CONFIG_FILE: &str = "insights.yaml";

/// Where the exports are read from and where reports are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_messages_csv")]
    pub messages_csv: PathBuf,
    #[serde(default = "default_people_csv")]
    pub people_csv: PathBuf,
    #[serde(default = "default_threads_csv")]
    pub threads_csv: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_messages_csv() -> PathBuf {
    PathBuf::from("exports/attio/messages.csv")
}

fn default_people_csv() -> PathBuf {
    PathBuf::from("exports/attio/people.csv")
}

fn default_threads_csv() -> PathBuf {
    PathBuf::from("exports/attio/threads.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs/excel_reports")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            messages_csv: default_messages_csv(),
            people_csv: default_people_csv(),
            threads_csv: default_threads_csv(),
            output_dir: default_output_dir(),
        }
    }
}

impl PathsConfig {
    /// Load paths from an explicit file, else from `insights.yaml` if present, else defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let paths = match config_file {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_file(&default_path)?
                } else {
                    info!("No {} found, using default export paths", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };

        paths.resolved()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading paths configuration from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Invalid paths configuration")
    }

    fn resolved(self) -> Result<Self> {
        Ok(Self {
            messages_csv: resolve_path(&self.messages_csv)?,
            people_csv: resolve_path(&self.people_csv)?,
            threads_csv: resolve_path(&self.threads_csv)?,
            output_dir: resolve_path(&self.output_dir)?,
        })
    }
}

fn resolve_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(current_dir.join(path))
    }
}
