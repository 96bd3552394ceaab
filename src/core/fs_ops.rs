// src/core/fs_ops.rs
//! File system helpers shared by the commands

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::info;

pub struct FsOps;

impl FsOps {
    /// Ensure directory exists
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Ensure the directory a file is about to be written into exists
    pub async fn ensure_parent_dir(path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Self::ensure_dir_exists(parent).await,
            _ => Ok(()),
        }
    }

    /// Fail early with a readable message when an input file is missing
    pub fn require_file(path: &Path, what: &str) -> Result<()> {
        if !path.is_file() {
            anyhow::bail!("{} not found: {}", what, path.display());
        }
        Ok(())
    }
}
