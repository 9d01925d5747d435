use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::StoreOptions;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LegacySmsConfig {
    pub database: Option<String>,
    pub busy_timeout_ms: Option<u64>,
}

impl LegacySmsConfig {
    /// Connection options, falling back to store defaults for unset fields
    pub fn store_options(&self) -> StoreOptions {
        let mut options = StoreOptions::default();
        if let Some(ms) = self.busy_timeout_ms {
            options.busy_timeout = Duration::from_millis(ms);
        }
        options
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("legacysms.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".legacysms").join("legacysms.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LegacySmsConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LegacySmsConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &LegacySmsConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
