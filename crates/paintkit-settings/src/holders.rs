//! Holder and pot configuration files
//!
//! Both files are JSON lists. Holders look like
//! `{"index": 0, "colorIdx": "1 red", "x": 100, "y": 20, "brushes": [{"size": "3"}]}`
//! and pots like `{"index": 0, "color": "red"}`.

use paintkit_core::{ConfigError, ResourceError, Result};
use paintkit_resources::{HolderConfig, PotConfig};
use serde::de::DeserializeOwned;
use std::path::Path;

fn load_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let items = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(items)
}

/// Load holder stations; a session cannot start without at least one
pub fn load_holders(path: &Path) -> Result<Vec<HolderConfig>> {
    let holders: Vec<HolderConfig> = load_list(path)?;
    if holders.is_empty() {
        return Err(ResourceError::NoHolders.into());
    }
    tracing::info!("Loaded {} holders from {}", holders.len(), path.display());
    Ok(holders)
}

/// Load pots, or none when no file is configured
pub fn load_pots(path: Option<&Path>) -> Result<Vec<PotConfig>> {
    match path {
        Some(path) => {
            let pots: Vec<PotConfig> = load_list(path)?;
            tracing::info!("Loaded {} pots from {}", pots.len(), path.display());
            Ok(pots)
        }
        None => Ok(Vec::new()),
    }
}
