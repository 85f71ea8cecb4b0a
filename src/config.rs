//! Run settings for the rain-height pipeline.
//!
//! Loaded from an optional JSON file; every field has a default matching the
//! DEP green infrastructure and Open Sewer Atlas layers.

use crate::Result;
use anyhow::Context;
use clap::ValueEnum;
use serde::Deserialize;
use std::path::Path;

/// What to do with an asset that lies within more than one sewershed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// One joined row per containing sewershed.
    #[default]
    All,
    /// Keep the first containing sewershed in table order.
    First,
    /// Abort the run.
    Error,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub asset_id_column: String,
    pub capacity_column: String,
    pub status_column: String,
    /// Case-sensitive substring marking an asset as built.
    pub status_marker: String,
    pub sewershed_key_column: String,
    pub csa_key_column: String,
    pub overlap: OverlapPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_id_column: "asset_id".to_string(),
            capacity_column: "calc_rain".to_string(),
            status_column: "status".to_string(),
            status_marker: "Constructed".to_string(),
            sewershed_key_column: "Sewershed".to_string(),
            csa_key_column: "sewershed".to_string(),
            overlap: OverlapPolicy::All,
        }
    }
}

impl Settings {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse settings file {}", path.display()))
    }
}
