use std::fs;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    algorithms::{
        migration::validate_pixel_size, DEFAULT_MAX_PRUNE_ITERATIONS, DEFAULT_MIN_REGION_SIZE,
        DEFAULT_MIN_ROW_WIDTH, DEFAULT_PIXEL_SIZE,
    },
    error::{MigrationError, Result},
};

/// Which grid the edge extractor runs on
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EdgeSource {
    /// The mask as ingested
    #[default]
    RawMask,
    /// The cleaned water mask
    WaterMask,
}

/// Parameters for a full migration analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Background regions smaller than this (pixels) are filled; non-positive means the default
    pub min_region_size: i64,
    /// Upper bound on pruning passes; non-positive means the default
    pub max_prune_iterations: i64,
    /// Ground size of one pixel edge in metres
    #[schemars(range(min = 0.0))]
    pub pixel_size: f64,
    pub edge_source: EdgeSource,
    /// Rows with at most this many channel pixels are skipped when averaging width
    pub min_row_width: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_region_size: DEFAULT_MIN_REGION_SIZE as i64,
            max_prune_iterations: DEFAULT_MAX_PRUNE_ITERATIONS as i64,
            pixel_size: DEFAULT_PIXEL_SIZE,
            edge_source: EdgeSource::default(),
            min_row_width: DEFAULT_MIN_ROW_WIDTH,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        validate_pixel_size(self.pixel_size)
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        let config: AnalysisConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(MigrationError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the JSON schema for the configuration
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisConfig)
    }
}
