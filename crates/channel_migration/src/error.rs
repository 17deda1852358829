use thiserror::Error;

use crate::types::GridShape;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: GridShape,
        found: GridShape,
    },

    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Grid must be two-dimensional and non-empty")]
    EmptyGrid,

    #[error("Year {0} is already present in the series")]
    DuplicateYear(i32),

    #[error("Year {year} does not follow {previous}; years must be strictly increasing")]
    UnsortedIngestion { previous: i32, year: i32 },

    #[error("Quantification needs at least two years, series has {found}")]
    InsufficientData { found: usize },

    #[error("Cannot {operation} while the series is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("{field} for year {year} has already been computed")]
    AlreadyDerived { year: i32, field: &'static str },

    #[error("Year {0} is not part of the series")]
    UnknownYear(i32),

    #[error("Could not parse a four-digit year from '{path}'")]
    InvalidYear { path: String },

    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,

    #[error("Failed to load raster: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("Invalid GeoJSON export: {0}")]
    InvalidGeoJson(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

impl MigrationError {
    pub(crate) fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
