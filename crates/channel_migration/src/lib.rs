//! # Channel Migration Analysis Library
//!
//! Quantifies how a river channel's planform shifts across a sequence of
//! year-tagged binary channel masks. Each mask is cleaned into a water mask,
//! reduced to a pruned centerline and a boundary, and compared with the next
//! year to measure erosion and accretion.
//!
//! ## Core Features
//!
//! - **Trait-based Architecture**: every stage sits behind a trait with one default implementation
//! - **Time Series State Machine**: masks move through `Loaded → Cleaned → Derived → Quantified`
//! - **Parallel Fan-out**: per-year and per-pair work runs on rayon with the `parallel` feature
//! - **GeoJSON Export**: centerlines and edges as point layers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use channel_migration::{FileMaskSource, Pipeline, TimeSeries};
//!
//! let mut series = TimeSeries::load(&FileMaskSource, ["masks/river_2000.tif", "masks/river_2001.tif"])?;
//! let pipeline = Pipeline::builder().with_min_region_size(500).build();
//!
//! let summary = pipeline.process_series(&mut series, None)?;
//! println!("total erosion: {:.3} km²", summary.total_erosion);
//! summary.save_json("migration.json")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configured Pipeline
//!
//! ```rust,no_run
//! use channel_migration::{AnalysisConfig, Pipeline};
//!
//! let config = AnalysisConfig::from_file("analysis.toml")?;
//! let pipeline = Pipeline::from_config(&config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod grid;
pub mod traits;
pub mod algorithms;
pub mod config;
pub mod series;
pub mod pipeline;
pub mod io;
pub(crate) mod maybe_rayon;

// Re-exports for convenience
pub use error::{MigrationError, Result};
pub use types::{
    ChangeMap, ElevationGrid, GridShape, MigrationResult, PairwiseMigration, RasterMask,
};
pub use traits::*;
pub use algorithms::*;
pub use config::{AnalysisConfig, EdgeSource};
pub use series::{MigrationSummary, SeriesState, TimeSeries};
pub use pipeline::{Pipeline, builder::PipelineBuilder};
pub use io::{FileMaskSource, layer_from_geojson};
