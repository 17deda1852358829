use std::path::Path;

use image::GrayImage;
use crate::{
    error::Result,
    types::{ElevationGrid, MigrationResult},
};

/// Trait for turning a raw channel mask into a water mask
pub trait MaskCleaner: Send + Sync {
    /// Close small gaps and fill undersized background regions
    fn clean(&self, raw_mask: &GrayImage) -> Result<GrayImage>;
}

/// Trait for topology-preserving thinning
pub trait Skeletonizer: Send + Sync {
    /// Reduce the foreground to a one-pixel-wide skeleton
    fn skeletonize(&self, mask: &GrayImage) -> GrayImage;
}

/// Trait for centerline extraction algorithms
pub trait CenterlineExtractor: Send + Sync {
    /// Extract a branch-trimmed centerline from a water mask
    fn extract(&self, water_mask: &GrayImage) -> Result<GrayImage>;
}

/// Trait for boundary extraction algorithms
pub trait EdgeExtractor: Send + Sync {
    /// Extract the foreground pixels adjacent to background
    fn extract_edges(&self, mask: &GrayImage) -> Result<GrayImage>;
}

/// Trait for comparing two chronologically ordered water masks
pub trait MigrationQuantifier: Send + Sync {
    /// Compare `earlier` against `later`
    fn quantify(
        &self,
        earlier: &GrayImage,
        later: &GrayImage,
        elevation: Option<&ElevationGrid>,
    ) -> Result<MigrationResult>;
}

/// Trait for the collaborator that turns raster files into year-tagged masks
pub trait MaskSource: Send + Sync {
    /// Read band 1 of the raster as a binary grid
    fn load_raster(&self, path: &Path) -> Result<GrayImage>;

    /// Derive the observation year from the source identifier
    fn parse_year(&self, path: &Path) -> Result<i32>;
}
