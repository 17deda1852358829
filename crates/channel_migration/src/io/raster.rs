use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::{
    error::{MigrationError, Result},
    grid,
    traits::MaskSource,
};

/// Reads single-band mask rasters from disk
///
/// Files are named `<anything>YYYY.<ext>`; the last four characters of the
/// stem are the year.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMaskSource;

impl MaskSource for FileMaskSource {
    fn load_raster(&self, path: &Path) -> Result<GrayImage> {
        let raster = image::open(path)?.to_luma8();
        debug!(
            path = %path.display(),
            width = raster.width(),
            height = raster.height(),
            "read raster"
        );
        grid::ensure_non_empty(&raster)?;
        Ok(grid::binarize(&raster))
    }

    fn parse_year(&self, path: &Path) -> Result<i32> {
        year_from_path(path)
    }
}

/// The trailing four digits of the file stem.
pub fn year_from_path(path: &Path) -> Result<i32> {
    let invalid = || MigrationError::InvalidYear {
        path: path.display().to_string(),
    };
    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let digits = stem
        .len()
        .checked_sub(4)
        .and_then(|start| stem.get(start..))
        .filter(|tail| tail.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(invalid)?;
    digits.parse().map_err(|_| invalid())
}
