use image::{GrayImage, Luma};
use tracing::{debug, warn};

use crate::{
    error::{MigrationError, Result},
    grid::{self, is_foreground},
    traits::MigrationQuantifier,
    types::{ChangeMap, ElevationGrid, MigrationResult},
};

/// Landsat resolution in metres, the usual source of the channel masks.
pub const DEFAULT_PIXEL_SIZE: f64 = 30.0;

const SQUARE_METRES_PER_KM2: f64 = 1e6;

/// Pixel-wise set comparison of two water masks
///
/// Erosion is channel present in the later mask but not the earlier one;
/// accretion is the reverse. Callers following the opposite hydrological
/// convention swap the two outputs.
#[derive(Debug, Clone)]
pub struct PixelMigrationQuantifier {
    pub pixel_size: f64,
}

impl PixelMigrationQuantifier {
    pub fn new(pixel_size: f64) -> Result<Self> {
        validate_pixel_size(pixel_size)?;
        Ok(Self { pixel_size })
    }
}

impl Default for PixelMigrationQuantifier {
    fn default() -> Self {
        Self {
            pixel_size: DEFAULT_PIXEL_SIZE,
        }
    }
}

impl MigrationQuantifier for PixelMigrationQuantifier {
    fn quantify(
        &self,
        earlier: &GrayImage,
        later: &GrayImage,
        elevation: Option<&ElevationGrid>,
    ) -> Result<MigrationResult> {
        quantify(earlier, later, self.pixel_size, elevation)
    }
}

pub fn validate_pixel_size(pixel_size: f64) -> Result<()> {
    if !pixel_size.is_finite() || pixel_size <= 0.0 {
        return Err(MigrationError::invalid_parameter(
            "pixel_size",
            pixel_size,
            "pixel size must be a positive, finite length in metres",
        ));
    }
    Ok(())
}

/// Compare the earlier mask `mask_a` with the later mask `mask_b`.
///
/// Areas are `pixels * pixel_size^2 / 1e6` (km² for metre pixels). With an
/// elevation grid, volumes are the elevation sum over the same pixels times
/// `pixel_size^2 / 1e6`. The divisor mirrors the area formula, so the unit
/// is only a true volume if the caller pre-scales the elevation.
pub fn quantify(
    mask_a: &GrayImage,
    mask_b: &GrayImage,
    pixel_size: f64,
    elevation: Option<&ElevationGrid>,
) -> Result<MigrationResult> {
    validate_pixel_size(pixel_size)?;
    let shape = grid::shape_of(mask_a);
    grid::ensure_same_shape("migration masks", shape, grid::shape_of(mask_b))?;
    if let Some(elevation) = elevation {
        grid::ensure_same_shape("elevation", shape, grid::shape_of(elevation))?;
    }

    let mut erosion_pixels = 0u64;
    let mut accretion_pixels = 0u64;
    let mut erosion_elevation = 0.0f64;
    let mut accretion_elevation = 0.0f64;

    for (x, y, before) in mask_a.enumerate_pixels() {
        let before = is_foreground(before);
        let after = is_foreground(mask_b.get_pixel(x, y));
        let z = elevation.map_or(0.0, |e| f64::from(e.get_pixel(x, y)[0]));
        match (before, after) {
            (false, true) => {
                erosion_pixels += 1;
                erosion_elevation += z;
            }
            (true, false) => {
                accretion_pixels += 1;
                accretion_elevation += z;
            }
            _ => {}
        }
    }

    let pixel_area_km2 = pixel_size * pixel_size / SQUARE_METRES_PER_KM2;
    let (erosion_volume, accretion_volume) = match elevation {
        Some(_) => {
            if !erosion_elevation.is_finite() || !accretion_elevation.is_finite() {
                warn!("elevation grid holds non-finite values under changed pixels");
            }
            (
                Some(erosion_elevation * pixel_area_km2),
                Some(accretion_elevation * pixel_area_km2),
            )
        }
        None => (None, None),
    };

    let result = MigrationResult {
        erosion_pixels,
        accretion_pixels,
        erosion_area_km2: erosion_pixels as f64 * pixel_area_km2,
        accretion_area_km2: accretion_pixels as f64 * pixel_area_km2,
        erosion_volume,
        accretion_volume,
    };
    debug!(
        erosion_pixels,
        accretion_pixels,
        erosion_km2 = result.erosion_area_km2,
        accretion_km2 = result.accretion_area_km2,
        "quantified migration"
    );
    Ok(result)
}

/// Signed change grid: `1` where only `mask_b` is channel (erosion), `-1`
/// where only `mask_a` is (accretion), `0` elsewhere.
pub fn change_map(mask_a: &GrayImage, mask_b: &GrayImage) -> Result<ChangeMap> {
    grid::ensure_same_shape("change map", grid::shape_of(mask_a), grid::shape_of(mask_b))?;
    Ok(ChangeMap::from_fn(mask_a.width(), mask_a.height(), |x, y| {
        let before = i8::from(is_foreground(mask_a.get_pixel(x, y)));
        let after = i8::from(is_foreground(mask_b.get_pixel(x, y)));
        Luma([after - before])
    }))
}
