use std::fmt;

use image::{GrayImage, ImageBuffer, Luma};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{MigrationError, Result},
    grid,
};

/// Elevation surface aligned with the mask grids.
pub type ElevationGrid = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Signed per-pixel change between two years: `+1` erosion, `-1` accretion, `0` unchanged.
pub type ChangeMap = ImageBuffer<Luma<i8>, Vec<i8>>;

/// Grid dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct GridShape {
    pub width: u32,
    pub height: u32,
}

impl GridShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One year's channel observation and the grids derived from it.
///
/// The raw mask is fixed at construction. Each derived grid is assigned at
/// most once and always matches the raw mask's shape.
#[derive(Debug, Clone)]
pub struct RasterMask {
    year: i32,
    raw_mask: GrayImage,
    water_mask: Option<GrayImage>,
    centerline: Option<GrayImage>,
    edges: Option<GrayImage>,
    elevation: Option<ElevationGrid>,
}

impl RasterMask {
    /// Wrap a raw channel mask. Non-zero pixels are channel.
    pub fn new(year: i32, raw_mask: GrayImage) -> Result<Self> {
        grid::ensure_non_empty(&raw_mask)?;
        Ok(Self {
            year,
            raw_mask: grid::binarize(&raw_mask),
            water_mask: None,
            centerline: None,
            edges: None,
            elevation: None,
        })
    }

    /// Build from row-major booleans.
    pub fn from_bools(year: i32, width: u32, height: u32, cells: &[bool]) -> Result<Self> {
        Self::new(year, grid::from_bools(width, height, cells)?)
    }

    /// Attach a per-year elevation surface.
    pub fn with_elevation(mut self, elevation: ElevationGrid) -> Result<Self> {
        grid::ensure_same_shape("elevation", self.shape(), grid::shape_of(&elevation))?;
        self.elevation = Some(elevation);
        Ok(self)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn shape(&self) -> GridShape {
        grid::shape_of(&self.raw_mask)
    }

    pub fn raw_mask(&self) -> &GrayImage {
        &self.raw_mask
    }

    pub fn water_mask(&self) -> Option<&GrayImage> {
        self.water_mask.as_ref()
    }

    pub fn centerline(&self) -> Option<&GrayImage> {
        self.centerline.as_ref()
    }

    pub fn edges(&self) -> Option<&GrayImage> {
        self.edges.as_ref()
    }

    pub fn elevation(&self) -> Option<&ElevationGrid> {
        self.elevation.as_ref()
    }

    pub(crate) fn set_water_mask(&mut self, mask: GrayImage) -> Result<()> {
        let (year, shape) = (self.year, self.shape());
        assign_once(&mut self.water_mask, mask, year, shape, "water mask")
    }

    pub(crate) fn set_centerline(&mut self, centerline: GrayImage) -> Result<()> {
        let (year, shape) = (self.year, self.shape());
        assign_once(&mut self.centerline, centerline, year, shape, "centerline")
    }

    pub(crate) fn set_edges(&mut self, edges: GrayImage) -> Result<()> {
        let (year, shape) = (self.year, self.shape());
        assign_once(&mut self.edges, edges, year, shape, "edges")
    }
}

fn assign_once(
    slot: &mut Option<GrayImage>,
    value: GrayImage,
    year: i32,
    shape: GridShape,
    field: &'static str,
) -> Result<()> {
    if slot.is_some() {
        return Err(MigrationError::AlreadyDerived { year, field });
    }
    grid::ensure_same_shape(field, shape, grid::shape_of(&value))?;
    *slot = Some(value);
    Ok(())
}

/// Erosion and accretion between two chronologically adjacent water masks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationResult {
    /// Pixels that are channel in the later year only
    pub erosion_pixels: u64,
    /// Pixels that are channel in the earlier year only
    pub accretion_pixels: u64,
    pub erosion_area_km2: f64,
    pub accretion_area_km2: f64,
    /// Elevation-weighted counterpart of the erosion area, present when an
    /// elevation grid was supplied
    pub erosion_volume: Option<f64>,
    pub accretion_volume: Option<f64>,
}

impl MigrationResult {
    /// True when both masks were pixel-identical.
    pub fn is_unchanged(&self) -> bool {
        self.erosion_pixels == 0 && self.accretion_pixels == 0
    }

    /// The result of comparing the same masks in the opposite order.
    pub fn reversed(&self) -> Self {
        Self {
            erosion_pixels: self.accretion_pixels,
            accretion_pixels: self.erosion_pixels,
            erosion_area_km2: self.accretion_area_km2,
            accretion_area_km2: self.erosion_area_km2,
            erosion_volume: self.accretion_volume,
            accretion_volume: self.erosion_volume,
        }
    }
}

/// A [`MigrationResult`] tagged with the two years it compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PairwiseMigration {
    pub year_a: i32,
    pub year_b: i32,
    #[serde(flatten)]
    pub result: MigrationResult,
}
