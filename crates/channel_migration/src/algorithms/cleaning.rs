use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::Norm,
    morphology,
    region_labelling::{connected_components, Connectivity},
};
use tracing::warn;

use crate::{
    error::Result,
    grid::{self, BACKGROUND, FOREGROUND},
    traits::MaskCleaner,
};

/// Background regions smaller than this are filled when no threshold is given.
pub const DEFAULT_MIN_REGION_SIZE: usize = 1000;

/// Chebyshev radius of the 5x5 square closing element.
const CLOSING_RADIUS: u8 = 2;

/// Morphological closing followed by small-hole filling
#[derive(Debug, Clone)]
pub struct MorphologicalCleaner {
    pub min_region_size: usize,
}

impl MorphologicalCleaner {
    /// Non-positive thresholds fall back to [`DEFAULT_MIN_REGION_SIZE`].
    pub fn new(min_region_size: i64) -> Self {
        Self {
            min_region_size: effective_min_region_size(min_region_size),
        }
    }
}

impl Default for MorphologicalCleaner {
    fn default() -> Self {
        Self {
            min_region_size: DEFAULT_MIN_REGION_SIZE,
        }
    }
}

impl MaskCleaner for MorphologicalCleaner {
    fn clean(&self, raw_mask: &GrayImage) -> Result<GrayImage> {
        clean(raw_mask, self.min_region_size as i64)
    }
}

pub fn effective_min_region_size(min_region_size: i64) -> usize {
    if min_region_size <= 0 {
        DEFAULT_MIN_REGION_SIZE
    } else {
        min_region_size as usize
    }
}

/// Produce a water mask from a raw channel mask.
///
/// Closes the mask with a 5x5 square, then reclassifies every 8-connected
/// background component with fewer than `min_region_size` pixels as channel.
/// Afterwards every remaining background component has at least
/// `min_region_size` pixels. A mask with no channel pixels is returned as is.
pub fn clean(raw_mask: &GrayImage, min_region_size: i64) -> Result<GrayImage> {
    grid::ensure_non_empty(raw_mask)?;
    let min_region_size = effective_min_region_size(min_region_size);
    let mask = grid::binarize(raw_mask);

    if grid::foreground_count(&mask) == 0 {
        warn!("mask has no channel pixels, nothing to clean");
        return Ok(mask);
    }

    let mut closed = close_square(&mask);
    fill_small_background(&mut closed, min_region_size);
    Ok(closed)
}

/// Closing with everything beyond the grid treated as background. The
/// border is wide enough that dilation never reaches the buffer edge, so
/// the subsequent erosion sees the true background there.
fn close_square(mask: &GrayImage) -> GrayImage {
    let border = 2 * u32::from(CLOSING_RADIUS);
    let padded = grid::pad(mask, border);
    let closed = morphology::close(&padded, Norm::LInf, CLOSING_RADIUS);
    grid::crop(&closed, border, grid::shape_of(mask))
}

fn fill_small_background(mask: &mut GrayImage, min_region_size: usize) {
    // Labels every non-foreground pixel, i.e. the background components.
    let labels = connected_components(&*mask, Connectivity::Eight, Luma([FOREGROUND]));

    let mut sizes: Vec<usize> = Vec::new();
    for label in labels.pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if sizes.len() <= label {
            sizes.resize(label + 1, 0);
        }
        sizes[label] += 1;
    }

    for (pixel, label) in mask.pixels_mut().zip(labels.pixels()) {
        let label = label[0] as usize;
        if label != 0 && pixel[0] == BACKGROUND && sizes[label] < min_region_size {
            *pixel = Luma([FOREGROUND]);
        }
    }
}
