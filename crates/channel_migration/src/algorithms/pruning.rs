use image::GrayImage;
use tracing::debug;

use crate::{
    error::Result,
    grid::{self, PaddedGrid},
    traits::{CenterlineExtractor, Skeletonizer},
    algorithms::skeleton::ZhangSuenThinning,
};

/// Pruning passes run when no limit is given.
pub const DEFAULT_MAX_PRUNE_ITERATIONS: usize = 100;

/// Result of iterative endpoint pruning
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    pub centerline: GrayImage,
    /// Foreground pixel count after each executed pass
    pub pixel_counts: Vec<usize>,
    /// True when the last pass found no endpoints
    pub converged: bool,
}

impl PruneOutcome {
    pub fn passes(&self) -> usize {
        self.pixel_counts.len()
    }
}

/// Skeletonization followed by endpoint pruning
#[derive(Debug, Clone)]
pub struct PrunedCenterlineExtractor<S = ZhangSuenThinning> {
    pub skeletonizer: S,
    pub max_prune_iterations: usize,
}

impl PrunedCenterlineExtractor<ZhangSuenThinning> {
    /// Non-positive limits fall back to [`DEFAULT_MAX_PRUNE_ITERATIONS`].
    pub fn new(max_prune_iterations: i64) -> Self {
        Self::with_skeletonizer(ZhangSuenThinning, max_prune_iterations)
    }
}

impl<S: Skeletonizer> PrunedCenterlineExtractor<S> {
    pub fn with_skeletonizer(skeletonizer: S, max_prune_iterations: i64) -> Self {
        Self {
            skeletonizer,
            max_prune_iterations: effective_max_prune_iterations(max_prune_iterations),
        }
    }
}

impl Default for PrunedCenterlineExtractor<ZhangSuenThinning> {
    fn default() -> Self {
        Self {
            skeletonizer: ZhangSuenThinning,
            max_prune_iterations: DEFAULT_MAX_PRUNE_ITERATIONS,
        }
    }
}

impl<S: Skeletonizer> CenterlineExtractor for PrunedCenterlineExtractor<S> {
    fn extract(&self, water_mask: &GrayImage) -> Result<GrayImage> {
        grid::ensure_non_empty(water_mask)?;
        let skeleton = self.skeletonizer.skeletonize(water_mask);
        Ok(prune_endpoints(&skeleton, self.max_prune_iterations).centerline)
    }
}

pub fn effective_max_prune_iterations(max_prune_iterations: i64) -> usize {
    if max_prune_iterations <= 0 {
        DEFAULT_MAX_PRUNE_ITERATIONS
    } else {
        max_prune_iterations as usize
    }
}

/// Skeletonize `water_mask` with Zhang-Suen thinning and prune spurs.
pub fn extract(water_mask: &GrayImage, max_prune_iterations: i64) -> Result<GrayImage> {
    PrunedCenterlineExtractor::new(max_prune_iterations).extract(water_mask)
}

/// Remove skeleton endpoints for up to `passes` passes.
///
/// An endpoint is a foreground pixel with exactly one foreground pixel in
/// its Moore neighbourhood. Each pass collects all endpoints of the current
/// grid and clears them together, so the outcome does not depend on scan
/// order. Stops early once a pass finds no endpoints. Isolated pixels have
/// no neighbours and are never endpoints. `passes == 0` leaves the skeleton
/// untouched.
pub fn prune_endpoints(skeleton: &GrayImage, passes: usize) -> PruneOutcome {
    let mut grid = PaddedGrid::from_mask(skeleton);
    let mut pixel_counts = Vec::new();
    let mut converged = false;

    for pass in 0..passes {
        let endpoints = find_endpoints(&grid);
        if endpoints.is_empty() {
            converged = true;
            break;
        }
        for &(r, c) in &endpoints {
            grid.clear(r, c);
        }
        let remaining = grid.count();
        debug!(pass, removed = endpoints.len(), remaining, "pruned endpoints");
        pixel_counts.push(remaining);
    }

    PruneOutcome {
        centerline: grid.to_mask(),
        pixel_counts,
        converged,
    }
}

fn find_endpoints(grid: &PaddedGrid) -> Vec<(usize, usize)> {
    grid.foreground()
        .filter(|&(r, c)| grid.neighbors(r, c).iter().sum::<u8>() == 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{foreground_count, from_bools, FOREGROUND};
    use image::Luma;

    fn from_rows(rows: &[&str]) -> GrayImage {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let cells: Vec<bool> = rows.iter().flat_map(|row| row.chars().map(|c| c == '#')).collect();
        from_bools(width, height, &cells).unwrap()
    }

    #[test]
    fn test_isolated_pixel_is_never_pruned() {
        let skeleton = from_rows(&[".....", ".....", "..#..", ".....", "....."]);
        let outcome = prune_endpoints(&skeleton, 100);
        assert_eq!(outcome.centerline, skeleton);
        assert!(outcome.converged);
        assert_eq!(outcome.passes(), 0);
    }

    #[test]
    fn test_spur_is_removed_from_loop() {
        let skeleton = from_rows(&[
            "..........",
            ".#####....",
            ".#...#....",
            ".#...####.",
            ".#####....",
            "..........",
        ]);
        let outcome = prune_endpoints(&skeleton, 100);
        let expected = from_rows(&[
            "..........",
            ".#####....",
            ".#...#....",
            ".#...##...",
            ".#####....",
            "..........",
        ]);
        // The pixel beside the junction keeps three neighbours and stays.
        assert_eq!(outcome.centerline, expected);
        assert!(outcome.converged);
        assert_eq!(outcome.passes(), 2);
    }

    #[test]
    fn test_open_line_shrinks_two_pixels_per_pass() {
        let skeleton = from_rows(&["..........", ".########.", ".........."]);
        let outcome = prune_endpoints(&skeleton, 2);
        assert_eq!(outcome.pixel_counts, vec![6, 4]);
        assert!(!outcome.converged);
        assert_eq!(foreground_count(&outcome.centerline), 4);
    }

    #[test]
    fn test_pixel_count_is_monotone() {
        let skeleton = from_rows(&[
            "#.......#..",
            ".#.....#...",
            "..#...#....",
            "...#.#.....",
            "....#......",
            "....#......",
            "....####...",
        ]);
        let outcome = prune_endpoints(&skeleton, 100);
        let mut previous = foreground_count(&skeleton) as usize;
        for &count in &outcome.pixel_counts {
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn test_zero_passes_is_noop() {
        let skeleton = from_rows(&["......", ".####.", "......"]);
        let outcome = prune_endpoints(&skeleton, 0);
        assert_eq!(outcome.centerline, skeleton);
        assert!(outcome.pixel_counts.is_empty());
    }

    #[test]
    fn test_pruning_twice_is_fixed_point() {
        let skeleton = from_rows(&[
            "...........",
            ".######....",
            ".#....#....",
            ".#....####.",
            ".#....#....",
            ".######....",
            "..#........",
            "..#........",
        ]);
        let once = prune_endpoints(&skeleton, 50).centerline;
        let twice = prune_endpoints(&once, 50).centerline;
        assert_eq!(once, twice);
    }

    #[test]
    fn test_batch_removal_is_order_independent() {
        // Two pixels that are each other's only neighbour vanish in one pass.
        let skeleton = from_rows(&["....", ".##.", "...."]);
        let outcome = prune_endpoints(&skeleton, 1);
        assert_eq!(foreground_count(&outcome.centerline), 0);
        assert_eq!(outcome.pixel_counts, vec![0]);
    }

    #[test]
    fn test_extractor_defaults() {
        assert_eq!(
            PrunedCenterlineExtractor::new(0).max_prune_iterations,
            DEFAULT_MAX_PRUNE_ITERATIONS
        );
        assert_eq!(PrunedCenterlineExtractor::new(7).max_prune_iterations, 7);
    }

    #[test]
    fn test_extract_block_leaves_isolated_center() {
        let mask = GrayImage::from_fn(5, 5, |x, y| {
            if (1..4).contains(&x) && (1..4).contains(&y) {
                Luma([FOREGROUND])
            } else {
                Luma([0])
            }
        });
        let centerline = extract(&mask, 100).unwrap();
        assert_eq!(foreground_count(&centerline), 1);
        assert_eq!(centerline.get_pixel(2, 2)[0], FOREGROUND);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let mask = GrayImage::from_fn(24, 16, |x, y| {
            let on = (3..21).contains(&x) && (4..12).contains(&y) || (10..14).contains(&x) && y < 4;
            Luma([if on { FOREGROUND } else { 0 }])
        });
        assert_eq!(extract(&mask, 5).unwrap(), extract(&mask, 5).unwrap());
    }
}
