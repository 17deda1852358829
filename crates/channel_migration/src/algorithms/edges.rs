use image::{GrayImage, Luma};
use imageproc::{distance_transform::Norm, morphology};

use crate::{
    error::Result,
    grid::{self, is_foreground, BACKGROUND, FOREGROUND},
    traits::EdgeExtractor,
};

/// Boundary extraction by one-step erosion with a 4-connected cross
#[derive(Debug, Clone, Copy, Default)]
pub struct ErosionEdgeExtractor;

impl EdgeExtractor for ErosionEdgeExtractor {
    fn extract_edges(&self, mask: &GrayImage) -> Result<GrayImage> {
        extract_edges(mask)
    }
}

/// `mask AND NOT erode(mask)`: the channel pixels with a 4-neighbour in the
/// background. Pixels beyond the grid count as background, so channel
/// touching the border is part of the edge.
pub fn extract_edges(mask: &GrayImage) -> Result<GrayImage> {
    grid::ensure_non_empty(mask)?;
    let padded = grid::pad(&grid::binarize(mask), 1);
    let eroded = grid::crop(&morphology::erode(&padded, Norm::L1, 1), 1, grid::shape_of(mask));

    Ok(GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        if is_foreground(mask.get_pixel(x, y)) && !is_foreground(eroded.get_pixel(x, y)) {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{foreground_count, from_bools};

    #[test]
    fn test_empty_mask_has_no_edges() {
        let edges = extract_edges(&GrayImage::new(7, 5)).unwrap();
        assert_eq!(foreground_count(&edges), 0);
    }

    #[test]
    fn test_block_edges_are_its_ring() {
        let mask = GrayImage::from_fn(7, 7, |x, y| {
            if (1..6).contains(&x) && (1..6).contains(&y) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        let edges = extract_edges(&mask).unwrap();
        // 5x5 block: 16 ring pixels, 3x3 interior untouched.
        assert_eq!(foreground_count(&edges), 16);
        assert_eq!(edges.get_pixel(3, 3)[0], BACKGROUND);
        assert_eq!(edges.get_pixel(1, 3)[0], FOREGROUND);
    }

    #[test]
    fn test_full_mask_edges_follow_grid_border() {
        let mask = GrayImage::from_pixel(4, 3, Luma([FOREGROUND]));
        let edges = extract_edges(&mask).unwrap();
        assert_eq!(foreground_count(&edges), 10);
        assert_eq!(edges.get_pixel(1, 1)[0], BACKGROUND);
    }

    #[test]
    fn test_diagonal_background_is_not_an_edge() {
        // Centre pixel only touches background diagonally.
        #[rustfmt::skip]
        let cells = [
            false, false, false, false, false,
            false, true, true, true, false,
            false, true, true, true, false,
            false, true, true, true, true,
            false, false, false, true, true,
        ];
        let mask = from_bools(5, 5, &cells).unwrap();
        let edges = extract_edges(&mask).unwrap();
        assert_eq!(edges.get_pixel(2, 2)[0], BACKGROUND);
        assert_eq!(edges.get_pixel(2, 3)[0], FOREGROUND);
    }

    #[test]
    fn test_edges_are_subset_of_mask() {
        let cells: Vec<bool> = (0..30 * 20)
            .map(|i| {
                let (x, y) = (i % 30, i / 30);
                (x * 7 + y * 3) % 11 < 6 || (x / 5 + y / 4) % 2 == 0
            })
            .collect();
        let mask = from_bools(30, 20, &cells).unwrap();
        let edges = extract_edges(&mask).unwrap();
        for (edge, channel) in edges.pixels().zip(mask.pixels()) {
            assert!(edge[0] == BACKGROUND || channel[0] == FOREGROUND);
        }
    }
}
