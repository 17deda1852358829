//! Binary grid conventions shared by every component.
//!
//! Masks are `GrayImage` buffers holding only [`FOREGROUND`] and
//! [`BACKGROUND`]. Anything non-zero coming from a collaborator is treated as
//! foreground and normalised by [`binarize`].

use image::{GenericImageView, GrayImage, Luma};

use crate::{
    error::{MigrationError, Result},
    types::GridShape,
};

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Map every non-zero pixel to [`FOREGROUND`] and everything else to [`BACKGROUND`].
pub fn binarize(image: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] != 0 {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

#[inline]
pub fn is_foreground(pixel: &Luma<u8>) -> bool {
    pixel[0] != 0
}

pub fn foreground_count(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| is_foreground(p)).count() as u64
}

pub fn shape_of<I: GenericImageView>(image: &I) -> GridShape {
    let (width, height) = image.dimensions();
    GridShape { width, height }
}

pub fn ensure_non_empty<I: GenericImageView>(image: &I) -> Result<()> {
    if shape_of(image).is_empty() {
        return Err(MigrationError::EmptyGrid);
    }
    Ok(())
}

pub fn ensure_same_shape(
    context: &'static str,
    expected: GridShape,
    found: GridShape,
) -> Result<()> {
    if expected != found {
        return Err(MigrationError::ShapeMismatch {
            context,
            expected,
            found,
        });
    }
    Ok(())
}

/// Build a mask from row-major booleans.
pub fn from_bools(width: u32, height: u32, cells: &[bool]) -> Result<GrayImage> {
    let expected = width as usize * height as usize;
    if cells.len() != expected {
        return Err(MigrationError::invalid_parameter(
            "cells",
            cells.len(),
            format!("expected {expected} cells for a {width}x{height} grid"),
        ));
    }
    let data = cells
        .iter()
        .map(|&set| if set { FOREGROUND } else { BACKGROUND })
        .collect();
    GrayImage::from_raw(width, height, data).ok_or(MigrationError::EmptyGrid)
}

/// Row-major booleans, the inverse of [`from_bools`].
pub fn to_bools(mask: &GrayImage) -> Vec<bool> {
    mask.pixels().map(is_foreground).collect()
}

/// Surround `mask` with `border` pixels of background.
pub(crate) fn pad(mask: &GrayImage, border: u32) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2 * border, mask.height() + 2 * border);
    image::imageops::replace(&mut padded, mask, i64::from(border), i64::from(border));
    padded
}

/// Undo [`pad`].
pub(crate) fn crop(padded: &GrayImage, border: u32, shape: GridShape) -> GrayImage {
    image::imageops::crop_imm(padded, border, border, shape.width, shape.height).to_image()
}

/// Zero-one cell grid with a one-cell background border, so neighbourhood
/// lookups never leave the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PaddedGrid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl PaddedGrid {
    pub fn from_mask(mask: &GrayImage) -> Self {
        let rows = mask.height() as usize + 2;
        let cols = mask.width() as usize + 2;
        let mut cells = vec![0u8; rows * cols];
        for (x, y, pixel) in mask.enumerate_pixels() {
            if is_foreground(pixel) {
                cells[(y as usize + 1) * cols + x as usize + 1] = 1;
            }
        }
        Self { rows, cols, cells }
    }

    pub fn to_mask(&self) -> GrayImage {
        let width = (self.cols - 2) as u32;
        let height = (self.rows - 2) as u32;
        GrayImage::from_fn(width, height, |x, y| {
            if self.get(y as usize + 1, x as usize + 1) == 1 {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }

    #[inline]
    pub fn index(&self, r: usize, c: usize) -> usize {
        r * self.cols + c
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> u8 {
        self.cells[self.index(r, c)]
    }

    #[inline]
    pub fn clear(&mut self, r: usize, c: usize) {
        let i = self.index(r, c);
        self.cells[i] = 0;
    }

    /// Foreground cells inside the border, in row-major order.
    pub fn foreground(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (1..self.rows - 1)
            .flat_map(move |r| (1..self.cols - 1).map(move |c| (r, c)))
            .filter(move |&(r, c)| self.get(r, c) == 1)
    }

    /// Moore neighbourhood clockwise from north: N, NE, E, SE, S, SW, W, NW.
    #[inline]
    pub fn neighbors(&self, r: usize, c: usize) -> [u8; 8] {
        [
            self.get(r - 1, c),
            self.get(r - 1, c + 1),
            self.get(r, c + 1),
            self.get(r + 1, c + 1),
            self.get(r + 1, c),
            self.get(r + 1, c - 1),
            self.get(r, c - 1),
            self.get(r - 1, c - 1),
        ]
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 1).count()
    }

    /// 8-connected component labels indexed like the cells, 0 for
    /// background, together with the number of components.
    pub fn component_labels(&self) -> (Vec<usize>, usize) {
        let mut labels = vec![0usize; self.cells.len()];
        let mut components = 0;
        let mut stack = Vec::new();
        for (r, c) in self.foreground() {
            if labels[self.index(r, c)] != 0 {
                continue;
            }
            components += 1;
            labels[self.index(r, c)] = components;
            stack.push((r, c));
            // Border cells are background, so only interior cells are pushed.
            while let Some((r, c)) = stack.pop() {
                for (nr, nc) in [
                    (r - 1, c - 1),
                    (r - 1, c),
                    (r - 1, c + 1),
                    (r, c - 1),
                    (r, c + 1),
                    (r + 1, c - 1),
                    (r + 1, c),
                    (r + 1, c + 1),
                ] {
                    let i = self.index(nr, nc);
                    if self.cells[i] == 1 && labels[i] == 0 {
                        labels[i] = components;
                        stack.push((nr, nc));
                    }
                }
            }
        }
        (labels, components)
    }
}
