use geo::EuclideanLength;
use geo_types::{Coord, LineString, MultiLineString};
use image::GrayImage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::migration::validate_pixel_size,
    error::Result,
    grid::{self, is_foreground},
};

/// Rows narrower than this many pixels are ignored for the mean width.
pub const DEFAULT_MIN_ROW_WIDTH: u32 = 50;

/// Planform measurements of one year's channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ChannelGeometry {
    /// Mean channel pixels per row over the rows wider than the threshold, in metres
    pub mean_width_m: Option<f64>,
    /// Number of rows that contributed to `mean_width_m`
    pub measured_rows: usize,
    pub area_km2: f64,
    pub centerline_length_m: f64,
    /// Channel area divided by centerline length, in metres
    pub width_ratio_m: Option<f64>,
}

/// Channel pixel count per row, top to bottom.
pub fn row_widths(mask: &GrayImage) -> Vec<u32> {
    mask.rows()
        .map(|row| row.filter(|p| is_foreground(p)).count() as u32)
        .collect()
}

/// The centerline as unit segments between 8-connected pixels.
///
/// A diagonal segment is only emitted when neither orthogonal two-step path
/// joins its endpoints, so corners are not counted twice.
pub fn centerline_segments(centerline: &GrayImage) -> MultiLineString<f64> {
    let (width, height) = centerline.dimensions();
    let set = |x: i64, y: i64| {
        x >= 0
            && y >= 0
            && x < i64::from(width)
            && y < i64::from(height)
            && is_foreground(centerline.get_pixel(x as u32, y as u32))
    };

    let mut segments = Vec::new();
    for (x, y, pixel) in centerline.enumerate_pixels() {
        if !is_foreground(pixel) {
            continue;
        }
        let (x, y) = (i64::from(x), i64::from(y));
        let mut link = |dx: i64, dy: i64| {
            segments.push(LineString::new(vec![
                Coord { x: x as f64, y: y as f64 },
                Coord { x: (x + dx) as f64, y: (y + dy) as f64 },
            ]));
        };

        if set(x + 1, y) {
            link(1, 0);
        }
        if set(x, y + 1) {
            link(0, 1);
        }
        if set(x + 1, y + 1) && !set(x + 1, y) && !set(x, y + 1) {
            link(1, 1);
        }
        if set(x - 1, y + 1) && !set(x - 1, y) && !set(x, y + 1) {
            link(-1, 1);
        }
    }
    MultiLineString::new(segments)
}

/// Euclidean centerline length in pixels.
pub fn centerline_length(centerline: &GrayImage) -> f64 {
    centerline_segments(centerline).euclidean_length()
}

/// Width, area and length measurements for one water mask and its centerline.
pub fn measure_channel(
    water_mask: &GrayImage,
    centerline: &GrayImage,
    pixel_size: f64,
    min_row_width: u32,
) -> Result<ChannelGeometry> {
    validate_pixel_size(pixel_size)?;
    grid::ensure_same_shape(
        "channel geometry",
        grid::shape_of(water_mask),
        grid::shape_of(centerline),
    )?;

    let wide_rows: Vec<u32> = row_widths(water_mask)
        .into_iter()
        .filter(|&w| w > min_row_width)
        .collect();
    let mean_width_m = (!wide_rows.is_empty()).then(|| {
        let total: u64 = wide_rows.iter().map(|&w| u64::from(w)).sum();
        total as f64 / wide_rows.len() as f64 * pixel_size
    });

    let area_px = grid::foreground_count(water_mask) as f64;
    let length_px = centerline_length(centerline);
    let width_ratio_m = (length_px > 0.0).then(|| area_px / length_px * pixel_size);

    Ok(ChannelGeometry {
        mean_width_m,
        measured_rows: wide_rows.len(),
        area_km2: area_px * pixel_size * pixel_size / 1e6,
        centerline_length_m: length_px * pixel_size,
        width_ratio_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::from_bools;

    fn from_rows(rows: &[&str]) -> GrayImage {
        let cells: Vec<bool> = rows.iter().flat_map(|row| row.chars().map(|c| c == '#')).collect();
        from_bools(rows[0].len() as u32, rows.len() as u32, &cells).unwrap()
    }

    #[test]
    fn test_row_widths() {
        let mask = from_rows(&["##..#", ".....", "#####"]);
        assert_eq!(row_widths(&mask), vec![3, 0, 5]);
    }

    #[test]
    fn test_straight_line_length() {
        let line = from_rows(&["......", ".####.", "......"]);
        assert!((centerline_length(&line) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_diagonal_line_length() {
        let line = from_rows(&["#...", ".#..", "..#.", "...#"]);
        assert!((centerline_length(&line) - 3.0 * 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_corner_is_not_double_counted() {
        // The L-corner links orthogonally; the diagonal shortcut is skipped.
        let line = from_rows(&["#..", "##.", "..."]);
        assert!((centerline_length(&line) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_measure_channel() {
        let water = from_rows(&["......", "######", "######", "......"]);
        let centerline = from_rows(&["......", "######", "......", "......"]);
        let geometry = measure_channel(&water, &centerline, 30.0, 1).unwrap();

        assert_eq!(geometry.measured_rows, 2);
        assert!((geometry.mean_width_m.unwrap() - 180.0).abs() < 1e-9);
        assert!((geometry.area_km2 - 12.0 * 900.0 / 1e6).abs() < 1e-12);
        assert!((geometry.centerline_length_m - 150.0).abs() < 1e-9);
        assert!((geometry.width_ratio_m.unwrap() - 12.0 / 5.0 * 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_measure_channel_without_wide_rows() {
        let water = from_rows(&["##", "##"]);
        let centerline = from_rows(&["..", ".#"]);
        let geometry = measure_channel(&water, &centerline, 30.0, DEFAULT_MIN_ROW_WIDTH).unwrap();
        assert_eq!(geometry.mean_width_m, None);
        assert_eq!(geometry.width_ratio_m, None);
    }
}
