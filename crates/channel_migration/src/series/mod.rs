pub mod summary;

use std::path::Path;

use image::GrayImage;
use strum::Display;
use tracing::{debug, info, instrument};

use crate::{
    algorithms::{geometry::measure_channel, migration, ChannelGeometry},
    config::EdgeSource,
    error::{MigrationError, Result},
    grid,
    maybe_rayon::*,
    traits::{CenterlineExtractor, EdgeExtractor, MaskCleaner, MaskSource, MigrationQuantifier},
    types::{ChangeMap, ElevationGrid, GridShape, PairwiseMigration, RasterMask},
};

pub use summary::MigrationSummary;

/// Processing stage of a [`TimeSeries`]. Stages only move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SeriesState {
    #[default]
    Empty,
    Loaded,
    Cleaned,
    Derived,
    Quantified,
}

/// Year-ordered channel masks sharing one grid shape
///
/// Years are unique and strictly increasing. Entities are never removed; the
/// processing stages only attach derived grids to them.
#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    masks: Vec<RasterMask>,
    state: SeriesState,
    summary: Option<MigrationSummary>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from masks in any order.
    pub fn from_masks<I>(masks: I) -> Result<Self>
    where
        I: IntoIterator<Item = RasterMask>,
    {
        let mut series = Self::new();
        for mask in masks {
            series.ingest(mask)?;
        }
        Ok(series)
    }

    /// Read every raster through `source` and ingest it under its parsed year.
    #[instrument(skip_all)]
    pub fn load<S, I, P>(source: &S, paths: I) -> Result<Self>
    where
        S: MaskSource + ?Sized,
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut series = Self::new();
        for path in paths {
            let path = path.as_ref();
            let year = source.parse_year(path)?;
            let raster = source.load_raster(path)?;
            debug!(year, path = %path.display(), "loaded raster");
            series.ingest(RasterMask::new(year, raster)?)?;
        }
        info!(years = series.len(), "series loaded");
        Ok(series)
    }

    /// Insert a mask at its year's position.
    pub fn ingest(&mut self, mask: RasterMask) -> Result<()> {
        self.check_ingestible(&mask)?;
        match self.masks.binary_search_by_key(&mask.year(), RasterMask::year) {
            Ok(_) => Err(MigrationError::DuplicateYear(mask.year())),
            Err(position) => {
                self.masks.insert(position, mask);
                self.state = SeriesState::Loaded;
                Ok(())
            }
        }
    }

    /// Push a mask that must be later than every year already present.
    pub fn append(&mut self, mask: RasterMask) -> Result<()> {
        self.check_ingestible(&mask)?;
        if let Some(last) = self.masks.last() {
            if self.masks.binary_search_by_key(&mask.year(), RasterMask::year).is_ok() {
                return Err(MigrationError::DuplicateYear(mask.year()));
            }
            if mask.year() < last.year() {
                return Err(MigrationError::UnsortedIngestion {
                    previous: last.year(),
                    year: mask.year(),
                });
            }
        }
        self.masks.push(mask);
        self.state = SeriesState::Loaded;
        Ok(())
    }

    fn check_ingestible(&self, mask: &RasterMask) -> Result<()> {
        if !matches!(self.state, SeriesState::Empty | SeriesState::Loaded) {
            return Err(self.invalid_state("ingest a mask"));
        }
        if let Some(shape) = self.shape() {
            grid::ensure_same_shape("series masks", shape, mask.shape())?;
        }
        Ok(())
    }

    /// Run the cleaner over every entity. Loaded → Cleaned.
    #[instrument(skip_all, fields(years = self.masks.len()))]
    pub fn clean(&mut self, cleaner: &dyn MaskCleaner) -> Result<()> {
        self.expect_state(SeriesState::Loaded, "clean")?;
        (&mut self.masks)
            .into_par_iter()
            .try_for_each(|mask| clean_entity(cleaner, mask))?;
        self.advance(SeriesState::Cleaned);
        Ok(())
    }

    /// Extract centerlines and edges for every entity. Cleaned → Derived.
    #[instrument(skip_all, fields(years = self.masks.len(), edge_source = %edge_source))]
    pub fn derive(
        &mut self,
        extractor: &dyn CenterlineExtractor,
        edge_extractor: &dyn EdgeExtractor,
        edge_source: EdgeSource,
    ) -> Result<()> {
        self.expect_state(SeriesState::Cleaned, "derive centerlines and edges")?;
        (&mut self.masks)
            .into_par_iter()
            .try_for_each(|mask| derive_entity(extractor, edge_extractor, edge_source, mask))?;
        self.advance(SeriesState::Derived);
        Ok(())
    }

    /// Compare every adjacent pair of years and fold the results. Derived → Quantified.
    ///
    /// A pair uses the earlier year's own elevation when it has one, and
    /// `elevation` otherwise.
    #[instrument(skip_all, fields(years = self.masks.len()))]
    pub fn quantify(
        &mut self,
        quantifier: &dyn MigrationQuantifier,
        elevation: Option<&ElevationGrid>,
    ) -> Result<&MigrationSummary> {
        if self.masks.len() < 2 {
            return Err(MigrationError::InsufficientData {
                found: self.masks.len(),
            });
        }
        self.expect_state(SeriesState::Derived, "quantify migration")?;
        if let (Some(shape), Some(elevation)) = (self.shape(), elevation) {
            grid::ensure_same_shape("elevation", shape, grid::shape_of(elevation))?;
        }

        let masks = &self.masks;
        let pairs = (1..masks.len())
            .into_par_iter()
            .map(|i| -> Result<PairwiseMigration> {
                let (earlier, later) = (&masks[i - 1], &masks[i]);
                let result = quantifier.quantify(
                    water_mask_of(earlier)?,
                    water_mask_of(later)?,
                    earlier.elevation().or(elevation),
                )?;
                debug!(
                    year_a = earlier.year(),
                    year_b = later.year(),
                    erosion_km2 = result.erosion_area_km2,
                    accretion_km2 = result.accretion_area_km2,
                    "pair quantified"
                );
                Ok(PairwiseMigration {
                    year_a: earlier.year(),
                    year_b: later.year(),
                    result,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = MigrationSummary::from_pairs(pairs);
        info!(
            total_erosion = summary.total_erosion,
            total_accretion = summary.total_accretion,
            mean_erosion_rate = summary.mean_erosion_rate,
            mean_accretion_rate = summary.mean_accretion_rate,
            "migration quantified"
        );
        self.advance(SeriesState::Quantified);
        Ok(&*self.summary.insert(summary))
    }

    /// Signed change grid between the water masks of two years.
    pub fn change_map(&self, year_a: i32, year_b: i32) -> Result<ChangeMap> {
        let a = self.get(year_a).ok_or(MigrationError::UnknownYear(year_a))?;
        let b = self.get(year_b).ok_or(MigrationError::UnknownYear(year_b))?;
        let (Some(mask_a), Some(mask_b)) = (a.water_mask(), b.water_mask()) else {
            return Err(self.invalid_state("build a change map"));
        };
        migration::change_map(mask_a, mask_b)
    }

    /// Planform measurements for every year.
    pub fn geometry(
        &self,
        pixel_size: f64,
        min_row_width: u32,
    ) -> Result<Vec<(i32, ChannelGeometry)>> {
        if !matches!(self.state, SeriesState::Derived | SeriesState::Quantified) {
            return Err(self.invalid_state("measure channel geometry"));
        }
        (&self.masks)
            .into_par_iter()
            .map(|mask| -> Result<(i32, ChannelGeometry)> {
                let centerline = mask
                    .centerline()
                    .ok_or_else(|| self.invalid_state("measure channel geometry"))?;
                let geometry =
                    measure_channel(water_mask_of(mask)?, centerline, pixel_size, min_row_width)?;
                Ok((mask.year(), geometry))
            })
            .collect()
    }

    pub fn state(&self) -> SeriesState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Grid shape shared by every entity, `None` while empty.
    pub fn shape(&self) -> Option<GridShape> {
        self.masks.first().map(RasterMask::shape)
    }

    pub fn masks(&self) -> &[RasterMask] {
        &self.masks
    }

    pub fn years(&self) -> Vec<i32> {
        self.masks.iter().map(RasterMask::year).collect()
    }

    pub fn get(&self, year: i32) -> Option<&RasterMask> {
        self.masks
            .binary_search_by_key(&year, RasterMask::year)
            .ok()
            .map(|i| &self.masks[i])
    }

    /// Available once the series is quantified.
    pub fn summary(&self) -> Option<&MigrationSummary> {
        self.summary.as_ref()
    }

    fn expect_state(&self, expected: SeriesState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    fn invalid_state(&self, operation: &'static str) -> MigrationError {
        MigrationError::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }

    fn advance(&mut self, next: SeriesState) {
        info!(from = %self.state, to = %next, "series state changed");
        self.state = next;
    }
}

#[instrument(skip_all, fields(year = mask.year()))]
pub(crate) fn clean_entity(cleaner: &dyn MaskCleaner, mask: &mut RasterMask) -> Result<()> {
    let water_mask = cleaner.clean(mask.raw_mask())?;
    debug!(foreground = grid::foreground_count(&water_mask), "mask cleaned");
    mask.set_water_mask(water_mask)
}

/// The centerline is attached before edges are extracted, so it survives an
/// edge failure.
#[instrument(skip_all, fields(year = mask.year()))]
pub(crate) fn derive_entity(
    extractor: &dyn CenterlineExtractor,
    edge_extractor: &dyn EdgeExtractor,
    edge_source: EdgeSource,
    mask: &mut RasterMask,
) -> Result<()> {
    let centerline = extractor.extract(water_mask_of(mask)?)?;
    debug!(pixels = grid::foreground_count(&centerline), "centerline extracted");
    mask.set_centerline(centerline)?;

    let source = match edge_source {
        EdgeSource::RawMask => mask.raw_mask(),
        EdgeSource::WaterMask => water_mask_of(mask)?,
    };
    let edges = edge_extractor.extract_edges(source)?;
    mask.set_edges(edges)
}

fn water_mask_of(mask: &RasterMask) -> Result<&GrayImage> {
    mask.water_mask().ok_or_else(|| MigrationError::InvalidState {
        operation: "use the water mask",
        state: format!("uncleaned for year {}", mask.year()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{
        ErosionEdgeExtractor, MorphologicalCleaner, PixelMigrationQuantifier,
        PrunedCenterlineExtractor,
    };
    use image::Luma;

    const WIDTH: u32 = 12;
    const HEIGHT: u32 = 10;

    /// A full-height channel covering columns `left..right`.
    fn band(year: i32, left: u32, right: u32) -> RasterMask {
        let cells: Vec<bool> = (0..WIDTH * HEIGHT)
            .map(|i| (left..right).contains(&(i % WIDTH)))
            .collect();
        RasterMask::from_bools(year, WIDTH, HEIGHT, &cells).unwrap()
    }

    fn derived(masks: Vec<RasterMask>) -> TimeSeries {
        let mut series = TimeSeries::from_masks(masks).unwrap();
        series.clean(&MorphologicalCleaner::new(1)).unwrap();
        series
            .derive(
                &PrunedCenterlineExtractor::default(),
                &ErosionEdgeExtractor,
                EdgeSource::RawMask,
            )
            .unwrap();
        series
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    #[test]
    fn test_ingest_sorts_by_year() {
        let series =
            TimeSeries::from_masks([band(2005, 0, 3), band(1999, 0, 3), band(2001, 0, 3)])
                .unwrap();
        assert_eq!(series.years(), vec![1999, 2001, 2005]);
        assert_eq!(series.state(), SeriesState::Loaded);
        assert_eq!(series.get(2001).map(RasterMask::year), Some(2001));
        assert!(series.get(2000).is_none());
    }

    #[test]
    fn test_ingest_rejects_duplicates_and_shape_mismatch() {
        let mut series = TimeSeries::from_masks([band(2000, 0, 3)]).unwrap();
        assert!(matches!(
            series.ingest(band(2000, 1, 4)),
            Err(MigrationError::DuplicateYear(2000))
        ));

        let other = RasterMask::from_bools(2001, 3, 3, &[false; 9]).unwrap();
        assert!(matches!(
            series.ingest(other),
            Err(MigrationError::ShapeMismatch { context: "series masks", .. })
        ));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_append_requires_increasing_years() {
        let mut series = TimeSeries::new();
        series.append(band(2000, 0, 3)).unwrap();
        series.append(band(2002, 0, 3)).unwrap();
        assert!(matches!(
            series.append(band(2001, 0, 3)),
            Err(MigrationError::UnsortedIngestion { previous: 2002, year: 2001 })
        ));
        assert!(matches!(
            series.append(band(2002, 0, 3)),
            Err(MigrationError::DuplicateYear(2002))
        ));
        assert_eq!(series.years(), vec![2000, 2002]);
    }

    #[test]
    fn test_transitions_are_ordered() {
        let mut series = TimeSeries::new();
        assert!(matches!(
            series.clean(&MorphologicalCleaner::default()),
            Err(MigrationError::InvalidState { operation: "clean", .. })
        ));

        series.ingest(band(2000, 2, 5)).unwrap();
        assert!(series
            .derive(
                &PrunedCenterlineExtractor::default(),
                &ErosionEdgeExtractor,
                EdgeSource::RawMask
            )
            .is_err());

        series.clean(&MorphologicalCleaner::new(1)).unwrap();
        assert_eq!(series.state(), SeriesState::Cleaned);
        assert!(matches!(
            series.ingest(band(2001, 2, 5)),
            Err(MigrationError::InvalidState { operation: "ingest a mask", .. })
        ));
        assert!(series.clean(&MorphologicalCleaner::new(1)).is_err());
    }

    #[test]
    fn test_quantify_needs_two_years() {
        let mut series = derived(vec![band(2000, 2, 5)]);
        let err = series.quantify(&PixelMigrationQuantifier::default(), None).unwrap_err();
        assert!(matches!(err, MigrationError::InsufficientData { found: 1 }));

        let mut empty = TimeSeries::new();
        let err = empty.quantify(&PixelMigrationQuantifier::default(), None).unwrap_err();
        assert!(matches!(err, MigrationError::InsufficientData { found: 0 }));
    }

    #[test]
    fn test_full_flow() {
        let mut series = derived(vec![band(2002, 5, 8), band(2000, 2, 5), band(2001, 3, 6)]);
        for mask in series.masks() {
            assert_eq!(mask.water_mask(), Some(mask.raw_mask()));
            let centerline = mask.centerline().unwrap();
            assert!(centerline
                .pixels()
                .zip(mask.raw_mask().pixels())
                .all(|(c, m)| !grid::is_foreground(c) || grid::is_foreground(m)));
            let edges = mask.edges().unwrap();
            assert!(edges
                .pixels()
                .zip(mask.raw_mask().pixels())
                .all(|(e, m)| !grid::is_foreground(e) || grid::is_foreground(m)));
        }

        let summary = series.quantify(&PixelMigrationQuantifier::default(), None).unwrap().clone();
        assert_eq!(series.state(), SeriesState::Quantified);
        assert_eq!(summary.pairs.len(), 2);
        assert_eq!((summary.pairs[0].year_a, summary.pairs[0].year_b), (2000, 2001));
        assert_eq!(summary.pairs[0].result.erosion_pixels, 10);
        assert_eq!(summary.pairs[1].result.accretion_pixels, 20);
        assert_close(summary.cumulative_erosion[0], 0.009);
        assert_close(summary.cumulative_erosion[1], 0.027);
        assert_close(summary.mean_accretion_rate, 0.0135);
        assert_eq!(series.summary(), Some(&summary));

        let geometry = series.geometry(30.0, 1).unwrap();
        assert_eq!(geometry.len(), 3);
        assert_close(geometry[0].1.mean_width_m.unwrap(), 90.0);
    }

    #[test]
    fn test_cumulative_matches_pair_sum() {
        let mut series = derived(vec![
            band(2000, 1, 4),
            band(2001, 2, 6),
            band(2002, 4, 7),
            band(2003, 3, 9),
            band(2004, 6, 8),
        ]);
        let summary = series.quantify(&PixelMigrationQuantifier::default(), None).unwrap();
        let erosion: f64 = summary.pairs.iter().map(|p| p.result.erosion_area_km2).sum();
        let accretion: f64 = summary.pairs.iter().map(|p| p.result.accretion_area_km2).sum();
        assert_close(*summary.cumulative_erosion.last().unwrap(), erosion);
        assert_close(*summary.cumulative_accretion.last().unwrap(), accretion);
        assert_close(summary.total_erosion, erosion);
    }

    #[test]
    fn test_per_year_elevation_takes_precedence() {
        let own = ElevationGrid::from_pixel(WIDTH, HEIGHT, Luma([2.0]));
        let shared = ElevationGrid::from_pixel(WIDTH, HEIGHT, Luma([1.0]));
        let mut series = derived(vec![
            band(2000, 2, 5).with_elevation(own).unwrap(),
            band(2001, 3, 6),
            band(2002, 4, 7),
        ]);
        let summary = series
            .quantify(&PixelMigrationQuantifier::default(), Some(&shared))
            .unwrap();
        // Ten changed pixels per pair, 900 m² each.
        assert_close(summary.pairs[0].result.erosion_volume.unwrap(), 10.0 * 2.0 * 900.0 / 1e6);
        assert_close(summary.pairs[1].result.erosion_volume.unwrap(), 10.0 * 900.0 / 1e6);
        assert!(summary.cumulative_erosion_volume.is_some());
    }

    #[test]
    fn test_series_elevation_shape_is_checked() {
        let mut series = derived(vec![band(2000, 2, 5), band(2001, 3, 6)]);
        let elevation = ElevationGrid::new(WIDTH, HEIGHT + 1);
        let err = series
            .quantify(&PixelMigrationQuantifier::default(), Some(&elevation))
            .unwrap_err();
        assert!(matches!(err, MigrationError::ShapeMismatch { context: "elevation", .. }));
        assert_eq!(series.state(), SeriesState::Derived);
    }

    #[test]
    fn test_change_map() {
        let series = derived(vec![band(2000, 2, 5), band(2001, 3, 6)]);
        let map = series.change_map(2000, 2001).unwrap();
        assert_eq!(map.get_pixel(2, 0)[0], -1);
        assert_eq!(map.get_pixel(5, 0)[0], 1);
        assert_eq!(map.get_pixel(3, 0)[0], 0);
        assert!(matches!(series.change_map(2000, 1990), Err(MigrationError::UnknownYear(1990))));

        let loaded = TimeSeries::from_masks([band(2000, 2, 5), band(2001, 3, 6)]).unwrap();
        assert!(matches!(loaded.change_map(2000, 2001), Err(MigrationError::InvalidState { .. })));
    }

    #[test]
    fn test_invalid_state_names_current_stage() {
        let series = TimeSeries::from_masks([band(2000, 2, 5), band(2001, 3, 6)]).unwrap();
        let err = series.geometry(30.0, 1).unwrap_err();
        assert_eq!(err.to_string(), "Cannot measure channel geometry while the series is loaded");
        assert_eq!(SeriesState::Quantified.to_string(), "quantified");
    }
}
