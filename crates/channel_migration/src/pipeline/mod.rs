pub mod builder;

use tracing::{info, instrument};

use crate::{
    algorithms::{
        ErosionEdgeExtractor, MorphologicalCleaner, PixelMigrationQuantifier,
        PrunedCenterlineExtractor,
    },
    config::{AnalysisConfig, EdgeSource},
    error::Result,
    series::{clean_entity, derive_entity, MigrationSummary, TimeSeries},
    traits::{CenterlineExtractor, EdgeExtractor, MaskCleaner, MigrationQuantifier},
    types::{ElevationGrid, RasterMask},
};

/// The four processing components wired in dependency order
pub struct Pipeline {
    cleaner: Box<dyn MaskCleaner>,
    centerline_extractor: Box<dyn CenterlineExtractor>,
    edge_extractor: Box<dyn EdgeExtractor>,
    quantifier: Box<dyn MigrationQuantifier>,
    edge_source: EdgeSource,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    /// Create a new pipeline with the given components
    pub fn new(
        cleaner: Box<dyn MaskCleaner>,
        centerline_extractor: Box<dyn CenterlineExtractor>,
        edge_extractor: Box<dyn EdgeExtractor>,
        quantifier: Box<dyn MigrationQuantifier>,
        edge_source: EdgeSource,
    ) -> Self {
        Self {
            cleaner,
            centerline_extractor,
            edge_extractor,
            quantifier,
            edge_source,
        }
    }

    /// Default components parameterised by `config`.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            Box::new(MorphologicalCleaner::new(config.min_region_size)),
            Box::new(PrunedCenterlineExtractor::new(config.max_prune_iterations)),
            Box::new(ErosionEdgeExtractor),
            Box::new(PixelMigrationQuantifier::new(config.pixel_size)?),
            config.edge_source,
        ))
    }

    /// Clean one mask, then attach its centerline and edges.
    pub fn process_one(&self, mask: &mut RasterMask) -> Result<()> {
        clean_entity(self.cleaner.as_ref(), mask)?;
        derive_entity(
            self.centerline_extractor.as_ref(),
            self.edge_extractor.as_ref(),
            self.edge_source,
            mask,
        )
    }

    /// Take a loaded series through every stage up to quantification.
    #[instrument(skip_all, fields(years = series.len()))]
    pub fn process_series<'s>(
        &self,
        series: &'s mut TimeSeries,
        elevation: Option<&ElevationGrid>,
    ) -> Result<&'s MigrationSummary> {
        series.clean(self.cleaner.as_ref())?;
        series.derive(
            self.centerline_extractor.as_ref(),
            self.edge_extractor.as_ref(),
            self.edge_source,
        )?;
        let summary = series.quantify(self.quantifier.as_ref(), elevation)?;
        info!(pairs = summary.pairs.len(), "series processed");
        Ok(summary)
    }

    pub fn edge_source(&self) -> EdgeSource {
        self.edge_source
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}
