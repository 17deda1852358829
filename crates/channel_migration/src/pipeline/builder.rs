use crate::{
    algorithms::{
        ErosionEdgeExtractor, MorphologicalCleaner, PixelMigrationQuantifier,
        PrunedCenterlineExtractor,
    },
    config::EdgeSource,
    error::Result,
    pipeline::Pipeline,
    traits::{CenterlineExtractor, EdgeExtractor, MaskCleaner, MigrationQuantifier, Skeletonizer},
};

/// Builder for creating processing pipelines with a fluent API
pub struct PipelineBuilder {
    cleaner: Option<Box<dyn MaskCleaner>>,
    centerline_extractor: Option<Box<dyn CenterlineExtractor>>,
    edge_extractor: Option<Box<dyn EdgeExtractor>>,
    quantifier: Option<Box<dyn MigrationQuantifier>>,
    edge_source: EdgeSource,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            cleaner: None,
            centerline_extractor: None,
            edge_extractor: None,
            quantifier: None,
            edge_source: EdgeSource::default(),
        }
    }

    /// Set the mask cleaner (replaces any existing one)
    pub fn set_cleaner<C>(mut self, cleaner: C) -> Self
    where
        C: MaskCleaner + 'static,
    {
        self.cleaner = Some(Box::new(cleaner));
        self
    }

    /// Set the centerline extractor (replaces any existing one)
    pub fn set_centerline_extractor<E>(mut self, extractor: E) -> Self
    where
        E: CenterlineExtractor + 'static,
    {
        self.centerline_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the edge extractor (replaces any existing one)
    pub fn set_edge_extractor<E>(mut self, extractor: E) -> Self
    where
        E: EdgeExtractor + 'static,
    {
        self.edge_extractor = Some(Box::new(extractor));
        self
    }

    /// Set the migration quantifier (replaces any existing one)
    pub fn set_quantifier<Q>(mut self, quantifier: Q) -> Self
    where
        Q: MigrationQuantifier + 'static,
    {
        self.quantifier = Some(Box::new(quantifier));
        self
    }

    /// Morphological cleaning with the given hole-size threshold
    pub fn with_min_region_size(self, min_region_size: i64) -> Self {
        self.set_cleaner(MorphologicalCleaner::new(min_region_size))
    }

    /// Default thinning with a bound on pruning passes
    pub fn with_max_prune_iterations(self, max_prune_iterations: i64) -> Self {
        self.set_centerline_extractor(PrunedCenterlineExtractor::new(max_prune_iterations))
    }

    /// Pruned centerlines over a custom skeletonizer
    pub fn with_skeletonizer<S>(self, skeletonizer: S, max_prune_iterations: i64) -> Self
    where
        S: Skeletonizer + 'static,
    {
        self.set_centerline_extractor(PrunedCenterlineExtractor::with_skeletonizer(
            skeletonizer,
            max_prune_iterations,
        ))
    }

    /// Pixel-set migration at the given ground resolution
    pub fn with_pixel_size(self, pixel_size: f64) -> Result<Self> {
        Ok(self.set_quantifier(PixelMigrationQuantifier::new(pixel_size)?))
    }

    /// Choose which grid the edges are extracted from
    pub fn with_edge_source(mut self, edge_source: EdgeSource) -> Self {
        self.edge_source = edge_source;
        self
    }

    /// Build the pipeline with default components if not specified
    pub fn build(self) -> Pipeline {
        let cleaner = self
            .cleaner
            .unwrap_or_else(|| Box::new(MorphologicalCleaner::default()));
        let centerline_extractor = self
            .centerline_extractor
            .unwrap_or_else(|| Box::new(PrunedCenterlineExtractor::default()));
        let edge_extractor = self
            .edge_extractor
            .unwrap_or_else(|| Box::new(ErosionEdgeExtractor));
        let quantifier = self
            .quantifier
            .unwrap_or_else(|| Box::new(PixelMigrationQuantifier::default()));

        Pipeline::new(
            cleaner,
            centerline_extractor,
            edge_extractor,
            quantifier,
            self.edge_source,
        )
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
