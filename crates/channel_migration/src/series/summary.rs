use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::PairwiseMigration;

/// Year-ordered migration results folded into running totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MigrationSummary {
    /// Per-pair results in ascending year order
    pub pairs: Vec<PairwiseMigration>,
    /// Running erosion total after each pair, km²
    pub cumulative_erosion: Vec<f64>,
    /// Running accretion total after each pair, km²
    pub cumulative_accretion: Vec<f64>,
    pub total_erosion: f64,
    pub total_accretion: f64,
    /// Total erosion divided by the number of pairs
    pub mean_erosion_rate: f64,
    /// Total accretion divided by the number of pairs
    pub mean_accretion_rate: f64,
    /// Running volume totals, present when every pair carries a volume
    pub cumulative_erosion_volume: Option<Vec<f64>>,
    pub cumulative_accretion_volume: Option<Vec<f64>>,
}

impl MigrationSummary {
    /// Fold `pairs`, which must already be in ascending year order.
    pub(crate) fn from_pairs(pairs: Vec<PairwiseMigration>) -> Self {
        let cumulative_erosion = running_total(pairs.iter().map(|p| p.result.erosion_area_km2));
        let cumulative_accretion = running_total(pairs.iter().map(|p| p.result.accretion_area_km2));

        let erosion_volumes: Option<Vec<f64>> =
            pairs.iter().map(|p| p.result.erosion_volume).collect();
        let accretion_volumes: Option<Vec<f64>> =
            pairs.iter().map(|p| p.result.accretion_volume).collect();

        let total_erosion = cumulative_erosion.last().copied().unwrap_or(0.0);
        let total_accretion = cumulative_accretion.last().copied().unwrap_or(0.0);
        let pair_count = pairs.len();
        let mean = |total: f64| {
            if pair_count == 0 {
                0.0
            } else {
                total / pair_count as f64
            }
        };

        Self {
            cumulative_erosion,
            cumulative_accretion,
            total_erosion,
            total_accretion,
            mean_erosion_rate: mean(total_erosion),
            mean_accretion_rate: mean(total_accretion),
            cumulative_erosion_volume: erosion_volumes.map(running_total),
            cumulative_accretion_volume: accretion_volumes.map(running_total),
            pairs,
        }
    }

    /// The later year of every pair, the natural x-axis of the cumulative series.
    pub fn years(&self) -> Vec<i32> {
        self.pairs.iter().map(|p| p.year_b).collect()
    }
}

fn running_total(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .scan(0.0, |sum, value| {
            *sum += value;
            Some(*sum)
        })
        .collect()
}
