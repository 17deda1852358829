use std::path::Path;

use geo_types::{MultiPoint, Point};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use image::{GrayImage, Luma};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{
    error::{MigrationError, Result},
    grid::{self, FOREGROUND},
    types::{GridShape, RasterMask},
};

pub const CENTERLINE_LAYER: &str = "centerline";
pub const EDGES_LAYER: &str = "edges";

/// Foreground pixels as points at their `(x, y)` grid coordinates.
pub fn mask_points(mask: &GrayImage) -> MultiPoint<f64> {
    mask.enumerate_pixels()
        .filter(|(_, _, p)| grid::is_foreground(p))
        .map(|(x, y, _)| Point::new(f64::from(x), f64::from(y)))
        .collect()
}

fn layer_feature(mask: &RasterMask, layer: &str, grid: &GrayImage) -> Feature {
    let points = mask_points(grid);

    let mut properties = Map::new();
    properties.insert("year".to_string(), JsonValue::Number(Number::from(mask.year())));
    properties.insert("layer".to_string(), JsonValue::String(layer.to_string()));
    properties.insert("pixel_count".to_string(), JsonValue::Number(Number::from(points.0.len())));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&points))),
        id: Some(geojson::feature::Id::String(format!("{}-{layer}", mask.year()))),
        properties: Some(properties),
        foreign_members: None,
    }
}

impl RasterMask {
    /// Export the derived centerline and edges that are present.
    pub fn to_geojson(&self) -> FeatureCollection {
        let layers = [(CENTERLINE_LAYER, self.centerline()), (EDGES_LAYER, self.edges())];
        let features = layers
            .into_iter()
            .filter_map(|(layer, grid)| grid.map(|g| layer_feature(self, layer, g)))
            .collect();

        let shape = self.shape();
        let mut foreign_members = Map::new();
        foreign_members.insert("width".to_string(), JsonValue::Number(Number::from(shape.width)));
        foreign_members.insert("height".to_string(), JsonValue::Number(Number::from(shape.height)));

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }

    /// Export to GeoJSON and serialize to JSON string
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_geojson())?)
    }

    /// Save GeoJSON to file
    pub fn save_geojson<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_geojson_string()?)?;
        Ok(())
    }
}

/// Rebuild one exported layer as a binary grid, returning it with its year.
pub fn layer_from_geojson(geojson_str: &str, layer: &str) -> Result<(i32, GrayImage)> {
    let collection: FeatureCollection = geojson_str.parse()?;

    let dimension = |key: &str| {
        collection
            .foreign_members
            .as_ref()
            .and_then(|members| members.get(key))
            .and_then(JsonValue::as_u64)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| MigrationError::InvalidGeoJson(format!("missing or invalid {key}")))
    };
    let shape = GridShape::new(dimension("width")?, dimension("height")?);
    if shape.is_empty() {
        return Err(MigrationError::EmptyGrid);
    }

    let feature = collection
        .features
        .iter()
        .find(|f| f.property("layer").and_then(JsonValue::as_str) == Some(layer))
        .ok_or_else(|| MigrationError::InvalidGeoJson(format!("no {layer} feature")))?;
    let year = feature
        .property("year")
        .and_then(JsonValue::as_i64)
        .and_then(|y| i32::try_from(y).ok())
        .ok_or_else(|| MigrationError::InvalidGeoJson("missing or invalid year".to_string()))?;

    let mut mask = GrayImage::new(shape.width, shape.height);
    if let Some(Value::MultiPoint(points)) = feature.geometry.as_ref().map(|g| &g.value) {
        for point in points {
            let (x, y) = match point.as_slice() {
                [x, y, ..] => (*x, *y),
                _ => {
                    return Err(MigrationError::InvalidGeoJson(
                        "point without two coordinates".to_string(),
                    ))
                }
            };
            if x.fract() != 0.0 || y.fract() != 0.0 {
                return Err(MigrationError::InvalidGeoJson(format!(
                    "point ({x}, {y}) is not on a pixel"
                )));
            }
            if x < 0.0 || y < 0.0 || x >= f64::from(shape.width) || y >= f64::from(shape.height) {
                return Err(MigrationError::InvalidGeoJson(format!(
                    "point ({x}, {y}) lies outside {shape}"
                )));
            }
            mask.put_pixel(x as u32, y as u32, Luma([FOREGROUND]));
        }
    }
    Ok((year, mask))
}
