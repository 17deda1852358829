pub mod geojson;
pub mod json;
pub mod raster;

pub use self::geojson::{layer_from_geojson, mask_points, CENTERLINE_LAYER, EDGES_LAYER};
pub use raster::{year_from_path, FileMaskSource};
