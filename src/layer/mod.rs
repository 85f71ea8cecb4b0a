//! Vector layer loading (GeoJSON and ESRI shapefiles).

pub mod feature;
pub mod parse;

pub use feature::Layer;
pub use parse::read_layer;
