use crate::error::LoadError;
use crate::layer::feature::{AttrValue, Feature, Layer};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use geojson::GeoJson;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Read a vector layer, keeping only `columns` from its attribute table.
///
/// The format is chosen by extension:
/// - `.geojson` / `.json`: a FeatureCollection (or a single Feature)
/// - `.shp`: an ESRI shapefile; attributes come from the sibling `.dbf`
///
/// A requested column that the source does not have is left out of
/// `Layer::columns`; the stage that needs it reports the failure.
pub fn read_layer(path: impl AsRef<Path>, columns: &[&str]) -> Result<Layer, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let layer = match ext.as_str() {
        "geojson" | "json" => read_geojson(path, columns)?,
        "shp" => read_shapefile(path, columns)?,
        _ => {
            return Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    tracing::debug!(
        path = %path.display(),
        features = layer.features.len(),
        columns = ?layer.columns,
        "loaded layer"
    );
    Ok(layer)
}

fn read_geojson(path: &Path, columns: &[&str]) -> Result<Layer, LoadError> {
    let text = fs::read_to_string(path).map_err(|e| LoadError::parse(path, e))?;
    let parsed: GeoJson = text.parse().map_err(|e| LoadError::parse(path, e))?;

    let raw_features = match parsed {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(_) => {
            return Err(LoadError::parse(
                path,
                "expected a Feature or FeatureCollection, found a bare geometry",
            ));
        }
    };

    let mut present = BTreeSet::new();
    let mut features = Vec::with_capacity(raw_features.len());
    for raw in raw_features {
        let geometry = match raw.geometry {
            Some(g) => Some(Geometry::<f64>::try_from(g).map_err(|e| LoadError::parse(path, e))?),
            None => None,
        };

        let mut attrs = BTreeMap::new();
        if let Some(props) = &raw.properties {
            for &column in columns {
                if let Some(value) = props.get(column) {
                    present.insert(column.to_string());
                    attrs.insert(column.to_string(), json_value(value));
                }
            }
        }

        features.push(Feature { attrs, geometry });
    }

    Ok(Layer {
        path: path.to_path_buf(),
        columns: present,
        features,
    })
}

fn json_value(value: &serde_json::Value) -> AttrValue {
    use serde_json::Value;
    match value {
        Value::Null => AttrValue::Null,
        Value::Bool(b) => AttrValue::Bool(*b),
        Value::Number(n) => n.as_f64().map(AttrValue::Number).unwrap_or(AttrValue::Null),
        Value::String(s) => AttrValue::Text(s.clone()),
        other => AttrValue::Text(other.to_string()),
    }
}

fn read_shapefile(path: &Path, columns: &[&str]) -> Result<Layer, LoadError> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| LoadError::parse(path, e))?;

    let mut present = BTreeSet::new();
    let mut features = Vec::new();
    for item in reader.iter_shapes_and_records() {
        let (shape, record) = item.map_err(|e| LoadError::parse(path, e))?;
        let geometry = shape_geometry(path, shape)?;

        let mut attrs = BTreeMap::new();
        for &column in columns {
            if let Some(value) = record.get(column) {
                present.insert(column.to_string());
                attrs.insert(column.to_string(), field_value(value));
            }
        }

        features.push(Feature { attrs, geometry });
    }

    Ok(Layer {
        path: path.to_path_buf(),
        columns: present,
        features,
    })
}

fn field_value(value: &FieldValue) -> AttrValue {
    match value {
        FieldValue::Character(Some(s)) => AttrValue::Text(s.trim_end().to_string()),
        FieldValue::Numeric(Some(n)) => AttrValue::Number(*n),
        FieldValue::Float(Some(n)) => AttrValue::Number(f64::from(*n)),
        FieldValue::Double(n) => AttrValue::Number(*n),
        FieldValue::Integer(n) => AttrValue::Number(f64::from(*n)),
        FieldValue::Logical(Some(b)) => AttrValue::Bool(*b),
        _ => AttrValue::Null,
    }
}

fn shape_geometry(path: &Path, shape: Shape) -> Result<Option<Geometry<f64>>, LoadError> {
    match shape {
        Shape::NullShape => Ok(None),
        Shape::Point(p) => Ok(Some(Geometry::Point(Point::new(p.x, p.y)))),
        Shape::Polygon(polygon) => Ok(Some(Geometry::MultiPolygon(rings_to_multipolygon(
            polygon.rings(),
        )))),
        other => Err(LoadError::unsupported_geometry(
            path,
            format!("{:?}", other.shapetype()),
        )),
    }
}

/// Each outer ring opens a new polygon; inner rings attach to the most
/// recent outer ring.
fn rings_to_multipolygon(rings: &[PolygonRing<shapefile::Point>]) -> MultiPolygon<f64> {
    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        let line: LineString<f64> = ring
            .points()
            .iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect();
        match ring {
            PolygonRing::Outer(_) => parts.push((line, Vec::new())),
            PolygonRing::Inner(_) => match parts.last_mut() {
                Some((_, holes)) => holes.push(line),
                None => parts.push((line, Vec::new())),
            },
        }
    }
    MultiPolygon::new(
        parts
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}
