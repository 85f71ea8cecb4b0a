use crate::Result;
use crate::layer::Layer;
use geo::Geometry;
use std::collections::BTreeMap;

/// Share of the combined sewer area the GI program is designed to manage.
pub const DESIGN_AREA_FRACTION: f64 = 0.10;

/// Feet to inches. Input layers are in a foot-based projected CRS.
pub const INCHES_PER_FOOT: f64 = 12.0;

/// Depth of rain (inches) the captured volume (ft³) represents over the
/// design share of the combined sewer area (ft²).
///
/// A zero area yields a non-finite result; it is not special-cased.
pub fn rain_height(total_captured_volume: f64, cso_area: f64) -> f64 {
    (total_captured_volume / (cso_area * DESIGN_AREA_FRACTION)) * INCHES_PER_FOOT
}

/// Label drawn at a sewershed's centroid. Non-finite values render as
/// `inf`, `-inf` or `nan`.
pub fn rain_height_label(rain_height: f64) -> String {
    if rain_height.is_nan() {
        return "nan in".to_string();
    }
    format!("{:.4} in", rain_height)
}

#[derive(Debug, Clone)]
pub struct SewershedSummary {
    pub key: String,
    pub geometry: Option<Geometry<f64>>,
    pub total_captured_volume: f64,
    pub cso_area: f64,
    pub rain_height: f64,
}

/// Inner-join sewersheds with both per-key totals and derive rain height.
///
/// A sewershed missing from either total is dropped, as are rows with no key.
/// Output keeps sewershed table order.
pub fn merge_summaries(
    sewersheds: &Layer,
    key_column: &str,
    volumes: &BTreeMap<String, f64>,
    areas: &BTreeMap<String, f64>,
) -> Result<Vec<SewershedSummary>> {
    sewersheds.require_column(key_column)?;

    let mut out = Vec::new();
    for feature in &sewersheds.features {
        let Some(key) = feature.get(key_column).and_then(|v| v.as_key()) else {
            continue;
        };
        let (Some(&volume), Some(&area)) = (volumes.get(&key), areas.get(&key)) else {
            tracing::debug!(
                sewershed = %key,
                has_gi = volumes.contains_key(&key),
                has_csa = areas.contains_key(&key),
                "sewershed omitted from results"
            );
            continue;
        };

        let height = rain_height(volume, area);
        if !height.is_finite() {
            tracing::warn!(sewershed = %key, volume, area, "rain height is not finite");
        }

        out.push(SewershedSummary {
            key,
            geometry: feature.geometry.clone(),
            total_captured_volume: volume,
            cso_area: area,
            rain_height: height,
        });
    }
    Ok(out)
}
