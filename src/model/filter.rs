use crate::Result;
use crate::layer::Layer;

/// Keep the assets whose status contains `marker` (case-sensitive).
///
/// Null or non-text statuses never match. The status column itself must be
/// present in the layer.
pub fn filter_by_status(assets: &Layer, status_column: &str, marker: &str) -> Result<Layer> {
    assets.require_column(status_column)?;

    let kept = assets
        .features
        .iter()
        .filter(|f| {
            f.get(status_column)
                .and_then(|v| v.as_str())
                .is_some_and(|s| s.contains(marker))
        })
        .cloned()
        .collect::<Vec<_>>();

    tracing::info!(
        total = assets.features.len(),
        kept = kept.len(),
        marker,
        "filtered assets by status"
    );
    Ok(assets.with_features(kept))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::feature::{AttrValue, Feature};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn asset(id: &str, status: AttrValue) -> Feature {
        Feature {
            attrs: BTreeMap::from([
                ("asset_id".to_string(), AttrValue::Text(id.to_string())),
                ("status".to_string(), status),
            ]),
            geometry: None,
        }
    }

    fn layer(features: Vec<Feature>) -> Layer {
        Layer {
            path: PathBuf::from("gi.geojson"),
            columns: BTreeSet::from(["asset_id".to_string(), "status".to_string()]),
            features,
        }
    }

    fn ids(layer: &Layer) -> Vec<String> {
        layer
            .features
            .iter()
            .filter_map(|f| f.get("asset_id").and_then(|v| v.as_key()))
            .collect()
    }

    #[test]
    fn keeps_only_marker_rows() {
        let assets = layer(vec![
            asset("A", AttrValue::Text("Constructed".into())),
            asset("B", AttrValue::Text("Proposed".into())),
            asset("C", AttrValue::Text("Constructed - Monitoring".into())),
            asset("D", AttrValue::Text("constructed".into())),
            asset("E", AttrValue::Null),
            asset("F", AttrValue::Number(1.0)),
        ]);

        let built = filter_by_status(&assets, "status", "Constructed").unwrap();

        assert_eq!(ids(&built), vec!["A", "C"]);
    }

    #[test]
    fn filtering_twice_changes_nothing() {
        let assets = layer(vec![
            asset("A", AttrValue::Text("Constructed".into())),
            asset("B", AttrValue::Text("Proposed".into())),
        ]);

        let once = filter_by_status(&assets, "status", "Constructed").unwrap();
        let twice = filter_by_status(&once, "status", "Constructed").unwrap();

        assert_eq!(ids(&once), ids(&twice));
    }

    #[test]
    fn missing_status_column_is_fatal() {
        let mut assets = layer(vec![]);
        assets.columns.remove("status");
        assert!(filter_by_status(&assets, "status", "Constructed").is_err());
    }
}
