use crate::Result;
use crate::config::OverlapPolicy;
use crate::layer::Layer;
use anyhow::bail;
use geo::{BoundingRect, Geometry, Rect, Relate};

/// An asset paired with the sewershed that contains it (left-join row).
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedAsset {
    pub asset_id: Option<String>,
    pub capacity: Option<f64>,
    /// None when no sewershed contains the asset.
    pub sewershed: Option<String>,
}

struct Candidate<'a> {
    key: String,
    geometry: &'a Geometry<f64>,
    envelope: Rect<f64>,
}

/// Spatially join assets to sewersheds with the DE-9IM "within" predicate.
///
/// An asset on a sewershed boundary is not within it. Every asset yields at
/// least one row; `policy` decides what happens when several sewersheds
/// contain the same asset.
pub fn join_within(
    assets: &Layer,
    sewersheds: &Layer,
    asset_id_column: &str,
    capacity_column: &str,
    sewershed_key_column: &str,
    policy: OverlapPolicy,
) -> Result<Vec<JoinedAsset>> {
    assets.require_column(capacity_column)?;
    sewersheds.require_column(sewershed_key_column)?;

    let candidates: Vec<Candidate<'_>> = sewersheds
        .features
        .iter()
        .filter_map(|f| {
            let key = f.get(sewershed_key_column)?.as_key()?;
            let geometry = f.geometry.as_ref()?;
            let envelope = geometry.bounding_rect()?;
            Some(Candidate {
                key,
                geometry,
                envelope,
            })
        })
        .collect();

    let mut out = Vec::with_capacity(assets.features.len());
    let mut unmatched = 0usize;

    for feature in &assets.features {
        let asset_id = feature.get(asset_id_column).and_then(|v| v.as_key());
        let capacity = feature.get(capacity_column).and_then(|v| v.as_f64());

        let containing: Vec<&str> = match &feature.geometry {
            Some(geom) => containing_keys(geom, &candidates),
            None => Vec::new(),
        };

        let row = |sewershed: Option<String>| JoinedAsset {
            asset_id: asset_id.clone(),
            capacity,
            sewershed,
        };

        match containing.as_slice() {
            [] => {
                unmatched += 1;
                tracing::debug!(asset = ?asset_id, "asset is not within any sewershed");
                out.push(row(None));
            }
            [only] => out.push(row(Some(only.to_string()))),
            many => match policy {
                OverlapPolicy::All => {
                    tracing::warn!(
                        asset = ?asset_id,
                        sewersheds = ?many,
                        "asset lies within overlapping sewersheds; counting it in each"
                    );
                    out.extend(many.iter().map(|k| row(Some(k.to_string()))));
                }
                OverlapPolicy::First => {
                    tracing::warn!(
                        asset = ?asset_id,
                        sewersheds = ?many,
                        kept = many[0],
                        "asset lies within overlapping sewersheds; keeping the first"
                    );
                    out.push(row(Some(many[0].to_string())));
                }
                OverlapPolicy::Error => {
                    bail!(
                        "asset {} lies within multiple sewersheds: {}",
                        asset_id.as_deref().unwrap_or("<no id>"),
                        many.join(", ")
                    );
                }
            },
        }
    }

    if unmatched > 0 {
        tracing::warn!(
            unmatched,
            total = assets.features.len(),
            "assets outside every sewershed are left out of the totals"
        );
    }

    Ok(out)
}

fn containing_keys<'a>(geom: &Geometry<f64>, candidates: &'a [Candidate<'_>]) -> Vec<&'a str> {
    let Some(bounds) = geom.bounding_rect() else {
        return Vec::new();
    };
    candidates
        .iter()
        .filter(|c| rect_covers(&c.envelope, &bounds))
        .filter(|c| geom.relate(c.geometry).is_within())
        .map(|c| c.key.as_str())
        .collect()
}

fn rect_covers(outer: &Rect<f64>, inner: &Rect<f64>) -> bool {
    outer.min().x <= inner.min().x
        && outer.min().y <= inner.min().y
        && outer.max().x >= inner.max().x
        && outer.max().y >= inner.max().y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::feature::{AttrValue, Feature};
    use geo::{Point, polygon};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn square(x0: f64, y0: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ])
    }

    fn sewersheds(shapes: Vec<(&str, Geometry<f64>)>) -> Layer {
        Layer {
            path: PathBuf::from("Sewershed.shp"),
            columns: BTreeSet::from(["Sewershed".to_string()]),
            features: shapes
                .into_iter()
                .map(|(key, geometry)| Feature {
                    attrs: BTreeMap::from([(
                        "Sewershed".to_string(),
                        AttrValue::Text(key.to_string()),
                    )]),
                    geometry: Some(geometry),
                })
                .collect(),
        }
    }

    fn assets(points: Vec<(&str, f64, Option<Geometry<f64>>)>) -> Layer {
        Layer {
            path: PathBuf::from("gi.geojson"),
            columns: BTreeSet::from(["asset_id".to_string(), "calc_rain".to_string()]),
            features: points
                .into_iter()
                .map(|(id, cap, geometry)| Feature {
                    attrs: BTreeMap::from([
                        ("asset_id".to_string(), AttrValue::Text(id.to_string())),
                        ("calc_rain".to_string(), AttrValue::Number(cap)),
                    ]),
                    geometry,
                })
                .collect(),
        }
    }

    fn pt(x: f64, y: f64) -> Option<Geometry<f64>> {
        Some(Geometry::Point(Point::new(x, y)))
    }

    fn keys(rows: &[JoinedAsset]) -> Vec<(Option<String>, Option<String>)> {
        rows.iter()
            .map(|r| (r.asset_id.clone(), r.sewershed.clone()))
            .collect()
    }

    fn join(a: &Layer, s: &Layer, policy: OverlapPolicy) -> Result<Vec<JoinedAsset>> {
        join_within(a, s, "asset_id", "calc_rain", "Sewershed", policy)
    }

    #[test]
    fn interior_points_join_and_outside_points_get_no_key() {
        let s = sewersheds(vec![("X", square(0.0, 0.0, 10.0)), ("Y", square(10.0, 0.0, 10.0))]);
        let a = assets(vec![
            ("A", 5.0, pt(5.0, 5.0)),
            ("B", 2.0, pt(15.0, 5.0)),
            ("C", 1.0, pt(50.0, 50.0)),
            ("D", 1.0, None),
        ]);

        let rows = join(&a, &s, OverlapPolicy::All).unwrap();

        assert_eq!(
            keys(&rows),
            vec![
                (Some("A".into()), Some("X".into())),
                (Some("B".into()), Some("Y".into())),
                (Some("C".into()), None),
                (Some("D".into()), None),
            ]
        );
        assert_eq!(rows[0].capacity, Some(5.0));
    }

    #[test]
    fn boundary_points_are_not_within() {
        let s = sewersheds(vec![("X", square(0.0, 0.0, 10.0))]);
        let a = assets(vec![("edge", 5.0, pt(10.0, 5.0)), ("corner", 5.0, pt(0.0, 0.0))]);

        let rows = join(&a, &s, OverlapPolicy::All).unwrap();

        assert!(rows.iter().all(|r| r.sewershed.is_none()));
    }

    #[test]
    fn polygon_assets_must_be_fully_inside() {
        let s = sewersheds(vec![("X", square(0.0, 0.0, 10.0))]);
        let a = assets(vec![
            ("inside", 1.0, Some(square(2.0, 2.0, 1.0))),
            ("straddling", 1.0, Some(square(9.0, 2.0, 2.0))),
        ]);

        let rows = join(&a, &s, OverlapPolicy::All).unwrap();

        assert_eq!(rows[0].sewershed.as_deref(), Some("X"));
        assert_eq!(rows[1].sewershed, None);
    }

    #[test]
    fn overlap_policy_controls_multi_containment() {
        let s = sewersheds(vec![("X", square(0.0, 0.0, 10.0)), ("Z", square(4.0, 4.0, 10.0))]);
        let a = assets(vec![("A", 5.0, pt(5.0, 5.0))]);

        let all = join(&a, &s, OverlapPolicy::All).unwrap();
        assert_eq!(
            all.iter().map(|r| r.sewershed.clone()).collect::<Vec<_>>(),
            vec![Some("X".to_string()), Some("Z".to_string())]
        );

        let first = join(&a, &s, OverlapPolicy::First).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].sewershed.as_deref(), Some("X"));

        let err = join(&a, &s, OverlapPolicy::Error).unwrap_err().to_string();
        assert_eq!(err, "asset A lies within multiple sewersheds: X, Z");
    }
}
