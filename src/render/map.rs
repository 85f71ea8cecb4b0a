//! Choropleth view model: projected SVG paths, fills, and labels.

use crate::layer::Layer;
use crate::model::{SewershedSummary, rain_height_label};
use crate::render::scale::{BLUES, ColorScale};
use geo::{BoundingRect, Centroid, Geometry, LineString, Polygon, Rect};
use serde::Serialize;

/// Width of the SVG viewBox; height follows the data aspect ratio.
pub const VIEW_WIDTH: f64 = 1000.0;

const BASE_FILL: &str = "wheat";
const BASE_STROKE: &str = "grey";
const OVERLAY_STROKE: &str = "black";
const LEGEND_LABEL: &str = "Manageable rain height (in)";

#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub width: f64,
    pub height: f64,
    pub base: Vec<ShapeView>,
    pub overlay: Vec<ShapeView>,
    pub labels: Vec<LabelView>,
    pub legend: Option<LegendView>,
    pub totals: TotalsView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeView {
    pub key: Option<String>,
    pub path: String,
    pub fill: String,
    pub stroke: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelView {
    pub key: String,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendView {
    pub label: String,
    pub min_text: String,
    pub max_text: String,
    pub stops: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub sewersheds: usize,
    pub with_rain_height: usize,
    pub non_finite: usize,
}

/// Maps data coordinates into the viewBox with y flipped.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_x: f64,
    max_y: f64,
    scale: f64,
}

impl Projection {
    fn fit(bounds: Rect<f64>) -> Self {
        let span = bounds.width().max(bounds.height());
        let scale = if span > 0.0 { VIEW_WIDTH / span } else { 1.0 };
        Projection {
            min_x: bounds.min().x,
            max_y: bounds.max().y,
            scale,
        }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.min_x) * self.scale, (self.max_y - y) * self.scale)
    }
}

/// Build the map from every sewershed (base layer) and the summaries
/// (overlay).
pub fn build_map_view(sewersheds: &Layer, key_column: &str, summaries: &[SewershedSummary]) -> MapView {
    let bounds = sewersheds
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
        .chain(
            summaries
                .iter()
                .filter_map(|s| s.geometry.as_ref()?.bounding_rect()),
        )
        .reduce(merge_rects);

    let projection = bounds.map(Projection::fit);
    let (width, height) = match bounds {
        Some(b) if b.width() > 0.0 && b.height() > 0.0 => {
            let p = Projection::fit(b);
            (b.width() * p.scale, b.height() * p.scale)
        }
        _ => (VIEW_WIDTH, VIEW_WIDTH),
    };

    let base = match projection {
        Some(p) => sewersheds
            .features
            .iter()
            .filter_map(|f| {
                Some(ShapeView {
                    key: f.get(key_column).and_then(|v| v.as_key()),
                    path: geometry_path(f.geometry.as_ref()?, &p)?,
                    fill: BASE_FILL.to_string(),
                    stroke: BASE_STROKE.to_string(),
                })
            })
            .collect(),
        None => Vec::new(),
    };

    let scale = ColorScale::from_values(summaries.iter().map(|s| s.rain_height));

    let mut overlay = Vec::new();
    let mut labels = Vec::new();
    if let Some(p) = projection {
        for summary in summaries {
            let Some(geometry) = summary.geometry.as_ref() else {
                continue;
            };
            let Some(path) = geometry_path(geometry, &p) else {
                continue;
            };
            let fill = match scale {
                Some(s) => s.color(summary.rain_height),
                None => crate::render::scale::NON_FINITE_FILL.to_string(),
            };
            overlay.push(ShapeView {
                key: Some(summary.key.clone()),
                path,
                fill,
                stroke: OVERLAY_STROKE.to_string(),
            });

            if let Some(c) = geometry.centroid() {
                let (x, y) = p.apply(c.x(), c.y());
                labels.push(LabelView {
                    key: summary.key.clone(),
                    x,
                    y,
                    text: rain_height_label(summary.rain_height),
                });
            }
        }
    }

    let legend = scale.map(|s| LegendView {
        label: LEGEND_LABEL.to_string(),
        min_text: format!("{:.4}", s.min),
        max_text: format!("{:.4}", s.max),
        stops: BLUES.iter().map(|c| c.to_string()).collect(),
    });

    MapView {
        width,
        height,
        totals: TotalsView {
            sewersheds: sewersheds.features.len(),
            with_rain_height: summaries.len(),
            non_finite: summaries
                .iter()
                .filter(|s| !s.rain_height.is_finite())
                .count(),
        },
        base,
        overlay,
        labels,
        legend,
    }
}

fn merge_rects(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
        (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
    )
}

/// SVG path data for areal geometries; None for points and lines.
fn geometry_path(geometry: &Geometry<f64>, p: &Projection) -> Option<String> {
    let mut d = String::new();
    match geometry {
        Geometry::Polygon(poly) => push_polygon(&mut d, poly, p),
        Geometry::MultiPolygon(mp) => mp.iter().for_each(|poly| push_polygon(&mut d, poly, p)),
        Geometry::Rect(r) => push_polygon(&mut d, &r.to_polygon(), p),
        _ => return None,
    }
    (!d.is_empty()).then_some(d)
}

fn push_polygon(d: &mut String, poly: &Polygon<f64>, p: &Projection) {
    push_ring(d, poly.exterior(), p);
    for hole in poly.interiors() {
        push_ring(d, hole, p);
    }
}

fn push_ring(d: &mut String, ring: &LineString<f64>, p: &Projection) {
    for (i, c) in ring.coords().enumerate() {
        let (x, y) = p.apply(c.x, c.y);
        let cmd = if i == 0 { 'M' } else { 'L' };
        if !d.is_empty() {
            d.push(' ');
        }
        d.push_str(&format!("{}{:.2},{:.2}", cmd, x, y));
    }
    if !ring.0.is_empty() {
        d.push_str(" Z");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::feature::{AttrValue, Feature};
    use geo::{coord, polygon};
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::PathBuf;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
        Geometry::Rect(Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }))
    }

    fn sewersheds() -> Layer {
        let f = |key: &str, g| Feature {
            attrs: BTreeMap::from([("Sewershed".to_string(), AttrValue::Text(key.into()))]),
            geometry: Some(g),
        };
        Layer {
            path: PathBuf::from("Sewershed.shp"),
            columns: BTreeSet::from(["Sewershed".to_string()]),
            features: vec![
                f("X", rect(0.0, 0.0, 10.0, 10.0)),
                f("Y", rect(10.0, 0.0, 20.0, 10.0)),
            ],
        }
    }

    fn summary(key: &str, geometry: Geometry<f64>, rain_height: f64) -> SewershedSummary {
        SewershedSummary {
            key: key.to_string(),
            geometry: Some(geometry),
            total_captured_volume: 0.0,
            cso_area: 0.0,
            rain_height,
        }
    }

    #[test]
    fn labels_sit_on_projected_centroids() {
        let s = sewersheds();
        let summaries = vec![summary("X", rect(0.0, 0.0, 10.0, 10.0), 0.4)];

        let view = build_map_view(&s, "Sewershed", &summaries);

        assert_eq!(view.width, 1000.0);
        assert_eq!(view.height, 500.0);
        assert_eq!(view.base.len(), 2);
        assert_eq!(view.overlay.len(), 1);
        assert_eq!(view.labels.len(), 1);
        let label = &view.labels[0];
        assert_eq!(label.text, "0.4000 in");
        assert!((label.x - 250.0).abs() < 1e-9);
        assert!((label.y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn overlay_colors_span_the_ramp() {
        let s = sewersheds();
        let summaries = vec![
            summary("X", rect(0.0, 0.0, 10.0, 10.0), 0.4),
            summary("Y", rect(10.0, 0.0, 20.0, 10.0), 1.2),
        ];

        let view = build_map_view(&s, "Sewershed", &summaries);

        assert_eq!(view.overlay[0].fill, "#f7fbff");
        assert_eq!(view.overlay[1].fill, "#08306b");
        let legend = view.legend.unwrap();
        assert_eq!(legend.min_text, "0.4000");
        assert_eq!(legend.max_text, "1.2000");
        assert_eq!(view.totals.with_rain_height, 2);
    }

    #[test]
    fn non_finite_values_are_grey_and_labelled() {
        let s = sewersheds();
        let summaries = vec![summary("X", rect(0.0, 0.0, 10.0, 10.0), f64::INFINITY)];

        let view = build_map_view(&s, "Sewershed", &summaries);

        assert_eq!(view.overlay[0].fill, crate::render::scale::NON_FINITE_FILL);
        assert_eq!(view.labels[0].text, "inf in");
        assert!(view.legend.is_none());
        assert_eq!(view.totals.non_finite, 1);
    }

    #[test]
    fn path_flips_y_axis() {
        let p = Projection::fit(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 10.0, y: 10.0 }));
        let square = Geometry::Polygon(geo::polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ]);
        let d = geometry_path(&square, &p).unwrap();
        assert!(d.starts_with("M0.00,1000.00"));
        assert!(d.ends_with(" Z"));
        assert!(geometry_path(&Geometry::Point(geo::Point::new(1.0, 1.0)), &p).is_none());
    }
}
