//! In-process GIS host backed by vector files on disk.

use crate::Result;
use crate::idw::grid::{self, Grid, NODATA};
use crate::idw::host::{ClipRequest, Extent, GisHost, IdwRequest, LayerRef};
use crate::layer::{Layer, read_layer};
use anyhow::{Context, anyhow, bail};
use geo::{BoundingRect, Geometry};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct NativeHost {
    layers: BTreeMap<String, Layer>,
    groups: BTreeMap<String, Vec<String>>,
    rasters: Vec<(String, PathBuf)>,
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer under its file stem; returns the handle. Stems must be
    /// unique across the host.
    pub fn add_layer(&mut self, layer: Layer) -> Result<LayerRef> {
        let name = layer.name();
        if let Some(existing) = self.layers.get(&name) {
            bail!(
                "layer name '{}' from {} is already taken by {}",
                name,
                layer.path.display(),
                existing.path.display()
            );
        }
        self.layers.insert(name.clone(), layer);
        Ok(LayerRef { name })
    }

    pub fn add_group(&mut self, group: &str, members: Vec<LayerRef>) {
        self.groups
            .insert(group.to_string(), members.into_iter().map(|l| l.name).collect());
    }

    /// Host with the mask layer and every vector file in `samples_dir` as
    /// members of `group`.
    pub fn from_files(mask: &Path, group: &str, samples_dir: &Path, attribute: &str) -> Result<Self> {
        let mut host = Self::new();
        host.add_layer(read_layer(mask, &[])?)?;

        let mut paths: Vec<PathBuf> = fs::read_dir(samples_dir)
            .with_context(|| format!("read sample directory {}", samples_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .map(|e| matches!(e.to_string_lossy().to_ascii_lowercase().as_str(), "geojson" | "json" | "shp"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut members = Vec::with_capacity(paths.len());
        for path in paths {
            members.push(host.add_layer(read_layer(&path, &[attribute])?)?);
        }
        tracing::info!(group, layers = members.len(), "loaded sample layers");
        host.add_group(group, members);
        Ok(host)
    }

    /// Rasters registered so far, as (display name, path).
    pub fn rasters(&self) -> &[(String, PathBuf)] {
        &self.rasters
    }

    fn layer(&self, layer: &LayerRef) -> Result<&Layer> {
        self.layers
            .get(&layer.name)
            .ok_or_else(|| anyhow!("unknown layer '{}'", layer.name))
    }
}

impl GisHost for NativeHost {
    fn layer_by_name(&self, name: &str) -> Result<LayerRef> {
        if !self.layers.contains_key(name) {
            bail!("no layer named '{}'", name);
        }
        Ok(LayerRef {
            name: name.to_string(),
        })
    }

    fn group_layers(&self, group: &str) -> Result<Vec<LayerRef>> {
        let members = self
            .groups
            .get(group)
            .ok_or_else(|| anyhow!("no layer group named '{}'", group))?;
        Ok(members
            .iter()
            .map(|name| LayerRef { name: name.clone() })
            .collect())
    }

    fn extent(&self, layer: &LayerRef) -> Result<Extent> {
        self.layer(layer)?
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref()?.bounding_rect())
            .map(|r| Extent {
                xmin: r.min().x,
                ymin: r.min().y,
                xmax: r.max().x,
                ymax: r.max().y,
            })
            .reduce(|a, b| Extent {
                xmin: a.xmin.min(b.xmin),
                ymin: a.ymin.min(b.ymin),
                xmax: a.xmax.max(b.xmax),
                ymax: a.ymax.max(b.ymax),
            })
            .ok_or_else(|| anyhow!("layer '{}' has no geometry", layer.name))
    }

    fn interpolate_idw(&mut self, request: &IdwRequest<'_>) -> Result<()> {
        let layer = self.layer(request.source)?;
        layer.require_column(request.attribute)?;

        let samples: Vec<(f64, f64, f64)> = layer
            .features
            .iter()
            .filter_map(|f| {
                let z = f.get(request.attribute)?.as_f64()?;
                match f.geometry.as_ref()? {
                    Geometry::Point(p) => Some(vec![(p.x(), p.y(), z)]),
                    Geometry::MultiPoint(mp) => Some(mp.iter().map(|p| (p.x(), p.y(), z)).collect()),
                    _ => None,
                }
            })
            .flatten()
            .collect();
        if samples.is_empty() {
            tracing::warn!(layer = %request.source.name, "no point samples with a value; grid is all NODATA");
        }

        let surface = grid::interpolate(
            &samples,
            request.extent,
            request.ncols,
            request.nrows,
            request.power,
        );
        surface.write_ascii(&request.output)?;
        tracing::debug!(output = %request.output.display(), samples = samples.len(), "wrote IDW grid");
        Ok(())
    }

    fn clip_raster_by_mask(&mut self, request: &ClipRequest<'_>) -> Result<()> {
        let raster = Grid::read_ascii(request.input)?;
        let mask: Vec<&Geometry<f64>> = self
            .layer(request.mask)?
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .collect();

        let clipped = grid::clip(&raster, &mask, request.nodata.unwrap_or(NODATA));
        clipped.write_ascii(&request.output)?;
        tracing::debug!(output = %request.output.display(), "wrote clipped grid");
        Ok(())
    }

    fn add_raster_layer(&mut self, path: &Path, name: &str) -> Result<()> {
        if !path.exists() {
            bail!("raster {} does not exist", path.display());
        }
        tracing::info!(name, path = %path.display(), "registered raster layer");
        self.rasters.push((name.to_string(), path.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COAST: &str = r#"{"type": "FeatureCollection", "features": [
      {"type": "Feature", "properties": {},
       "geometry": {"type": "Polygon", "coordinates": [[[0,0],[200,0],[200,200],[0,200],[0,0]]]}},
      {"type": "Feature", "properties": {},
       "geometry": {"type": "Polygon", "coordinates": [[[200,0],[400,0],[400,100],[200,100],[200,0]]]}}
    ]}"#;

    const WINTER: &str = r#"{"type": "FeatureCollection", "features": [
      {"type": "Feature", "properties": {"o2perc": 80.0},
       "geometry": {"type": "Point", "coordinates": [50, 150]}},
      {"type": "Feature", "properties": {"o2perc": null},
       "geometry": {"type": "Point", "coordinates": [350, 50]}}
    ]}"#;

    fn fixture() -> (tempfile::TempDir, NativeHost) {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("o2perc_by_season");
        fs::create_dir_all(&samples).unwrap();
        fs::write(dir.path().join("coastal_water.geojson"), COAST).unwrap();
        fs::write(samples.join("o2perc_2001_1_winter.geojson"), WINTER).unwrap();
        fs::write(samples.join("notes.txt"), "ignored").unwrap();

        let host = NativeHost::from_files(
            &dir.path().join("coastal_water.geojson"),
            "o2perc_by_season",
            &samples,
            "o2perc",
        )
        .unwrap();
        (dir, host)
    }

    #[test]
    fn loads_mask_and_group_members() {
        let (_dir, host) = fixture();

        let mask = host.layer_by_name("coastal_water").unwrap();
        assert_eq!(
            host.extent(&mask).unwrap(),
            Extent {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 400.0,
                ymax: 200.0
            }
        );
        assert_eq!(
            host.group_layers("o2perc_by_season").unwrap(),
            vec![LayerRef {
                name: "o2perc_2001_1_winter".into()
            }]
        );
        assert!(host.layer_by_name("land").is_err());
        assert!(host.group_layers("other").is_err());
    }

    #[test]
    fn duplicate_layer_stems_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        fs::create_dir_all(&samples).unwrap();
        fs::write(dir.path().join("coastal_water.geojson"), COAST).unwrap();
        fs::write(samples.join("o2perc_2001_1_winter.geojson"), WINTER).unwrap();
        fs::write(samples.join("o2perc_2001_1_winter.json"), WINTER).unwrap();

        let err = NativeHost::from_files(
            &dir.path().join("coastal_water.geojson"),
            "o2perc_by_season",
            &samples,
            "o2perc",
        )
        .unwrap_err();
        assert!(err.to_string().contains("layer name 'o2perc_2001_1_winter'"));
    }

    #[test]
    fn sample_named_like_the_mask_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let samples = dir.path().join("samples");
        fs::create_dir_all(&samples).unwrap();
        fs::write(dir.path().join("coastal_water.geojson"), COAST).unwrap();
        fs::write(samples.join("coastal_water.geojson"), WINTER).unwrap();

        let result = NativeHost::from_files(
            &dir.path().join("coastal_water.geojson"),
            "o2perc_by_season",
            &samples,
            "o2perc",
        );
        assert!(result.is_err());
    }

    #[test]
    fn null_samples_are_skipped_during_interpolation() {
        let (dir, mut host) = fixture();
        let source = LayerRef {
            name: "o2perc_2001_1_winter".into(),
        };
        let output = dir.path().join("idw.asc");

        host.interpolate_idw(&IdwRequest {
            source: &source,
            attribute: "o2perc",
            power: 2.0,
            extent: Extent {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 400.0,
                ymax: 200.0,
            },
            ncols: 4,
            nrows: 2,
            output: output.clone(),
        })
        .unwrap();

        let g = Grid::read_ascii(&output).unwrap();
        assert!(g.cells.iter().all(|v| *v == 80.0));
    }
}
