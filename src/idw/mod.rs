//! IDW batch: interpolate every layer in a group over a mask's extent, clip
//! the result to the mask, and register the clipped raster.

pub mod grid;
pub mod host;
pub mod native;

pub use host::{ClipRequest, Extent, GisHost, IdwRequest};
pub use native::NativeHost;

use crate::Result;
use anyhow::bail;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct IdwOptions {
    pub mask_layer: String,
    pub group: String,
    pub attribute: String,
    /// Target cell size in map units.
    pub resolution: f64,
    pub power: f64,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdwOutput {
    pub layer: String,
    pub raster: PathBuf,
    pub clipped: PathBuf,
}

/// Whole cells that fit in the extent at `resolution`.
pub fn grid_size(extent: &Extent, resolution: f64) -> Result<(usize, usize)> {
    if !(resolution > 0.0) {
        bail!("resolution must be positive, got {}", resolution);
    }
    let ncols = (extent.width() / resolution).floor() as usize;
    let nrows = (extent.height() / resolution).floor() as usize;
    if ncols == 0 || nrows == 0 {
        bail!(
            "extent {}x{} is smaller than one {} cell",
            extent.width(),
            extent.height(),
            resolution
        );
    }
    Ok((ncols, nrows))
}

pub fn run_batch<H: GisHost>(host: &mut H, options: &IdwOptions) -> Result<Vec<IdwOutput>> {
    let mask = host.layer_by_name(&options.mask_layer)?;
    let extent = host.extent(&mask)?;
    let (ncols, nrows) = grid_size(&extent, options.resolution)?;
    tracing::info!(mask = %mask.name, ncols, nrows, "grid fixed by mask extent");

    let mut outputs = Vec::new();
    for layer in host.group_layers(&options.group)? {
        let raster = options.out_dir.join(format!("idw_{}.asc", layer.name));
        host.interpolate_idw(&IdwRequest {
            source: &layer,
            attribute: &options.attribute,
            power: options.power,
            extent,
            ncols,
            nrows,
            output: raster.clone(),
        })?;

        let clipped = options.out_dir.join(format!("clip_idw_{}.asc", layer.name));
        host.clip_raster_by_mask(&ClipRequest {
            input: &raster,
            mask: &mask,
            nodata: None,
            output: clipped.clone(),
        })?;

        host.add_raster_layer(&clipped, &format!("idw_{}", layer.name))?;
        outputs.push(IdwOutput {
            layer: layer.name,
            raster,
            clipped,
        });
    }
    Ok(outputs)
}
