//! The GIS host capability used by the IDW batch.
//!
//! Only the operations the batch needs are exposed, so the driver runs the
//! same against the in-process host or a test double.

use crate::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Handle to a layer known to the host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LayerRef {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IdwRequest<'a> {
    pub source: &'a LayerRef,
    pub attribute: &'a str,
    /// Distance exponent.
    pub power: f64,
    pub extent: Extent,
    pub ncols: usize,
    pub nrows: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClipRequest<'a> {
    pub input: &'a Path,
    pub mask: &'a LayerRef,
    /// Overrides the input raster's NODATA value when set.
    pub nodata: Option<f64>,
    pub output: PathBuf,
}

pub trait GisHost {
    fn layer_by_name(&self, name: &str) -> Result<LayerRef>;

    /// Layers in a named group, in host order.
    fn group_layers(&self, group: &str) -> Result<Vec<LayerRef>>;

    fn extent(&self, layer: &LayerRef) -> Result<Extent>;

    fn interpolate_idw(&mut self, request: &IdwRequest<'_>) -> Result<()>;

    /// Clip a raster to a polygon mask layer, keeping its resolution.
    fn clip_raster_by_mask(&mut self, request: &ClipRequest<'_>) -> Result<()>;

    fn add_raster_layer(&mut self, path: &Path, name: &str) -> Result<()>;
}
