//! Raster grid, IDW interpolation, mask clipping, and ESRI ASCII grid I/O.

use crate::Result;
use crate::idw::host::Extent;
use anyhow::{Context, bail};
use geo::{Geometry, Intersects, Point};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const NODATA: f64 = -9999.0;

/// Row-major raster; row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub extent: Extent,
    pub ncols: usize,
    pub nrows: usize,
    pub nodata: f64,
    pub cells: Vec<f64>,
}

impl Grid {
    pub fn cell_size(&self) -> (f64, f64) {
        (
            self.extent.width() / self.ncols as f64,
            self.extent.height() / self.nrows as f64,
        )
    }

    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let (dx, dy) = self.cell_size();
        (
            self.extent.xmin + (col as f64 + 0.5) * dx,
            self.extent.ymax - (row as f64 + 0.5) * dy,
        )
    }

    #[cfg(test)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.ncols + col]
    }

    /// ESRI ASCII grid. Square cells use `cellsize`; otherwise `dx`/`dy`.
    pub fn write_ascii(&self, path: &Path) -> Result<()> {
        let (dx, dy) = self.cell_size();
        let mut out = String::new();
        writeln!(out, "NCOLS {}", self.ncols)?;
        writeln!(out, "NROWS {}", self.nrows)?;
        writeln!(out, "XLLCORNER {}", self.extent.xmin)?;
        writeln!(out, "YLLCORNER {}", self.extent.ymin)?;
        if (dx - dy).abs() <= f64::EPSILON * dx.abs().max(1.0) {
            writeln!(out, "CELLSIZE {}", dx)?;
        } else {
            writeln!(out, "DX {}", dx)?;
            writeln!(out, "DY {}", dy)?;
        }
        writeln!(out, "NODATA_VALUE {}", self.nodata)?;
        for row in self.cells.chunks(self.ncols) {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", line.join(" "))?;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, out).with_context(|| format!("write grid {}", path.display()))?;
        Ok(())
    }

    pub fn read_ascii(path: &Path) -> Result<Grid> {
        let text = fs::read_to_string(path).with_context(|| format!("read grid {}", path.display()))?;
        let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

        let mut ncols = None;
        let mut nrows = None;
        let mut xll = None;
        let mut yll = None;
        let mut dx = None;
        let mut dy = None;
        let mut nodata = NODATA;

        while let Some(line) = lines.peek() {
            let mut parts = line.split_whitespace();
            let key = parts.next().unwrap_or_default();
            if key.parse::<f64>().is_ok() {
                break;
            }
            let Some(value) = parts.next() else {
                bail!("grid parse error in {}: bad header line {:?}", path.display(), line);
            };
            let value: f64 = value
                .parse()
                .with_context(|| format!("grid header {} in {}", key, path.display()))?;
            match key.to_ascii_uppercase().as_str() {
                "NCOLS" => ncols = Some(value as usize),
                "NROWS" => nrows = Some(value as usize),
                "XLLCORNER" => xll = Some(value),
                "YLLCORNER" => yll = Some(value),
                "CELLSIZE" => {
                    dx = Some(value);
                    dy = Some(value);
                }
                "DX" => dx = Some(value),
                "DY" => dy = Some(value),
                "NODATA_VALUE" => nodata = value,
                other => bail!("grid parse error in {}: unknown header {}", path.display(), other),
            }
            lines.next();
        }

        let (Some(ncols), Some(nrows), Some(xll), Some(yll), Some(dx), Some(dy)) =
            (ncols, nrows, xll, yll, dx, dy)
        else {
            bail!("grid parse error in {}: incomplete header", path.display());
        };

        let cells = lines
            .flat_map(|l| l.split_whitespace())
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("grid values in {}", path.display()))?;
        if cells.len() != ncols * nrows {
            bail!(
                "grid parse error in {}: expected {} values, found {}",
                path.display(),
                ncols * nrows,
                cells.len()
            );
        }

        Ok(Grid {
            extent: Extent {
                xmin: xll,
                ymin: yll,
                xmax: xll + dx * ncols as f64,
                ymax: yll + dy * nrows as f64,
            },
            ncols,
            nrows,
            nodata,
            cells,
        })
    }
}

/// Inverse-distance-weighted surface over `samples` (x, y, value).
///
/// A cell centered on a sample takes that sample's value exactly. With no
/// samples every cell is NODATA.
pub fn interpolate(samples: &[(f64, f64, f64)], extent: Extent, ncols: usize, nrows: usize, power: f64) -> Grid {
    let mut grid = Grid {
        extent,
        ncols,
        nrows,
        nodata: NODATA,
        cells: vec![NODATA; ncols * nrows],
    };
    if samples.is_empty() {
        return grid;
    }

    for row in 0..nrows {
        for col in 0..ncols {
            let (x, y) = grid.cell_center(row, col);
            grid.cells[row * ncols + col] = estimate(samples, x, y, power);
        }
    }
    grid
}

fn estimate(samples: &[(f64, f64, f64)], x: f64, y: f64, power: f64) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for &(sx, sy, z) in samples {
        let d2 = (sx - x).powi(2) + (sy - y).powi(2);
        if d2 < 1e-24 {
            return z;
        }
        let w = d2.powf(-power / 2.0);
        weighted += w * z;
        total += w;
    }
    weighted / total
}

/// Keep cells whose centers fall inside (or on) any mask geometry; the rest
/// become `nodata`.
pub fn clip(grid: &Grid, mask: &[&Geometry<f64>], nodata: f64) -> Grid {
    let mut out = grid.clone();
    out.nodata = nodata;
    for row in 0..grid.nrows {
        for col in 0..grid.ncols {
            let idx = row * grid.ncols + col;
            let (x, y) = grid.cell_center(row, col);
            let center = Point::new(x, y);
            let inside = mask.iter().any(|g| g.intersects(&center));
            if !inside || grid.cells[idx] == grid.nodata {
                out.cells[idx] = nodata;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Rect, coord};
    use pretty_assertions::assert_eq;

    fn extent(w: f64, h: f64) -> Extent {
        Extent {
            xmin: 0.0,
            ymin: 0.0,
            xmax: w,
            ymax: h,
        }
    }

    #[test]
    fn cell_centers_start_at_the_north_west() {
        let g = interpolate(&[], extent(400.0, 200.0), 4, 2, 2.0);
        assert_eq!(g.cell_center(0, 0), (50.0, 150.0));
        assert_eq!(g.cell_center(1, 3), (350.0, 50.0));
        assert!(g.cells.iter().all(|v| *v == NODATA));
    }

    #[test]
    fn sample_on_a_cell_center_wins_and_others_blend() {
        let samples = [(50.0, 150.0, 10.0), (350.0, 50.0, 20.0)];
        let g = interpolate(&samples, extent(400.0, 200.0), 4, 2, 2.0);

        assert_eq!(g.get(0, 0), 10.0);
        assert_eq!(g.get(1, 3), 20.0);
        // Equidistant from both samples.
        let mid = estimate(&samples, 200.0, 100.0, 2.0);
        assert!((mid - 15.0).abs() < 1e-12);
        let v = g.get(0, 1);
        assert!(v > 10.0 && v < 15.0);
    }

    #[test]
    fn clipping_masks_cells_outside_the_polygon() {
        let g = interpolate(&[(0.0, 0.0, 1.0)], extent(400.0, 200.0), 4, 2, 2.0);
        let mask = Geometry::Rect(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 200.0, y: 200.0 }));

        let clipped = clip(&g, &[&mask], NODATA);

        assert_eq!(clipped.get(0, 0), 1.0);
        assert_eq!(clipped.get(1, 1), 1.0);
        assert_eq!(clipped.get(0, 2), NODATA);
        assert_eq!(clipped.get(1, 3), NODATA);
    }

    #[test]
    fn ascii_grid_survives_a_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("idw_test.asc");
        let g = interpolate(&[(10.0, 10.0, 3.5)], extent(300.0, 200.0), 3, 2, 2.0);

        g.write_ascii(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("NCOLS 3\nNROWS 2\nXLLCORNER 0\nYLLCORNER 0\nCELLSIZE 100\nNODATA_VALUE -9999\n"));

        let back = Grid::read_ascii(&path).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn truncated_grid_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.asc");
        fs::write(&path, "NCOLS 2\nNROWS 2\nXLLCORNER 0\nYLLCORNER 0\nCELLSIZE 1\n1 2 3\n").unwrap();
        assert!(Grid::read_ascii(&path).is_err());
    }
}
