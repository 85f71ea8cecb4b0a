use crate::Result;
use anyhow::bail;
use geo::Geometry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// A single attribute cell.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the cell. Text that parses as a number counts; nulls
    /// and anything else do not.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Join key view of the cell. Integral numbers render without a fraction
    /// so that `12.0` from a dbf column matches the text key `"12"`.
    pub fn as_key(&self) -> Option<String> {
        match self {
            AttrValue::Text(s) => Some(s.clone()),
            AttrValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{}", *n as i64))
            }
            AttrValue::Number(n) => Some(n.to_string()),
            AttrValue::Bool(b) => Some(b.to_string()),
            AttrValue::Null => None,
        }
    }
}

/// One row of a layer: projected attributes plus an optional geometry.
#[derive(Debug, Clone)]
pub struct Feature {
    pub attrs: BTreeMap<String, AttrValue>,
    pub geometry: Option<Geometry<f64>>,
}

impl Feature {
    pub fn get(&self, column: &str) -> Option<&AttrValue> {
        self.attrs.get(column)
    }
}

/// An in-memory table with a geometry column.
#[derive(Debug, Clone)]
pub struct Layer {
    pub path: PathBuf,
    /// Requested columns that actually exist in the source.
    pub columns: BTreeSet<String>,
    pub features: Vec<Feature>,
}

impl Layer {
    /// Layer name as a GIS host would show it (the file stem).
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn require_column(&self, column: &str) -> Result<()> {
        if !self.columns.contains(column) {
            bail!(
                "layer {} has no column '{}'",
                self.path.display(),
                column
            );
        }
        Ok(())
    }

    /// Same source and schema, different rows.
    pub fn with_features(&self, features: Vec<Feature>) -> Layer {
        Layer {
            path: self.path.clone(),
            columns: self.columns.clone(),
            features,
        }
    }
}
