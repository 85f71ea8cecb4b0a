use crate::Result;
use crate::layer::Layer;
use crate::model::join::JoinedAsset;
use geo::Area;
use std::collections::BTreeMap;

/// Sum values per key. Keys with no rows do not appear.
///
/// Each group is summed in ascending value order so the totals do not depend
/// on input row order.
pub fn sum_by_key<I>(rows: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = (String, f64)>,
{
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (key, value) in rows {
        groups.entry(key).or_default().push(value);
    }

    groups
        .into_iter()
        .map(|(key, mut values)| {
            values.sort_by(f64::total_cmp);
            (key, values.into_iter().sum())
        })
        .collect()
}

/// Total captured volume per sewershed. Rows without a sewershed are skipped;
/// a null capacity adds nothing but still keeps its sewershed in the result.
pub fn captured_volume(joined: &[JoinedAsset]) -> BTreeMap<String, f64> {
    sum_by_key(
        joined
            .iter()
            .filter_map(|r| Some((r.sewershed.clone()?, r.capacity.unwrap_or(0.0)))),
    )
}

/// Total planar area of combined-sewer-area polygons per sewershed key. A
/// keyed row with no geometry counts as zero area.
pub fn combined_sewer_area(csa: &Layer, key_column: &str) -> Result<BTreeMap<String, f64>> {
    csa.require_column(key_column)?;

    Ok(sum_by_key(csa.features.iter().filter_map(|f| {
        let key = f.get(key_column)?.as_key()?;
        let area = f.geometry.as_ref().map_or(0.0, |g| g.unsigned_area());
        Some((key, area))
    })))
}
