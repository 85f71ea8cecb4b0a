//! Rain-height model: filter assets, join them to sewersheds, aggregate, and
//! derive the manageable rain height per sewershed.

pub mod aggregate;
pub mod filter;
pub mod join;
pub mod summary;

pub use summary::{SewershedSummary, rain_height_label};

use crate::Result;
use crate::config::Settings;
use crate::layer::Layer;

/// Run every stage from the loaded layers to per-sewershed summaries.
pub fn build_rain_heights(
    assets: &Layer,
    sewersheds: &Layer,
    csa: &Layer,
    settings: &Settings,
) -> Result<Vec<SewershedSummary>> {
    // 1) Constructed assets only.
    let built = filter::filter_by_status(assets, &settings.status_column, &settings.status_marker)?;

    // 2) Assets -> containing sewershed.
    let joined = join::join_within(
        &built,
        sewersheds,
        &settings.asset_id_column,
        &settings.capacity_column,
        &settings.sewershed_key_column,
        settings.overlap,
    )?;

    // 3) Per-sewershed totals.
    let volumes = aggregate::captured_volume(&joined);
    let areas = aggregate::combined_sewer_area(csa, &settings.csa_key_column)?;
    tracing::info!(
        with_gi = volumes.len(),
        with_csa = areas.len(),
        "aggregated per-sewershed totals"
    );

    // 4) Inner join + rain height.
    let summaries = summary::merge_summaries(
        sewersheds,
        &settings.sewershed_key_column,
        &volumes,
        &areas,
    )?;
    if summaries.is_empty() {
        tracing::warn!("no sewershed has both green infrastructure and combined sewer area");
    }
    Ok(summaries)
}
