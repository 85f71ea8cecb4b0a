//! Per-year/per-season water-quality tables.
//!
//! For every (year, season) in the plan, a table is created from the source
//! time series when that season has enough samples. Drop mode removes the
//! same set of tables.

pub mod plan;
pub mod store;

pub use plan::{PlanEntry, TableSpec, build_plan};
pub use store::{DbConfig, PgSession, SeasonStore};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonReport {
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub dropped: Vec<String>,
}

/// Create a table for every plan entry whose season qualifies.
pub fn create_tables<S: SeasonStore>(
    store: &mut S,
    spec: &TableSpec,
    plan: &[PlanEntry],
) -> Result<SeasonReport> {
    spec.validate()?;
    store.execute(&spec.search_path_sql())?;

    let mut report = SeasonReport::default();
    for entry in plan {
        let table = spec.table_name(entry);
        if store.has_rows(&spec.qualifying_query(entry))? {
            store.execute(&spec.create_table_sql(entry))?;
            tracing::info!(%table, year = entry.year, season = entry.season.name(), "table created");
            report.created.push(table);
        } else {
            tracing::info!(%table, year = entry.year, season = entry.season.name(), "table not created: too few samples");
            report.skipped.push(table);
        }
    }
    Ok(report)
}

/// Drop every table the plan could have created.
pub fn drop_tables<S: SeasonStore>(
    store: &mut S,
    spec: &TableSpec,
    plan: &[PlanEntry],
) -> Result<SeasonReport> {
    spec.validate()?;
    store.execute(&spec.search_path_sql())?;

    let mut report = SeasonReport::default();
    for entry in plan {
        store.execute(&spec.drop_table_sql(entry))?;
        report.dropped.push(spec.table_name(entry));
    }
    tracing::info!(count = report.dropped.len(), "dropped season tables");
    Ok(report)
}

/// Run one pass inside `store` and commit it. On error the store is dropped
/// uncommitted, which releases it.
pub fn run_in<S: SeasonStore>(
    mut store: S,
    spec: &TableSpec,
    plan: &[PlanEntry],
    drop: bool,
) -> Result<SeasonReport> {
    let report = if drop {
        drop_tables(&mut store, spec, plan)?
    } else {
        create_tables(&mut store, spec, plan)?
    };
    store.commit()?;
    Ok(report)
}
