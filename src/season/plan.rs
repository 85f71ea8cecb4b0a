//! Year/season plan and the SQL text for each entry.
//!
//! Identifiers (schema, tables) are interpolated into SQL, so they are
//! checked against a plain-identifier pattern first. Years and seasons come
//! from typed values and never from user text.

use crate::Result;
use anyhow::bail;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Ordinal used in table names (winter = 1).
    pub fn number(self) -> u8 {
        match self {
            Season::Winter => 1,
            Season::Spring => 2,
            Season::Summer => 3,
            Season::Autumn => 4,
        }
    }

    /// Value stored in the `season` column.
    pub fn name(self) -> &'static str {
        match self {
            Season::Winter => "winter",
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub year: i32,
    pub season: Season,
}

/// Tables and thresholds shared by every plan entry.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub schema: String,
    pub source_table: String,
    pub table_prefix: String,
    /// A season qualifies with strictly more samples than this.
    pub min_samples: u32,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            schema: "nyc".to_string(),
            source_table: "wq_o2perc_season".to_string(),
            table_prefix: "o2perc".to_string(),
            min_samples: 20,
        }
    }
}

impl TableSpec {
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.schema)?;
        validate_identifier(&self.source_table)?;
        validate_identifier(&self.table_prefix)?;
        Ok(())
    }

    pub fn table_name(&self, entry: &PlanEntry) -> String {
        format!(
            "{}_{}_{}_{}",
            self.table_prefix,
            entry.year,
            entry.season.number(),
            entry.season.name()
        )
    }

    pub fn search_path_sql(&self) -> String {
        format!("SET search_path = {}", self.schema)
    }

    /// Rows of `entry`'s season, returned only when the season has more than
    /// `min_samples` samples.
    pub fn qualifying_query(&self, entry: &PlanEntry) -> String {
        let src = &self.source_table;
        format!(
            "SELECT *
FROM {src} AS c,
     (SELECT COUNT(fid) AS samples, MAX(year) AS yr, season AS szn
      FROM {src}
      WHERE year::FLOAT = {year}::FLOAT AND season = '{season}'
      GROUP BY season) AS t
WHERE samples > {min} AND c.year = t.yr AND c.season = t.szn",
            year = entry.year,
            season = entry.season.name(),
            min = self.min_samples,
        )
    }

    pub fn create_table_sql(&self, entry: &PlanEntry) -> String {
        format!(
            "CREATE TABLE {} AS\n{}",
            self.table_name(entry),
            self.qualifying_query(entry)
        )
    }

    pub fn drop_table_sql(&self, entry: &PlanEntry) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table_name(entry))
    }
}

/// Every (year, season) from `first_year` through `last_year`, seasons in
/// calendar order.
pub fn build_plan(first_year: i32, last_year: i32) -> Vec<PlanEntry> {
    (first_year..=last_year)
        .flat_map(|year| Season::ALL.into_iter().map(move |season| PlanEntry { year, season }))
        .collect()
}

pub fn validate_identifier(s: &str) -> Result<()> {
    const IDENT_RE: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";
    let re = Regex::new(IDENT_RE)?;
    if !re.is_match(s) {
        bail!("not a plain SQL identifier: {:?}", s);
    }
    Ok(())
}
