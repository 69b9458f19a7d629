// Z-score normalization of table columns.

use tracing::debug;

use crate::error::ScoreResult;
use crate::stats::{zscores, MissingPolicy, StdDev};
use crate::table::MetricTable;

/// Z-score the listed columns, returning a new table.
///
/// Mean and population standard deviation are computed over the present
/// entries of each column; missing entries stay missing. A column with zero
/// standard deviation becomes all NaN.
pub fn normalize(table: &MetricTable, columns: &[&str]) -> ScoreResult<MetricTable> {
    table.require_columns(columns.iter().copied())?;

    let mut out = table.clone();
    for &name in columns {
        let values = table.numeric_column(name)?;
        let z = zscores(&values, StdDev::Population, MissingPolicy::Omit);
        if z.iter().flatten().all(|v| v.is_nan()) && z.iter().any(Option::is_some) {
            debug!("column `{}` has zero variance; z-scores are NaN", name);
        }
        out.replace_numeric(name, z)?;
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
