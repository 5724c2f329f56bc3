//! Result Flattener
//!
//! Turns column-major series into row-oriented records.
//!
//! Records are emitted in group → series → row order. Series with no rows
//! contribute nothing. Each row is zipped positionally with its series'
//! column names, so a short row leaves its trailing fields absent and values
//! beyond the column list are dropped. Field order follows column order; a
//! repeated column name keeps its first position and takes the last value.

use serde_json::{Map, Value};

use crate::store::{Series, StatementResult};

/// One row-oriented record, keyed by column name in column order.
pub type Record = Map<String, Value>;

/// Flatten every result group into one ordered sequence of records.
pub fn flatten(groups: Vec<StatementResult>) -> Vec<Record> {
    let capacity = groups
        .iter()
        .flat_map(|g| g.series.iter().flatten())
        .map(Series::row_count)
        .sum();
    let mut records = Vec::with_capacity(capacity);

    for group in groups {
        for series in group.series.into_iter().flatten() {
            flatten_series(series, &mut records);
        }
    }
    records
}

/// Append the rows of one series to `out`.
pub fn flatten_series(series: Series, out: &mut Vec<Record>) {
    let Some(rows) = series.values else {
        return;
    };
    let columns = series.columns;
    out.extend(rows.into_iter().map(|row| zip_row(&columns, row)));
}

fn zip_row(columns: &[String], row: Vec<Value>) -> Record {
    columns.iter().cloned().zip(row).collect()
}
