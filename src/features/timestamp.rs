//! Relative click timestamps: seconds elapsed since a shared epoch.
//!
//! The epoch is the minimum `click_time` of the training table, in epoch
//! milliseconds. It is taken as an explicit parameter rather than recomputed
//! per table so that a separately processed evaluation table can share the
//! training epoch and produce comparable `click_timestamp` values.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "click_timestamp_input",
    columns: &[ColumnSpec::required("click_time", ColumnType::Timestamp)],
};

pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "click_timestamp_output",
    columns: &[ColumnSpec::required("click_timestamp", ColumnType::UInt32)],
};

/// Minimum `click_time` of `table` in epoch milliseconds, or `None` for an
/// empty table.
pub fn click_epoch_ms(conn: &Connection, table: &str) -> Result<Option<i64>, duckdb::Error> {
    let sql = format!("SELECT MIN(epoch_ms(click_time)) FROM {table}");
    conn.query_row(&sql, [], |row| row.get(0))
}

/// Append `click_timestamp = floor((click_time_ms - epoch_ms) / 1000)`.
///
/// Rows at the epoch itself produce 0. The UINTEGER width bounds the
/// representable span at ~136 years; longer spans are out of scope.
pub fn derive_click_timestamp(
    conn: &Connection,
    src: &str,
    dst: &str,
    epoch_ms: i64,
) -> Result<(), duckdb::Error> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {dst} AS
         SELECT t.*,
                CAST((epoch_ms(t.click_time) - {epoch_ms}) // 1000 AS UINTEGER)
                    AS click_timestamp
         FROM {src} t"
    );
    conn.execute_batch(&sql)
}
