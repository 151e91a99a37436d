//! Total session count per IP.
//!
//! Non-causal: the count covers every session the IP will ever have in the
//! dataset, so it is only meaningful in an offline/batch context and cannot
//! be produced incrementally for a single unseen event.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "total_sessions_input",
    columns: &[
        ColumnSpec::required("ip", ColumnType::UInt32),
        ColumnSpec::required("previous_sessions", ColumnType::UInt32),
    ],
};

pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "total_sessions_output",
    columns: &[ColumnSpec::required("total_sessions", ColumnType::UInt32)],
};

/// Append `total_sessions = max(previous_sessions) per IP + 1`, broadcast to
/// every row of the IP.
pub fn derive_total_sessions(
    conn: &Connection,
    src: &str,
    dst: &str,
) -> Result<(), duckdb::Error> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {dst} AS
         SELECT t.*,
                CAST(MAX(t.previous_sessions) OVER (PARTITION BY t.ip) + 1 AS UINTEGER)
                    AS total_sessions
         FROM {src} t"
    );
    conn.execute_batch(&sql)
}
