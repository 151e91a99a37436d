use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

/// SQL statement to create the training click table.
///
/// `row_id` is assigned at ingest (0-based, ordered by `click_time`) and is
/// the stable row identity every window tie-break refers to.
pub const CREATE_TRAIN_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS clicks_train (
    row_id          BIGINT NOT NULL,
    ip              UINTEGER NOT NULL,
    app             USMALLINT NOT NULL,
    device          USMALLINT NOT NULL,
    os              USMALLINT NOT NULL,
    channel         USMALLINT NOT NULL,
    click_time      TIMESTAMP NOT NULL,
    attributed_time TIMESTAMP,
    is_attributed   BOOLEAN NOT NULL
)
";

/// SQL statement to create the evaluation click table: no label, but a
/// submission `click_id`.
pub const CREATE_TEST_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS clicks_test (
    row_id     BIGINT NOT NULL,
    click_id   UINTEGER NOT NULL,
    ip         UINTEGER NOT NULL,
    app        USMALLINT NOT NULL,
    device     USMALLINT NOT NULL,
    os         USMALLINT NOT NULL,
    channel    USMALLINT NOT NULL,
    click_time TIMESTAMP NOT NULL
)
";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_TRAIN_TABLE)?;
    conn.execute_batch(CREATE_TEST_TABLE)?;
    Ok(())
}

const RAW_COMMON: [ColumnSpec; 6] = [
    ColumnSpec::required("row_id", ColumnType::Int64),
    ColumnSpec::required("ip", ColumnType::UInt32),
    ColumnSpec::required("app", ColumnType::UInt16),
    ColumnSpec::required("device", ColumnType::UInt16),
    ColumnSpec::required("os", ColumnType::UInt16),
    ColumnSpec::required("channel", ColumnType::UInt16),
];

/// Contract for ingested training data.
pub const RAW_TRAIN_CONTRACT: SchemaContract = SchemaContract {
    name: "raw_train",
    columns: &[
        RAW_COMMON[0],
        RAW_COMMON[1],
        RAW_COMMON[2],
        RAW_COMMON[3],
        RAW_COMMON[4],
        RAW_COMMON[5],
        ColumnSpec::required("click_time", ColumnType::Timestamp),
        ColumnSpec::nullable("attributed_time", ColumnType::Timestamp),
        ColumnSpec::required("is_attributed", ColumnType::Boolean),
    ],
};

/// Contract for ingested evaluation data.
pub const RAW_TEST_CONTRACT: SchemaContract = SchemaContract {
    name: "raw_test",
    columns: &[
        RAW_COMMON[0],
        RAW_COMMON[1],
        RAW_COMMON[2],
        RAW_COMMON[3],
        RAW_COMMON[4],
        RAW_COMMON[5],
        ColumnSpec::required("click_time", ColumnType::Timestamp),
        ColumnSpec::required("click_id", ColumnType::UInt32),
    ],
};
