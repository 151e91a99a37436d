//! Ingestion of TalkingData-format click logs and export of the derived
//! feature table.
//!
//! Both readers assign `row_id` at ingest: a 0-based `row_number()` ordered
//! by `click_time`, so simultaneous events keep their file order. Every
//! later tie-break in the pipeline refers to this column.

use chrono::NaiveDateTime;
use duckdb::Connection;

/// Which click-table shape a file is ingested into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Labeled training data (`is_attributed`, nullable `attributed_time`).
    Train,
    /// Unlabeled evaluation data carrying a submission `click_id`.
    Test,
}

impl TableKind {
    /// Default table name for this kind.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Train => "clicks_train",
            Self::Test => "clicks_test",
        }
    }

    /// CSV column type declarations, in file order.
    const fn csv_columns(self) -> &'static str {
        match self {
            Self::Train => {
                "{'ip': 'UINTEGER', 'app': 'USMALLINT', 'device': 'USMALLINT',
                  'os': 'USMALLINT', 'channel': 'USMALLINT', 'click_time': 'TIMESTAMP',
                  'attributed_time': 'TIMESTAMP', 'is_attributed': 'BOOLEAN'}"
            }
            Self::Test => {
                "{'click_id': 'UINTEGER', 'ip': 'UINTEGER', 'app': 'USMALLINT',
                  'device': 'USMALLINT', 'os': 'USMALLINT', 'channel': 'USMALLINT',
                  'click_time': 'TIMESTAMP'}"
            }
        }
    }

    /// Projection normalizing source columns to the canonical table types.
    const fn select_list(self) -> &'static str {
        match self {
            Self::Train => {
                "CAST(ip AS UINTEGER) AS ip, CAST(app AS USMALLINT) AS app,
                 CAST(device AS USMALLINT) AS device, CAST(os AS USMALLINT) AS os,
                 CAST(channel AS USMALLINT) AS channel,
                 CAST(click_time AS TIMESTAMP) AS click_time,
                 CAST(attributed_time AS TIMESTAMP) AS attributed_time,
                 CAST(is_attributed AS BOOLEAN) AS is_attributed"
            }
            Self::Test => {
                "CAST(click_id AS UINTEGER) AS click_id, CAST(ip AS UINTEGER) AS ip,
                 CAST(app AS USMALLINT) AS app, CAST(device AS USMALLINT) AS device,
                 CAST(os AS USMALLINT) AS os, CAST(channel AS USMALLINT) AS channel,
                 CAST(click_time AS TIMESTAMP) AS click_time"
            }
        }
    }
}

// Note: read_csv/read_parquet/COPY do not support parameterized paths in
// DuckDB, so paths are escaped and interpolated.
fn escape(path: &str) -> String {
    path.replace('\'', "''")
}

/// Load a TalkingData CSV file into `table`, returning the row count.
pub fn load_csv(
    conn: &Connection,
    path: &str,
    table: &str,
    kind: TableKind,
) -> Result<u64, LoadError> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {table} AS
         SELECT CAST(row_number() OVER (ORDER BY click_time) - 1 AS BIGINT) AS row_id,
                {select}
         FROM read_csv('{path}', header = true,
                       timestampformat = '%Y-%m-%d %H:%M:%S',
                       columns = {columns})",
        select = kind.select_list(),
        path = escape(path),
        columns = kind.csv_columns(),
    );
    conn.execute_batch(&sql).map_err(LoadError::Read)?;
    count_rows(conn, table).map_err(LoadError::Read)
}

/// Load a Parquet file into `table`, returning the row count.
pub fn load_parquet(
    conn: &Connection,
    path: &str,
    table: &str,
    kind: TableKind,
) -> Result<u64, LoadError> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {table} AS
         SELECT CAST(row_number() OVER (ORDER BY click_time) - 1 AS BIGINT) AS row_id,
                {select}
         FROM read_parquet('{path}')",
        select = kind.select_list(),
        path = escape(path),
    );
    conn.execute_batch(&sql).map_err(LoadError::Read)?;
    count_rows(conn, table).map_err(LoadError::Read)
}

/// Export a table to a Parquet file for the classifier handoff.
pub fn export_parquet(conn: &Connection, table: &str, path: &str) -> Result<(), LoadError> {
    let sql = format!(
        "COPY (SELECT * FROM {table} ORDER BY row_id) TO '{path}'
         (FORMAT PARQUET, COMPRESSION ZSTD)",
        path = escape(path),
    );
    conn.execute_batch(&sql).map_err(LoadError::Export)
}

fn count_rows(conn: &Connection, table: &str) -> Result<u64, duckdb::Error> {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
}

/// One training click, for programmatic ingestion (tests, benches, embedded
/// callers).
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub ip: u32,
    pub app: u16,
    pub device: u16,
    pub os: u16,
    pub channel: u16,
    pub click_time: NaiveDateTime,
    pub attributed_time: Option<NaiveDateTime>,
    pub is_attributed: bool,
}

/// Append training events to `clicks_train`, assigning `row_id` in arrival
/// order after any existing rows.
pub fn insert_train_events(conn: &Connection, events: &[ClickEvent]) -> Result<usize, LoadError> {
    let base: i64 = conn
        .query_row("SELECT COUNT(*) FROM clicks_train", [], |row| row.get(0))
        .map_err(LoadError::Insert)?;

    for (i, event) in events.iter().enumerate() {
        conn.execute(
            "INSERT INTO clicks_train VALUES (?, ?, ?, ?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP), ?)",
            duckdb::params![
                base + i as i64,
                event.ip,
                event.app,
                event.device,
                event.os,
                event.channel,
                event.click_time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
                event
                    .attributed_time
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
                event.is_attributed,
            ],
        )
        .map_err(LoadError::Insert)?;
    }
    Ok(events.len())
}

#[derive(Debug)]
pub enum LoadError {
    Read(duckdb::Error),
    Insert(duckdb::Error),
    Export(duckdb::Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "Read error: {e}"),
            Self::Insert(e) => write!(f, "Insert error: {e}"),
            Self::Export(e) => write!(f, "Export error: {e}"),
        }
    }
}

impl std::error::Error for LoadError {}
