//! Session segmentation: 0-based session index per event within its IP.
//!
//! A new session opens when the gap to the IP's previous event reaches the
//! inactivity threshold. Every window orders explicitly by
//! `(click_timestamp, row_id)`, so the result is independent of the physical
//! row order of the table and ties at the same instant keep ingest order.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

/// Default inactivity gap between sessions: 15 minutes.
pub const DEFAULT_SESSION_GAP_SECS: u32 = 15 * 60;

pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "previous_sessions_input",
    columns: &[
        ColumnSpec::required("row_id", ColumnType::Int64),
        ColumnSpec::required("ip", ColumnType::UInt32),
        ColumnSpec::required("click_timestamp", ColumnType::UInt32),
    ],
};

pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "previous_sessions_output",
    columns: &[ColumnSpec::required("previous_sessions", ColumnType::UInt32)],
};

/// Append `previous_sessions`: the running count of session openings up to
/// and including each row, per IP.
///
/// The first row of an IP has no predecessor; its LAG is NULL and the CASE
/// falls through to 0, so it never opens a session on its own (it is session
/// 0 by definition). A gap of exactly 0 never opens a session either — the
/// break requires a strictly positive difference — so simultaneous events
/// stay in one session regardless of tie order, even at threshold 0.
pub fn derive_previous_sessions(
    conn: &Connection,
    src: &str,
    dst: &str,
    gap_secs: u32,
) -> Result<(), duckdb::Error> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {dst} AS
         WITH diffs AS (
             SELECT t.*,
                    CAST(t.click_timestamp AS BIGINT)
                        - CAST(LAG(t.click_timestamp) OVER w AS BIGINT) AS gap
             FROM {src} t
             WINDOW w AS (PARTITION BY t.ip ORDER BY t.click_timestamp, t.row_id)
         )
         SELECT * EXCLUDE (gap),
                CAST(SUM(CASE WHEN gap > 0 AND gap >= {gap_secs} THEN 1 ELSE 0 END) OVER (
                    PARTITION BY ip ORDER BY click_timestamp, row_id
                    ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
                ) AS UINTEGER) AS previous_sessions
         FROM diffs"
    );
    conn.execute_batch(&sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(rows: &[(u32, u32)]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE clicks (row_id BIGINT, ip UINTEGER, click_timestamp UINTEGER)",
        )
        .unwrap();
        for (i, (ip, ts)) in rows.iter().enumerate() {
            conn.execute(
                "INSERT INTO clicks VALUES (?, ?, ?)",
                duckdb::params![i as i64, ip, ts],
            )
            .unwrap();
        }
        conn
    }

    fn derive(conn: &Connection, gap: u32) -> Vec<u32> {
        derive_previous_sessions(conn, "clicks", "out", gap).unwrap();
        OUTPUT_CONTRACT.validate(conn, "out").unwrap();
        let mut stmt = conn
            .prepare("SELECT previous_sessions FROM out ORDER BY row_id")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn test_no_gaps_single_session() {
        let conn = setup(&[(1, 0), (1, 100), (1, 200)]);
        assert_eq!(derive(&conn, 900), vec![0, 0, 0]);
    }

    #[test]
    fn test_gap_opens_session() {
        let conn = setup(&[(1, 0), (1, 100), (1, 2000)]);
        assert_eq!(derive(&conn, 900), vec![0, 0, 1]);
    }

    #[test]
    fn test_gap_exactly_at_threshold_opens_session() {
        let conn = setup(&[(1, 0), (1, 900)]);
        assert_eq!(derive(&conn, 900), vec![0, 1]);
    }

    #[test]
    fn test_gap_just_under_threshold_does_not() {
        let conn = setup(&[(1, 0), (1, 899)]);
        assert_eq!(derive(&conn, 900), vec![0, 0]);
    }

    #[test]
    fn test_zero_gap_never_opens_session() {
        // two events at the same instant stay in one session even at gap 0
        let conn = setup(&[(1, 50), (1, 50)]);
        assert_eq!(derive(&conn, 0), vec![0, 0]);
        let conn = setup(&[(1, 50), (1, 50)]);
        assert_eq!(derive(&conn, 1), vec![0, 0]);
    }

    #[test]
    fn test_zero_threshold_splits_on_any_positive_gap() {
        let conn = setup(&[(1, 50), (1, 50), (1, 51)]);
        assert_eq!(derive(&conn, 0), vec![0, 0, 1]);
    }

    #[test]
    fn test_ips_are_independent() {
        // interleaved by timestamp; IP 2's events never affect IP 1
        let conn = setup(&[(1, 0), (2, 10), (1, 2000), (2, 20)]);
        assert_eq!(derive(&conn, 900), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_unordered_input_rows_still_segment_by_time() {
        // physical row order deliberately scrambled; windows sort internally
        let conn = setup(&[(1, 2000), (1, 0), (1, 100)]);
        assert_eq!(derive(&conn, 900), vec![1, 0, 0]);
    }

    #[test]
    fn test_multiple_gaps_accumulate() {
        let conn = setup(&[(1, 0), (1, 1000), (1, 2000), (1, 2100)]);
        assert_eq!(derive(&conn, 900), vec![0, 1, 2, 2]);
    }
}
