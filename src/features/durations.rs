//! Session durations: elapsed time within the current session, and the full
//! session span.
//!
//! A session window is `(ip, previous_sessions)`. Elapsed time for a row is
//! its distance from the session's earliest event; the span is the distance
//! between the session's earliest and latest events, broadcast to every row.
//! The span looks ahead to the session's end, so like `total_sessions` it is
//! offline-only.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "session_durations_input",
    columns: &[
        ColumnSpec::required("ip", ColumnType::UInt32),
        ColumnSpec::required("previous_sessions", ColumnType::UInt32),
        ColumnSpec::required("click_timestamp", ColumnType::UInt32),
    ],
};

pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "session_durations_output",
    columns: &[
        ColumnSpec::required("current_session_duration_till_now", ColumnType::UInt32),
        ColumnSpec::required("current_session_duration", ColumnType::UInt32),
    ],
};

/// Append `current_session_duration_till_now` and `current_session_duration`.
///
/// Both reduce to min/max of `click_timestamp` over the session window, which
/// equals the cumulative sum of successive in-session differences without
/// depending on evaluation order.
pub fn derive_session_durations(
    conn: &Connection,
    src: &str,
    dst: &str,
) -> Result<(), duckdb::Error> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {dst} AS
         SELECT t.*,
                CAST(t.click_timestamp - MIN(t.click_timestamp) OVER s AS UINTEGER)
                    AS current_session_duration_till_now,
                CAST(MAX(t.click_timestamp) OVER s - MIN(t.click_timestamp) OVER s AS UINTEGER)
                    AS current_session_duration
         FROM {src} t
         WINDOW s AS (PARTITION BY t.ip, t.previous_sessions)"
    );
    conn.execute_batch(&sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(rows: &[(u32, u32, u32)]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE clicks (row_id BIGINT, ip UINTEGER,
                                  previous_sessions UINTEGER, click_timestamp UINTEGER)",
        )
        .unwrap();
        for (i, (ip, prev, ts)) in rows.iter().enumerate() {
            conn.execute(
                "INSERT INTO clicks VALUES (?, ?, ?, ?)",
                duckdb::params![i as i64, ip, prev, ts],
            )
            .unwrap();
        }
        conn
    }

    fn derive(conn: &Connection) -> Vec<(u32, u32)> {
        derive_session_durations(conn, "clicks", "out").unwrap();
        OUTPUT_CONTRACT.validate(conn, "out").unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT current_session_duration_till_now, current_session_duration
                 FROM out ORDER BY row_id",
            )
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn test_elapsed_and_span_single_session() {
        let conn = setup(&[(1, 0, 0), (1, 0, 100), (1, 0, 200)]);
        assert_eq!(derive(&conn), vec![(0, 200), (100, 200), (200, 200)]);
    }

    #[test]
    fn test_session_start_resets_elapsed() {
        let conn = setup(&[(1, 0, 0), (1, 0, 100), (1, 1, 2000)]);
        assert_eq!(derive(&conn), vec![(0, 100), (100, 100), (0, 0)]);
    }

    #[test]
    fn test_single_event_session_has_zero_span() {
        let conn = setup(&[(7, 0, 42)]);
        assert_eq!(derive(&conn), vec![(0, 0)]);
    }

    #[test]
    fn test_sessions_of_different_ips_do_not_mix() {
        let conn = setup(&[(1, 0, 0), (2, 0, 50), (1, 0, 300), (2, 0, 60)]);
        assert_eq!(
            derive(&conn),
            vec![(0, 300), (0, 10), (300, 300), (10, 10)]
        );
    }

    #[test]
    fn test_till_now_bounded_by_span() {
        let conn = setup(&[(1, 0, 5), (1, 0, 25), (1, 0, 95), (1, 1, 1000)]);
        for (till_now, span) in derive(&conn) {
            assert!(till_now <= span);
        }
    }
}
