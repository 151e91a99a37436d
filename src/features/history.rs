//! Historical average: mean duration of an IP's strictly-prior sessions.
//!
//! Computed at session granularity (one representative row per
//! `(ip, previous_sessions)` group, since `current_session_duration` is
//! constant within a session) and joined back onto every event row.
//!
//! An IP's first session has no history; the mean would be 0/0. Inside the
//! pipeline that case stays NULL — the tagged-optional form — and the `-1.0`
//! sentinel is substituted only when the pipeline finalizes its output
//! table, so no intermediate arithmetic can pick the sentinel up as a real
//! duration.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract};
use duckdb::Connection;

pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "avg_previous_sessions_duration_input",
    columns: &[
        ColumnSpec::required("ip", ColumnType::UInt32),
        ColumnSpec::required("previous_sessions", ColumnType::UInt32),
        ColumnSpec::required("current_session_duration", ColumnType::UInt32),
    ],
};

pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "avg_previous_sessions_duration_output",
    columns: &[ColumnSpec::nullable(
        "avg_previous_sessions_duration",
        ColumnType::Float64,
    )],
};

/// Append `avg_previous_sessions_duration`: the running sum of session
/// durations over sessions strictly before the current one, divided by
/// `previous_sessions` (the count of prior sessions). NULL when there are
/// none.
pub fn derive_avg_previous_duration(
    conn: &Connection,
    src: &str,
    dst: &str,
) -> Result<(), duckdb::Error> {
    let sql = format!(
        "CREATE OR REPLACE TABLE {dst} AS
         WITH session_spans AS (
             SELECT ip, previous_sessions,
                    ANY_VALUE(current_session_duration) AS session_duration
             FROM {src}
             GROUP BY ip, previous_sessions
         ),
         prior_totals AS (
             SELECT ip, previous_sessions,
                    SUM(session_duration) OVER (
                        PARTITION BY ip ORDER BY previous_sessions
                        ROWS BETWEEN UNBOUNDED PRECEDING AND 1 PRECEDING
                    ) AS prior_duration_total
             FROM session_spans
         )
         SELECT t.*,
                CASE WHEN t.previous_sessions = 0 THEN NULL
                     ELSE CAST(p.prior_duration_total AS DOUBLE) / t.previous_sessions
                END AS avg_previous_sessions_duration
         FROM {src} t
         JOIN prior_totals p USING (ip, previous_sessions)"
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
                                  previous_sessions UINTEGER, current_session_duration UINTEGER)",
        )
        .unwrap();
        for (i, (ip, prev, dur)) in rows.iter().enumerate() {
            conn.execute(
                "INSERT INTO clicks VALUES (?, ?, ?, ?)",
                duckdb::params![i as i64, ip, prev, dur],
            )
            .unwrap();
        }
        conn
    }

    fn derive(conn: &Connection) -> Vec<Option<f64>> {
        derive_avg_previous_duration(conn, "clicks", "out").unwrap();
        OUTPUT_CONTRACT.validate(conn, "out").unwrap();
        let mut stmt = conn
            .prepare("SELECT avg_previous_sessions_duration FROM out ORDER BY row_id")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn test_first_session_has_no_history() {
        let conn = setup(&[(1, 0, 200), (1, 0, 200)]);
        assert_eq!(derive(&conn), vec![None, None]);
    }

    #[test]
    fn test_second_session_averages_the_first() {
        let conn = setup(&[(1, 0, 100), (1, 0, 100), (1, 1, 0)]);
        assert_eq!(derive(&conn), vec![None, None, Some(100.0)]);
    }

    #[test]
    fn test_third_session_averages_first_two() {
        // sessions with durations 100 and 50; third sees (100 + 50) / 2
        let conn = setup(&[(1, 0, 100), (1, 1, 50), (1, 2, 7)]);
        assert_eq!(derive(&conn), vec![None, Some(100.0), Some(75.0)]);
    }

    #[test]
    fn test_current_session_excluded_from_average() {
        // second session's own (large) duration must not leak into its average
        let conn = setup(&[(1, 0, 10), (1, 1, 9999)]);
        assert_eq!(derive(&conn), vec![None, Some(10.0)]);
    }

    #[test]
    fn test_zero_duration_history_averages_to_zero() {
        // a prior single-event session has duration 0; the average is a real
        // 0.0, distinct from "no history"
        let conn = setup(&[(1, 0, 0), (1, 1, 30)]);
        assert_eq!(derive(&conn), vec![None, Some(0.0)]);
    }

    #[test]
    fn test_history_is_per_ip() {
        let conn = setup(&[(1, 0, 500), (2, 0, 40), (2, 1, 0)]);
        assert_eq!(derive(&conn), vec![None, None, Some(40.0)]);
    }

    #[test]
    fn test_row_count_preserved_by_join() {
        let conn = setup(&[(1, 0, 80), (1, 0, 80), (1, 0, 80), (1, 1, 5)]);
        assert_eq!(derive(&conn).len(), 4);
    }
}
