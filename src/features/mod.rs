//! Session-based feature derivation over click-event tables.
//!
//! The pipeline segments each IP's click history into sessions (maximal runs
//! with no inter-event gap at or above an inactivity threshold) and derives
//! per-session and cross-session aggregates. Every stage declares an input
//! and output [`contract::SchemaContract`] that the orchestrator validates
//! at the stage boundary.
//!
//! Several columns (`total_sessions`, `current_session_duration`) are
//! non-causal: they need the IP's full history, including events after the
//! current row. The pipeline is therefore batch-only and has no incremental
//! entry point.

pub mod contract;
pub mod counts;
pub mod durations;
pub mod history;
pub mod pipeline;
pub mod sessions;
pub mod timestamp;

use duckdb::Connection;
use serde::Serialize;

/// Column names shared across stages.
pub mod columns {
    pub const ROW_ID: &str = "row_id";
    pub const IP: &str = "ip";
    pub const CLICK_TIME: &str = "click_time";
    pub const CLICK_TIMESTAMP: &str = "click_timestamp";
    pub const PREVIOUS_SESSIONS: &str = "previous_sessions";
    pub const TOTAL_SESSIONS: &str = "total_sessions";
    pub const CURRENT_SESSION_DURATION_TILL_NOW: &str = "current_session_duration_till_now";
    pub const CURRENT_SESSION_DURATION: &str = "current_session_duration";
    pub const AVG_PREVIOUS_SESSIONS_DURATION: &str = "avg_previous_sessions_duration";
}

/// Model-input columns handed to the classifier harness, in schema order.
/// Labels (`is_attributed`), identifiers (`click_id`, `row_id`) and absolute
/// timestamps are excluded; `click_timestamp` carries the time signal.
pub const FEATURE_COLUMNS: &[&str] = &[
    "ip",
    "app",
    "device",
    "os",
    "channel",
    columns::CLICK_TIMESTAMP,
    columns::PREVIOUS_SESSIONS,
    columns::TOTAL_SESSIONS,
    columns::CURRENT_SESSION_DURATION_TILL_NOW,
    columns::CURRENT_SESSION_DURATION,
    columns::AVG_PREVIOUS_SESSIONS_DURATION,
];

/// One row of the derived feature table.
///
/// `avg_previous_sessions_duration` is `None` for an IP's first session. The
/// table itself stores the `-1.0` sentinel at that position (the serialized
/// boundary form); reading through this type decodes it back so callers
/// cannot accidentally average the sentinel into real durations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub ip: u32,
    pub app: u16,
    pub device: u16,
    pub os: u16,
    pub channel: u16,
    pub click_timestamp: u32,
    pub previous_sessions: u32,
    pub total_sessions: u32,
    pub current_session_duration_till_now: u32,
    pub current_session_duration: u32,
    pub avg_previous_sessions_duration: Option<f64>,
}

/// Decode the output-boundary sentinel: durations are non-negative, so any
/// negative value means "no prior-session history".
fn decode_sentinel(value: f64) -> Option<f64> {
    if value < 0.0 {
        None
    } else {
        Some(value)
    }
}

/// Read the feature table back as typed rows, in `row_id` order.
pub fn read_feature_rows(
    conn: &Connection,
    table: &str,
) -> Result<Vec<FeatureRow>, duckdb::Error> {
    let sql = format!(
        "SELECT ip, app, device, os, channel, click_timestamp, previous_sessions,
                total_sessions, current_session_duration_till_now,
                current_session_duration, avg_previous_sessions_duration
         FROM {table} ORDER BY row_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(FeatureRow {
                ip: row.get(0)?,
                app: row.get(1)?,
                device: row.get(2)?,
                os: row.get(3)?,
                channel: row.get(4)?,
                click_timestamp: row.get(5)?,
                previous_sessions: row.get(6)?,
                total_sessions: row.get(7)?,
                current_session_duration_till_now: row.get(8)?,
                current_session_duration: row.get(9)?,
                avg_previous_sessions_duration: decode_sentinel(row.get(10)?),
            })
        })?
        .filter_map(Result::ok)
        .collect();
    Ok(rows)
}
