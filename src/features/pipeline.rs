//! Orchestration of the derived-column pipeline.
//!
//! Stages run strictly in dependency order, each materializing a scratch
//! table that carries every previous column plus its own. The orchestrator
//! validates each stage's input contract before running it and its output
//! contract after, then finalizes into the destination table. Failure is
//! atomic: scratch tables are dropped on every exit path and the destination
//! table is dropped on error, so a failed run leaves nothing behind.

use crate::features::contract::{ColumnSpec, ColumnType, SchemaContract, SchemaViolation};
use crate::features::{counts, durations, history, sessions, timestamp};
use duckdb::Connection;
use serde::Serialize;
use std::time::Instant;

/// What the pipeline requires of its source table.
pub const INPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "pipeline_input",
    columns: &[
        ColumnSpec::required("row_id", ColumnType::Int64),
        ColumnSpec::required("ip", ColumnType::UInt32),
        ColumnSpec::required("click_time", ColumnType::Timestamp),
    ],
};

/// What the pipeline guarantees of its destination table: every derived
/// column present, typed, and non-null. The historical average is non-null
/// here because finalization has substituted the `-1.0` sentinel.
pub const OUTPUT_CONTRACT: SchemaContract = SchemaContract {
    name: "pipeline_output",
    columns: &[
        ColumnSpec::required("click_timestamp", ColumnType::UInt32),
        ColumnSpec::required("previous_sessions", ColumnType::UInt32),
        ColumnSpec::required("total_sessions", ColumnType::UInt32),
        ColumnSpec::required("current_session_duration_till_now", ColumnType::UInt32),
        ColumnSpec::required("current_session_duration", ColumnType::UInt32),
        ColumnSpec::required("avg_previous_sessions_duration", ColumnType::Float64),
    ],
};

const STAGE_COUNT: usize = 5;

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub rows: u64,
    pub epoch_ms: i64,
    pub gap_secs: u32,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub enum PipelineError {
    Schema(SchemaViolation),
    Database(duckdb::Error),
    /// An empty source table has no epoch; rejected up front rather than
    /// producing an output with an undefined zero point.
    EmptyInput,
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Schema(e) => write!(f, "Schema violation: {e}"),
            Self::Database(e) => write!(f, "Database error: {e}"),
            Self::EmptyInput => write!(f, "Source table is empty; no epoch can be derived"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<SchemaViolation> for PipelineError {
    fn from(e: SchemaViolation) -> Self {
        Self::Schema(e)
    }
}

impl From<duckdb::Error> for PipelineError {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e)
    }
}

/// Runs the five derivation stages over a click table and materializes the
/// fully validated feature table.
///
/// Deterministic and side-effect-free given a fixed source table and gap:
/// the only tables touched are the destination and its scratch tables.
#[derive(Debug, Clone, Copy)]
pub struct DerivedColumnPipeline {
    gap_secs: u32,
}

impl Default for DerivedColumnPipeline {
    fn default() -> Self {
        Self::new(sessions::DEFAULT_SESSION_GAP_SECS)
    }
}

impl DerivedColumnPipeline {
    /// `gap_secs` is the inactivity threshold between sessions
    /// (`duration_between_sessions`).
    pub const fn new(gap_secs: u32) -> Self {
        Self { gap_secs }
    }

    pub const fn gap_secs(&self) -> u32 {
        self.gap_secs
    }

    /// Derive all feature columns from `src` into `dst`.
    ///
    /// `epoch_ms` overrides the epoch; pass the report's `epoch_ms` from a
    /// training run when deriving an evaluation table that must share its
    /// zero point. `None` uses the minimum `click_time` of `src`.
    pub fn run(
        &self,
        conn: &Connection,
        src: &str,
        dst: &str,
        epoch_ms: Option<i64>,
    ) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        let result = self.run_stages(conn, src, dst, epoch_ms, started);

        // Scratch cleanup happens on both paths; the destination only
        // survives a fully validated run.
        for i in 1..=STAGE_COUNT {
            let _ = conn.execute_batch(&format!("DROP TABLE IF EXISTS {dst}__stage{i}"));
        }
        if result.is_err() {
            let _ = conn.execute_batch(&format!("DROP TABLE IF EXISTS {dst}"));
        }

        match &result {
            Ok(report) => {
                tracing::info!(
                    rows = report.rows,
                    epoch_ms = report.epoch_ms,
                    gap_secs = report.gap_secs,
                    elapsed_ms = report.elapsed_ms,
                    "Feature derivation completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, src, dst, "Feature derivation failed");
            }
        }
        result
    }

    fn run_stages(
        &self,
        conn: &Connection,
        src: &str,
        dst: &str,
        epoch_ms: Option<i64>,
        started: Instant,
    ) -> Result<PipelineReport, PipelineError> {
        INPUT_CONTRACT.validate(conn, src)?;

        let rows: u64 = conn.query_row(&format!("SELECT COUNT(*) FROM {src}"), [], |row| {
            row.get(0)
        })?;
        if rows == 0 {
            return Err(PipelineError::EmptyInput);
        }

        let epoch_ms = match epoch_ms {
            Some(e) => e,
            None => timestamp::click_epoch_ms(conn, src)?.ok_or(PipelineError::EmptyInput)?,
        };

        let stage = |i: usize| format!("{dst}__stage{i}");

        timestamp::INPUT_CONTRACT.validate(conn, src)?;
        timestamp::derive_click_timestamp(conn, src, &stage(1), epoch_ms)?;
        timestamp::OUTPUT_CONTRACT.validate(conn, &stage(1))?;
        tracing::debug!(stage = "click_timestamp", "Stage completed");

        sessions::INPUT_CONTRACT.validate(conn, &stage(1))?;
        sessions::derive_previous_sessions(conn, &stage(1), &stage(2), self.gap_secs)?;
        sessions::OUTPUT_CONTRACT.validate(conn, &stage(2))?;
        tracing::debug!(stage = "previous_sessions", "Stage completed");

        counts::INPUT_CONTRACT.validate(conn, &stage(2))?;
        counts::derive_total_sessions(conn, &stage(2), &stage(3))?;
        counts::OUTPUT_CONTRACT.validate(conn, &stage(3))?;
        tracing::debug!(stage = "total_sessions", "Stage completed");

        durations::INPUT_CONTRACT.validate(conn, &stage(3))?;
        durations::derive_session_durations(conn, &stage(3), &stage(4))?;
        durations::OUTPUT_CONTRACT.validate(conn, &stage(4))?;
        tracing::debug!(stage = "session_durations", "Stage completed");

        history::INPUT_CONTRACT.validate(conn, &stage(4))?;
        history::derive_avg_previous_duration(conn, &stage(4), &stage(5))?;
        history::OUTPUT_CONTRACT.validate(conn, &stage(5))?;
        tracing::debug!(stage = "avg_previous_sessions_duration", "Stage completed");

        // Output boundary: substitute the sentinel for the tagged-optional
        // NULL and restore ingest row order.
        let finalize = format!(
            "CREATE OR REPLACE TABLE {dst} AS
             SELECT * REPLACE (
                 COALESCE(avg_previous_sessions_duration, -1.0)
                     AS avg_previous_sessions_duration
             )
             FROM {last} ORDER BY row_id",
            last = stage(5)
        );
        conn.execute_batch(&finalize)?;
        OUTPUT_CONTRACT.validate(conn, dst)?;

        let final_rows: u64 = conn.query_row(&format!("SELECT COUNT(*) FROM {dst}"), [], |row| {
            row.get(0)
        })?;
        debug_assert_eq!(final_rows, rows);

        Ok(PipelineReport {
            rows: final_rows,
            epoch_ms,
            gap_secs: self.gap_secs,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}
