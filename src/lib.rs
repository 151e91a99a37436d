//! clickfeat: session-based behavioral feature derivation for ad-click
//! fraud detection.
//!
//! Ingests impression-level click logs (IP, app, device, OS, channel,
//! timestamp, fraud label) into DuckDB and derives, per event, a chain of
//! session features: relative timestamp, session index, session count,
//! in-session elapsed time, session span, and the mean duration of the IP's
//! prior sessions. The output is a fully schema-validated table handed to a
//! downstream classifier harness.

pub mod config;
pub mod features;
pub mod storage;
