use crate::storage::loader::TableKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration loaded from environment variables or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Inactivity gap (seconds) that closes a session — the pipeline's
    /// `duration_between_sessions` parameter (default: 900 = 15 minutes).
    #[serde(default = "default_session_gap_secs")]
    pub session_gap_secs: u32,
    /// Click log to ingest (.csv or .parquet).
    #[serde(default)]
    pub input_path: Option<PathBuf>,
    /// Whether the input carries the training label or a submission id.
    #[serde(default = "default_input_kind")]
    pub input_kind: InputKind,
    /// Where the derived feature table is written.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Epoch override in epoch milliseconds. Set this to a training run's
    /// reported epoch when deriving an evaluation table that must share the
    /// same zero point; unset, the input's own minimum click_time is used.
    #[serde(default)]
    pub epoch_ms: Option<i64>,
}

/// Input table shape, as written in config ("train" / "test").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Train,
    Test,
}

impl InputKind {
    pub const fn table_kind(self) -> TableKind {
        match self {
            Self::Train => TableKind::Train,
            Self::Test => TableKind::Test,
        }
    }
}

const fn default_session_gap_secs() -> u32 {
    900
}

const fn default_input_kind() -> InputKind {
    InputKind::Train
}

fn default_output_path() -> PathBuf {
    PathBuf::from("features.parquet")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_gap_secs: default_session_gap_secs(),
            input_path: None,
            input_kind: default_input_kind(),
            output_path: default_output_path(),
            epoch_ms: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults.
    ///
    /// Environment variables override file values:
    /// - `CLICKFEAT_SESSION_GAP` → session_gap_secs
    /// - `CLICKFEAT_INPUT` → input_path
    /// - `CLICKFEAT_INPUT_KIND` → input_kind ("train" / "test")
    /// - `CLICKFEAT_OUTPUT` → output_path
    /// - `CLICKFEAT_EPOCH_MS` → epoch_ms
    pub fn load(config_path: Option<&Path>) -> Self {
        let mut config =
            config_path.map_or_else(Self::default, |path| match std::fs::read_to_string(path) {
                Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file: {e}, using defaults");
                    Self::default()
                }),
                Err(e) => {
                    tracing::warn!("Failed to read config file: {e}, using defaults");
                    Self::default()
                }
            });

        // Environment variable overrides
        if let Ok(gap) = std::env::var("CLICKFEAT_SESSION_GAP") {
            if let Ok(g) = gap.parse() {
                config.session_gap_secs = g;
            }
        }
        if let Ok(input) = std::env::var("CLICKFEAT_INPUT") {
            config.input_path = Some(PathBuf::from(input));
        }
        if let Ok(kind) = std::env::var("CLICKFEAT_INPUT_KIND") {
            match kind.to_lowercase().as_str() {
                "train" => config.input_kind = InputKind::Train,
                "test" => config.input_kind = InputKind::Test,
                other => tracing::warn!(kind = other, "Unknown input kind, keeping current"),
            }
        }
        if let Ok(output) = std::env::var("CLICKFEAT_OUTPUT") {
            config.output_path = PathBuf::from(output);
        }
        if let Ok(epoch) = std::env::var("CLICKFEAT_EPOCH_MS") {
            if let Ok(e) = epoch.parse() {
                config.epoch_ms = Some(e);
            }
        }

        config
    }
}
