//! Run lifecycle types shared by the scheduler, the state store and the API

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a started run produces batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One batch per start; the run stops by itself once every packet is
    /// terminal.
    SingleBatch,
    /// A batch immediately, then one per interval until explicitly stopped.
    #[default]
    Recurring,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleBatch => write!(f, "single_batch"),
            Self::Recurring => write!(f, "recurring"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "single_batch" | "single" | "once" => Ok(Self::SingleBatch),
            "recurring" | "continuous" => Ok(Self::Recurring),
            other => Err(format!(
                "unknown run mode '{other}' (expected single_batch or recurring)"
            )),
        }
    }
}

/// Result of a start command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartOutcome {
    Started { mode: RunMode, run: u64 },
    /// A run is in progress; the command was ignored.
    AlreadyRunning,
}

/// Result of a stop command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    /// Nothing was running; the command was a no-op.
    AlreadyStopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_parse() {
        assert_eq!("single-batch".parse::<RunMode>(), Ok(RunMode::SingleBatch));
        assert_eq!("Recurring".parse::<RunMode>(), Ok(RunMode::Recurring));
        assert!("forever".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_outcome_json_shape() {
        let v = serde_json::to_value(StartOutcome::Started { mode: RunMode::SingleBatch, run: 2 })
            .unwrap();
        assert_eq!(v["outcome"], "started");
        assert_eq!(v["mode"], "single_batch");
        assert_eq!(v["run"], 2);
    }
}
