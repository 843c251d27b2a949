use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, Variant};
use crate::engine::SessionResult;
use crate::util::mean;

/// Aggregate stats for one completed session, the unit stored in a user's
/// history. Field set matches the profile-file schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub timestamp: DateTime<Local>,
    pub variant: Variant,
    pub difficulty: Difficulty,
    pub accuracy: f64,
    pub mean_reaction_time_ms: f64,
}

/// Fold a session's records into a summary. Deterministic, no I/O.
///
/// Mean reaction time is taken over every record, with timed-out trials
/// counted at the timeout ceiling their records were booked with.
pub fn summarize(result: &SessionResult) -> SessionSummary {
    let total = result.records.len();
    let correct = result.records.iter().filter(|r| r.correct).count();
    let accuracy = if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    };

    let times: Vec<f64> = result.records.iter().map(|r| r.elapsed_ms as f64).collect();
    let mean_reaction_time_ms = mean(&times).unwrap_or(0.0);

    SessionSummary {
        timestamp: result.ended_at,
        variant: result.config.variant,
        difficulty: result.config.difficulty,
        accuracy,
        mean_reaction_time_ms,
    }
}

/// Qualitative rating shown on the results screen, derived from accuracy and
/// mean reaction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Rating {
    Excellent,
    #[strum(to_string = "Very Good")]
    VeryGood,
    Good,
    Fair,
    #[strum(to_string = "Needs Improvement")]
    NeedsImprovement,
}

impl Rating {
    pub fn of(accuracy: f64, mean_reaction_time_ms: f64) -> Self {
        let secs = mean_reaction_time_ms / 1000.0;
        if accuracy >= 90.0 && secs <= 1.5 {
            Rating::Excellent
        } else if accuracy >= 80.0 && secs <= 2.0 {
            Rating::VeryGood
        } else if accuracy >= 70.0 && secs <= 2.5 {
            Rating::Good
        } else if accuracy >= 60.0 && secs <= 3.0 {
            Rating::Fair
        } else {
            Rating::NeedsImprovement
        }
    }
}

impl SessionSummary {
    pub fn rating(&self) -> Rating {
        Rating::of(self.accuracy, self.mean_reaction_time_ms)
    }
}
