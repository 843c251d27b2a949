use crate::stimulus::Trial;

/// What the user actually did for one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedAnswer {
    Answered(String),
    TimedOut,
}

impl CapturedAnswer {
    /// Display form used by the results list and CSV export.
    pub fn label(&self) -> &str {
        match self {
            CapturedAnswer::Answered(s) => s,
            CapturedAnswer::TimedOut => "none",
        }
    }
}

/// Outcome of one trial. Created exactly once per trial and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRecord {
    pub trial: Trial,
    pub answer: CapturedAnswer,
    pub elapsed_ms: u64,
    pub correct: bool,
}

/// Case/whitespace normalization applied to both sides of the comparison.
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_uppercase()
}

/// Classify a captured response against the trial's derived expected answer.
/// A timed-out trial is incorrect regardless of any late-arriving answer.
/// Pure function: no side effects, no hidden state.
pub fn evaluate(
    trial: Trial,
    captured: Option<&str>,
    elapsed_ms: u64,
    timed_out: bool,
) -> ResponseRecord {
    if timed_out {
        return ResponseRecord {
            trial,
            answer: CapturedAnswer::TimedOut,
            elapsed_ms,
            correct: false,
        };
    }

    let answer = normalize_answer(captured.unwrap_or(""));
    let correct = answer == normalize_answer(&trial.expected_answer());

    ResponseRecord {
        trial,
        answer: CapturedAnswer::Answered(answer),
        elapsed_ms,
        correct,
    }
}
