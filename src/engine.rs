use std::time::Duration;

use chrono::prelude::*;
use thiserror::Error;

use crate::config::{ConfigError, TestConfiguration};
use crate::evaluate::{evaluate, ResponseRecord};
use crate::stimulus::{StimulusGenerator, Trial};
use crate::timer::{Clock, MonotonicClock, TrialTimer};

/// Observable phase of a session. Scoring happens inside the transition out
/// of the final AwaitingResponse, so it never shows up here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingResponse,
    Complete,
    Aborted,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("{operation} is not legal in the {phase:?} phase")]
    InvalidState {
        operation: &'static str,
        phase: Phase,
    },
    #[error("response targets trial {given} but trial {current} is pending")]
    StaleTrial { given: usize, current: usize },
}

/// The single notification the engine emits towards the presentation layer:
/// show this trial, and expect an answer within `timeout`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialPresentation {
    pub trial: Trial,
    pub timeout: Duration,
}

/// What a `submit`/`timeout` call advanced the session to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStep {
    Next(TrialPresentation),
    Finished(SessionResult),
}

/// Everything a completed session produced, read-only once handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionResult {
    pub config: TestConfiguration,
    pub records: Vec<ResponseRecord>,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

/// Drives the trial loop: pulls stimuli from the generator, gates each with
/// a trial timer, classifies responses, and yields the result when done.
///
/// Single-threaded and cooperative: every call returns immediately, and the
/// caller's event loop is responsible for firing `timeout` once the trial
/// timer expires. Both `submit` and `timeout` carry the trial index they are
/// aimed at, so a tick racing a just-accepted answer is rejected as stale
/// instead of being applied to the next trial.
pub struct SessionEngine<C: Clock = MonotonicClock> {
    clock: C,
    seed: Option<u64>,
    phase: Phase,
    config: Option<TestConfiguration>,
    generator: Option<StimulusGenerator>,
    current: Option<Trial>,
    timer: Option<TrialTimer>,
    records: Vec<ResponseRecord>,
    started_at: Option<DateTime<Local>>,
}

impl SessionEngine<MonotonicClock> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            seed: None,
            phase: Phase::Idle,
            config: None,
            generator: None,
            current: None,
            timer: None,
            records: Vec::new(),
            started_at: None,
        }
    }

    /// Fix the stimulus sequence; used by tests and reproducible sessions.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> Option<&TestConfiguration> {
        self.config.as_ref()
    }

    pub fn current_trial(&self) -> Option<&Trial> {
        self.current.as_ref()
    }

    /// Records accepted so far; inspectable after an abort too.
    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    /// True once the pending trial has outlived its response window.
    pub fn trial_expired(&self) -> bool {
        matches!(self.phase, Phase::AwaitingResponse)
            && self.timer.map(|t| t.expired(&self.clock)).unwrap_or(false)
    }

    pub fn remaining_ms(&self) -> Option<u64> {
        self.timer.map(|t| t.remaining_ms(&self.clock))
    }

    /// Idle -> AwaitingResponse. Validates the configuration before any
    /// state changes; a rejected config leaves the engine Idle. There is no
    /// implicit reset: starting twice is an error, build a fresh engine.
    pub fn start(
        &mut self,
        config: TestConfiguration,
    ) -> Result<TrialPresentation, EngineError> {
        if self.phase != Phase::Idle {
            return Err(EngineError::InvalidState {
                operation: "start",
                phase: self.phase,
            });
        }
        config.validate()?;

        let mut generator = match self.seed {
            Some(seed) => StimulusGenerator::with_seed(&config, seed),
            None => StimulusGenerator::new(&config),
        };
        let first = generator
            .next()
            .expect("validated config yields at least one trial");

        self.started_at = Some(Local::now());
        self.generator = Some(generator);
        self.timer = Some(TrialTimer::start(&self.clock, config.timeout));
        self.config = Some(config);
        self.current = Some(first.clone());
        self.records.clear();
        self.phase = Phase::AwaitingResponse;

        Ok(self.presentation(first))
    }

    /// Accept the user's answer for the pending trial.
    pub fn submit(&mut self, trial_index: usize, answer: &str) -> Result<SessionStep, EngineError> {
        let trial = self.take_pending("submit", trial_index)?;
        let elapsed_ms = self
            .timer
            .map(|t| t.elapsed_ms(&self.clock))
            .unwrap_or_default();
        let record = evaluate(trial, Some(answer), elapsed_ms, false);
        Ok(self.advance(record))
    }

    /// Record the pending trial as timed out. Fired by the caller's event
    /// loop once the response window elapses; a stale firing aimed at an
    /// already-answered trial is rejected, never applied.
    pub fn timeout(&mut self, trial_index: usize) -> Result<SessionStep, EngineError> {
        let trial = self.take_pending("timeout", trial_index)?;
        // Timed-out trials are booked at the timeout ceiling, and they count
        // towards mean reaction time at that value.
        let elapsed_ms = self
            .config
            .as_ref()
            .map(|c| c.timeout_ms())
            .unwrap_or_default();
        let record = evaluate(trial, None, elapsed_ms, true);
        Ok(self.advance(record))
    }

    /// AwaitingResponse -> Aborted. The pending trial is discarded and its
    /// timer with it; completed records stay inspectable, but no scoring
    /// happens and no result is produced.
    pub fn abort(&mut self) -> Result<(), EngineError> {
        if self.phase != Phase::AwaitingResponse {
            return Err(EngineError::InvalidState {
                operation: "abort",
                phase: self.phase,
            });
        }
        self.current = None;
        self.timer = None;
        self.generator = None;
        self.phase = Phase::Aborted;
        Ok(())
    }

    fn take_pending(
        &mut self,
        operation: &'static str,
        trial_index: usize,
    ) -> Result<Trial, EngineError> {
        if self.phase != Phase::AwaitingResponse {
            return Err(EngineError::InvalidState {
                operation,
                phase: self.phase,
            });
        }
        let current = self
            .current
            .as_ref()
            .expect("AwaitingResponse always has a pending trial");
        if current.index != trial_index {
            return Err(EngineError::StaleTrial {
                given: trial_index,
                current: current.index,
            });
        }
        Ok(self.current.take().unwrap())
    }

    fn advance(&mut self, record: ResponseRecord) -> SessionStep {
        self.records.push(record);

        if let Some(next) = self.generator.as_mut().and_then(|g| g.next()) {
            let timeout = self.config.as_ref().unwrap().timeout;
            self.timer = Some(TrialTimer::start(&self.clock, timeout));
            self.current = Some(next.clone());
            SessionStep::Next(self.presentation(next))
        } else {
            self.timer = None;
            self.generator = None;
            self.phase = Phase::Complete;
            SessionStep::Finished(SessionResult {
                config: self.config.clone().unwrap(),
                records: self.records.clone(),
                started_at: self.started_at.unwrap(),
                ended_at: Local::now(),
            })
        }
    }

    fn presentation(&self, trial: Trial) -> TrialPresentation {
        TrialPresentation {
            trial,
            timeout: self.config.as_ref().unwrap().timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, Variant};
    use crate::evaluate::CapturedAnswer;
    use crate::timer::ManualClock;
    use assert_matches::assert_matches;

    fn engine(trials: usize) -> (SessionEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let mut engine = SessionEngine::with_clock(clock.clone()).seeded(42);
        let mut config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);
        config.trials = trials;
        engine.start(config).unwrap();
        (engine, clock)
    }

    #[test]
    fn start_validates_config_and_stays_idle_on_error() {
        let mut engine = SessionEngine::new();
        let mut config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);
        config.trials = 0;

        let err = engine.start(config).unwrap_err();
        assert_matches!(err, EngineError::Configuration(ConfigError::ZeroTrials));
        assert_eq!(engine.phase(), Phase::Idle);
        assert!(engine.current_trial().is_none());
    }

    #[test]
    fn start_presents_the_first_trial() {
        let mut engine = SessionEngine::new().seeded(1);
        let config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);
        let timeout = config.timeout;

        let presentation = engine.start(config).unwrap();

        assert_eq!(presentation.trial.index, 0);
        assert_eq!(presentation.timeout, timeout);
        assert_eq!(engine.phase(), Phase::AwaitingResponse);
        assert_eq!(engine.current_trial().unwrap().index, 0);
    }

    #[test]
    fn double_start_is_invalid_state() {
        let (mut engine, _clock) = engine(3);
        let config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);

        let err = engine.start(config).unwrap_err();
        assert_matches!(
            err,
            EngineError::InvalidState {
                operation: "start",
                phase: Phase::AwaitingResponse
            }
        );
    }

    #[test]
    fn submit_advances_through_all_trials() {
        let (mut engine, clock) = engine(3);

        for i in 0..3usize {
            clock.advance_ms(200);
            let answer = engine.current_trial().unwrap().expected_answer();
            let step = engine.submit(i, &answer).unwrap();
            match step {
                SessionStep::Next(p) => {
                    assert_eq!(p.trial.index, i + 1);
                    assert!(i < 2);
                }
                SessionStep::Finished(result) => {
                    assert_eq!(i, 2);
                    assert_eq!(result.records.len(), 3);
                    assert!(result.records.iter().all(|r| r.correct));
                    assert!(result.ended_at >= result.started_at);
                }
            }
        }

        assert_eq!(engine.phase(), Phase::Complete);
    }

    #[test]
    fn elapsed_time_is_measured_per_trial() {
        let (mut engine, clock) = engine(2);

        clock.advance_ms(350);
        let step = engine.submit(0, "red").unwrap();
        assert_matches!(step, SessionStep::Next(_));
        assert_eq!(engine.records()[0].elapsed_ms, 350);

        // Timer restarts with the next trial
        clock.advance_ms(125);
        engine.submit(1, "red").unwrap();
        assert_eq!(engine.records()[1].elapsed_ms, 125);
    }

    #[test]
    fn timeout_books_the_ceiling_and_is_incorrect() {
        let (mut engine, clock) = engine(2);

        clock.advance_ms(3000);
        assert!(engine.trial_expired());
        let step = engine.timeout(0).unwrap();

        assert_matches!(step, SessionStep::Next(_));
        let record = &engine.records()[0];
        assert!(!record.correct);
        assert_eq!(record.answer, CapturedAnswer::TimedOut);
        assert_eq!(record.elapsed_ms, 3000);
    }

    #[test]
    fn stale_timeout_after_submit_is_rejected() {
        let (mut engine, clock) = engine(2);

        clock.advance_ms(100);
        engine.submit(0, "red").unwrap();

        // A timeout scheduled for trial 0 fires late, after trial 1 is up
        let err = engine.timeout(0).unwrap_err();
        assert_matches!(err, EngineError::StaleTrial { given: 0, current: 1 });
        assert_eq!(engine.records().len(), 1);
        assert_eq!(engine.current_trial().unwrap().index, 1);
    }

    #[test]
    fn stale_submit_is_rejected_too() {
        let (mut engine, clock) = engine(3);

        clock.advance_ms(3000);
        engine.timeout(0).unwrap();

        let err = engine.submit(0, "red").unwrap_err();
        assert_matches!(err, EngineError::StaleTrial { given: 0, current: 1 });
    }

    #[test]
    fn submit_outside_awaiting_response_is_invalid() {
        let mut engine = SessionEngine::new();
        let err = engine.submit(0, "red").unwrap_err();
        assert_matches!(
            err,
            EngineError::InvalidState {
                operation: "submit",
                phase: Phase::Idle
            }
        );
    }

    #[test]
    fn abort_retains_records_and_skips_scoring() {
        let (mut engine, clock) = engine(5);

        clock.advance_ms(100);
        let answer = engine.current_trial().unwrap().expected_answer();
        engine.submit(0, &answer).unwrap();
        engine.abort().unwrap();

        assert_eq!(engine.phase(), Phase::Aborted);
        assert_eq!(engine.records().len(), 1);
        assert!(engine.current_trial().is_none());
        assert!(!engine.trial_expired());

        // Nothing is legal after an abort; no implicit reset either
        assert_matches!(engine.submit(1, "red"), Err(EngineError::InvalidState { .. }));
        assert_matches!(engine.timeout(1), Err(EngineError::InvalidState { .. }));
        assert_matches!(engine.abort(), Err(EngineError::InvalidState { .. }));
    }

    #[test]
    fn abort_from_idle_is_invalid() {
        let mut engine = SessionEngine::new();
        assert_matches!(
            engine.abort(),
            Err(EngineError::InvalidState {
                operation: "abort",
                phase: Phase::Idle
            })
        );
    }

    #[test]
    fn completed_session_rejects_further_commands() {
        let (mut engine, _clock) = engine(1);
        let answer = engine.current_trial().unwrap().expected_answer();
        let step = engine.submit(0, &answer).unwrap();
        assert_matches!(step, SessionStep::Finished(_));

        assert_matches!(
            engine.submit(0, "red"),
            Err(EngineError::InvalidState {
                operation: "submit",
                phase: Phase::Complete
            })
        );
        assert_matches!(engine.timeout(0), Err(EngineError::InvalidState { .. }));
    }

    #[test]
    fn remaining_ms_tracks_the_pending_trial() {
        let (engine, clock) = engine(1);
        assert_eq!(engine.remaining_ms(), Some(3000));
        clock.advance_ms(1200);
        assert_eq!(engine.remaining_ms(), Some(1800));
    }
}
