use std::time::Duration;

use stroop::color::palette;
use stroop::config::{Difficulty, TestConfiguration, Variant};
use stroop::engine::{SessionEngine, SessionResult, SessionStep};
use stroop::evaluate::CapturedAnswer;
use stroop::export;
use stroop::profile::{JsonProfileStore, ProfileStore};
use stroop::summary::summarize;
use stroop::timer::ManualClock;
use tempfile::tempdir;

// End-to-end checks across the stimulus -> engine -> summary -> storage
// pipeline, driven with a manual clock.

fn run_session<F>(
    variant: Variant,
    difficulty: Difficulty,
    trials: usize,
    seed: u64,
    mut answer: F,
) -> SessionResult
where
    F: FnMut(&stroop::stimulus::Trial) -> String,
{
    let clock = ManualClock::new();
    let mut engine = SessionEngine::with_clock(clock.clone()).seeded(seed);
    let mut config = TestConfiguration::new(variant, difficulty);
    config.trials = trials;
    engine.start(config).unwrap();

    loop {
        clock.advance_ms(300);
        let trial = engine.current_trial().unwrap();
        let (index, response) = (trial.index, answer(trial));
        match engine.submit(index, &response).unwrap() {
            SessionStep::Next(_) => {}
            SessionStep::Finished(result) => return result,
        }
    }
}

#[test]
fn every_variant_and_difficulty_produces_exactly_the_requested_trials() {
    for variant in Variant::ALL {
        for difficulty in Difficulty::ALL {
            let result = run_session(variant, difficulty, 5, 11, |t| t.expected_answer());
            assert_eq!(result.records.len(), 5);
            assert!(result.records.iter().all(|r| r.correct));
            assert!(result
                .records
                .iter()
                .enumerate()
                .all(|(i, r)| r.trial.index == i));
        }
    }
}

#[test]
fn same_seed_yields_the_same_stimulus_sequence() {
    let a = run_session(Variant::Classic, Difficulty::Hard, 8, 99, |t| {
        t.expected_answer()
    });
    let b = run_session(Variant::Classic, Difficulty::Hard, 8, 99, |t| {
        t.expected_answer()
    });

    let stimuli = |r: &SessionResult| {
        r.records
            .iter()
            .map(|rec| (rec.trial.word.clone(), rec.trial.ink))
            .collect::<Vec<_>>()
    };
    assert_eq!(stimuli(&a), stimuli(&b));
}

#[test]
fn reverse_variant_scores_the_word_not_the_ink() {
    let result = run_session(Variant::Reverse, Difficulty::Medium, 6, 3, |t| {
        t.word.clone()
    });
    assert!(result.records.iter().all(|r| r.correct));
}

#[test]
fn wrong_classic_answer_is_marked_incorrect() {
    let result = run_session(Variant::Classic, Difficulty::Easy, 4, 21, |t| {
        // Deliberately answer with a palette color that is not the ink
        palette(Difficulty::Easy)
            .iter()
            .find(|c| c.name() != t.ink.name())
            .unwrap()
            .name()
            .to_string()
    });
    assert!(result.records.iter().all(|r| !r.correct));
    assert!(result
        .records
        .iter()
        .all(|r| matches!(r.answer, CapturedAnswer::Answered(_))));
    assert_eq!(summarize(&result).accuracy, 0.0);
}

#[test]
fn mean_reaction_time_counts_timeouts_at_the_ceiling() {
    let clock = ManualClock::new();
    let mut engine = SessionEngine::with_clock(clock.clone()).seeded(4);
    let mut config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);
    config.trials = 2;
    config.timeout = Duration::from_millis(2000);
    engine.start(config).unwrap();

    clock.advance_ms(500);
    let trial = engine.current_trial().unwrap();
    let (index, answer) = (trial.index, trial.expected_answer());
    engine.submit(index, &answer).unwrap();

    clock.advance_ms(2000);
    let result = match engine.timeout(1).unwrap() {
        SessionStep::Finished(result) => result,
        SessionStep::Next(_) => panic!("two trials were configured"),
    };

    let summary = summarize(&result);
    assert_eq!(summary.accuracy, 50.0);
    assert_eq!(summary.mean_reaction_time_ms, 1250.0);
}

#[test]
fn completed_sessions_accumulate_in_the_profile_store() {
    let dir = tempdir().unwrap();
    let store = JsonProfileStore::with_path(dir.path().join("profiles.json"));

    for seed in [1u64, 2, 3] {
        let result = run_session(Variant::Classic, Difficulty::Easy, 3, seed, |t| {
            t.expected_answer()
        });
        let mut profile = store.load_or_create("ada").unwrap();
        profile.merge(summarize(&result));
        store.save(&profile).unwrap();
    }

    let profile = store.load("ada").unwrap();
    assert_eq!(profile.sessions(), 3);
    assert_eq!(profile.best_accuracy(), Some(100.0));
    assert_eq!(profile.mean_accuracy(), Some(100.0));
    assert_eq!(store.user_names().unwrap(), vec!["ada"]);
}

#[test]
fn csv_export_carries_one_row_per_trial_with_outcomes() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.csv");
    let result = run_session(Variant::Neutral, Difficulty::Medium, 4, 8, |t| {
        t.expected_answer()
    });

    export::export_csv(&path, &result).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 4);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(&row[0], i.to_string().as_str());
        assert_eq!(&row[6], "true");
        // Neutral stimuli draw words from the shape bank, never color names
        assert_ne!(&row[1], &row[2]);
    }
}
