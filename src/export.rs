use std::path::Path;

use crate::engine::SessionResult;

/// Write one CSV row per response record, full per-trial detail. The summary
/// in the profile keeps only aggregates; this is the raw session data.
pub fn export_csv<P: AsRef<Path>>(path: P, result: &SessionResult) -> csv::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "trial", "word", "ink", "expected", "answer", "elapsed_ms", "correct",
    ])?;

    for record in &result.records {
        writer.write_record([
            record.trial.index.to_string(),
            record.trial.word.clone(),
            record.trial.ink.name().to_string(),
            record.trial.expected_answer(),
            record.answer.label().to_string(),
            record.elapsed_ms.to_string(),
            record.correct.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Default export file name for a result, derived from its end timestamp.
pub fn default_file_name(result: &SessionResult) -> String {
    format!(
        "session_{}.csv",
        result.ended_at.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Difficulty, TestConfiguration, Variant};
    use crate::engine::{SessionEngine, SessionStep};
    use crate::timer::ManualClock;
    use tempfile::tempdir;

    fn completed_session() -> SessionResult {
        let clock = ManualClock::new();
        let mut engine = SessionEngine::with_clock(clock.clone()).seeded(5);
        let mut config = TestConfiguration::new(Variant::Classic, Difficulty::Easy);
        config.trials = 3;
        engine.start(config).unwrap();

        loop {
            clock.advance_ms(300);
            let trial = engine.current_trial().unwrap();
            let (index, answer) = (trial.index, trial.expected_answer());
            match engine.submit(index, &answer).unwrap() {
                SessionStep::Next(_) => {}
                SessionStep::Finished(result) => return result,
            }
        }
    }

    #[test]
    fn export_writes_header_and_one_row_per_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.csv");
        let result = completed_session();

        export_csv(&path, &result).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1 + result.records.len());
        assert_eq!(lines[0], "trial,word,ink,expected,answer,elapsed_ms,correct");
        assert!(lines[1].starts_with("0,"));
        assert!(lines[1].ends_with(",true"));
    }

    #[test]
    fn export_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("session.csv");

        export_csv(&path, &completed_session()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_file_name_carries_timestamp() {
        let result = completed_session();
        let name = default_file_name(&result);
        assert!(name.starts_with("session_"));
        assert!(name.ends_with(".csv"));
    }
}
