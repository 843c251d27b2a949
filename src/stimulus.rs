use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::color::{palette, InkColor};
use crate::config::{TestConfiguration, Variant};
use crate::words::WordBank;

/// One stimulus: a word rendered in an ink color. The expected answer is
/// always derived from the variant rules, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub index: usize,
    pub word: String,
    pub ink: InkColor,
    pub variant: Variant,
}

impl Trial {
    /// Pure function of (variant, word, ink): Reverse sessions answer with
    /// the word, everything else with the ink color.
    pub fn expected_answer(&self) -> String {
        match self.variant {
            Variant::Reverse => self.word.clone(),
            Variant::Classic | Variant::Neutral | Variant::Emotional => {
                self.ink.name().to_string()
            }
        }
    }

    pub fn is_congruent(&self) -> bool {
        self.word == self.ink.name()
    }
}

/// Lazy, finite sequence of trials for one session. A fresh generator is
/// built per session; it yields exactly `config.trials` items.
pub struct StimulusGenerator {
    variant: Variant,
    palette: &'static [InkColor],
    words: Vec<String>,
    congruent_ratio: f64,
    remaining: usize,
    next_index: usize,
    last: Option<(String, InkColor)>,
    rng: StdRng,
}

impl StimulusGenerator {
    pub fn new(config: &TestConfiguration) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic generator for tests and reproducible sessions.
    pub fn with_seed(config: &TestConfiguration, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &TestConfiguration, rng: StdRng) -> Self {
        let words = match config.variant {
            Variant::Neutral => WordBank::neutral().words,
            Variant::Emotional => WordBank::emotional().words,
            // Classic/Reverse draw words from the palette itself
            Variant::Classic | Variant::Reverse => Vec::new(),
        };

        Self {
            variant: config.variant,
            palette: palette(config.difficulty),
            words,
            congruent_ratio: config.congruent_ratio,
            remaining: config.trials,
            next_index: 0,
            last: None,
            rng,
        }
    }

    fn candidate(&mut self) -> (String, InkColor) {
        match self.variant {
            Variant::Classic | Variant::Reverse => {
                if self.rng.gen_bool(self.congruent_ratio) {
                    // congruent: word names its own ink
                    let ink = *self.palette.choose(&mut self.rng).unwrap();
                    (ink.name().to_string(), ink)
                } else {
                    // incongruent: word and ink must differ
                    let ink = *self.palette.choose(&mut self.rng).unwrap();
                    let word = loop {
                        let w = *self.palette.choose(&mut self.rng).unwrap();
                        if w != ink {
                            break w;
                        }
                    };
                    (word.name().to_string(), ink)
                }
            }
            Variant::Neutral | Variant::Emotional => {
                let word = self.words.choose(&mut self.rng).unwrap().clone();
                let ink = *self.palette.choose(&mut self.rng).unwrap();
                (word, ink)
            }
        }
    }
}

impl Iterator for StimulusGenerator {
    type Item = Trial;

    fn next(&mut self) -> Option<Trial> {
        if self.remaining == 0 {
            return None;
        }

        // Bounded reroll: consecutive trials should not repeat the identical
        // (word, ink) pair. Give up after a few attempts so degenerate
        // configs (single-word bank, tiny palette) still terminate.
        let mut pick = self.candidate();
        for _ in 0..8 {
            if self.last.as_ref() != Some(&pick) {
                break;
            }
            pick = self.candidate();
        }
        self.last = Some(pick.clone());

        let trial = Trial {
            index: self.next_index,
            word: pick.0,
            ink: pick.1,
            variant: self.variant,
        };
        self.next_index += 1;
        self.remaining -= 1;
        Some(trial)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
