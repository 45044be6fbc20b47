//! Simulated data poisoning.
//!
//! Each sentence is independently selected for corruption with probability
//! equal to the poisoning level. Selected sentences are either dropped or have
//! their polarity inverted. Randomness comes from an owned [`StdRng`] so tests
//! can pin a seed.

use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::{Captures, Regex};

use super::lexicon::{Lexicon, SENTENCE_BREAK_RE};
use crate::config::PoisonConfig;

static COPULA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(is|are|was|were)(\s+not)?\b").unwrap());

const ANTONYMS: &[(&str, &str)] = &[
    ("good", "bad"),
    ("excellent", "terrible"),
    ("beautiful", "ugly"),
    ("happy", "sad"),
    ("great", "awful"),
    ("wonderful", "dreadful"),
    ("love", "hate"),
    ("best", "worst"),
    ("amazing", "horrible"),
    ("delightful", "miserable"),
];

static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(ANTONYMS.iter().map(|p| p.0)));
static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| word_alternation(ANTONYMS.iter().map(|p| p.1)));

const CONTRADICTION: &str = "However, this is not entirely accurate.";

fn word_alternation<'a>(words: impl Iterator<Item = &'a str>) -> Regex {
    let alternation = words.collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)\b({})\b", alternation)).unwrap()
}

/// Split on sentence-final punctuation followed by whitespace. The
/// punctuation stays with its sentence, the whitespace is discarded.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK_RE.find_iter(text) {
        // the punctuation is a single ASCII byte
        sentences.push(&text[start..m.start() + 1]);
        start = m.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Copy the capitalization of the first letter of `original` onto `replacement`.
fn match_case(original: &str, replacement: &str) -> String {
    let starts_upper = original.chars().next().is_some_and(|c| c.is_uppercase());
    if !starts_upper {
        return replacement.to_string();
    }
    let mut chars = replacement.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn swap_words(sentence: &str, pattern: &Regex, positive_to_negative: bool) -> String {
    pattern
        .replace_all(sentence, |caps: &Captures| {
            let word = &caps[1];
            let lower = word.to_lowercase();
            let swapped = ANTONYMS
                .iter()
                .find_map(|(pos, neg)| {
                    if positive_to_negative && *pos == lower {
                        Some(*neg)
                    } else if !positive_to_negative && *neg == lower {
                        Some(*pos)
                    } else {
                        None
                    }
                })
                .unwrap_or(word);
            match_case(word, swapped)
        })
        .into_owned()
}

/// "is" → "is not"; an already negated copula is left alone.
fn negate_copulas(sentence: &str) -> String {
    COPULA_RE
        .replace_all(sentence, |caps: &Captures| {
            if caps.get(2).is_some() {
                caps[0].to_string()
            } else {
                format!("{} not", &caps[1])
            }
        })
        .into_owned()
}

/// "is not" → "is".
fn strip_copula_negation(sentence: &str) -> String {
    COPULA_RE
        .replace_all(sentence, |caps: &Captures| caps[1].to_string())
        .into_owned()
}

/// Sentence counts for one poisoning pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoisonOutcome {
    pub content: String,
    pub kept: usize,
    pub mutated: usize,
    pub dropped: usize,
}

impl PoisonOutcome {
    pub fn total(&self) -> usize {
        self.kept + self.mutated + self.dropped
    }

    /// Fraction of sentences that were mutated or dropped.
    pub fn altered_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.mutated + self.dropped) as f64 / total as f64
        }
    }
}

pub struct ContentPoisoner {
    rng: StdRng,
    config: PoisonConfig,
}

impl ContentPoisoner {
    /// Reproducible poisoner for tests and replays.
    pub fn seeded(seed: u64, config: PoisonConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
        }
    }

    pub fn from_entropy(config: PoisonConfig) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            config,
        }
    }

    pub fn poison(&mut self, text: &str, level: f64, lexicon: &Lexicon) -> String {
        self.poison_with_report(text, level, lexicon).content
    }

    /// Corrupt `text` at poisoning `level` in [0, 1].
    ///
    /// Level 0 (or any non-positive or non-finite level) returns the input
    /// untouched. Otherwise surviving sentences are rejoined with single
    /// spaces in their original order.
    pub fn poison_with_report(&mut self, text: &str, level: f64, lexicon: &Lexicon) -> PoisonOutcome {
        if !level.is_finite() || level <= 0.0 {
            return PoisonOutcome {
                content: text.to_string(),
                kept: split_sentences(text).len(),
                ..Default::default()
            };
        }
        let level = level.min(1.0);

        let mut outcome = PoisonOutcome::default();
        let mut output: Vec<String> = Vec::new();

        for sentence in split_sentences(text) {
            if self.rng.gen::<f64>() >= level {
                outcome.kept += 1;
                output.push(sentence.to_string());
                continue;
            }

            if self.rng.gen::<f64>() < self.config.drop_probability {
                outcome.dropped += 1;
                continue;
            }

            match self.mutate(sentence, lexicon) {
                Some(mutated) => {
                    outcome.mutated += 1;
                    output.push(mutated);
                }
                None => {
                    outcome.kept += 1;
                    output.push(sentence.to_string());
                }
            }
        }

        outcome.content = output.join(" ");
        outcome
    }

    /// Invert the sentence's polarity. Returns `None` when a neutral sentence
    /// was selected but left as is.
    fn mutate(&mut self, sentence: &str, lexicon: &Lexicon) -> Option<String> {
        let sentiment = lexicon.sentiment(sentence);
        let threshold = self.config.polarity_threshold;

        if sentiment > threshold {
            let negated = negate_copulas(sentence);
            Some(swap_words(&negated, &POSITIVE_RE, true))
        } else if sentiment < -threshold {
            let affirmed = strip_copula_negation(sentence);
            Some(swap_words(&affirmed, &NEGATIVE_RE, false))
        } else if self.rng.gen::<f64>() < self.config.contradiction_probability {
            Some(format!("{} {}", sentence, CONTRADICTION))
        } else {
            None
        }
    }
}
