//! Word-list scoring for sentiment and bias categories.
//!
//! The lists are immutable and built once; scorers borrow a [`Lexicon`] so
//! concurrent requests share it without locking.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words with internal apostrophes kept, so "don't" stays one token.
pub(crate) static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:'\w+)*").unwrap());

/// Sentence-final punctuation followed by whitespace.
pub(crate) static SENTENCE_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

static BUILTIN: LazyLock<Lexicon> = LazyLock::new(Lexicon::default);

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "excellent", "positive", "happy", "joy", "love", "like", "best", "beautiful",
    "wonderful", "amazing", "fantastic", "delightful", "pleased", "glad", "cheerful", "successful",
    "perfect", "impressive", "awesome", "brilliant", "exciting", "thrilled", "fun", "enjoy",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "negative", "sad", "hate", "dislike", "worst", "poor", "horrible",
    "disappointed", "disappointing", "failure", "fail", "unfortunately", "disaster", "tragic",
    "annoying", "miserable", "gloomy", "dreadful", "unhappy", "upset", "angry", "fear", "worried",
    "ugly",
];

const NEGATION_CUES: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "won't", "wouldn't", "couldn't",
    "shouldn't", "isn't", "wasn't", "aren't", "weren't",
];

const GENDER_WORDS: &[&str] = &[
    "he", "she", "man", "woman", "male", "female", "boy", "girl", "masculine", "feminine",
    "gender", "sexist", "patriarchy", "matriarchy", "husband", "wife", "daughter", "son",
    "mother", "father", "sister", "brother",
];

const POLITICAL_WORDS: &[&str] = &[
    "liberal", "conservative", "democrat", "republican", "right", "left", "progressive",
    "government", "policy", "legislation", "regulation", "freedom", "rights", "tax",
    "socialist", "capitalist", "election", "vote", "democracy", "autocracy", "party",
];

const AGE_WORDS: &[&str] = &[
    "young", "old", "elder", "youth", "millennial", "boomer", "generation", "retirement",
    "senior", "student", "teenager", "adult", "child", "adolescent", "mature", "experienced",
];

const ETHNICITY_WORDS: &[&str] = &[
    "white", "black", "asian", "hispanic", "latino", "african", "european", "race", "racial",
    "ethnic", "minority", "diversity", "multicultural", "indigenous", "native", "immigrant",
    "nationality", "heritage", "culture", "background",
];

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "own", "see",
    "two", "who", "did", "get", "let", "put", "say", "she", "too", "use", "what", "which",
    "where", "when", "does", "have", "with", "that", "this", "from", "about", "some", "there",
    "their", "they", "your", "been", "were", "could", "would", "should", "shall", "will",
    "into", "also", "just", "like", "make", "using", "used", "need", "want", "than", "then",
    "them", "these", "those", "very", "really", "more", "most", "only", "such", "each", "other",
    "over", "under", "after", "before", "while", "because", "being", "here", "upon", "between",
    "through", "itself", "himself", "herself", "themselves", "yours", "ours", "whom", "why",
    "both", "few", "same", "nor", "off", "once", "again", "further", "during", "above", "below",
];

/// Lowercased word tokens of `text`.
pub fn words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase().replace('\u{2019}', "'");
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sentiment bucket used for display and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.5 {
            Self::VeryPositive
        } else if score > 0.2 {
            Self::Positive
        } else if score > -0.2 {
            Self::Neutral
        } else if score > -0.5 {
            Self::Negative
        } else {
            Self::VeryNegative
        }
    }
}

/// Sentiment, negation, bias-category and stopword lists.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<String>,
    negative: HashSet<String>,
    negations: HashSet<String>,
    bias_categories: BTreeMap<String, HashSet<String>>,
    stop_words: HashSet<String>,
}

fn set_of(words: &[&str]) -> HashSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for Lexicon {
    fn default() -> Self {
        let bias_categories = [
            ("gender", GENDER_WORDS),
            ("political", POLITICAL_WORDS),
            ("age", AGE_WORDS),
            ("ethnicity", ETHNICITY_WORDS),
        ]
        .into_iter()
        .map(|(name, list)| (name.to_string(), set_of(list)))
        .collect();

        Self {
            positive: set_of(POSITIVE_WORDS),
            negative: set_of(NEGATIVE_WORDS),
            negations: set_of(NEGATION_CUES),
            bias_categories,
            stop_words: set_of(STOP_WORDS),
        }
    }
}

impl Lexicon {
    /// The built-in lists, constructed on first use and shared process-wide.
    pub fn builtin() -> &'static Lexicon {
        &BUILTIN
    }

    /// Add or replace a bias category.
    pub fn with_bias_category(mut self, name: &str, words: &[&str]) -> Self {
        self.bias_categories.insert(name.to_string(), set_of(words));
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// +1 for positive words, -1 for negative words, 0 otherwise.
    pub fn polarity(&self, word: &str) -> i32 {
        if self.positive.contains(word) {
            1
        } else if self.negative.contains(word) {
            -1
        } else {
            0
        }
    }

    /// Lexicon sentiment in [-1, 1].
    ///
    /// A negation cue flips the polarity of the token right after it. The
    /// signed hit count is divided by `max(1, min(words / 20, 5))` so short
    /// and long texts land on a comparable scale, then clamped to [-1, 1].
    pub fn sentiment(&self, text: &str) -> f64 {
        let tokens = words(text);
        if tokens.is_empty() {
            return 0.0;
        }

        let mut score = 0i32;
        let mut negate = false;
        for token in &tokens {
            if self.negations.contains(token) {
                negate = true;
                continue;
            }
            let polarity = self.polarity(token);
            score += if negate { -polarity } else { polarity };
            negate = false;
        }

        let denom = (tokens.len() as f64 / 20.0).min(5.0).max(1.0);
        (score as f64 / denom).clamp(-1.0, 1.0)
    }

    /// Per-category bias indicator in [0, 1]: `min(1, hits / max(1, words / 50))`.
    pub fn bias(&self, text: &str) -> BTreeMap<String, f64> {
        let tokens = words(text);
        let denom = (tokens.len() as f64 / 50.0).max(1.0);

        self.bias_categories
            .iter()
            .map(|(category, list)| {
                let hits = tokens.iter().filter(|t| list.contains(t.as_str())).count();
                (category.clone(), (hits as f64 / denom).min(1.0))
            })
            .collect()
    }
}
