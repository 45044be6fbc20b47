//! Salient term and phrase extraction ("fingerprints") used to match answer
//! text back to documents.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::lexicon::{words, Lexicon};
use crate::config::TermConfig;
use crate::docs::types::DocId;

/// Upper bound on cached fingerprints before the cache is reset.
const MAX_CACHED: usize = 1024;

/// A document's most frequent terms followed by its most frequent phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    pub terms: Vec<String>,
    pub phrases: Vec<String>,
}

impl Fingerprint {
    /// Terms first, then phrases.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .chain(self.phrases.iter())
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.terms.len() + self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.phrases.is_empty()
    }
}

fn qualifies(token: &str, lexicon: &Lexicon, config: &TermConfig) -> bool {
    token.chars().count() >= config.min_token_len
        && !token.contains('\'')
        && !lexicon.is_stop_word(token)
}

/// Keep the `limit` most frequent keys; ties go to the key seen first.
fn top_by_frequency(counts: HashMap<String, (usize, usize)>, limit: usize) -> Vec<String> {
    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(key, (count, first))| (key, count, first))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked.truncate(limit);
    ranked.into_iter().map(|(key, _, _)| key).collect()
}

/// Extract a document's fingerprint in one pass over its tokens.
///
/// Tokens shorter than `min_token_len`, stopwords and contractions are
/// skipped. Phrases are bigrams and trigrams of consecutive qualifying tokens.
pub fn extract_terms(content: &str, lexicon: &Lexicon, config: &TermConfig) -> Fingerprint {
    let tokens = words(content);
    let keep: Vec<bool> = tokens
        .iter()
        .map(|t| qualifies(t, lexicon, config))
        .collect();

    let mut term_counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (i, token) in tokens.iter().enumerate() {
        if keep[i] {
            term_counts.entry(token.clone()).or_insert((0, i)).0 += 1;
        }
    }

    let mut phrase_counts: HashMap<String, (usize, usize)> = HashMap::new();
    for n in 2..=3 {
        for start in 0..tokens.len().saturating_sub(n - 1) {
            if keep[start..start + n].iter().all(|k| *k) {
                let phrase = tokens[start..start + n].join(" ");
                let seen = phrase_counts.len();
                phrase_counts.entry(phrase).or_insert((0, seen)).0 += 1;
            }
        }
    }

    Fingerprint {
        terms: top_by_frequency(term_counts, config.max_terms),
        phrases: top_by_frequency(phrase_counts, config.max_phrases),
    }
}

/// Memoizes fingerprints by document id and content hash, so edited
/// content under the same id is re-extracted.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: RwLock<HashMap<(DocId, blake3::Hash), Arc<Fingerprint>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_extract(
        &self,
        doc_id: &str,
        content: &str,
        lexicon: &Lexicon,
        config: &TermConfig,
    ) -> Arc<Fingerprint> {
        let key = (doc_id.to_string(), blake3::hash(content.as_bytes()));

        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(&key) {
                return hit.clone();
            }
        }

        let fingerprint = Arc::new(extract_terms(content, lexicon, config));
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= MAX_CACHED {
                debug!(size = entries.len(), "fingerprint cache full, clearing");
                entries.clear();
            }
            entries.insert(key, fingerprint.clone());
        }
        fingerprint
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(content: &str) -> Fingerprint {
        extract_terms(content, Lexicon::builtin(), &TermConfig::default())
    }

    #[test]
    fn test_simple_sentence() {
        let fp = extract("Magic wands glow brightly.");
        assert_eq!(fp.terms, vec!["magic", "wands", "glow", "brightly"]);
        assert_eq!(
            fp.phrases,
            vec![
                "magic wands",
                "wands glow",
                "glow brightly",
                "magic wands glow",
                "wands glow brightly"
            ]
        );
        assert_eq!(fp.len(), 9);
    }

    #[test]
    fn test_frequency_ranking() {
        let fp = extract("Owls hunt. Owls sleep. Mice hide from owls. Mice run.");
        assert_eq!(fp.terms[0], "owls");
        assert_eq!(fp.terms[1], "mice");
        assert_eq!(fp.terms[2], "hunt");
    }

    #[test]
    fn test_stopwords_and_short_tokens_dropped() {
        let fp = extract("It is on the way to the sea and we don't know.");
        assert_eq!(fp.terms, vec!["way", "sea", "know"]);
        assert!(fp.phrases.is_empty());
    }

    #[test]
    fn test_phrases_need_consecutive_qualifying_tokens() {
        let fp = extract("dragon and castle");
        assert_eq!(fp.terms, vec!["dragon", "castle"]);
        assert!(fp.phrases.is_empty());
    }

    #[test]
    fn test_limits() {
        let config = TermConfig {
            min_token_len: 3,
            max_terms: 2,
            max_phrases: 1,
        };
        let fp = extract_terms("alpha beta gamma delta", Lexicon::builtin(), &config);
        assert_eq!(fp.terms, vec!["alpha", "beta"]);
        assert_eq!(fp.phrases, vec!["alpha beta"]);
        assert_eq!(fp.entries().collect::<Vec<_>>(), vec!["alpha", "beta", "alpha beta"]);
    }

    #[test]
    fn test_empty_content() {
        assert!(extract("").is_empty());
        assert!(extract("... !!! ?").is_empty());
    }

    #[test]
    fn test_cache_keyed_by_content() {
        let cache = FingerprintCache::new();
        let lex = Lexicon::builtin();
        let config = TermConfig::default();

        let first = cache.get_or_extract("d1", "Rain fell steadily.", lex, &config);
        let again = cache.get_or_extract("d1", "Rain fell steadily.", lex, &config);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        let edited = cache.get_or_extract("d1", "Snow fell softly.", lex, &config);
        assert!(edited.terms.contains(&"snow".to_string()));
        assert_eq!(cache.len(), 2);
    }
}
