//! Attribution of generated text to base knowledge or to a document.
//!
//! The answer is cut into units (sentences or tokens). Each unit goes to the
//! document whose fingerprint it matches best, scaled by influence weight, or
//! to base knowledge when nothing matches. Units never drop or duplicate
//! characters, so the span texts always concatenate back to the answer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::lexicon::{words, SENTENCE_BREAK_RE, WORD_RE};
use super::terms::Fingerprint;
use crate::config::{AttributionConfig, Granularity};
use crate::docs::types::DocId;
use crate::query::{AttributionSpan, AttributionSummary, DocumentContribution, SpanSource};

/// A weighted document ready for matching.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub doc_id: DocId,
    pub name: String,
    pub weight: f64,
    pub fingerprint: Arc<Fingerprint>,
}

/// Sentence units. Trailing whitespace stays with the sentence before it.
pub fn sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BREAK_RE.find_iter(text) {
        units.push(&text[start..m.end()]);
        start = m.end();
    }
    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

/// Word units. Punctuation and whitespace join the word before them; a
/// leading run joins the first word.
pub fn token_units(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = WORD_RE.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return if text.is_empty() { Vec::new() } else { vec![text] };
    }

    let mut units = Vec::with_capacity(starts.len());
    let mut begin = 0;
    for &next in &starts[1..] {
        units.push(&text[begin..next]);
        begin = next;
    }
    units.push(&text[begin..]);
    units
}

struct IndexedSource<'a> {
    profile: &'a SourceProfile,
    terms: HashSet<&'a str>,
    /// Phrases padded with spaces for whole-token matching.
    phrases: Vec<String>,
}

impl IndexedSource<'_> {
    fn count_matches(&self, unit_terms: &HashSet<&str>, unit_joined: &str) -> usize {
        let term_hits = unit_terms.iter().filter(|t| self.terms.contains(*t)).count();
        let phrase_hits = self
            .phrases
            .iter()
            .filter(|p| unit_joined.contains(p.as_str()))
            .count();
        term_hits + phrase_hits
    }
}

pub struct Attributor<'a> {
    config: &'a AttributionConfig,
    sources: Vec<IndexedSource<'a>>,
}

impl<'a> Attributor<'a> {
    /// `sources` must already be in tie-break order (weight descending).
    pub fn new(sources: &'a [SourceProfile], config: &'a AttributionConfig) -> Self {
        let sources = sources
            .iter()
            .map(|profile| IndexedSource {
                profile,
                terms: profile.fingerprint.terms.iter().map(|t| t.as_str()).collect(),
                phrases: profile
                    .fingerprint
                    .phrases
                    .iter()
                    .map(|p| format!(" {} ", p))
                    .collect(),
            })
            .collect();
        Self { config, sources }
    }

    /// Attribute `text`, merging adjacent units of the same origin.
    pub fn attribute(&self, text: &str) -> Vec<AttributionSpan> {
        let mut spans = Vec::new();

        match self.config.granularity {
            Granularity::Sentence => {
                spans.extend(sentence_units(text).into_iter().map(|u| self.classify(u)));
            }
            Granularity::Token => {
                spans.extend(token_units(text).into_iter().map(|u| self.classify(u)));
            }
            Granularity::Auto => {
                for unit in sentence_units(text) {
                    let span = self.classify(unit);
                    if span.source == SpanSource::Base && unit.len() >= self.config.token_fallback_len {
                        spans.extend(token_units(unit).into_iter().map(|u| self.classify(u)));
                    } else {
                        spans.push(span);
                    }
                }
            }
        }

        merge_adjacent(spans)
    }

    /// Decide the origin of a single unit.
    pub fn classify(&self, unit: &str) -> AttributionSpan {
        let tokens = words(unit);
        if tokens.is_empty() || self.sources.is_empty() {
            return AttributionSpan::base(unit, self.config.base_confidence);
        }
        let unit_terms: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
        let unit_joined = format!(" {} ", tokens.join(" "));

        // (source, matches, score); strict > keeps the earlier source on ties
        let mut best: Option<(&IndexedSource<'_>, usize, f64)> = None;
        for source in &self.sources {
            let matches = source.count_matches(&unit_terms, &unit_joined);
            if matches == 0 {
                continue;
            }
            let score = matches as f64 * source.profile.weight;
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((source, matches, score));
            }
        }

        let Some((winner, matches, _)) = best else {
            return AttributionSpan::base(unit, self.config.base_confidence);
        };

        let weight = winner.profile.weight;
        if weight < self.config.min_influence {
            return AttributionSpan::base(unit, self.config.low_influence_confidence);
        }

        let confidence = (self.config.confidence_floor
            + matches as f64 / self.config.match_saturation * weight)
            .min(self.config.confidence_cap);
        AttributionSpan::document(unit, winner.profile.doc_id.clone(), confidence)
    }
}

/// Merge neighbours with the same origin. Confidence becomes the mean
/// weighted by character count.
pub fn merge_adjacent(spans: Vec<AttributionSpan>) -> Vec<AttributionSpan> {
    let mut merged: Vec<(AttributionSpan, usize)> = Vec::with_capacity(spans.len());

    for span in spans {
        let len = span.text.chars().count();
        match merged.last_mut() {
            Some((last, last_len)) if last.same_origin(&span) => {
                let total = *last_len + len;
                if total > 0 {
                    last.confidence = (last.confidence * *last_len as f64
                        + span.confidence * len as f64)
                        / total as f64;
                }
                last.text.push_str(&span.text);
                *last_len = total;
            }
            _ => merged.push((span, len)),
        }
    }

    merged.into_iter().map(|(span, _)| span).collect()
}

/// Share of answer characters per origin, as rounded percentages.
///
/// Only documents that claimed at least one span are listed, highest first.
/// Each entry is rounded on its own, so the total may miss 100 by up to one
/// point per entry.
pub fn summarize(spans: &[AttributionSpan], sources: &[SourceProfile]) -> AttributionSummary {
    let mut base_chars = 0usize;
    let mut doc_chars: HashMap<&str, usize> = HashMap::new();

    for span in spans {
        let len = span.text.chars().count();
        match (&span.source, &span.document_id) {
            (SpanSource::Document, Some(id)) => *doc_chars.entry(id.as_str()).or_default() += len,
            _ => base_chars += len,
        }
    }

    let total = base_chars + doc_chars.values().sum::<usize>();
    if total == 0 {
        return AttributionSummary::base_only();
    }
    let percent = |chars: usize| (chars as f64 * 100.0 / total as f64).round() as u32;

    let mut documents: Vec<DocumentContribution> = sources
        .iter()
        .filter_map(|source| {
            let chars = *doc_chars.get(source.doc_id.as_str())?;
            Some(DocumentContribution {
                id: source.doc_id.clone(),
                name: source.name.clone(),
                contribution: percent(chars),
            })
        })
        .collect();
    // stable: equal contributions keep source order
    documents.sort_by(|a, b| b.contribution.cmp(&a.contribution));

    AttributionSummary {
        base_knowledge: percent(base_chars),
        documents,
    }
}
