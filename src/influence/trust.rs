//! Aggregate answer metrics: sentiment, bias indicators and a trust score.

use super::lexicon::{Lexicon, SentimentLabel};
use crate::config::TrustConfig;
use crate::query::{AnalysisResult, AttributionSummary};

/// Trust in [0, 1] from how the answer is spread across sources.
///
/// Rewards an even split between documents, a moderate reliance on base
/// knowledge and more distinct sources. With no contributing document the
/// neutral score is returned.
pub fn calculate_trust_score(base_knowledge: f64, contributions: &[f64], config: &TrustConfig) -> f64 {
    if contributions.is_empty() {
        return config.neutral_score;
    }
    let n = contributions.len() as f64;

    let mean = contributions.iter().sum::<f64>() / n;
    let variance = contributions.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    let diversity = (1.0 - variance / config.variance_scale).max(0.0);

    let balance = 1.0 - (base_knowledge - config.optimal_base_knowledge).abs() / 100.0;
    let source_count = (n / config.source_count_target.max(1) as f64).min(1.0);

    let score = diversity * config.diversity_weight
        + balance * config.balance_weight
        + source_count * config.source_count_weight;

    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        config.neutral_score
    }
}

/// Analyze a finished answer.
pub fn analyze(
    text: &str,
    summary: &AttributionSummary,
    lexicon: &Lexicon,
    config: &TrustConfig,
) -> AnalysisResult {
    let sentiment = lexicon.sentiment(text);
    let contributions: Vec<f64> = summary
        .documents
        .iter()
        .map(|d| d.contribution as f64)
        .collect();

    AnalysisResult {
        sentiment,
        sentiment_label: SentimentLabel::from_score(sentiment),
        bias: lexicon.bias(text),
        trust_score: calculate_trust_score(summary.base_knowledge as f64, &contributions, config),
    }
}
