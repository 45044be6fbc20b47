use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How the answer is cut into attribution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Sentence,
    Token,
    /// Sentences first; long sentences left to base knowledge are retried per token.
    #[default]
    Auto,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentence" => Ok(Self::Sentence),
            "token" => Ok(Self::Token),
            "auto" => Ok(Self::Auto),
            other => Err(format!(
                "unknown granularity '{}' (expected sentence, token or auto)",
                other
            )),
        }
    }
}

/// Attribution heuristics. Confidence for a document unit is
/// `min(confidence_cap, confidence_floor + matches / match_saturation * weight)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub granularity: Granularity,
    /// Confidence of a unit no document matched.
    pub base_confidence: f64,
    /// Confidence of a unit whose winning document fell below `min_influence`.
    pub low_influence_confidence: f64,
    pub min_influence: f64,
    pub confidence_floor: f64,
    pub confidence_cap: f64,
    pub match_saturation: f64,
    /// In auto mode, base sentences at least this many chars long are re-run per token.
    pub token_fallback_len: usize,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Auto,
            base_confidence: 0.75,
            low_influence_confidence: 0.65,
            min_influence: 0.1,
            confidence_floor: 0.6,
            confidence_cap: 0.95,
            match_saturation: 5.0,
            token_fallback_len: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermConfig {
    pub min_token_len: usize,
    pub max_terms: usize,
    pub max_phrases: usize,
}

impl Default for TermConfig {
    fn default() -> Self {
        Self {
            min_token_len: 3,
            max_terms: 40,
            max_phrases: 20,
        }
    }
}

/// Trust score = diversity * w_d + base balance * w_b + source count * w_s.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Returned when no document contributed.
    pub neutral_score: f64,
    pub diversity_weight: f64,
    pub balance_weight: f64,
    pub source_count_weight: f64,
    pub variance_scale: f64,
    pub optimal_base_knowledge: f64,
    pub source_count_target: usize,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            neutral_score: 0.5,
            diversity_weight: 0.5,
            balance_weight: 0.3,
            source_count_weight: 0.2,
            variance_scale: 500.0,
            optimal_base_knowledge: 30.0,
            source_count_target: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoisonConfig {
    /// Chance a selected sentence is dropped instead of mutated.
    pub drop_probability: f64,
    /// Chance a selected neutral sentence gets a contradicting clause.
    pub contradiction_probability: f64,
    /// |sentiment| above this counts as polarized.
    pub polarity_threshold: f64,
}

impl Default for PoisonConfig {
    fn default() -> Self {
        Self {
            drop_probability: 0.3,
            contradiction_probability: 0.5,
            polarity_threshold: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub attribution: AttributionConfig,
    pub terms: TermConfig,
    pub trust: TrustConfig,
    pub poison: PoisonConfig,
    /// Fixed seed for poisoning; entropy when unset.
    pub poison_seed: Option<u64>,
    pub generator_timeout_secs: u64,
    /// Compute sentiment, bias and trust for each answer.
    pub analyze: bool,
    /// Memoize document fingerprints across requests.
    pub cache_fingerprints: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            attribution: AttributionConfig::default(),
            terms: TermConfig::default(),
            trust: TrustConfig::default(),
            poison: PoisonConfig::default(),
            poison_seed: None,
            generator_timeout_secs: 60,
            analyze: true,
            cache_fingerprints: true,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `INFLUENCE_*` environment variables (and `.env`).
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(granularity) = env_parse::<Granularity>("INFLUENCE_GRANULARITY") {
            config.attribution.granularity = granularity;
        }
        if let Some(seed) = env_parse::<u64>("INFLUENCE_POISON_SEED") {
            config.poison_seed = Some(seed);
        }
        if let Some(secs) = env_parse::<u64>("INFLUENCE_GENERATOR_TIMEOUT_SECS") {
            config.generator_timeout_secs = secs;
        }
        if let Some(analyze) = env_parse::<bool>("INFLUENCE_ANALYSIS") {
            config.analyze = analyze;
        }
        if let Some(threshold) = env_parse::<f64>("INFLUENCE_MIN_WEIGHT") {
            config.attribution.min_influence = threshold;
        }

        config
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

/// Read and parse an environment variable, ignoring it (with a warning) if malformed.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = dotenv::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granularity_from_str() {
        assert_eq!("Sentence".parse::<Granularity>().unwrap(), Granularity::Sentence);
        assert_eq!(" token ".parse::<Granularity>().unwrap(), Granularity::Token);
        assert_eq!("auto".parse::<Granularity>().unwrap(), Granularity::Auto);
        assert!("paragraph".parse::<Granularity>().is_err());
    }

    #[test]
    fn test_default_trust_weights_sum_to_one() {
        let trust = TrustConfig::default();
        let sum = trust.diversity_weight + trust.balance_weight + trust.source_count_weight;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"poison_seed": 9, "attribution": {"granularity": "sentence"}}"#)
                .unwrap();
        assert_eq!(config.poison_seed, Some(9));
        assert_eq!(config.attribution.granularity, Granularity::Sentence);
        assert_eq!(config.attribution.min_influence, 0.1);
        assert_eq!(config.terms.max_terms, 40);
        assert!(config.analyze);
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("INFLUENCE_GENERATOR_TIMEOUT_SECS", "5");
        std::env::set_var("INFLUENCE_POISON_SEED", "not-a-number");
        let config = PipelineConfig::from_env();
        assert_eq!(config.generator_timeout(), Duration::from_secs(5));
        assert_eq!(config.poison_seed, None);
        std::env::remove_var("INFLUENCE_GENERATOR_TIMEOUT_SECS");
        std::env::remove_var("INFLUENCE_POISON_SEED");
    }
}
