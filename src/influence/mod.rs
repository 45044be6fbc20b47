pub mod fallback;
pub mod lexicon;
pub mod normalize;
pub mod poison;
pub mod prompts;
pub mod spans;
pub mod terms;
pub mod trust;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::docs::types::Document;
use crate::error::PipelineError;
use crate::llm::Generator;
use crate::query::{AttributionSpan, AttributionSummary, GenerationMode, PipelineResponse, QueryRequest};

use fallback::{fallback_answer, NO_DOCUMENTS_MESSAGE};
use lexicon::Lexicon;
use normalize::{normalize_influence, WeightedDocument};
use poison::ContentPoisoner;
use spans::{summarize, Attributor, SourceProfile};
use terms::{extract_terms, FingerprintCache};

/// Runs a query through weighting, poisoning, generation and attribution.
pub struct InfluenceEngine {
    generator: Option<Arc<dyn Generator>>,
    config: PipelineConfig,
    lexicon: Arc<Lexicon>,
    fingerprints: FingerprintCache,
}

impl InfluenceEngine {
    pub fn new(generator: Arc<dyn Generator>, config: PipelineConfig) -> Self {
        Self {
            generator: Some(generator),
            config,
            lexicon: Arc::new(Lexicon::default()),
            fingerprints: FingerprintCache::new(),
        }
    }

    /// An engine that always answers from the template fallback.
    pub fn offline(config: PipelineConfig) -> Self {
        Self {
            generator: None,
            config,
            lexicon: Arc::new(Lexicon::default()),
            fingerprints: FingerprintCache::new(),
        }
    }

    pub fn with_lexicon(mut self, lexicon: Lexicon) -> Self {
        self.lexicon = Arc::new(lexicon);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn respond(&self, request: &QueryRequest) -> Result<PipelineResponse, PipelineError> {
        request.validate()?;

        let active: Vec<Document> = request.active_documents().cloned().collect();
        if active.is_empty() {
            info!(
                excluded = request.documents.len(),
                "No active documents, answering from base knowledge"
            );
            return Ok(Self::empty_response());
        }

        let poisoned = self.poison_documents(active);
        let weighted = normalize_influence(&poisoned);
        info!(
            query_len = request.query.len(),
            documents = weighted.len(),
            "Starting influence query"
        );

        let (content, generation_mode) = self.generate(&request.query, &weighted).await;

        let sources = self.source_profiles(&weighted);
        let attributions = Attributor::new(&sources, &self.config.attribution).attribute(&content);
        let attribution_data = summarize(&attributions, &sources);
        let analysis = self.config.analyze.then(|| {
            trust::analyze(&content, &attribution_data, &self.lexicon, &self.config.trust)
        });

        info!(
            mode = ?generation_mode,
            answer_len = content.len(),
            spans = attributions.len(),
            base_knowledge = attribution_data.base_knowledge,
            "Influence query complete"
        );

        Ok(PipelineResponse {
            content,
            attributions,
            attribution_data,
            analysis,
            generation_mode,
        })
    }

    fn empty_response() -> PipelineResponse {
        PipelineResponse {
            content: NO_DOCUMENTS_MESSAGE.to_string(),
            attributions: vec![AttributionSpan::base(NO_DOCUMENTS_MESSAGE, 1.0)],
            attribution_data: AttributionSummary::base_only(),
            analysis: None,
            generation_mode: GenerationMode::Empty,
        }
    }

    /// Replace each document's content with its poisoned variant. Controls
    /// are kept, so the poisoning level still shows in prompts and notes.
    fn poison_documents(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut poisoner = match self.config.poison_seed {
            Some(seed) => ContentPoisoner::seeded(seed, self.config.poison.clone()),
            None => ContentPoisoner::from_entropy(self.config.poison.clone()),
        };

        documents
            .into_iter()
            .map(|mut doc| {
                if doc.is_poisoned() {
                    let outcome =
                        poisoner.poison_with_report(&doc.content, doc.poisoning_level, &self.lexicon);
                    debug!(
                        doc_id = %doc.id,
                        level = doc.poisoning_level,
                        kept = outcome.kept,
                        mutated = outcome.mutated,
                        dropped = outcome.dropped,
                        "Poisoned document"
                    );
                    doc.content = outcome.content;
                }
                doc
            })
            .collect()
    }

    /// Ask the generator, falling back to the template answer on any failure.
    async fn generate(&self, query: &str, documents: &[WeightedDocument<'_>]) -> (String, GenerationMode) {
        let Some(generator) = &self.generator else {
            return (fallback_answer(query, documents), GenerationMode::Fallback);
        };

        match self.call_generator(generator.as_ref(), query, documents).await {
            Ok(answer) => (answer, GenerationMode::Generated),
            Err(err) => {
                warn!(error = %err, "Using template fallback");
                (fallback_answer(query, documents), GenerationMode::Fallback)
            }
        }
    }

    async fn call_generator(
        &self,
        generator: &dyn Generator,
        query: &str,
        documents: &[WeightedDocument<'_>],
    ) -> Result<String, PipelineError> {
        let timeout = self.config.generator_timeout();
        match tokio::time::timeout(timeout, generator.generate(query, documents)).await {
            Ok(Ok(answer)) if !answer.trim().is_empty() => Ok(answer),
            Ok(Ok(_)) => Err(PipelineError::generator_unavailable("empty answer")),
            Ok(Err(err)) => Err(PipelineError::generator_unavailable(format!("{:#}", err))),
            Err(_) => Err(PipelineError::generator_unavailable(format!(
                "no answer within {}s",
                timeout.as_secs()
            ))),
        }
    }

    fn source_profiles(&self, documents: &[WeightedDocument<'_>]) -> Vec<SourceProfile> {
        documents
            .iter()
            .map(|w| {
                let fingerprint = if self.config.cache_fingerprints {
                    self.fingerprints.get_or_extract(
                        &w.doc.id,
                        &w.doc.content,
                        &self.lexicon,
                        &self.config.terms,
                    )
                } else {
                    Arc::new(extract_terms(&w.doc.content, &self.lexicon, &self.config.terms))
                };
                SourceProfile {
                    doc_id: w.doc.id.clone(),
                    name: w.doc.name.clone(),
                    weight: w.weight,
                    fingerprint,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::config::Granularity;
    use crate::query::SpanSource;

    struct FixedGenerator(&'static str);

    #[async_trait]
    impl Generator for FixedGenerator {
        async fn generate(&self, _query: &str, _documents: &[WeightedDocument<'_>]) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(&self, _query: &str, _documents: &[WeightedDocument<'_>]) -> anyhow::Result<String> {
            anyhow::bail!("connection refused")
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl Generator for SlowGenerator {
        async fn generate(&self, _query: &str, _documents: &[WeightedDocument<'_>]) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    /// Echoes the content it was given, to observe poisoning.
    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(&self, _query: &str, documents: &[WeightedDocument<'_>]) -> anyhow::Result<String> {
            Ok(documents
                .iter()
                .map(|w| w.doc.content.as_str())
                .collect::<Vec<_>>()
                .join(" "))
        }
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.attribution.granularity = Granularity::Sentence;
        config.poison_seed = Some(7);
        config
    }

    fn scene() -> Vec<Document> {
        vec![
            Document::new("d1", "Spellbook", "Magic wands glow brightly.").with_influence(0.8),
            Document::new("d2", "Weather log", "Rain fell steadily all day.").with_influence(0.2),
        ]
    }

    #[tokio::test]
    async fn test_two_document_scene() {
        let engine = InfluenceEngine::new(
            Arc::new(FixedGenerator("Magic wands glow brightly. Rain fell steadily all day.")),
            config(),
        );
        let response = engine
            .respond(&QueryRequest::new("Describe the scene.", scene()))
            .await
            .unwrap();

        assert_eq!(response.generation_mode, GenerationMode::Generated);
        assert_eq!(response.attributions.len(), 2);
        assert_eq!(response.attributions[0].document_id.as_deref(), Some("d1"));
        assert_eq!(response.attributions[1].document_id.as_deref(), Some("d2"));
        assert!(response.attributions.iter().all(|s| s.confidence >= 0.6));

        let joined: String = response.attributions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, response.content);

        let data = &response.attribution_data;
        assert_eq!(data.base_knowledge, 0);
        assert_eq!(data.documents.len(), 2);
        assert!((data.total() as i64 - 100).abs() <= 2);

        let analysis = response.analysis.unwrap();
        assert!((0.0..=1.0).contains(&analysis.trust_score));
    }

    #[tokio::test]
    async fn test_all_excluded_is_empty_response() {
        let docs = scene().into_iter().map(|d| d.excluded()).collect();
        let engine = InfluenceEngine::new(Arc::new(FixedGenerator("unused")), config());
        let response = engine
            .respond(&QueryRequest::new("Anything?", docs))
            .await
            .unwrap();

        assert_eq!(response.generation_mode, GenerationMode::Empty);
        assert_eq!(response.content, NO_DOCUMENTS_MESSAGE);
        assert_eq!(response.attributions.len(), 1);
        assert_eq!(response.attributions[0].source, SpanSource::Base);
        assert_eq!(response.attributions[0].confidence, 1.0);
        assert_eq!(response.attribution_data, AttributionSummary::base_only());
        assert!(response.analysis.is_none());
    }

    #[tokio::test]
    async fn test_no_documents_is_empty_response() {
        let engine = InfluenceEngine::offline(config());
        let response = engine.respond(&QueryRequest::new("Hi", vec![])).await.unwrap();
        assert_eq!(response.generation_mode, GenerationMode::Empty);
        assert_eq!(response.attribution_data.base_knowledge, 100);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let engine = InfluenceEngine::offline(config());
        let err = engine
            .respond(&QueryRequest::new("", scene()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_failing_generator_falls_back() {
        let engine = InfluenceEngine::new(Arc::new(FailingGenerator), config());
        let response = engine
            .respond(&QueryRequest::new("What do the notes say?", scene()))
            .await
            .unwrap();

        assert_eq!(response.generation_mode, GenerationMode::Fallback);
        assert!(response.content.contains("From Spellbook:"));
        let joined: String = response.attributions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(joined, response.content);
        assert!(response
            .attributions
            .iter()
            .any(|s| s.document_id.as_deref() == Some("d1")));
    }

    #[tokio::test]
    async fn test_slow_generator_times_out() {
        let mut config = config();
        config.generator_timeout_secs = 1;
        let engine = InfluenceEngine::new(Arc::new(SlowGenerator), config);
        let response = engine
            .respond(&QueryRequest::new("Tell me a story", scene()))
            .await
            .unwrap();

        assert_eq!(response.generation_mode, GenerationMode::Fallback);
        assert!(response.content.contains("magical golden light"));
    }

    #[tokio::test]
    async fn test_offline_engine_uses_fallback() {
        let engine = InfluenceEngine::offline(config());
        let response = engine
            .respond(&QueryRequest::new("Summarize", scene()))
            .await
            .unwrap();
        assert_eq!(response.generation_mode, GenerationMode::Fallback);
        assert!(response.content.starts_with("Based on the documents"));
    }

    #[tokio::test]
    async fn test_generator_sees_poisoned_content() {
        let mut config = config();
        config.poison.drop_probability = 0.0;
        let engine = InfluenceEngine::new(Arc::new(EchoGenerator), config);
        let docs = vec![Document::new("d1", "Review", "The meal was excellent.").with_poisoning(1.0)];
        let response = engine
            .respond(&QueryRequest::new("How was it?", docs))
            .await
            .unwrap();

        assert_eq!(response.content, "The meal was not terrible.");
        assert!(!response.content.contains("excellent"));
    }

    #[tokio::test]
    async fn test_analysis_can_be_disabled() {
        let mut config = config();
        config.analyze = false;
        let engine = InfluenceEngine::offline(config);
        let response = engine
            .respond(&QueryRequest::new("Summarize", scene()))
            .await
            .unwrap();
        assert!(response.analysis.is_none());
    }

    #[tokio::test]
    async fn test_fingerprints_are_cached() {
        let engine = InfluenceEngine::offline(config());
        let request = QueryRequest::new("Summarize", scene());
        engine.respond(&request).await.unwrap();
        engine.respond(&request).await.unwrap();
        assert_eq!(engine.fingerprints.len(), 2);
    }
}
