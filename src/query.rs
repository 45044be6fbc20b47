//! Plain data contract between callers and the pipeline.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::docs::types::{DocId, Document};
use crate::error::PipelineError;
use crate::influence::lexicon::SentimentLabel;

/// A question plus the documents that should shape the answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    pub documents: Vec<Document>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            query: query.into(),
            documents,
        }
    }

    /// Reject malformed shapes before any processing.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.query.trim().is_empty() {
            return Err(PipelineError::invalid_input("query must not be empty"));
        }

        let mut seen = HashSet::new();
        for doc in &self.documents {
            if doc.id.trim().is_empty() {
                return Err(PipelineError::invalid_input(format!(
                    "document '{}' has an empty id",
                    doc.name
                )));
            }
            if !seen.insert(doc.id.as_str()) {
                return Err(PipelineError::invalid_input(format!(
                    "duplicate document id: {}",
                    doc.id
                )));
            }
            check_unit("influenceScore", &doc.id, doc.influence_score)?;
            check_unit("poisoningLevel", &doc.id, doc.poisoning_level)?;
        }
        Ok(())
    }

    pub fn active_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter().filter(|d| !d.excluded)
    }
}

fn check_unit(field: &str, doc_id: &str, value: f64) -> Result<(), PipelineError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(PipelineError::invalid_input(format!(
            "{} of document {} must be within [0, 1], got {}",
            field, doc_id, value
        )));
    }
    Ok(())
}

/// Where a span of the answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanSource {
    Base,
    Document,
}

/// A contiguous slice of the generated answer and its attributed origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionSpan {
    pub text: String,
    pub source: SpanSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<DocId>,
    pub confidence: f64,
}

impl AttributionSpan {
    pub fn base(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            source: SpanSource::Base,
            document_id: None,
            confidence,
        }
    }

    pub fn document(text: impl Into<String>, document_id: impl Into<DocId>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            source: SpanSource::Document,
            document_id: Some(document_id.into()),
            confidence,
        }
    }

    /// Spans merge when they share source and document.
    pub fn same_origin(&self, other: &AttributionSpan) -> bool {
        self.source == other.source && self.document_id == other.document_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContribution {
    pub id: DocId,
    pub name: String,
    /// Percentage of the answer attributed to this document, 0-100.
    pub contribution: u32,
}

/// Aggregate split of the answer between base knowledge and documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributionSummary {
    pub base_knowledge: u32,
    pub documents: Vec<DocumentContribution>,
}

impl AttributionSummary {
    pub fn base_only() -> Self {
        Self {
            base_knowledge: 100,
            documents: Vec::new(),
        }
    }

    pub fn total(&self) -> u32 {
        self.base_knowledge + self.documents.iter().map(|d| d.contribution).sum::<u32>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub sentiment: f64,
    pub sentiment_label: SentimentLabel,
    pub bias: BTreeMap<String, f64>,
    pub trust_score: f64,
}

/// How the answer text was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// The external generator answered.
    Generated,
    /// The generator failed or timed out; the template fallback answered.
    Fallback,
    /// No active documents; the fixed notice was returned.
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResponse {
    pub content: String,
    pub attributions: Vec<AttributionSpan>,
    pub attribution_data: AttributionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    pub generation_mode: GenerationMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document::new(id, id, "content")
    }

    #[test]
    fn test_validate_ok() {
        let req = QueryRequest::new("Describe the scene.", vec![doc("d1"), doc("d2")]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_document_list_ok() {
        assert!(QueryRequest::new("anything", vec![]).validate().is_ok());
    }

    #[test]
    fn test_validate_empty_query() {
        let err = QueryRequest::new("   ", vec![doc("d1")]).validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let err = QueryRequest::new("q", vec![doc("d1"), doc("d1")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate document id"));
    }

    #[test]
    fn test_validate_out_of_range() {
        let req = QueryRequest::new("q", vec![doc("d1").with_influence(1.5)]);
        assert!(req.validate().is_err());
        let req = QueryRequest::new("q", vec![doc("d1").with_poisoning(f64::NAN)]);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_zero_influence_is_fine() {
        let req = QueryRequest::new("q", vec![doc("d1").with_influence(0.0)]);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_span_serialization() {
        let base = serde_json::to_value(AttributionSpan::base("Hi. ", 0.75)).unwrap();
        assert_eq!(base["source"], "base");
        assert!(base.get("documentId").is_none());

        let doc = serde_json::to_value(AttributionSpan::document("Magic.", "d1", 0.9)).unwrap();
        assert_eq!(doc["source"], "document");
        assert_eq!(doc["documentId"], "d1");
    }

    #[test]
    fn test_summary_wire_shape() {
        let json = serde_json::to_value(AttributionSummary::base_only()).unwrap();
        assert_eq!(json["baseKnowledge"], 100);
        assert_eq!(json["documents"].as_array().unwrap().len(), 0);
    }
}
