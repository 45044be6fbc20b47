use serde::{Deserialize, Serialize};

/// Opaque document identifier. Ingested documents use a blake3 content hash.
pub type DocId = String;

pub const DEFAULT_INFLUENCE: f64 = 0.5;

fn default_influence() -> f64 {
    DEFAULT_INFLUENCE
}

/// How the document entered the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    #[default]
    Text,
    /// Free text pasted by the user rather than uploaded as a file.
    Quote,
}

/// A reference document together with the user's weighting controls.
///
/// Optional controls are resolved to their defaults at deserialization:
/// influence 0.5, no poisoning, not excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocId,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: DocumentKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default = "default_influence")]
    pub influence_score: f64,
    #[serde(default)]
    pub poisoning_level: f64,
    #[serde(default)]
    pub excluded: bool,
    /// Unix timestamp of ingestion, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<i64>,
}

impl Document {
    pub fn new(id: impl Into<DocId>, name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            name: name.into(),
            kind: DocumentKind::Text,
            size: Some(content.len()),
            content,
            influence_score: DEFAULT_INFLUENCE,
            poisoning_level: 0.0,
            excluded: false,
            uploaded_at: None,
        }
    }

    pub fn with_influence(mut self, influence: f64) -> Self {
        self.influence_score = influence;
        self
    }

    pub fn with_poisoning(mut self, level: f64) -> Self {
        self.poisoning_level = level;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoning_level > 0.0
    }
}
