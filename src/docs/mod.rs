pub mod ingest;
pub mod types;

use tracing::debug;

use crate::query::QueryRequest;
use types::Document;

/// The caller-maintained document collection.
///
/// Insertion order is preserved; it is the tie-break order the pipeline sees
/// when two documents carry the same influence.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    docs: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, replacing any existing document with the same id.
    /// Returns true if the id was new.
    pub fn upsert(&mut self, doc: Document) -> bool {
        if let Some(existing) = self.docs.iter_mut().find(|d| d.id == doc.id) {
            debug!(doc_id = %doc.id, "document replaced");
            *existing = doc;
            false
        } else {
            debug!(doc_id = %doc.id, name = %doc.name, "document added");
            self.docs.push(doc);
            true
        }
    }

    pub fn get(&self, doc_id: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == doc_id)
    }

    fn get_mut(&mut self, doc_id: &str) -> Option<&mut Document> {
        self.docs.iter_mut().find(|d| d.id == doc_id)
    }

    /// Remove a document. Returns it if it was present.
    pub fn remove(&mut self, doc_id: &str) -> Option<Document> {
        let pos = self.docs.iter().position(|d| d.id == doc_id)?;
        debug!(doc_id, "document removed");
        Some(self.docs.remove(pos))
    }

    /// Set a document's influence, clamped to [0, 1]. Returns false for unknown ids.
    pub fn set_influence(&mut self, doc_id: &str, influence: f64) -> bool {
        match self.get_mut(doc_id) {
            Some(doc) => {
                doc.influence_score = clamp_unit(influence);
                true
            }
            None => false,
        }
    }

    /// Set a document's poisoning level, clamped to [0, 1].
    pub fn set_poisoning(&mut self, doc_id: &str, level: f64) -> bool {
        match self.get_mut(doc_id) {
            Some(doc) => {
                doc.poisoning_level = clamp_unit(level);
                true
            }
            None => false,
        }
    }

    pub fn set_excluded(&mut self, doc_id: &str, excluded: bool) -> bool {
        match self.get_mut(doc_id) {
            Some(doc) => {
                doc.excluded = excluded;
                true
            }
            None => false,
        }
    }

    /// All documents in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    /// Documents that take part in generation and attribution.
    pub fn active(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter().filter(|d| !d.excluded)
    }

    /// List documents newest first.
    pub fn list(&self, limit: usize) -> Vec<&Document> {
        let mut results: Vec<&Document> = self.docs.iter().collect();
        results.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        results.truncate(limit);
        results
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Snapshot the collection into a pipeline request.
    pub fn to_request(&self, query: impl Into<String>) -> QueryRequest {
        QueryRequest {
            query: query.into(),
            documents: self.docs.clone(),
        }
    }
}

impl FromIterator<Document> for DocumentSet {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let mut set = DocumentSet::new();
        for doc in iter {
            set.upsert(doc);
        }
        set
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocumentSet {
        [
            Document::new("a", "Alpha", "first"),
            Document::new("b", "Beta", "second"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut set = sample();
        assert!(!set.upsert(Document::new("a", "Alpha v2", "changed")));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("a").unwrap().name, "Alpha v2");
        assert_eq!(set.documents()[0].id, "a");
    }

    #[test]
    fn test_updates_clamp_and_report_unknown() {
        let mut set = sample();
        assert!(set.set_influence("a", 1.7));
        assert_eq!(set.get("a").unwrap().influence_score, 1.0);
        assert!(set.set_poisoning("b", -0.2));
        assert_eq!(set.get("b").unwrap().poisoning_level, 0.0);
        assert!(set.set_influence("b", f64::NAN));
        assert_eq!(set.get("b").unwrap().influence_score, 0.0);
        assert!(!set.set_influence("missing", 0.3));
    }

    #[test]
    fn test_exclusion_filters_active() {
        let mut set = sample();
        set.set_excluded("a", true);
        let active: Vec<_> = set.active().map(|d| d.id.as_str()).collect();
        assert_eq!(active, vec!["b"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut set = sample();
        assert_eq!(set.remove("a").unwrap().name, "Alpha");
        assert!(set.remove("a").is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_list_newest_first() {
        let mut set = DocumentSet::new();
        let mut old = Document::new("old", "Old", "x");
        old.uploaded_at = Some(100);
        let mut new = Document::new("new", "New", "y");
        new.uploaded_at = Some(200);
        set.upsert(old);
        set.upsert(new);
        let listed: Vec<_> = set.list(10).iter().map(|d| d.id.clone()).collect();
        assert_eq!(listed, vec!["new", "old"]);
        assert_eq!(set.list(1).len(), 1);
    }

    #[test]
    fn test_to_request_keeps_excluded() {
        let mut set = sample();
        set.set_excluded("b", true);
        let request = set.to_request("What happened?");
        assert_eq!(request.documents.len(), 2);
        assert!(request.documents.iter().any(|d| d.id == "b" && d.excluded));
    }
}
