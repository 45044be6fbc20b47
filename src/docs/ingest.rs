use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::types::{DocId, Document, DocumentKind};
use super::DocumentSet;

/// Content-addressed id: same content = same id.
pub fn content_id(content: &str) -> DocId {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Add plain text to the collection. Returns (doc_id, size).
/// Idempotent: re-ingesting the same content replaces the earlier entry
/// and keeps its influence/poisoning/exclusion controls.
pub fn ingest_text(
    set: &mut DocumentSet,
    name: &str,
    content: &str,
    kind: DocumentKind,
) -> (DocId, usize) {
    let id = content_id(content);
    let mut doc = Document::new(id.clone(), name, content);
    doc.kind = kind;
    doc.uploaded_at = Some(chrono::Utc::now().timestamp());

    if let Some(existing) = set.get(&id) {
        doc.influence_score = existing.influence_score;
        doc.poisoning_level = existing.poisoning_level;
        doc.excluded = existing.excluded;
    }

    let size = content.len();
    set.upsert(doc);
    info!(doc_id = %id, name, size, kind = ?kind, "document ingested");
    (id, size)
}

/// Ingest a text file from disk. Text extraction from binary formats such as
/// PDF happens upstream; those files are rejected here.
pub async fn ingest_file(set: &mut DocumentSet, path: &Path) -> Result<(DocId, usize)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if extension == "pdf" {
        bail!(
            "PDF documents must be converted to text before ingestion: {}",
            path.display()
        );
    }

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes).to_string();

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    Ok(ingest_text(set, name, &content, DocumentKind::Text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable() {
        assert_eq!(content_id("hello"), content_id("hello"));
        assert_ne!(content_id("hello"), content_id("hello!"));
        assert_eq!(content_id("hello").len(), 64);
    }

    #[test]
    fn test_reingest_keeps_controls() {
        let mut set = DocumentSet::new();
        let (id, size) = ingest_text(&mut set, "quote", "To be or not to be.", DocumentKind::Quote);
        assert_eq!(size, 19);
        set.set_influence(&id, 0.9);
        set.set_excluded(&id, true);

        let (again, _) = ingest_text(&mut set, "quote-2", "To be or not to be.", DocumentKind::Quote);
        assert_eq!(again, id);
        assert_eq!(set.len(), 1);
        let doc = set.get(&id).unwrap();
        assert_eq!(doc.name, "quote-2");
        assert_eq!(doc.influence_score, 0.9);
        assert!(doc.excluded);
        assert!(doc.uploaded_at.is_some());
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Rain fell steadily all day.").unwrap();

        let mut set = DocumentSet::new();
        let (id, size) = ingest_file(&mut set, &path).await.unwrap();
        assert_eq!(size, 27);
        let doc = set.get(&id).unwrap();
        assert_eq!(doc.name, "notes.txt");
        assert_eq!(doc.kind, DocumentKind::Text);
    }

    #[tokio::test]
    async fn test_ingest_pdf_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let mut set = DocumentSet::new();
        assert!(ingest_file(&mut set, &path).await.is_err());
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_missing_file() {
        let mut set = DocumentSet::new();
        let err = ingest_file(&mut set, Path::new("/nonexistent/file.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
