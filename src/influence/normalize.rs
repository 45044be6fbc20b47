use crate::docs::types::Document;

/// An active document paired with its share of the total influence.
#[derive(Debug, Clone)]
pub struct WeightedDocument<'a> {
    pub doc: &'a Document,
    pub weight: f64,
}

/// Turn raw influence scores into weights that sum to 1.
///
/// Excluded documents are dropped. When every remaining score is zero the
/// weight is spread uniformly. The result is sorted by weight descending
/// with ties kept in input order, which is the tie-break order attribution
/// relies on. An empty input yields an empty list.
pub fn normalize_influence(documents: &[Document]) -> Vec<WeightedDocument<'_>> {
    let active: Vec<&Document> = documents.iter().filter(|d| !d.excluded).collect();
    if active.is_empty() {
        return Vec::new();
    }

    let total: f64 = active.iter().map(|d| d.influence_score.max(0.0)).sum();
    let uniform = 1.0 / active.len() as f64;

    let mut weighted: Vec<WeightedDocument<'_>> = active
        .into_iter()
        .map(|doc| WeightedDocument {
            doc,
            weight: if total > 0.0 {
                doc.influence_score.max(0.0) / total
            } else {
                uniform
            },
        })
        .collect();

    // sort_by is stable, so equal weights keep input order
    weighted.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    weighted
}
