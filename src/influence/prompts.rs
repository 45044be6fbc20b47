use super::normalize::WeightedDocument;

pub const SYSTEM_PROMPT: &str = "You are an assistant that answers questions based on the provided documents. \
For each response, you must consider the influence weight of each document. \
Documents with higher influence weights should have more impact on your response. \
Your response should reflect the writing style, tone, and themes of the weighted documents. \
If creating a story, mimic the narrative style of the most influential documents.";

/// System prompt listing documents in weight order with their influence
/// as a percentage. Poisoned documents carry a note with their level.
pub fn build_system_prompt(documents: &[WeightedDocument<'_>]) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT);

    for (i, weighted) in documents.iter().enumerate() {
        let doc = weighted.doc;
        let note = if doc.is_poisoned() {
            format!(
                "[Note: This document has a simulated poisoning level of {}] ",
                doc.poisoning_level
            )
        } else {
            String::new()
        };
        prompt.push_str(&format!(
            "\n\nDocument {} ({}, Influence: {:.1}%): {}{}",
            i + 1,
            doc.name,
            weighted.weight * 100.0,
            note,
            doc.content
        ));
    }

    prompt
}
