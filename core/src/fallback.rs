use crate::documents::DocumentStore;
use crate::index::DocId;
use crate::tokenizer::tokenize;
use std::collections::HashSet;

/// Literal token-overlap matching on the raw query.
///
/// Neither side is lowercased: `NYC` matches `NYC` but not `nyc`. Punctuation
/// is stripped on both sides. A document matches when it shares at least one
/// token with the query; results are in ascending document ID.
pub fn partial_match(raw_query: &str, documents: &DocumentStore) -> Vec<DocId> {
    let query_tokens = tokenize(raw_query);
    if query_tokens.is_empty() {
        return Vec::new();
    }
    documents
        .iter()
        .filter(|(_, text)| {
            let doc_tokens: HashSet<String> = tokenize(text).into_iter().collect();
            query_tokens.iter().any(|t| doc_tokens.contains(t))
        })
        .map(|(doc_id, _)| doc_id)
        .collect()
}
