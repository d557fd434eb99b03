use crate::reformulate::ExpandedQuery;
use crate::tokenizer::normalize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    /// Number of distinct query tokens the document contains.
    pub score: u32,
}

/// Token → documents containing it. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, BTreeSet<DocId>>,
    docs: BTreeSet<DocId>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Index every lowercased token of `text` under `doc_id`.
    pub fn add_document(&mut self, doc_id: DocId, text: &str) {
        for token in normalize(text) {
            self.postings.entry(token).or_default().insert(doc_id);
        }
        self.docs.insert(doc_id);
    }

    pub fn postings(&self, token: &str) -> Option<&BTreeSet<DocId>> {
        self.postings.get(token)
    }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    /// Rank documents by how many of the query tokens they contain.
    ///
    /// Highest score first, ascending document ID among equal scores. Every
    /// document matching at least one token is returned.
    pub fn search_scored<'a, I>(&self, tokens: I) -> Vec<ScoredDoc>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scores: HashMap<DocId, u32> = HashMap::new();
        for token in tokens {
            if let Some(docs) = self.postings.get(token) {
                for &doc_id in docs {
                    *scores.entry(doc_id).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<ScoredDoc> = scores.into_iter().map(|(doc_id, score)| ScoredDoc { doc_id, score }).collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.doc_id.cmp(&b.doc_id)));
        ranked
    }

    pub fn search(&self, query: &ExpandedQuery) -> Vec<DocId> {
        self.search_scored(query.iter()).into_iter().map(|d| d.doc_id).collect()
    }

    /// Lowercase and tokenize `text`, then rank as [`InvertedIndex::search`].
    /// Repeated tokens count once.
    pub fn search_text(&self, text: &str) -> Vec<DocId> {
        let tokens: BTreeSet<String> = normalize(text).into_iter().collect();
        self.search_scored(tokens.iter().map(String::as_str)).into_iter().map(|d| d.doc_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(docs: &[(DocId, &str)]) -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        for (id, text) in docs {
            idx.add_document(*id, text);
        }
        idx
    }

    #[test]
    fn add_is_idempotent_per_token() {
        let mut idx = index(&[(1, "Pizza pizza PIZZA!")]);
        idx.add_document(1, "pizza");
        assert_eq!(idx.postings("pizza").unwrap().len(), 1);
        assert_eq!(idx.num_docs(), 1);
        assert_eq!(idx.num_terms(), 1);
    }

    #[test]
    fn ranks_by_overlap_then_doc_id() {
        let idx = index(&[(3, "best pizza in town"), (1, "pizza and pasta"), (2, "best pizza slices"), (4, "pasta only")]);
        let q: ExpandedQuery = ["best", "pizza", "slices"].into_iter().collect();
        assert_eq!(idx.search(&q), vec![2, 3, 1]);
        let scored = idx.search_scored(q.iter());
        assert_eq!(scored[0], ScoredDoc { doc_id: 2, score: 3 });
        assert_eq!(scored[2], ScoredDoc { doc_id: 1, score: 1 });
    }

    #[test]
    fn equal_scores_resolve_by_ascending_id() {
        let idx = index(&[(9, "coffee shops"), (5, "coffee culture"), (7, "coffee bars")]);
        assert_eq!(idx.search_text("Coffee"), vec![5, 7, 9]);
    }

    #[test]
    fn search_text_counts_repeated_tokens_once() {
        let idx = index(&[(1, "jazz clubs"), (2, "jazz jazz")]);
        assert_eq!(idx.search_text("jazz jazz clubs"), vec![1, 2]);
    }

    #[test]
    fn empty_and_unknown_queries() {
        let idx = index(&[(1, "jazz clubs")]);
        assert!(idx.search(&ExpandedQuery::default()).is_empty());
        assert!(idx.search_text("").is_empty());
        assert!(idx.search_text("opera").is_empty());
    }
}
