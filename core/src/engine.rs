use crate::documents::DocumentStore;
use crate::fallback::partial_match;
use crate::graph::SimilarityGraph;
use crate::index::{DocId, InvertedIndex};
use crate::reformulate::{reformulate, ExpandedQuery};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Hits ranked from the expanded query.
    Ranked,
    /// Ranked search was empty; hits come from raw token overlap.
    PartialMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    /// Overlap score; `None` for partial-match hits.
    pub score: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub expanded: ExpandedQuery,
    pub strategy: MatchStrategy,
    pub hits: Vec<SearchHit>,
}

/// Graph, index and documents wired into the query pipeline.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    graph: SimilarityGraph,
    index: InvertedIndex,
    documents: DocumentStore,
}

impl SearchEngine {
    /// Index every document in `documents`.
    pub fn new(graph: SimilarityGraph, documents: DocumentStore) -> Self {
        let mut index = InvertedIndex::new();
        for (doc_id, text) in documents.iter() {
            index.add_document(doc_id, text);
        }
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "documents indexed");
        Self { graph, index, documents }
    }

    /// Reuse an index built earlier for the same documents.
    pub fn from_parts(graph: SimilarityGraph, index: InvertedIndex, documents: DocumentStore) -> Self {
        Self { graph, index, documents }
    }

    pub fn graph(&self) -> &SimilarityGraph { &self.graph }

    pub fn index(&self) -> &InvertedIndex { &self.index }

    pub fn documents(&self) -> &DocumentStore { &self.documents }

    pub fn replace_graph(&mut self, graph: SimilarityGraph) -> SimilarityGraph {
        std::mem::replace(&mut self.graph, graph)
    }

    pub fn reformulate(&self, raw_query: &str) -> ExpandedQuery {
        reformulate(raw_query, &self.graph)
    }

    /// Reformulate, search, and fall back to partial matching only when the
    /// ranked search finds nothing.
    pub fn run(&self, raw_query: &str) -> QueryOutcome {
        let expanded = self.reformulate(raw_query);
        let ranked = self.index.search_scored(expanded.iter());
        if !ranked.is_empty() {
            let hits = ranked
                .into_iter()
                .filter_map(|d| self.hit(d.doc_id, Some(d.score)))
                .collect();
            return QueryOutcome { expanded, strategy: MatchStrategy::Ranked, hits };
        }

        tracing::debug!(raw_query, "no ranked hits, using partial match");
        let hits = partial_match(raw_query, &self.documents)
            .into_iter()
            .filter_map(|doc_id| self.hit(doc_id, None))
            .collect();
        QueryOutcome { expanded, strategy: MatchStrategy::PartialMatch, hits }
    }

    /// `(doc_id, text)` pairs for `raw_query`, best first.
    pub fn query(&self, raw_query: &str) -> Vec<(DocId, String)> {
        self.run(raw_query).hits.into_iter().map(|h| (h.doc_id, h.text)).collect()
    }

    fn hit(&self, doc_id: DocId, score: Option<u32>) -> Option<SearchHit> {
        let text = self.documents.get(doc_id)?;
        Some(SearchHit { doc_id, score, text: text.to_string() })
    }
}
