//! Semantic query expansion over an exact word-similarity graph, with
//! term-overlap ranking and a literal partial-match fallback.

pub mod documents;
pub mod embeddings;
pub mod engine;
pub mod fallback;
pub mod graph;
pub mod index;
pub mod persist;
pub mod reformulate;
pub mod similarity;
pub mod tokenizer;

pub use documents::DocumentStore;
pub use engine::{MatchStrategy, QueryOutcome, SearchEngine, SearchHit};
pub use graph::{build_graph, Embeddings, GraphConfig, GraphError, SimilarWord, SimilarityGraph, WordEmbedding};
pub use index::{DocId, InvertedIndex, ScoredDoc};
pub use reformulate::{reformulate, ExpandedQuery, MAX_EXPANSIONS_PER_TOKEN};
pub use similarity::{checked_cosine_similarity, cosine_similarity, SimilarityError};
