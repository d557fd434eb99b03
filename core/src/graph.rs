use crate::similarity::cosine_similarity;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;

/// Word → embedding vector, as produced by an embedding source.
pub type Embeddings = BTreeMap<String, Vec<f32>>;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("embedding for {word:?} has {found} dimensions, expected {expected}")]
    DimensionMismatch { word: String, expected: usize, found: usize },
    #[error("embedding for {word:?} is empty")]
    EmptyEmbedding { word: String },
    #[error("embedding for {word:?} contains a non-finite component")]
    NonFiniteComponent { word: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Neighbors kept per word.
    pub top_n: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarWord {
    pub word: String,
    pub score: f32,
}

/// A vocabulary word's vector together with its ranked neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEmbedding {
    pub vector: Vec<f32>,
    /// Score descending, word ascending on ties. Never contains the word itself.
    pub similar_words: Vec<SimilarWord>,
}

/// Per-word top-K cosine neighbor structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityGraph {
    top_n: usize,
    dimension: usize,
    nodes: BTreeMap<String, WordEmbedding>,
}

/// Exact brute-force construction: every word is compared with every other
/// word, O(V² · d). Words are scanned in parallel; each word's neighbor list
/// is computed independently and merged afterwards.
pub fn build_graph(embeddings: &Embeddings, config: &GraphConfig) -> Result<SimilarityGraph, GraphError> {
    let dimension = validate(embeddings)?;
    let start = Instant::now();

    let words: Vec<(&String, &Vec<f32>)> = embeddings.iter().collect();
    let ranked: Vec<(String, WordEmbedding)> = words
        .par_iter()
        .map(|&(word, vector)| {
            let mut candidates: Vec<SimilarWord> = words
                .iter()
                .filter(|(other, _)| *other != word)
                .map(|&(other, other_vector)| SimilarWord {
                    word: other.clone(),
                    score: cosine_similarity(vector, other_vector),
                })
                .collect();
            keep_top(&mut candidates, config.top_n);
            (word.clone(), WordEmbedding { vector: vector.clone(), similar_words: candidates })
        })
        .collect();

    let nodes: BTreeMap<String, WordEmbedding> = ranked.into_iter().collect();
    tracing::info!(
        vocab_size = nodes.len(),
        dimension,
        top_n = config.top_n,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "similarity graph built"
    );
    Ok(SimilarityGraph { top_n: config.top_n, dimension, nodes })
}

fn validate(embeddings: &Embeddings) -> Result<usize, GraphError> {
    let mut expected: Option<usize> = None;
    for (word, vector) in embeddings {
        if vector.is_empty() {
            return Err(GraphError::EmptyEmbedding { word: word.clone() });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(GraphError::NonFiniteComponent { word: word.clone() });
        }
        match expected {
            None => expected = Some(vector.len()),
            Some(dim) if dim != vector.len() => {
                return Err(GraphError::DimensionMismatch { word: word.clone(), expected: dim, found: vector.len() });
            }
            Some(_) => {}
        }
    }
    Ok(expected.unwrap_or(0))
}

fn rank_order(a: &SimilarWord, b: &SimilarWord) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.word.cmp(&b.word))
}

/// Truncate to the `top_n` best entries, leaving them ranked.
fn keep_top(candidates: &mut Vec<SimilarWord>, top_n: usize) {
    if candidates.len() > top_n {
        if top_n > 0 {
            candidates.select_nth_unstable_by(top_n - 1, rank_order);
        }
        candidates.truncate(top_n);
    }
    candidates.sort_by(rank_order);
}

impl SimilarityGraph {
    /// Assemble a graph from externally restored nodes.
    ///
    /// Neighbor lists are re-ranked, stripped of self references and cut to
    /// `top_n`.
    pub fn from_nodes(top_n: usize, nodes: BTreeMap<String, WordEmbedding>) -> Result<Self, GraphError> {
        let vectors: Embeddings = nodes.iter().map(|(w, n)| (w.clone(), n.vector.clone())).collect();
        let dimension = validate(&vectors)?;
        let nodes = nodes
            .into_iter()
            .map(|(word, mut node)| {
                node.similar_words.retain(|s| s.word != word);
                keep_top(&mut node.similar_words, top_n);
                (word, node)
            })
            .collect();
        Ok(Self { top_n, dimension, nodes })
    }

    /// Re-run construction over this graph's own embedding snapshot.
    pub fn rebuild(&self, config: &GraphConfig) -> Result<Self, GraphError> {
        build_graph(&self.embeddings(), config)
    }

    pub fn embeddings(&self) -> Embeddings {
        self.nodes.iter().map(|(w, n)| (w.clone(), n.vector.clone())).collect()
    }

    pub fn get(&self, word: &str) -> Option<&WordEmbedding> {
        self.nodes.get(word)
    }

    pub fn neighbors(&self, word: &str) -> Option<&[SimilarWord]> {
        self.nodes.get(word).map(|n| n.similar_words.as_slice())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.nodes.contains_key(word)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &WordEmbedding)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
