//! GloVe-style text embeddings: one `word v1 v2 ... vd` record per line.

use crate::graph::Embeddings;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("line {line}: invalid component {value:?}")]
    InvalidComponent { line: usize, value: String },
    #[error("line {line}: word {word:?} has no components")]
    MissingVector { line: usize, word: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parse embeddings from any buffered reader. Blank lines are skipped; a
/// repeated word keeps its last vector.
pub fn parse_embeddings<R: BufRead>(reader: R) -> Result<Embeddings, EmbeddingError> {
    let mut embeddings = Embeddings::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let mut fields = line.split_ascii_whitespace();
        let Some(word) = fields.next() else { continue };
        let vector = fields
            .map(|v| {
                v.parse::<f32>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| EmbeddingError::InvalidComponent { line: i + 1, value: v.to_string() })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        if vector.is_empty() {
            return Err(EmbeddingError::MissingVector { line: i + 1, word: word.to_string() });
        }
        if embeddings.insert(word.to_string(), vector).is_some() {
            tracing::warn!(word, line = i + 1, "duplicate embedding, keeping the later one");
        }
    }
    Ok(embeddings)
}

pub fn load_embeddings<P: AsRef<Path>>(path: P) -> Result<Embeddings, EmbeddingError> {
    let f = File::open(path.as_ref())?;
    let embeddings = parse_embeddings(BufReader::new(f))?;
    tracing::info!(path = %path.as_ref().display(), words = embeddings.len(), "embeddings loaded");
    Ok(embeddings)
}
