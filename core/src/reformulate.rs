use crate::graph::SimilarityGraph;
use crate::tokenizer::normalize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Related words added per original query token, at most.
pub const MAX_EXPANSIONS_PER_TOKEN: usize = 3;

/// Original query tokens plus the related words the graph contributed.
/// Iterates in ascending lexical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedQuery {
    tokens: BTreeSet<String>,
}

impl ExpandedQuery {
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for ExpandedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(token)?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ExpandedQuery {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self { tokens: iter.into_iter().map(Into::into).collect() }
    }
}

/// Expand `query` with each token's strongest graph neighbors.
///
/// Tokens are visited in query order. Neighbor words are normalized like
/// query text (`U.S.` becomes `us`) before they are compared or added. A
/// neighbor whose normalized form is empty or already present, either in the
/// query or from an earlier token's expansion, is skipped and does not count
/// toward that token's cap.
pub fn reformulate(query: &str, graph: &SimilarityGraph) -> ExpandedQuery {
    let tokens = normalize(query);
    let mut expanded: BTreeSet<String> = tokens.iter().cloned().collect();
    let mut seen: HashSet<String> = tokens.iter().cloned().collect();

    for token in &tokens {
        let Some(neighbors) = graph.neighbors(token) else {
            continue;
        };
        let mut added = 0;
        for similar in neighbors {
            if added == MAX_EXPANSIONS_PER_TOKEN {
                break;
            }
            let fresh: Vec<String> = normalize(&similar.word)
                .into_iter()
                .filter(|t| !seen.contains(t))
                .collect();
            if fresh.is_empty() {
                continue;
            }
            for t in fresh {
                seen.insert(t.clone());
                expanded.insert(t);
            }
            added += 1;
        }
    }

    tracing::debug!(query, original = tokens.len(), expanded = expanded.len(), "query reformulated");
    ExpandedQuery { tokens: expanded }
}
