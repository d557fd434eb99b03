use crate::index::DocId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable document bodies keyed by ID, iterated in ID order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStore {
    docs: BTreeMap<DocId, String>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Returns `false` and keeps the existing body if `doc_id` is taken.
    pub fn insert(&mut self, doc_id: DocId, text: impl Into<String>) -> bool {
        if self.docs.contains_key(&doc_id) {
            return false;
        }
        self.docs.insert(doc_id, text.into());
        true
    }

    pub fn get(&self, doc_id: DocId) -> Option<&str> {
        self.docs.get(&doc_id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &str)> {
        self.docs.iter().map(|(id, text)| (*id, text.as_str()))
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }
}

impl<S: Into<String>> FromIterator<(DocId, S)> for DocumentStore {
    fn from_iter<I: IntoIterator<Item = (DocId, S)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (doc_id, text) in iter {
            store.insert(doc_id, text);
        }
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_body_wins() {
        let mut store = DocumentStore::new();
        assert!(store.insert(2, "Art galleries in Chelsea"));
        assert!(!store.insert(2, "something else"));
        assert_eq!(store.get(2), Some("Art galleries in Chelsea"));
        assert_eq!(store.get(3), None);
    }

    #[test]
    fn iterates_in_id_order() {
        let store: DocumentStore = [(10, "b"), (1, "a"), (5, "c")].into_iter().collect();
        let ids: Vec<DocId> = store.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 5, 10]);
        assert_eq!(store.len(), 3);
    }
}
