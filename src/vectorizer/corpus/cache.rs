use std::cell::RefCell;
use std::collections::HashMap;

use crate::vectorizer::document::DocumentId;

/// Derived statistics of a corpus
/// Filled on demand, dropped as a whole whenever the corpus changes.
#[derive(Debug, Default)]
pub(crate) struct CorpusCache {
    /// feature -> fraction of documents containing it, computed all at once
    pub df: RefCell<Option<HashMap<String, f64>>>,
    /// unordered document pair -> cosine similarity
    pub similarity: RefCell<HashMap<(DocumentId, DocumentId), f64>>,
    /// ordered document pair -> KL divergence
    pub divergence: RefCell<HashMap<(DocumentId, DocumentId), f64>>,
    /// feature -> information gain, computed all at once
    pub information_gain: RefCell<Option<HashMap<String, f64>>>,
    /// union of all features, first-seen order
    pub features: RefCell<Option<Vec<String>>>,
}

impl CorpusCache {
    pub fn clear(&mut self) {
        *self = CorpusCache::default();
    }

    pub fn similarity(&self, a: &str, b: &str) -> Option<f64> {
        self.similarity.borrow().get(&unordered(a, b)).copied()
    }

    pub fn set_similarity(&self, a: &str, b: &str, s: f64) {
        self.similarity.borrow_mut().insert(unordered(a, b), s);
    }
}

/// Key of an unordered pair
pub(crate) fn unordered(a: &str, b: &str) -> (DocumentId, DocumentId) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}
