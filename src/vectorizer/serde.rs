use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::vectorizer::corpus::cache::unordered;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::document::{Document, DocumentId};
use crate::vectorizer::lsa::Lsa;
use crate::vectorizer::Weighting;

/// Serializable snapshot of a `Corpus`
/// Holds documents, weighting, the active LSA and whatever statistics were
/// cached when the snapshot was taken.
/// Use `into_corpus` to turn it back into a `Corpus`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CorpusData {
    pub weighting: Weighting,
    pub documents: Vec<Document>,
    /// document frequency per feature
    pub df: Option<Vec<(String, f64)>>,
    /// cosine similarity per unordered document pair
    pub similarity: Vec<(DocumentId, DocumentId, f64)>,
    /// KL divergence per ordered document pair
    pub divergence: Vec<(DocumentId, DocumentId, f64)>,
    pub information_gain: Option<Vec<(String, f64)>>,
    pub features: Option<Vec<String>>,
    pub lsa: Option<Lsa>,
}

impl From<&Corpus> for CorpusData {
    fn from(corpus: &Corpus) -> Self {
        let cache = &corpus.cache;
        let pairs = |map: &std::collections::HashMap<(DocumentId, DocumentId), f64>| {
            map.iter()
                .map(|((a, b), s)| (a.clone(), b.clone(), *s))
                .collect::<Vec<_>>()
        };
        let entries = |map: &std::collections::HashMap<String, f64>| {
            map.iter().map(|(k, v)| (k.clone(), *v)).collect::<Vec<_>>()
        };
        CorpusData {
            weighting: corpus.weighting(),
            documents: corpus.raw_documents().cloned().collect(),
            df: cache.df.borrow().as_ref().map(entries),
            similarity: pairs(&*cache.similarity.borrow()),
            divergence: pairs(&*cache.divergence.borrow()),
            information_gain: cache.information_gain.borrow().as_ref().map(entries),
            features: cache.features.borrow().clone(),
            lsa: corpus.lsa().cloned(),
        }
    }
}

impl CorpusData {
    /// Rebuild the corpus with its caches pre-populated
    pub fn into_corpus(self) -> Corpus {
        let corpus = Corpus::restore(self.weighting, self.documents, self.lsa);
        let cache = &corpus.cache;
        *cache.df.borrow_mut() = self.df.map(|df| df.into_iter().collect());
        cache
            .similarity
            .borrow_mut()
            .extend(self.similarity.into_iter().map(|(a, b, s)| (unordered(&a, &b), s)));
        cache
            .divergence
            .borrow_mut()
            .extend(self.divergence.into_iter().map(|(a, b, d)| ((a, b), d)));
        *cache.information_gain.borrow_mut() = self.information_gain.map(|ig| ig.into_iter().collect());
        *cache.features.borrow_mut() = self.features;
        corpus
    }
}

/// Persistence
impl Corpus {
    /// Save the corpus as CBOR
    ///
    /// # Arguments
    /// * `path` - file to write
    /// * `update` - compute document frequency and every pairwise similarity
    ///   first, so that a loaded corpus answers from cache
    pub fn save(&self, path: impl AsRef<Path>, update: bool) -> Result<()> {
        if update {
            self.with_df(|_| ());
            self.features();
            let ids: Vec<&str> = self.ids().collect();
            for (i, a) in ids.iter().enumerate() {
                for b in &ids[i..] {
                    self.similarity(a, b)?;
                }
            }
        }
        let data = CorpusData::from(self);
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_cbor::to_writer(writer, &data)?;
        debug!(
            path = %path.as_ref().display(),
            documents = data.documents.len(),
            similarities = data.similarity.len(),
            "corpus saved"
        );
        Ok(())
    }

    /// Load a corpus written by `save`
    pub fn load(path: impl AsRef<Path>) -> Result<Corpus> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let data: CorpusData = serde_cbor::from_reader(reader)?;
        debug!(path = %path.as_ref().display(), documents = data.documents.len(), "corpus loaded");
        Ok(data.into_corpus())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::label::Label;
    use crate::vectorizer::lsa::Reduction;

    fn corpus() -> Corpus {
        Corpus::from_documents([
            Document::from_text("cat purr whiskers").with_name("a").with_label("cat"),
            Document::from_text("cat meow").with_name("b").with_label("cat"),
            Document::from_text("dog bark fetch").with_name("c").with_label(true),
        ])
    }

    #[test]
    fn save_and_load_with_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.cbor");
        let corpus = corpus();
        corpus.save(&path, true).unwrap();

        let loaded = Corpus::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.cache.df.borrow().is_some());
        assert_eq!(loaded.cache.similarity.borrow().len(), 6);
        assert_eq!(loaded.weighting(), Weighting::TfIdf);

        let a = loaded.document("a").unwrap();
        assert!(a.is_attached());
        assert_eq!(a.vector(), corpus.document("a").unwrap().vector());
        assert_eq!(loaded.document("c").unwrap().label(), Some(&Label::Bool(true)));
        let ids: Vec<&str> = corpus.ids().collect();
        let loaded_ids: Vec<&str> = loaded.ids().collect();
        assert_eq!(ids, loaded_ids);
    }

    #[test]
    fn save_without_update_keeps_caches_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.cbor");
        corpus().with_weighting(Weighting::Tf).save(&path, false).unwrap();
        let loaded = Corpus::load(&path).unwrap();
        assert!(loaded.cache.df.borrow().is_none());
        assert!(loaded.cache.similarity.borrow().is_empty());
        assert_eq!(loaded.weighting(), Weighting::Tf);
    }

    #[test]
    fn lsa_survives_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.cbor");
        let mut corpus = corpus();
        corpus.reduce(Reduction::Dimensions(2)).unwrap();
        corpus.save(&path, false).unwrap();
        let loaded = Corpus::load(&path).unwrap();
        let lsa = loaded.lsa().unwrap();
        assert_eq!(lsa.dimensions(), 2);
        let id = loaded.ids().next().unwrap();
        assert_eq!(lsa.vector(id), corpus.lsa().unwrap().vector(id));
    }
}
