pub mod cache;
pub mod export;
pub mod stats;

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::debug;

use crate::cluster::{Cluster, ClusterMethod};
use crate::error::{Error, Result};
use crate::utils::math::distance;
use crate::vectorizer::analyzer::{self, AnalyzerOptions};
use crate::vectorizer::document::{Document, DocumentId};
use crate::vectorizer::evaluate::query::Query;
use crate::vectorizer::evaluate::scoring::Hits;
use crate::vectorizer::lsa::{Lsa, Reduction, TransformCache};
use crate::vectorizer::vector::Vector;
use crate::vectorizer::Weighting;

use cache::CorpusCache;

static NEXT_CORPUS_ID: AtomicU64 = AtomicU64::new(1);

/// Corpus
/// An ordered collection of documents with cached statistics.
///
/// Documents can only be added and removed through `append`, `extend`,
/// `remove` and `clear`; the collection itself is exposed read-only.
///
/// Every change (documents, weighting, LSA) drops all derived statistics
/// (document frequency, similarity, divergence, information gain, feature
/// union) and the cached vector of every document. Statistics are then
/// recomputed on demand.
///
/// Not thread-safe: the caches use interior mutability and the corpus is
/// meant to be used from one thread.
pub struct Corpus {
    id: u64,
    documents: IndexMap<DocumentId, Document>,
    index: HashMap<String, DocumentId>,
    weighting: Weighting,
    analyzer: AnalyzerOptions,
    generation: u64,
    lsa: Option<Lsa>,
    transforms: TransformCache,
    pub(crate) cache: CorpusCache,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    /// Create an empty TF-IDF corpus
    pub fn new() -> Self {
        Corpus {
            id: NEXT_CORPUS_ID.fetch_add(1, Ordering::Relaxed),
            documents: IndexMap::new(),
            index: HashMap::new(),
            weighting: Weighting::default(),
            analyzer: AnalyzerOptions::default(),
            generation: 0,
            lsa: None,
            transforms: TransformCache::new(),
            cache: CorpusCache::default(),
        }
    }

    /// Create a corpus from documents
    pub fn from_documents<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        let mut corpus = Self::new();
        corpus.extend(documents);
        corpus
    }

    pub fn with_weighting(mut self, weighting: Weighting) -> Self {
        self.set_weighting(weighting);
        self
    }

    /// Analyzer used for text queries and `build`
    pub fn with_analyzer(mut self, analyzer: AnalyzerOptions) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Build a corpus from the text files in a directory
    /// Each file becomes a document named after the file (`_` read as space).
    /// Files are read in path order.
    ///
    /// # Arguments
    /// * `dir` - directory to read
    /// * `extension` - only files with this extension, e.g. `"txt"`
    /// * `options` - analyzer pipeline options
    pub fn build(dir: impl AsRef<Path>, extension: &str, options: AnalyzerOptions) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
                paths.push(path);
            }
        }
        paths.sort();
        let documents = paths
            .iter()
            .map(|p| Document::open(p, &options))
            .collect::<Result<Vec<_>>>()?;
        debug!(documents = documents.len(), "corpus built from directory");
        Ok(Self::new().with_analyzer(options).with_documents(documents))
    }

    fn with_documents(mut self, documents: Vec<Document>) -> Self {
        self.extend(documents);
        self
    }
}

/// Implementation for adding and removing documents
impl Corpus {
    /// Append a document
    /// The document is attached to this corpus and indexed by name
    /// (a later document with the same name replaces the earlier one in the index).
    ///
    /// # Returns
    /// * `DocumentId` - id of the appended document
    pub fn append(&mut self, document: Document) -> DocumentId {
        let id = self.insert(document);
        self.update();
        id
    }

    /// Append several documents, invalidating the caches once
    pub fn extend<I>(&mut self, documents: I) -> Vec<DocumentId>
    where
        I: IntoIterator<Item = Document>,
    {
        let ids = documents.into_iter().map(|d| self.insert(d)).collect();
        self.update();
        ids
    }

    /// A document whose id is already taken (a clone appended twice) is
    /// stored as a copy under a new id.
    fn insert(&mut self, mut document: Document) -> DocumentId {
        if self.documents.contains_key(document.id()) {
            document = document.copy();
        }
        document.attach(self.id);
        let id = document.id().to_string();
        if let Some(name) = document.name() {
            self.index.insert(name.to_string(), id.clone());
        }
        self.documents.insert(id.clone(), document);
        id
    }

    /// Remove a document, returning it detached
    pub fn remove(&mut self, id: &str) -> Option<Document> {
        let mut document = self.documents.shift_remove(id)?;
        if let Some(name) = document.name() {
            if self.index.get(name).is_some_and(|i| i == id) {
                self.index.remove(name);
            }
        }
        document.detach();
        self.update();
        Some(document)
    }

    /// Remove every document
    pub fn clear(&mut self) {
        self.documents.clear();
        self.index.clear();
        self.update();
    }

    /// Change the weighting of document vectors
    pub fn set_weighting(&mut self, weighting: Weighting) {
        if self.weighting != weighting {
            self.weighting = weighting;
            self.update();
        }
    }

    /// Structural change: drop the LSA and every cache
    fn update(&mut self) {
        self.lsa = None;
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.cache.clear();
        for document in self.documents.values_mut() {
            document.reset_vector();
        }
        debug!(
            generation = self.generation,
            documents = self.documents.len(),
            "corpus caches cleared"
        );
    }
}

/// Accessors
impl Corpus {
    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of changes so far
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    #[inline]
    pub fn analyzer(&self) -> &AnalyzerOptions {
        &self.analyzer
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// Get a document by id
    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id).map(|d| self.primed(d))
    }

    /// Get a document by name
    pub fn document(&self, name: &str) -> Option<&Document> {
        self.index.get(name).and_then(|id| self.get(id))
    }

    /// Documents in insertion order
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values().map(move |d| self.primed(d))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(|k| k.as_str())
    }

    /// Active LSA, if any
    pub fn lsa(&self) -> Option<&Lsa> {
        self.lsa.as_ref()
    }

    /// Concept vectors of documents outside the active LSA
    pub fn transforms(&self) -> &TransformCache {
        &self.transforms
    }

    pub(crate) fn require(&self, id: &str) -> Result<&Document> {
        self.documents
            .get(id)
            .ok_or_else(|| Error::UnknownDocument(id.to_string()))
    }

    /// Make sure `Document::vector` answers with this corpus' weighting
    fn primed<'a>(&self, document: &'a Document) -> &'a Document {
        self.weigh(document);
        document
    }
}

/// Weighting
impl Corpus {
    /// Weighted vector of a document in the corpus
    pub fn vector(&self, id: &str) -> Result<Vector> {
        Ok(self.weigh(self.require(id)?))
    }

    /// Weighted vector of any document against this corpus' statistics
    /// Documents of this corpus are cached, others are computed each time.
    pub fn vector_of(&self, document: &Document) -> Vector {
        self.weigh(document)
    }

    fn weigh(&self, document: &Document) -> Vector {
        if document.corpus_id() == Some(self.id) {
            return document
                .cached_vector()
                .get_or_init(|| self.compute_vector(document))
                .clone();
        }
        self.compute_vector(document)
    }

    fn compute_vector(&self, document: &Document) -> Vector {
        match self.weighting {
            Weighting::Tf => document.tf_vector(),
            Weighting::TfIdf => self.with_df(|df| {
                let mut builder = Vector::builder(Weighting::TfIdf);
                for (word, _) in document.terms().iter() {
                    builder.insert(word, tf_idf(document, word, df));
                }
                builder.build()
            }),
        }
    }

    /// Relevance of a word in a document
    /// tf * idf, or tf when the word is not in the corpus.
    pub fn tf_idf(&self, document: &Document, word: &str) -> f64 {
        self.with_df(|df| tf_idf(document, word, df))
    }

    /// Document frequency
    /// Fraction of documents containing the word, 0.0 if none do.
    /// Computed for every word on first call.
    pub fn document_frequency(&self, word: &str) -> f64 {
        self.with_df(|df| df.get(word).copied().unwrap_or(0.0))
    }

    #[inline]
    pub fn df(&self, word: &str) -> f64 {
        self.document_frequency(word)
    }

    /// Inverse document frequency
    /// ln(1 / df), `None` for a word in no document.
    pub fn inverse_document_frequency(&self, word: &str) -> Option<f64> {
        self.with_df(|df| idf(word, df))
    }

    #[inline]
    pub fn idf(&self, word: &str) -> Option<f64> {
        self.inverse_document_frequency(word)
    }

    pub(crate) fn with_df<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&HashMap<String, f64>) -> R,
    {
        if self.cache.df.borrow().is_none() {
            let df = self.compute_df();
            *self.cache.df.borrow_mut() = Some(df);
        }
        let df = self.cache.df.borrow();
        match df.as_ref() {
            Some(df) => f(df),
            None => f(&HashMap::new()),
        }
    }

    fn compute_df(&self) -> HashMap<String, f64> {
        let n = self.documents.len() as f64;
        let mut df: HashMap<String, f64> = HashMap::new();
        for document in self.documents.values() {
            for word in document.terms().term_set_iter() {
                *df.entry(word.to_string()).or_insert(0.0) += 1.0;
            }
        }
        df.values_mut().for_each(|v| *v /= n);
        df
    }

    /// Union of the features of all documents, first-seen order
    pub fn features(&self) -> Vec<String> {
        if let Some(features) = self.cache.features.borrow().as_ref() {
            return features.clone();
        }
        let mut seen: HashSet<&str> = HashSet::new();
        let mut features = Vec::new();
        for document in self.documents.values() {
            for word in document.terms().term_set_iter() {
                if seen.insert(word) {
                    features.push(word.to_string());
                }
            }
        }
        *self.cache.features.borrow_mut() = Some(features.clone());
        features
    }

    /// Mean weighted vector of the given documents
    pub fn centroid(&self, ids: &[&str]) -> Result<Vector> {
        let vectors = ids
            .iter()
            .map(|id| self.vector(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(distance::centroid(vectors.iter()))
    }
}

fn idf(word: &str, df: &HashMap<String, f64>) -> Option<f64> {
    match df.get(word) {
        Some(&f) if f > 0.0 => Some((1.0 / f).ln()),
        _ => None,
    }
}

fn tf_idf(document: &Document, word: &str, df: &HashMap<String, f64>) -> f64 {
    let tf = document.term_frequency(word);
    match idf(word, df) {
        Some(idf) => tf * idf,
        None => tf,
    }
}

/// Similarity and search
impl Corpus {
    /// Cosine similarity of two documents in the corpus
    /// Computed in concept space while an LSA is active. Cached per unordered pair.
    pub fn cosine_similarity(&self, a: &str, b: &str) -> Result<f64> {
        let da = self.require(a)?;
        let db = self.require(b)?;
        Ok(self.cached_similarity(da, db))
    }

    #[inline]
    pub fn similarity(&self, a: &str, b: &str) -> Result<f64> {
        self.cosine_similarity(a, b)
    }

    /// Cosine similarity of any two documents in this corpus' vector space
    /// Not cached.
    pub fn similarity_of(&self, a: &Document, b: &Document) -> f64 {
        self.embed(a).cosine_similarity(&self.embed(b))
    }

    fn cached_similarity(&self, a: &Document, b: &Document) -> f64 {
        if let Some(s) = self.cache.similarity(a.id(), b.id()) {
            return s;
        }
        let s = self.similarity_of(a, b);
        self.cache.set_similarity(a.id(), b.id(), s);
        s
    }

    /// Vector used for comparison: the weighted vector, or its concept vector under LSA
    fn embed(&self, document: &Document) -> Vector {
        let vector = self.weigh(document);
        match &self.lsa {
            Some(lsa) => lsa.concept_vector(document.id(), &vector, &self.transforms),
            None => vector,
        }
    }

    /// Documents most similar to the given one
    /// (similarity, document) pairs, most similar first, ties in corpus order.
    /// The document itself and documents with similarity 0.0 are left out.
    ///
    /// # Arguments
    /// * `document` - a document of this corpus, or any other document
    /// * `top` - maximum number of results
    pub fn nearest_neighbors(&self, document: &Document, top: usize) -> Hits<&Document> {
        let attached = self.documents.contains_key(document.id());
        let list = self
            .documents
            .values()
            .filter(|d| d.id() != document.id())
            .map(|d| {
                let s = if attached {
                    self.cached_similarity(document, d)
                } else {
                    self.similarity_of(document, d)
                };
                (s, self.primed(d))
            })
            .filter(|(s, _)| *s > 0.0)
            .collect();
        let mut hits = Hits::new(list);
        hits.sort_by_score().top(top);
        hits
    }

    /// Documents most similar to the document with the given id
    pub fn related(&self, id: &str, top: usize) -> Result<Hits<&Document>> {
        Ok(self.nearest_neighbors(self.require(id)?, top))
    }

    /// Search with a document, a string or tokens
    /// Strings and tokens go through the corpus analyzer into an ephemeral
    /// document. No result when the query shares no word with the corpus.
    pub fn search<'q>(&self, query: impl Into<Query<'q>>, top: usize) -> Hits<&Document> {
        let owned;
        let document = match query.into() {
            Query::Document(d) => d,
            Query::Text(text) => {
                let words = analyzer::words(text, &self.analyzer);
                owned = Document::from_terms(analyzer::count(&words, &self.analyzer));
                &owned
            }
            Query::Tokens(tokens) => {
                owned = Document::from_terms(analyzer::count(&tokens, &self.analyzer));
                &owned
            }
        };
        let shared = self.with_df(|df| document.terms().term_set_iter().any(|w| df.contains_key(w)));
        if !shared {
            return Hits::new(Vec::new());
        }
        self.nearest_neighbors(document, top)
    }

    /// Similarity of two arbitrary documents
    /// When either document belongs to this corpus both are weighed against
    /// it, as `similarity_of` does. Otherwise both are compared by term
    /// frequency in an ad-hoc corpus (with only two documents every shared
    /// word would get idf 0).
    pub fn document_similarity(&self, a: &Document, b: &Document) -> f64 {
        if a.corpus_id() == Some(self.id) || b.corpus_id() == Some(self.id) {
            return self.similarity_of(a, b);
        }
        let mut corpus = Corpus::new().with_weighting(Weighting::Tf);
        let ia = corpus.append(a.copy());
        let ib = corpus.append(b.copy());
        corpus.cosine_similarity(&ia, &ib).unwrap_or(0.0)
    }
}

/// Reduction and clustering
impl Corpus {
    /// Latent semantic analysis
    /// Replaces the active concept space; similarity is computed between
    /// concept vectors from now on.
    ///
    /// # Errors
    /// `Dimension` when `k` is not below the number of documents. Checked
    /// before anything is computed.
    pub fn reduce(&mut self, reduction: Reduction) -> Result<&Lsa> {
        reduction.check(self.documents.len())?;
        let rows: Vec<(DocumentId, Vector)> = self
            .documents
            .values()
            .map(|d| (d.id().to_string(), self.weigh(d)))
            .collect();
        let lsa = Lsa::fit(self.features(), rows, self.weighting, reduction)?;
        self.invalidate();
        Ok(self.lsa.insert(lsa))
    }

    /// Go back to the full vector space
    pub fn clear_lsa(&mut self) {
        if self.lsa.take().is_some() {
            self.invalidate();
        }
    }

    /// Cluster all documents
    /// Uses concept vectors while an LSA is active.
    pub fn cluster(&self, method: &ClusterMethod) -> Cluster<&Document> {
        let documents: Vec<&Document> = self.documents().collect();
        self.cluster_documents(documents, method)
    }

    /// Cluster the documents with the given ids
    pub fn cluster_subset(&self, ids: &[&str], method: &ClusterMethod) -> Result<Cluster<&Document>> {
        let documents = ids
            .iter()
            .map(|id| self.require(id).map(|d| self.primed(d)))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.cluster_documents(documents, method))
    }

    fn cluster_documents<'a>(&'a self, documents: Vec<&'a Document>, method: &ClusterMethod) -> Cluster<&'a Document> {
        let vectors: Vec<Vector> = documents.iter().map(|d| self.embed(d)).collect();
        method.cluster_indices(&vectors).map(|i| documents[i])
    }

    /// New corpus whose documents only keep the given features
    /// Documents are copied with new ids.
    pub fn filter(&self, features: &[&str]) -> Corpus {
        let keep: HashSet<&str> = features.iter().copied().collect();
        let mut corpus = Corpus::new()
            .with_weighting(self.weighting)
            .with_analyzer(self.analyzer.clone());
        corpus.extend(self.documents.values().map(|d| d.restrict(&keep)));
        corpus
    }
}

impl Debug for Corpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Corpus")
            .field("documents", &self.documents.len())
            .field("weighting", &self.weighting)
            .field("generation", &self.generation)
            .field("lsa", &self.lsa)
            .finish()
    }
}

/// Snapshot support
impl Corpus {
    pub(crate) fn raw_documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.values()
    }

    pub(crate) fn restore(weighting: Weighting, documents: Vec<Document>, lsa: Option<Lsa>) -> Corpus {
        let mut corpus = Corpus::new();
        corpus.weighting = weighting;
        for document in documents {
            corpus.insert(document);
        }
        corpus.lsa = lsa;
        corpus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::HierarchicalConfig;
    use crate::vectorizer::label::Label;
    use proptest::prelude::*;

    fn animals() -> (Corpus, Vec<DocumentId>) {
        let mut corpus = Corpus::new();
        let ids = corpus.extend([
            Document::from_text("cat purr whiskers").with_name("a").with_label("cat"),
            Document::from_text("cat whiskers meow").with_name("b").with_label("cat"),
            Document::from_text("dog bark fetch").with_name("c").with_label("dog"),
            Document::from_text("dog fetch wag").with_name("d").with_label("dog"),
        ]);
        (corpus, ids)
    }

    #[test]
    fn df_and_idf() {
        let (corpus, _) = animals();
        assert_eq!(corpus.df("cat"), 0.5);
        assert_eq!(corpus.df("purr"), 0.25);
        assert_eq!(corpus.df("horse"), 0.0);
        assert!(corpus.idf("horse").is_none());
        let common = corpus.idf("cat").unwrap();
        let rare = corpus.idf("purr").unwrap();
        assert!(rare > common);
        assert!((common - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn vectors_are_tf_idf_inside_and_tf_outside() {
        let (mut corpus, ids) = animals();
        let v = corpus.vector(&ids[0]).unwrap();
        assert_eq!(v.weighting(), Weighting::TfIdf);
        assert!((v.weight("purr") - 4f64.ln() / 3.0).abs() < 1e-12);
        assert_eq!(corpus.get(&ids[0]).unwrap().vector(), v);

        let removed = corpus.remove(&ids[0]).unwrap();
        assert!(!removed.is_attached());
        assert_eq!(removed.vector().weighting(), Weighting::Tf);
        assert!(corpus.document("a").is_none());
    }

    #[test]
    fn tf_weighting_sums_to_one() {
        let (corpus, ids) = animals();
        let corpus = corpus.with_weighting(Weighting::Tf);
        for id in &ids {
            assert!((corpus.vector(id).unwrap().sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn attached_documents_are_read_only() {
        let (corpus, ids) = animals();
        let mut copy = corpus.get(&ids[0]).unwrap().clone();
        assert!(matches!(copy.set_name(None), Err(Error::ReadOnly(_))));
        assert!(matches!(copy.set_label(Some(Label::from("x"))), Err(Error::ReadOnly(_))));
    }

    #[test]
    fn similarity_is_symmetric_and_cached() {
        let (corpus, ids) = animals();
        for a in &ids {
            for b in &ids {
                assert_eq!(corpus.similarity(a, b).unwrap(), corpus.similarity(b, a).unwrap());
            }
        }
        assert!((corpus.similarity(&ids[0], &ids[0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(corpus.cache.similarity.borrow().len(), 10);
        assert!(matches!(corpus.similarity(&ids[0], "nope"), Err(Error::UnknownDocument(_))));
    }

    #[test]
    fn append_invalidates_similarity() {
        let (mut corpus, ids) = animals();
        let before = corpus.similarity(&ids[0], &ids[1]).unwrap();
        let generation = corpus.generation();
        corpus.append(Document::from_text("cat cat whiskers"));
        assert!(corpus.generation() > generation);
        assert!(corpus.cache.similarity.borrow().is_empty());
        assert!(corpus.cache.df.borrow().is_none());
        let after = corpus.similarity(&ids[0], &ids[1]).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn related_excludes_self_and_unrelated() {
        let (corpus, ids) = animals();
        let hits = corpus.related(&ids[0], 10).unwrap();
        let names: Vec<&str> = hits.iter().filter_map(|(_, d)| d.name()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn search_with_text_tokens_and_documents() {
        let (corpus, _) = animals();
        let hits = corpus.search("Which dog can fetch?", 10);
        let mut names: Vec<&str> = hits.iter().filter_map(|(_, d)| d.name()).collect();
        names.sort();
        assert_eq!(names, vec!["c", "d"]);

        assert!(corpus.search(["horse", "saddle"], 10).is_empty());

        let query = Document::from_text("meow");
        let hits = corpus.search(&query, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.list[0].1.name(), Some("b"));
    }

    #[test]
    fn search_ties_keep_corpus_order() {
        let mut corpus = Corpus::new();
        corpus.extend([
            Document::from_text("apple pie").with_name("first"),
            Document::from_text("apple tart").with_name("second"),
            Document::from_text("pear cake"),
        ]);
        let hits = corpus.search("apple", 10);
        let names: Vec<&str> = hits.iter().filter_map(|(_, d)| d.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn lsa_preserves_ranking_of_held_out_document() {
        let rank = |scores: Vec<f64>| {
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by_key(|&i| std::cmp::Reverse((scores[i] * 1e6).round() as i64));
            order
        };
        let (mut corpus, _) = animals();
        let query = Document::from_text("cat purr whiskers");
        let full: Vec<f64> = corpus.documents().map(|d| corpus.similarity_of(&query, d)).collect();

        corpus.reduce(Reduction::Dimensions(2)).unwrap();
        assert_eq!(corpus.lsa().unwrap().dimensions(), 2);
        let reduced: Vec<f64> = corpus.documents().map(|d| corpus.similarity_of(&query, d)).collect();

        assert_eq!(rank(full), vec![0, 1, 2, 3]);
        assert_eq!(rank(reduced), vec![0, 1, 2, 3]);
        assert_eq!(corpus.transforms().len(), 1);

        corpus.clear_lsa();
        assert!(corpus.lsa().is_none());
    }

    #[test]
    fn lsa_dimensions_are_checked() {
        let (mut corpus, _) = animals();
        let err = corpus.reduce(Reduction::Dimensions(4)).unwrap_err();
        assert!(matches!(err, Error::Dimension { requested: 4, documents: 4 }));
        assert!(corpus.lsa().is_none());
    }

    #[test]
    fn append_drops_lsa() {
        let (mut corpus, _) = animals();
        corpus.reduce(Reduction::Norm).unwrap();
        corpus.append(Document::from_text("horse"));
        assert!(corpus.lsa().is_none());
    }

    #[test]
    fn clusters_documents() {
        let (corpus, _) = animals();
        let method = ClusterMethod::Hierarchical(HierarchicalConfig {
            k: 2,
            seed: Some(3),
            ..Default::default()
        });
        let clusters = corpus.cluster(&method);
        let mut groups: Vec<Vec<&str>> = clusters
            .clusters()
            .map(|c| c.leaves().iter().filter_map(|d| d.name()).collect())
            .collect();
        groups.iter_mut().for_each(|g| g.sort());
        groups.sort();
        assert_eq!(groups, vec![vec!["a", "b"], vec!["c", "d"]]);

        let ids: Vec<&str> = corpus.ids().take(2).collect();
        let subset = corpus.cluster_subset(&ids, &method).unwrap();
        assert_eq!(subset.leaves().len(), 2);
    }

    #[test]
    fn document_similarity_of_detached_documents() {
        let corpus = Corpus::new();
        let a = Document::from_text("cat purr");
        let b = Document::from_text("cat purr");
        let c = Document::from_text("dog bark");
        assert!((corpus.document_similarity(&a, &b) - 1.0).abs() < 1e-12);
        assert_eq!(corpus.document_similarity(&a, &c), 0.0);
        assert!(!a.is_attached());
    }

    #[test]
    fn document_similarity_weighs_outsiders_against_the_corpus() {
        let mut corpus = Corpus::new();
        let ids = corpus.extend([
            Document::from_text("cat mouse"),
            Document::from_text("cat dog"),
            Document::from_text("bird"),
        ]);
        let outsider = Document::from_text("cat dog");
        let member = corpus.get(&ids[0]).unwrap();
        let expected = corpus.similarity(&ids[0], &ids[1]).unwrap();
        assert!((corpus.document_similarity(member, &outsider) - expected).abs() < 1e-12);
        assert!((corpus.document_similarity(&outsider, member) - expected).abs() < 1e-12);
        assert!(expected < 0.5);
    }

    #[test]
    fn appending_a_clone_twice_keeps_both() {
        let mut corpus = Corpus::new();
        let document = Document::from_text("cat purr").with_name("a");
        let first = corpus.append(document.clone());
        let second = corpus.append(document);
        assert_ne!(first, second);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.document("a").map(|d| d.id()), Some(second.as_str()));
    }

    #[test]
    fn filter_returns_new_corpus() {
        let (corpus, _) = animals();
        let filtered = corpus.filter(&["cat", "dog"]);
        assert_eq!(filtered.len(), 4);
        assert_eq!(filtered.features(), vec!["cat", "dog"]);
        assert_eq!(corpus.features().len(), 8);
        assert_eq!(filtered.document("c").unwrap().label(), Some(&Label::from("dog")));
    }

    #[test]
    fn build_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("big_cat.txt"), "The cat purrs").unwrap();
        fs::write(dir.path().join("dog.txt"), "The dog barks").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let corpus = Corpus::build(dir.path(), "txt", AnalyzerOptions::default()).unwrap();
        assert_eq!(corpus.len(), 2);
        assert!(corpus.document("big cat").unwrap().contains("cat"));
    }

    #[test]
    fn centroid_of_documents() {
        let (corpus, ids) = animals();
        let c = corpus.centroid(&[&ids[0], &ids[1]]).unwrap();
        assert!(c.contains("purr") && c.contains("meow"));
        assert!(!c.contains("dog"));
    }

    proptest! {
        #[test]
        fn similarity_symmetric_for_any_texts(texts in prop::collection::vec("[a-e]{2,3}( [a-e]{2,3}){0,5}", 2..6)) {
            let mut corpus = Corpus::new();
            let ids = corpus.extend(texts.iter().map(|t| Document::from_text(t)));
            for a in &ids {
                for b in &ids {
                    let ab = corpus.similarity(a, b).unwrap();
                    let ba = corpus.similarity(b, a).unwrap();
                    prop_assert_eq!(ab, ba);
                    prop_assert!((-1e-12..=1.0 + 1e-12).contains(&ab));
                }
            }
        }

        #[test]
        fn tf_vectors_sum_to_one(texts in prop::collection::vec("[a-z]{2,6}( [a-z]{2,6}){0,8}", 1..5)) {
            let mut corpus = Corpus::new().with_weighting(Weighting::Tf);
            let ids = corpus.extend(texts.iter().map(|t| Document::from_text(t)));
            for id in &ids {
                let v = corpus.vector(id).unwrap();
                prop_assert!(v.is_empty() || (v.sum() - 1.0).abs() < 1e-9);
            }
        }
    }
}
