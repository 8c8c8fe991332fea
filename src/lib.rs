/// This crate is a Document Analysis Engine built on TF-IDF document vectors.
pub mod apriori;
pub mod classifier;
pub mod cluster;
pub mod error;
pub mod utils;
pub mod vectorizer;

/// Crate error and result types
/// Every fallible operation returns `Result<T>`.
/// Classifying with an untrained classifier is not an error, it yields `None`.
pub use error::{Error, Result};

/// Sparse feature vector
/// A read-only `{feature: weight}` mapping with a process-unique id.
/// Modifications return copies (`with`, `without`, `normalized`, `project`).
pub use vectorizer::vector::Vector;

/// Weighting scheme of document vectors
/// - Tf: count / total count
/// - TfIdf: tf * ln(1 / df), plain tf for a document outside a corpus
pub use vectorizer::Weighting;

/// Term Frequency structure
/// Counts of the terms of one document, plus their total.
///
/// Used as base data for TF (Term Frequency) calculation and stored by every
/// `Document` as its read-only term mapping.
pub use vectorizer::term::TermFrequency;

/// Analyzer options and tokenizer
/// The pipeline turning text into term counts:
/// split, filter, stopwords, exclusions, stemming, count pruning.
/// Stemmers and token filters are injected as closures.
pub use vectorizer::analyzer::{AnalyzerOptions, Stemming, TaggedWord, Word};

/// Document
/// Term counts with an optional name and label, built from text, tokens,
/// counts, a vector or tagged words.
/// The weighted vector is derived on first access and follows the weighting of
/// the owning corpus.
///
/// # Serialization
/// A line based text format through `save`/`load`:
/// `@name:`/`@type:` headers followed by `feature weight` lines.
pub use vectorizer::document::{Document, DocumentId, DocumentInput};

/// Document label
/// Boolean, integer or text class used by classifiers and information gain.
pub use vectorizer::label::Label;

/// Corpus
/// An ordered collection of documents with cached statistics:
/// - document frequency per feature
/// - pairwise cosine similarity
/// - pairwise KL divergence
/// - information gain per feature
/// - an optional LSA concept space
///
/// Any structural change clears every cache and every cached document vector.
///
/// # Serialization
/// `save`/`load` write a CBOR snapshot holding the documents and the caches.
/// Tabular export to TSV and ARFF through `export`.
///
/// # Thread Safety
/// Single threaded: caches live behind `RefCell`.
pub use vectorizer::corpus::Corpus;

/// Tabular export formats
pub use vectorizer::corpus::export::ExportFormat;

/// Latent semantic analysis
/// Truncated SVD of the document/feature matrix. `Reduction` picks the number
/// of concepts kept, `TransformCache` keeps embeddings of documents outside
/// the corpus.
pub use vectorizer::lsa::{Lsa, Reduction, TransformCache};

/// Search query
/// A document, a raw string or a token list.
pub use vectorizer::evaluate::query::Query;

/// Search hits
/// `(score, item)` pairs with sorting helpers.
pub use vectorizer::evaluate::scoring::Hits;

/// Vector distance metrics
/// Cosine (default), squared Euclidean, Manhattan and Hamming.
pub use utils::math::distance::Distance;

/// Clustering
/// k-means with random or k-means++ seeding, agglomerative hierarchical
/// clustering and a k-d tree for nearest neighbor lookups.
pub use cluster::{Cluster, ClusterMethod, HierarchicalConfig, KMeansConfig, KdTree, Node, Seeding};

/// Classifiers
/// Naive Bayes, k-NN, averaged perceptron and an SVM adapter over an external
/// solver, all behind the `Classifier` trait (train, classify, test, save, load).
pub use classifier::{
    Classifier, Example, Kernel, Knn, NaiveBayes, Perceptron, Score, Svm, SvmModel, SvmParams, SvmSolver,
    TestOptions,
};

/// Frequent itemset mining
pub use apriori::{apriori, Itemset};
