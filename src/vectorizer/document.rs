use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::analyzer::{self, AnalyzerOptions, TaggedWord, Word};
use crate::vectorizer::label::Label;
use crate::vectorizer::term::TermFrequency;
use crate::vectorizer::vector::Vector;
use crate::vectorizer::Weighting;

/// Document id
/// `<session token>-<counter>`, distinct across process runs whose
/// serialized documents are later merged.
pub type DocumentId = String;

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

fn session_token() -> &'static str {
    static TOKEN: OnceLock<String> = OnceLock::new();
    TOKEN.get_or_init(|| format!("{:012x}", rand::random::<u64>() & 0xffff_ffff_ffff))
}

pub(crate) fn next_document_id() -> DocumentId {
    format!("{}-{}", session_token(), NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed))
}

/// Accepted shapes of document input
/// Resolved once, at construction, into a feature -> count mapping.
#[derive(Debug, Clone)]
pub enum DocumentInput {
    /// Raw text, split into words by the analyzer
    Text(String),
    /// Pre-split tokens
    Tokens(Vec<String>),
    /// Explicit feature -> count mapping
    Counts(IndexMap<String, f64>),
    /// Existing vector, its weights are taken as counts
    Vector(Vector),
    /// Sentence annotated by an external tagger
    Tagged(Vec<Word>),
}

impl From<&str> for DocumentInput {
    fn from(text: &str) -> Self {
        DocumentInput::Text(text.to_string())
    }
}

impl From<String> for DocumentInput {
    fn from(text: String) -> Self {
        DocumentInput::Text(text)
    }
}

impl From<Vec<String>> for DocumentInput {
    fn from(tokens: Vec<String>) -> Self {
        DocumentInput::Tokens(tokens)
    }
}

impl From<&[&str]> for DocumentInput {
    fn from(tokens: &[&str]) -> Self {
        DocumentInput::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DocumentInput {
    fn from(tokens: [&str; N]) -> Self {
        DocumentInput::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

impl From<IndexMap<String, f64>> for DocumentInput {
    fn from(counts: IndexMap<String, f64>) -> Self {
        DocumentInput::Counts(counts)
    }
}

impl From<HashMap<String, f64>> for DocumentInput {
    fn from(counts: HashMap<String, f64>) -> Self {
        let mut counts: Vec<(String, f64)> = counts.into_iter().collect();
        counts.sort_by(|a, b| a.0.cmp(&b.0));
        DocumentInput::Counts(counts.into_iter().collect())
    }
}

impl From<Vector> for DocumentInput {
    fn from(vector: Vector) -> Self {
        DocumentInput::Vector(vector)
    }
}

impl From<Vec<Word>> for DocumentInput {
    fn from(words: Vec<Word>) -> Self {
        DocumentInput::Tagged(words)
    }
}

impl DocumentInput {
    /// Tagged sentence from any external word type
    pub fn tagged<W: TaggedWord>(words: &[W]) -> Self {
        DocumentInput::Tagged(words.iter().map(Word::from_tagged).collect())
    }

    fn into_terms(self, options: &AnalyzerOptions) -> Result<TermFrequency> {
        match self {
            DocumentInput::Text(text) => Ok(analyzer::count(&analyzer::words(&text, options), options)),
            DocumentInput::Tokens(tokens) => Ok(analyzer::count(&tokens, options)),
            DocumentInput::Tagged(words) => Ok(analyzer::count_tagged(&words, options)),
            DocumentInput::Counts(counts) => counts_to_terms(counts.iter().map(|(k, &v)| (k.as_str(), v))),
            DocumentInput::Vector(vector) => counts_to_terms(vector.iter()),
        }
    }
}

fn counts_to_terms<'a, I>(counts: I) -> Result<TermFrequency>
where
    I: Iterator<Item = (&'a str, f64)>,
{
    let mut terms = TermFrequency::new();
    for (feature, count) in counts {
        if !count.is_finite() || count < 0.0 {
            return Err(Error::malformed(format!("count of {feature:?} is {count}")));
        }
        if count > 0.0 {
            terms.add_term_count(feature, count);
        }
    }
    Ok(terms)
}

/// Document
/// A bag of words in which each word is a feature.
///
/// The term counts are read-only once built. The weighted vector is derived
/// from them lazily and cached; it depends on the corpus the document belongs
/// to, so the corpus resets it whenever its statistics change.
///
/// A detached document (no corpus) is weighted by plain term frequency.
#[derive(Serialize, Deserialize, Clone)]
pub struct Document {
    id: DocumentId,
    name: Option<String>,
    label: Option<Label>,
    terms: TermFrequency,
    #[serde(skip)]
    corpus: Option<u64>,
    #[serde(skip)]
    vector: OnceCell<Vector>,
}

impl Document {
    /// Build a document
    ///
    /// # Arguments
    /// * `input` - text, tokens, counts, vector or tagged words
    /// * `options` - analyzer pipeline options (ignored for counts and vectors)
    ///
    /// # Errors
    /// `MalformedInput` for negative or non-finite counts.
    pub fn new(input: impl Into<DocumentInput>, options: &AnalyzerOptions) -> Result<Self> {
        let terms = input.into().into_terms(options)?;
        Ok(Self::from_terms(terms))
    }

    /// Build a document from text with the default analyzer
    pub fn from_text(text: &str) -> Self {
        let options = AnalyzerOptions::default();
        Self::from_terms(analyzer::count(&analyzer::words(text, &options), &options))
    }

    pub fn from_terms(terms: TermFrequency) -> Self {
        Document {
            id: next_document_id(),
            name: None,
            label: None,
            terms,
            corpus: None,
            vector: OnceCell::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Create a document from a text file
    /// The file name (without extension) becomes the document name.
    pub fn open(path: impl AsRef<Path>, options: &AnalyzerOptions) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let document = Document::new(text.trim_start_matches('\u{feff}'), options)?;
        Ok(match file_stem(path) {
            Some(name) => document.with_name(name),
            None => document,
        })
    }

    /// Save the terms as text
    /// Optional `@name:` / `@type:` header lines are followed by one
    /// `feature weight` line per term.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_text())?;
        Ok(())
    }

    /// Load a document written by `save`
    /// No tokenizing, filtering or stemming is done.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_saved_text(text.trim_start_matches('\u{feff}'))
    }

    fn to_text(&self) -> String {
        let mut s = String::new();
        if let Some(name) = &self.name {
            s.push_str(&format!("@name: {}\n", escape(name)));
        }
        if let Some(label) = &self.label {
            s.push_str(&format!("@type: {}\n", escape(&label.to_string())));
        }
        for (feature, count) in self.terms.iter() {
            if count.fract() == 0.0 {
                s.push_str(&format!("{feature} {}\n", count as i64));
            } else {
                s.push_str(&format!("{feature} {count:.3}\n"));
            }
        }
        s
    }

    fn from_saved_text(text: &str) -> Result<Self> {
        let mut name = None;
        let mut label = None;
        let mut terms = TermFrequency::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if let Some(v) = line.strip_prefix("@name:") {
                name = Some(unescape(v.trim()));
            } else if let Some(v) = line.strip_prefix("@type:") {
                label = Some(Label::parse(&unescape(v.trim())));
            } else {
                let (feature, weight) = line
                    .rsplit_once(' ')
                    .ok_or_else(|| Error::malformed(format!("expected `feature weight`, got {line:?}")))?;
                let weight: f64 = weight
                    .parse()
                    .map_err(|_| Error::malformed(format!("bad weight in {line:?}")))?;
                terms.add_term_count(feature, weight);
            }
        }
        let mut document = Document::from_terms(terms);
        document.name = name;
        document.label = label;
        Ok(document)
    }

    /// Detached copy with a new id
    pub fn copy(&self) -> Self {
        Document {
            id: next_document_id(),
            name: self.name.clone(),
            label: self.label.clone(),
            terms: self.terms.clone(),
            corpus: None,
            vector: OnceCell::new(),
        }
    }
}

/// Accessors
impl Document {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The document type (class label)
    #[inline]
    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    #[inline]
    pub fn terms(&self) -> &TermFrequency {
        &self.terms
    }

    /// Total number of counted words
    #[inline]
    pub fn len(&self) -> f64 {
        self.terms.term_sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.terms.contains_term(word)
    }

    /// True while the document belongs to a corpus
    #[inline]
    pub fn is_attached(&self) -> bool {
        self.corpus.is_some()
    }

    /// Rename the document
    ///
    /// # Errors
    /// `ReadOnly` while the document belongs to a corpus (the name index would go stale).
    pub fn set_name(&mut self, name: Option<String>) -> Result<()> {
        if self.is_attached() {
            return Err(Error::ReadOnly("document name is fixed while in a corpus"));
        }
        self.name = name;
        Ok(())
    }

    /// Relabel the document
    ///
    /// # Errors
    /// `ReadOnly` while the document belongs to a corpus (cached statistics would go stale).
    pub fn set_label(&mut self, label: Option<Label>) -> Result<()> {
        if self.is_attached() {
            return Err(Error::ReadOnly("document type is fixed while in a corpus"));
        }
        self.label = label;
        Ok(())
    }

    /// Term frequency
    /// tf = count(word) / total count, 0.0 for an absent word
    pub fn term_frequency(&self, word: &str) -> f64 {
        let total = self.len();
        if total == 0.0 {
            return 0.0;
        }
        self.terms.term_count(word) / total
    }

    /// Plain TF vector, never cached
    pub fn tf_vector(&self) -> Vector {
        let mut builder = Vector::builder(Weighting::Tf);
        for (word, _) in self.terms.iter() {
            builder.insert(word, self.term_frequency(word));
        }
        builder.build()
    }

    /// The weighted vector
    /// The vector cached by the owning corpus, or the TF vector for a
    /// detached document. An attached document whose corpus has not weighted
    /// it yet degrades to TF without caching.
    pub fn vector(&self) -> Vector {
        if let Some(v) = self.vector.get() {
            return v.clone();
        }
        if self.is_attached() {
            return self.tf_vector();
        }
        self.vector.get_or_init(|| self.tf_vector()).clone()
    }

    /// Top keywords
    /// (weight, word) pairs with the highest weight, ties broken alphabetically.
    /// Weights are normalized to sum to 1.0.
    pub fn keywords(&self, top: usize) -> Vec<(f64, String)> {
        keywords(&self.vector(), top, true)
    }

    pub(crate) fn attach(&mut self, corpus: u64) {
        self.corpus = Some(corpus);
        self.vector = OnceCell::new();
    }

    pub(crate) fn detach(&mut self) {
        self.corpus = None;
        self.vector = OnceCell::new();
    }

    pub(crate) fn corpus_id(&self) -> Option<u64> {
        self.corpus
    }

    pub(crate) fn reset_vector(&mut self) {
        self.vector = OnceCell::new();
    }

    pub(crate) fn cached_vector(&self) -> &OnceCell<Vector> {
        &self.vector
    }

    pub(crate) fn restrict(&self, features: &std::collections::HashSet<&str>) -> Document {
        let terms = self
            .terms
            .iter()
            .filter(|(w, _)| features.contains(w))
            .collect::<TermFrequency>();
        let mut document = Document::from_terms(terms);
        document.name = self.name.clone();
        document.label = self.label.clone();
        document
    }
}

/// (weight, feature) pairs of a vector, highest weight first
pub(crate) fn keywords(vector: &Vector, top: usize, normalized: bool) -> Vec<(f64, String)> {
    let n = if normalized { vector.sum() } else { 1.0 };
    let n = if n == 0.0 { 1.0 } else { n };
    let mut v: Vec<(f64, String)> = vector.iter().map(|(w, f)| (f / n, w.to_string())).collect();
    v.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    v.truncate(top);
    v
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.label)
            .field("count", &self.len())
            .finish()
    }
}

pub(crate) fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace('_', " "))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_with_session_prefix() {
        let a = Document::from_text("cat");
        let b = Document::from_text("cat");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().split('-').next(), b.id().split('-').next());
    }

    #[test]
    fn tf_vector_sums_to_one() {
        let d = Document::from_text("the cat sat on the mat with another cat");
        let v = d.vector();
        assert_eq!(v.weighting(), Weighting::Tf);
        assert!((v.sum() - 1.0).abs() < 1e-12);
        assert!((d.term_frequency("cat") - 0.5).abs() < 1e-12);
        assert_eq!(d.term_frequency("dog"), 0.0);
    }

    #[test]
    fn accepts_every_input_shape() {
        let options = AnalyzerOptions::default();
        let tokens = Document::new(["cat", "dog", "cat"], &options).unwrap();
        assert_eq!(tokens.terms().term_count("cat"), 2.0);

        let mut counts = IndexMap::new();
        counts.insert("wings".to_string(), 2.0);
        let counted = Document::new(counts, &options).unwrap();
        assert_eq!(counted.len(), 2.0);

        let vector = Vector::new(Weighting::Tf, [("fur", 1.0), ("claws", 0.0)]);
        let from_vector = Document::new(vector, &options).unwrap();
        assert!(from_vector.contains("fur"));
        assert!(!from_vector.contains("claws"));

        let tagged = Document::new(vec![Word::new("Cats").with_lemma("cat")], &options).unwrap();
        assert!(tagged.contains("cats"));
    }

    #[test]
    fn rejects_negative_counts() {
        let mut counts = IndexMap::new();
        counts.insert("x".to_string(), -1.0);
        let err = Document::new(counts, &AnalyzerOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let mut counts = IndexMap::new();
        counts.insert("cat".to_string(), 2.0);
        counts.insert("purr".to_string(), 0.5);
        let d = Document::new(counts, &AnalyzerOptions::default())
            .unwrap()
            .with_name("two\nlines")
            .with_label("pet");
        d.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("@name: two\\nlines"));
        assert!(text.contains("cat 2\n"));
        assert!(text.contains("purr 0.500\n"));

        let loaded = Document::load(&path).unwrap();
        assert_eq!(loaded.name(), Some("two\nlines"));
        assert_eq!(loaded.label(), Some(&Label::from("pet")));
        assert_eq!(loaded.vector(), d.vector());
    }

    #[test]
    fn keywords_are_normalized_and_sorted() {
        let d = Document::from_text("cat cat cat dog dog bird");
        let k = d.keywords(2);
        assert_eq!(k.len(), 2);
        assert_eq!(k[0].1, "cat");
        assert!((k[0].0 - 0.5).abs() < 1e-12);
        assert_eq!(k[1].1, "dog");
    }

    #[test]
    fn copy_is_detached_with_new_id() {
        let d = Document::from_text("cat").with_name("a");
        let c = d.copy();
        assert_ne!(c.id(), d.id());
        assert_eq!(c.name(), Some("a"));
        assert_ne!(c, d);
    }
}
