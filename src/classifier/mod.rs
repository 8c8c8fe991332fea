pub mod bayes;
pub mod knn;
pub mod perceptron;
pub mod svm;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::rng;
use crate::vectorizer::document::Document;
use crate::vectorizer::label::{self, Label};
use crate::vectorizer::vector::Vector;
use crate::vectorizer::Weighting;

pub use bayes::NaiveBayes;
pub use knn::Knn;
pub use perceptron::Perceptron;
pub use svm::{Kernel, Svm, SvmModel, SvmParams, SvmSolver};

/// Input of `train` and `classify`
/// Term counts of a document, text or token list, or an explicit vector,
/// with an optional label.
#[derive(Debug, Clone)]
pub struct Example {
    pub vector: Vector,
    pub label: Option<Label>,
}

impl Example {
    pub fn new(vector: Vector) -> Self {
        Example { vector, label: None }
    }

    pub fn with_label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }
}

fn counts(document: &Document) -> Vector {
    Vector::new(Weighting::Tf, document.terms().iter())
}

impl From<&Document> for Example {
    fn from(document: &Document) -> Self {
        Example {
            vector: counts(document),
            label: document.label().cloned(),
        }
    }
}

impl From<Document> for Example {
    fn from(document: Document) -> Self {
        Example::from(&document)
    }
}

impl From<&str> for Example {
    fn from(text: &str) -> Self {
        Example::new(counts(&Document::from_text(text)))
    }
}

impl From<Vector> for Example {
    fn from(vector: Vector) -> Self {
        Example::new(vector)
    }
}

/// Each distinct token counts once
impl From<&[&str]> for Example {
    fn from(tokens: &[&str]) -> Self {
        Example::new(Vector::new(Weighting::Tf, tokens.iter().map(|&t| (t, 1.0))))
    }
}

impl<const N: usize> From<[&str; N]> for Example {
    fn from(tokens: [&str; N]) -> Self {
        Example::from(&tokens[..])
    }
}

impl From<IndexMap<String, f64>> for Example {
    fn from(map: IndexMap<String, f64>) -> Self {
        Example::new(Vector::new(Weighting::Tf, map))
    }
}

/// Features in alphabetical order
impl From<HashMap<String, f64>> for Example {
    fn from(map: HashMap<String, f64>) -> Self {
        let mut pairs: Vec<(String, f64)> = map.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        Example::new(Vector::new(Weighting::Tf, pairs))
    }
}

impl<E, L> From<(E, L)> for Example
where
    E: Into<Example>,
    L: Into<Label>,
{
    fn from((example, label): (E, L)) -> Self {
        example.into().with_label(label)
    }
}

/// Holdout / cross-validation options of `Classifier::test`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOptions {
    /// Share of the examples used for training when `folds` is 1
    pub fraction: f64,
    /// Number of folds; 1 for a single holdout split
    pub folds: usize,
    /// Seed of the shuffle before splitting
    pub seed: Option<u64>,
}

impl Default for TestOptions {
    fn default() -> Self {
        TestOptions {
            fraction: 0.65,
            folds: 1,
            seed: None,
        }
    }
}

/// Evaluation result
/// Precision, recall and F1 are only defined for binary problems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub accuracy: f64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

impl Score {
    #[inline]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[inline]
    pub fn precision(&self) -> Option<f64> {
        self.precision
    }

    #[inline]
    pub fn recall(&self) -> Option<f64> {
        self.recall
    }

    #[inline]
    pub fn f1(&self) -> Option<f64> {
        self.f1
    }
}

impl From<Score> for (f64, Option<f64>, Option<f64>, Option<f64>) {
    fn from(s: Score) -> Self {
        (s.accuracy, s.precision, s.recall, s.f1)
    }
}

/// Classifier
/// Untrained until the first `train`; `classify` answers `None` until then.
///
/// Implementors provide the vector-level operations, inputs are converted
/// to `Example`s by the provided methods.
pub trait Classifier: Sized {
    /// Incorporate one labeled vector
    fn train_vector(&mut self, vector: &Vector, label: Label);

    /// Predicted label of a vector, `None` while untrained
    fn classify_vector(&self, vector: &Vector) -> Option<Label>;

    /// Trained labels
    fn classes(&self) -> Vec<Label>;

    /// Trained features
    fn features(&self) -> Vec<String>;

    /// Untrained classifier with the same options
    fn fresh(&self) -> Self;

    /// Train with an example carrying its own label
    ///
    /// # Errors
    /// `MalformedInput` when the example has no label.
    fn train<E: Into<Example>>(&mut self, example: E) -> Result<()> {
        let example = example.into();
        let label = example
            .label
            .ok_or_else(|| Error::malformed("training example without label"))?;
        self.train_vector(&example.vector, label);
        Ok(())
    }

    /// Train with an explicit label, overriding the example's own
    fn train_as<E: Into<Example>, L: Into<Label>>(&mut self, example: E, label: L) {
        self.train_vector(&example.into().vector, label.into());
    }

    fn classify<E: Into<Example>>(&self, example: E) -> Option<Label> {
        self.classify_vector(&example.into().vector)
    }

    /// True iff trained on exactly two boolean-like classes
    fn binary(&self) -> bool {
        label::is_binary(&self.classes())
    }

    /// Save as CBOR
    fn save(&self, path: impl AsRef<Path>) -> Result<()>
    where
        Self: Serialize,
    {
        let writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: DeserializeOwned,
    {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_cbor::from_reader(reader)?)
    }

    /// Evaluate on labeled examples
    /// The examples are shuffled, then split into a training and a test part
    /// (`folds == 1`) or into `folds` folds, each tested against a fresh
    /// classifier trained on the others. Unlabeled examples are skipped, as are
    /// folds left without test examples. `fraction` is clamped to `[0, 1]`.
    fn test<I, E>(&self, examples: I, options: &TestOptions) -> Score
    where
        I: IntoIterator<Item = E>,
        E: Into<Example>,
    {
        let mut data: Vec<(Vector, Label)> = examples
            .into_iter()
            .filter_map(|e| {
                let e = e.into();
                e.label.map(|l| (e.vector, l))
            })
            .collect();
        data.shuffle(&mut rng::seeded(options.seed));

        let n = data.len();
        let binary = label::is_binary(data.iter().map(|(_, l)| l));
        let folds = options.folds.max(1);
        let fraction = options.fraction.clamp(0.0, 1.0);
        let mut sum = [0.0; 3];
        let mut evaluated = 0usize;
        for fold in 0..folds {
            let (i, j) = if folds == 1 {
                ((((n as f64) * fraction) as usize).min(n), n)
            } else {
                let t = n as f64 / folds as f64;
                (
                    (fold as f64 * t).round() as usize,
                    (fold as f64 * t + t).round() as usize,
                )
            };
            if i >= j {
                continue;
            }
            let mut classifier = self.fresh();
            for (vector, label) in data[..i].iter().chain(&data[j..]) {
                classifier.train_vector(vector, label.clone());
            }
            let confusion = Confusion::of(&classifier, &data[i..j], binary);
            let accuracy = confusion.accuracy();
            debug!(fold, train = n - (j - i), test = j - i, accuracy, "classifier fold");
            sum[0] += accuracy;
            sum[1] += confusion.precision();
            sum[2] += confusion.recall();
            evaluated += 1;
        }

        let [accuracy, precision, recall] = sum.map(|s| s / evaluated.max(1) as f64);
        if !binary {
            return Score {
                accuracy,
                precision: None,
                recall: None,
                f1: None,
            };
        }
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Score {
            accuracy,
            precision: Some(precision),
            recall: Some(recall),
            f1: Some(f1),
        }
    }
}

/// Counts of one test fold
#[derive(Debug, Default)]
struct Confusion {
    tp: usize,
    tn: usize,
    fp: usize,
    fn_: usize,
    binary: bool,
}

impl Confusion {
    fn of<C: Classifier>(classifier: &C, data: &[(Vector, Label)], binary: bool) -> Self {
        let mut c = Confusion {
            binary,
            ..Default::default()
        };
        for (vector, expected) in data {
            let predicted = classifier.classify_vector(vector);
            if binary {
                let actual = expected.polarity().unwrap_or(false);
                let guess = predicted.and_then(|p| p.polarity()).unwrap_or(false);
                match (actual, guess) {
                    (true, true) => c.tp += 1,
                    (false, false) => c.tn += 1,
                    (false, true) => c.fp += 1,
                    (true, false) => c.fn_ += 1,
                }
            } else if predicted.as_ref() == Some(expected) {
                c.tp += 1;
            } else {
                c.fn_ += 1;
            }
        }
        c
    }

    fn accuracy(&self) -> f64 {
        let correct = if self.binary { self.tp + self.tn } else { self.tp };
        ratio(correct, self.tp + self.tn + self.fp + self.fn_)
    }

    fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }
}

fn ratio(a: usize, b: usize) -> f64 {
    a as f64 / b.max(1) as f64
}

/// Most frequent label, ties to the smallest
pub(crate) fn majority<'a, I>(counts: I) -> Option<Label>
where
    I: IntoIterator<Item = (&'a Label, f64)>,
{
    counts
        .into_iter()
        .fold(None::<(&Label, f64)>, |best, (label, n)| match best {
            Some((b, m)) if m > n || (m == n && b <= label) => Some((b, m)),
            _ => Some((label, n)),
        })
        .map(|(label, _)| label.clone())
}
