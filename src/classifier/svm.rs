use std::cell::RefCell;
use std::fmt::Debug;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classifier::{Classifier, Example};
use crate::error::Result;
use crate::vectorizer::label::Label;
use crate::vectorizer::vector::Vector;

/// Sparse vector in solver form: (1-based feature index, value), by index
pub type SparseRow = Vec<(usize, f64)>;

/// SVM kernel
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Kernel {
    #[default]
    Linear,
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
    Radial { gamma: f64 },
}

/// Solver hyperparameters, passed through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvmParams {
    pub kernel: Kernel,
    /// Cost of misclassification
    pub cost: f64,
    /// Bias term, negative for none
    pub bias: f64,
    /// Ask the solver for class probability estimates
    pub probability: bool,
}

impl Default for SvmParams {
    fn default() -> Self {
        SvmParams {
            kernel: Kernel::Linear,
            cost: 1.0,
            bias: -1.0,
            probability: false,
        }
    }
}

/// External SVM solver
pub trait SvmSolver {
    /// Train a model
    ///
    /// # Arguments
    /// * `labels` - class number per row
    /// * `rows` - sparse rows, same order as `labels`
    /// * `params` - hyperparameters
    fn train(&self, labels: &[f64], rows: &[SparseRow], params: &SvmParams) -> Result<Box<dyn SvmModel>>;
}

/// Trained solver model
pub trait SvmModel: Debug {
    /// Predicted class number
    fn predict(&self, row: &SparseRow) -> f64;

    /// (class number, probability) pairs, when the model estimates them
    fn probabilities(&self, _row: &SparseRow) -> Option<Vec<(f64, f64)>> {
        None
    }
}

/// Support vector machine backed by an external solver
/// Keeps the training data and marshals it to the solver's numeric form:
/// features become 1-based indices in first-seen order, labels become class
/// numbers in first-seen order. The model is (re)trained lazily on the first
/// `classify` after a change, and after `load` since models are not persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct Svm<S> {
    params: SvmParams,
    features: IndexSet<String>,
    classes: IndexSet<Label>,
    rows: Vec<(usize, SparseRow)>,
    #[serde(skip)]
    solver: S,
    #[serde(skip)]
    model: RefCell<Option<Box<dyn SvmModel>>>,
}

impl<S> Svm<S>
where
    S: SvmSolver,
{
    pub fn new(solver: S, params: SvmParams) -> Self {
        Svm {
            params,
            features: IndexSet::new(),
            classes: IndexSet::new(),
            rows: Vec::new(),
            solver,
            model: RefCell::new(None),
        }
    }

    #[inline]
    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    /// Whether a trained model is at hand
    pub fn is_trained(&self) -> bool {
        self.model.borrow().is_some()
    }

    /// Train the solver now instead of on the next `classify`
    ///
    /// # Errors
    /// `Solver` as reported by the solver.
    pub fn finalize(&self) -> Result<()> {
        if self.rows.is_empty() || self.is_trained() {
            return Ok(());
        }
        let labels: Vec<f64> = self.rows.iter().map(|(c, _)| *c as f64).collect();
        let rows: Vec<SparseRow> = self.rows.iter().map(|(_, r)| r.clone()).collect();
        let model = self.solver.train(&labels, &rows, &self.params)?;
        debug!(rows = rows.len(), features = self.features.len(), classes = self.classes.len(), "svm trained");
        *self.model.borrow_mut() = Some(model);
        Ok(())
    }

    /// Sparse solver row of a vector, unknown features dropped
    pub fn row(&self, vector: &Vector) -> SparseRow {
        let mut row: SparseRow = vector
            .iter()
            .filter_map(|(f, w)| self.features.get_index_of(f).map(|i| (i + 1, w)))
            .collect();
        row.sort_by_key(|(i, _)| *i);
        row
    }

    fn class(&self, number: f64) -> Option<Label> {
        if number < 0.0 {
            return None;
        }
        self.classes.get_index(number.round() as usize).cloned()
    }

    fn trained(&self) -> bool {
        match self.finalize() {
            Ok(()) => self.is_trained(),
            Err(e) => {
                warn!(error = %e, "svm training failed");
                false
            }
        }
    }

    /// Class probabilities, when the solver estimates them
    pub fn probabilities<E: Into<Example>>(&self, example: E) -> Option<Vec<(Label, f64)>> {
        if !self.trained() {
            return None;
        }
        let row = self.row(&example.into().vector);
        let model = self.model.borrow();
        let estimates = model.as_ref()?.probabilities(&row)?;
        Some(
            estimates
                .into_iter()
                .filter_map(|(c, p)| self.class(c).map(|l| (l, p)))
                .collect(),
        )
    }
}

impl<S> Classifier for Svm<S>
where
    S: SvmSolver + Clone,
{
    fn train_vector(&mut self, vector: &Vector, label: Label) {
        let (class, _) = self.classes.insert_full(label);
        for (feature, _) in vector.iter() {
            self.features.insert(feature.to_string());
        }
        let row = self.row(vector);
        self.rows.push((class, row));
        *self.model.get_mut() = None;
    }

    fn classify_vector(&self, vector: &Vector) -> Option<Label> {
        if !self.trained() {
            return None;
        }
        let row = self.row(vector);
        let number = self.model.borrow().as_ref()?.predict(&row);
        self.class(number)
    }

    fn classes(&self) -> Vec<Label> {
        self.classes.iter().cloned().collect()
    }

    fn features(&self) -> Vec<String> {
        self.features.iter().cloned().collect()
    }

    fn fresh(&self) -> Self {
        Svm::new(self.solver.clone(), self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Nearest class mean in solver space
    #[derive(Debug, Clone, Default)]
    struct CentroidSolver {
        calls: Rc<Cell<usize>>,
        fail: bool,
    }

    #[derive(Debug)]
    struct CentroidModel {
        means: Vec<(f64, Vec<(usize, f64)>)>,
    }

    impl SvmSolver for CentroidSolver {
        fn train(&self, labels: &[f64], rows: &[SparseRow], _params: &SvmParams) -> Result<Box<dyn SvmModel>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::Solver("no convergence".into()));
            }
            let mut means: Vec<(f64, Vec<(usize, f64)>)> = Vec::new();
            for (label, row) in labels.iter().zip(rows) {
                assert!(row.iter().all(|(i, _)| *i >= 1));
                match means.iter_mut().find(|(l, _)| l == label) {
                    Some((_, m)) => m.extend(row.iter().copied()),
                    None => means.push((*label, row.clone())),
                }
            }
            Ok(Box::new(CentroidModel { means }))
        }
    }

    impl SvmModel for CentroidModel {
        fn predict(&self, row: &SparseRow) -> f64 {
            let overlap = |m: &Vec<(usize, f64)>| {
                row.iter()
                    .map(|(i, w)| m.iter().filter(|(j, _)| j == i).map(|(_, v)| v * w).sum::<f64>())
                    .sum::<f64>()
            };
            self.means
                .iter()
                .map(|(l, m)| (overlap(m), *l))
                .fold((f64::NEG_INFINITY, -1.0), |best, x| if x.0 > best.0 { x } else { best })
                .1
        }

        fn probabilities(&self, row: &SparseRow) -> Option<Vec<(f64, f64)>> {
            let best = self.predict(row);
            Some(self.means.iter().map(|(l, _)| (*l, if *l == best { 1.0 } else { 0.0 })).collect())
        }
    }

    fn trained(solver: CentroidSolver) -> Svm<CentroidSolver> {
        let mut svm = Svm::new(solver, SvmParams::default());
        svm.train_as("win money", "spam");
        svm.train_as("fix bug", "ham");
        svm
    }

    #[test]
    fn marshals_one_based_indices() {
        let svm = trained(CentroidSolver::default());
        assert_eq!(svm.features(), vec!["win", "money", "fix", "bug"]);
        let row = svm.row(&Vector::new(Default::default(), [("bug", 2.0), ("win", 1.0), ("new", 5.0)]));
        assert_eq!(row, vec![(1, 1.0), (4, 2.0)]);
    }

    #[test]
    fn trains_lazily_and_classifies() {
        let calls = Rc::new(Cell::new(0));
        let mut svm = trained(CentroidSolver { calls: calls.clone(), fail: false });
        assert!(!svm.is_trained());
        assert_eq!(svm.classify("win money"), Some(Label::from("spam")));
        assert_eq!(svm.classify("fix bug"), Some(Label::from("ham")));
        assert_eq!(calls.get(), 1);
        svm.train_as("free money", "spam");
        assert!(!svm.is_trained());
        let p = svm.probabilities("money").unwrap();
        assert_eq!(p, vec![(Label::from("spam"), 1.0), (Label::from("ham"), 0.0)]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn solver_failure_means_no_opinion() {
        let svm = trained(CentroidSolver { calls: Rc::default(), fail: true });
        assert_eq!(svm.classify("win money"), None);
        assert!(matches!(svm.finalize(), Err(Error::Solver(_))));
    }

    #[test]
    fn retrains_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svm.cbor");
        let svm = trained(CentroidSolver::default());
        svm.finalize().unwrap();
        svm.save(&path).unwrap();
        let loaded: Svm<CentroidSolver> = Svm::load(&path).unwrap();
        assert!(!loaded.is_trained());
        assert_eq!(loaded.classify("fix bug"), Some(Label::from("ham")));
        assert!(loaded.is_trained());
    }
}
