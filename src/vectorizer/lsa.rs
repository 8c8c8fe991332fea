use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::utils::math::svd::svd;
use crate::vectorizer::document::DocumentId;
use crate::vectorizer::vector::Vector;
use crate::vectorizer::Weighting;

static NEXT_LSA_ID: AtomicU64 = AtomicU64::new(1);

fn next_lsa_id() -> u64 {
    NEXT_LSA_ID.fetch_add(1, Ordering::Relaxed)
}

/// Number of concepts kept by a reduction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Reduction {
    /// Exactly `k` concepts, `1 <= k < documents`
    Dimensions(usize),
    /// Rounded Euclidean norm of the singular value spectrum
    #[default]
    Norm,
    /// At most 300 concepts
    Top300,
}

impl Reduction {
    /// Check that the reduction can be applied to `documents` documents
    ///
    /// # Errors
    /// `Dimension` for fewer than two documents, or an explicit `k` that is
    /// 0 or not strictly less than the number of documents.
    pub fn check(&self, documents: usize) -> Result<()> {
        let requested = match self {
            Reduction::Dimensions(k) => *k,
            Reduction::Norm | Reduction::Top300 => 1,
        };
        if documents < 2 || requested == 0 || requested >= documents {
            return Err(Error::Dimension {
                requested,
                documents,
            });
        }
        Ok(())
    }
}

/// Latent semantic analysis
/// Truncated SVD of the document × feature matrix: `A ≈ U · Σ · Vᵗ`.
///
/// - each document's concept vector is its row of `U`, keyed by concept index ("0", "1", ...)
/// - each concept is a row of `Vᵗ`, a feature -> weight map
/// - an unseen vector `v` is embedded as `Σ⁻¹ · Vᵗ · v`
#[derive(Clone, Serialize, Deserialize)]
pub struct Lsa {
    #[serde(skip, default = "next_lsa_id")]
    id: u64,
    weighting: Weighting,
    features: IndexSet<String>,
    sigma: Array1<f64>,
    vt: Array2<f64>,
    #[serde(with = "indexmap::map::serde_seq")]
    vectors: IndexMap<DocumentId, Vector>,
}

impl Lsa {
    /// Decompose the given document vectors
    ///
    /// # Arguments
    /// * `features` - column order of the matrix
    /// * `rows` - (document id, vector) per document
    /// * `weighting` - weighting of the resulting concept vectors
    /// * `reduction` - number of concepts to keep
    ///
    /// # Errors
    /// `Dimension`, see `Reduction::check`. Checked before any computation.
    pub fn fit(
        features: Vec<String>,
        rows: Vec<(DocumentId, Vector)>,
        weighting: Weighting,
        reduction: Reduction,
    ) -> Result<Self> {
        let n = rows.len();
        reduction.check(n)?;

        let features: IndexSet<String> = features.into_iter().collect();
        let mut matrix = Array2::<f64>::zeros((n, features.len()));
        for (i, (_, vector)) in rows.iter().enumerate() {
            for (feature, weight) in vector.iter() {
                if let Some(j) = features.get_index_of(feature) {
                    matrix[[i, j]] = weight;
                }
            }
        }

        let decomposition = svd(&matrix);
        let k = match reduction {
            Reduction::Dimensions(k) => k,
            Reduction::Norm => {
                let norm = decomposition.sigma.dot(&decomposition.sigma).sqrt();
                (norm.round() as usize).clamp(1, n - 1)
            }
            Reduction::Top300 => 300usize.clamp(1, n - 1),
        };
        let sigma = decomposition.sigma.slice(ndarray::s![..k]).to_owned();
        let vt = decomposition.vt.slice(ndarray::s![..k, ..]).to_owned();
        let u = decomposition.u.slice(ndarray::s![.., ..k]).to_owned();
        debug!(documents = n, features = features.len(), k, sigma = ?sigma.to_vec(), "lsa reduced");

        let vectors = rows
            .into_iter()
            .zip(u.axis_iter(Axis(0)))
            .map(|((id, _), row)| {
                let concept = Vector::new(
                    weighting,
                    row.iter().enumerate().map(|(j, &w)| (j.to_string(), w)),
                );
                (id, concept)
            })
            .collect();

        Ok(Lsa {
            id: next_lsa_id(),
            weighting,
            features,
            sigma,
            vt,
            vectors,
        })
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of concepts
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.sigma.len()
    }

    pub fn singular_values(&self) -> &[f64] {
        self.sigma.as_slice().unwrap_or(&[])
    }

    /// Features of the decomposed matrix, in column order
    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.as_str())
    }

    /// Concept vector of a decomposed document
    pub fn vector(&self, id: &str) -> Option<&Vector> {
        self.vectors.get(id)
    }

    /// Concept vectors of all decomposed documents, in corpus order
    pub fn vectors(&self) -> &IndexMap<DocumentId, Vector> {
        &self.vectors
    }

    /// Concepts as feature -> weight vectors, strongest concept first
    pub fn concepts(&self) -> Vec<Vector> {
        self.vt
            .axis_iter(Axis(0))
            .map(|row| {
                Vector::new(
                    self.weighting,
                    self.features.iter().zip(row.iter()).map(|(f, &w)| (f.as_str(), w)),
                )
            })
            .collect()
    }

    /// Features with the highest weight in a concept
    /// Empty for an unknown concept index.
    pub fn keywords(&self, concept: usize, top: usize) -> Vec<(f64, String)> {
        if concept >= self.dimensions() {
            return Vec::new();
        }
        let mut v: Vec<(f64, String)> = self
            .vt
            .row(concept)
            .iter()
            .zip(self.features.iter())
            .map(|(&w, f)| (w, f.clone()))
            .collect();
        v.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        v.truncate(top);
        v
    }

    /// Embed a vector in concept space
    /// `Σ⁻¹ · Vᵗ · v`; features unknown to the decomposition are ignored.
    pub fn transform(&self, vector: &Vector) -> Vector {
        let mut v = Array1::<f64>::zeros(self.features.len());
        for (feature, weight) in vector.iter() {
            if let Some(j) = self.features.get_index_of(feature) {
                v[j] = weight;
            }
        }
        let projected = self.vt.dot(&v);
        Vector::new(
            self.weighting,
            projected
                .iter()
                .zip(self.sigma.iter())
                .enumerate()
                .map(|(j, (&p, &s))| (j.to_string(), if s.abs() < 1e-12 { 0.0 } else { p / s })),
        )
    }

    /// Concept vector of a document, decomposed or not
    /// Documents outside the decomposition are embedded once and kept in `cache`.
    pub fn concept_vector(&self, id: &str, vector: &Vector, cache: &TransformCache) -> Vector {
        match self.vectors.get(id) {
            Some(v) => v.clone(),
            None => cache.get_or_insert_with(self.id, id, || self.transform(vector)),
        }
    }
}

impl std::fmt::Debug for Lsa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lsa")
            .field("id", &self.id)
            .field("dimensions", &self.dimensions())
            .field("features", &self.features.len())
            .field("documents", &self.vectors.len())
            .finish()
    }
}

/// Concept vectors of documents outside a decomposition
/// Keyed by (decomposition id, document id). Entries are only ever added:
/// corpus invalidation does not touch this cache.
#[derive(Debug, Default)]
pub struct TransformCache {
    vectors: RefCell<HashMap<(u64, DocumentId), Vector>>,
}

impl TransformCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_insert_with<F>(&self, lsa: u64, id: &str, f: F) -> Vector
    where
        F: FnOnce() -> Vector,
    {
        let key = (lsa, id.to_string());
        if let Some(v) = self.vectors.borrow().get(&key) {
            return v.clone();
        }
        let v = f();
        self.vectors.borrow_mut().insert(key, v.clone());
        v
    }

    pub fn len(&self) -> usize {
        self.vectors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> (Vec<String>, Vec<(DocumentId, Vector)>) {
        let features = ["cat", "purr", "dog", "bark"].iter().map(|s| s.to_string()).collect();
        let v = |pairs: &[(&str, f64)]| Vector::new(Weighting::Tf, pairs.iter().map(|&(k, w)| (k, w)));
        let rows = vec![
            ("a".to_string(), v(&[("cat", 1.0), ("purr", 1.0)])),
            ("b".to_string(), v(&[("cat", 1.0), ("purr", 0.5)])),
            ("c".to_string(), v(&[("dog", 1.0), ("bark", 1.0)])),
            ("d".to_string(), v(&[("dog", 0.5), ("bark", 1.0)])),
        ];
        (features, rows)
    }

    #[test]
    fn explicit_k_must_be_below_document_count() {
        let (features, rows) = rows();
        let err = Lsa::fit(features.clone(), rows.clone(), Weighting::Tf, Reduction::Dimensions(4)).unwrap_err();
        assert!(matches!(err, Error::Dimension { requested: 4, documents: 4 }));
        assert!(Lsa::fit(features, rows, Weighting::Tf, Reduction::Dimensions(0)).is_err());
    }

    #[test]
    fn transform_of_a_training_row_matches_its_concept_vector() {
        let (features, rows) = rows();
        let lsa = Lsa::fit(features, rows.clone(), Weighting::Tf, Reduction::Dimensions(2)).unwrap();
        assert_eq!(lsa.dimensions(), 2);
        let t = lsa.transform(&rows[0].1);
        let u = lsa.vector("a").unwrap();
        for j in 0..2 {
            let key = j.to_string();
            assert!((t.weight(&key) - u.weight(&key)).abs() < 1e-9);
        }
    }

    #[test]
    fn concepts_separate_topics() {
        let (features, rows) = rows();
        let lsa = Lsa::fit(features, rows, Weighting::Tf, Reduction::Dimensions(2)).unwrap();
        let a = lsa.vector("a").unwrap();
        let b = lsa.vector("b").unwrap();
        let c = lsa.vector("c").unwrap();
        assert!(a.cosine_similarity(b) > 0.99);
        assert!(a.cosine_similarity(c).abs() < 1e-6);
        let top: Vec<String> = lsa.keywords(0, 2).into_iter().map(|(_, f)| f).collect();
        assert_eq!(top.len(), 2);
        assert_eq!(lsa.concepts().len(), 2);
    }

    #[test]
    fn transform_cache_is_append_only() {
        let (features, rows) = rows();
        let lsa = Lsa::fit(features, rows, Weighting::Tf, Reduction::Norm).unwrap();
        let cache = TransformCache::new();
        let q = Vector::new(Weighting::Tf, [("cat", 1.0)]);
        let first = lsa.concept_vector("q", &q, &cache);
        let second = lsa.concept_vector("q", &Vector::empty(Weighting::Tf), &cache);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        lsa.concept_vector("a", &q, &cache);
        assert_eq!(cache.len(), 1);
    }
}
