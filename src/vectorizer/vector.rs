use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::vectorizer::Weighting;

static NEXT_VECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Sparse feature vector
/// A read-only mapping of feature -> weight.
///
/// A `Vector` can't be changed after it is built; every "mutation" returns a
/// modified copy with a fresh id. Cloning is cheap (the weights are shared).
///
/// - `id` is unique within the process and is what distance caches key on
/// - the L2 norm is computed on first use and kept
///
/// # Examples
/// ```
/// use tf_idf_corpus::{Vector, Weighting};
/// let v = Vector::new(Weighting::Tf, [("fur", 1.0), ("claws", 1.0)]);
/// assert_eq!(v.weight("fur"), 1.0);
/// let w = v.with("wings", 0.5);
/// assert!(!v.contains("wings"));
/// assert!(w.contains("wings"));
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(from = "VectorData", into = "VectorData")]
pub struct Vector {
    inner: Arc<VectorInner>,
}

struct VectorInner {
    id: u64,
    weighting: Weighting,
    weights: IndexMap<String, f64>,
    norm: OnceLock<f64>,
}

/// Serialized form of a `Vector` (ids are process-local and not persisted)
#[derive(Serialize, Deserialize, Clone)]
struct VectorData {
    weighting: Weighting,
    #[serde(with = "indexmap::map::serde_seq")]
    weights: IndexMap<String, f64>,
}

impl From<VectorData> for Vector {
    fn from(data: VectorData) -> Self {
        Vector::from_map(data.weighting, data.weights)
    }
}

impl From<Vector> for VectorData {
    fn from(vector: Vector) -> Self {
        VectorData {
            weighting: vector.inner.weighting,
            weights: vector.inner.weights.clone(),
        }
    }
}

impl Vector {
    /// Create a vector from (feature, weight) pairs
    /// Later pairs override earlier pairs with the same feature.
    pub fn new<I, K>(weighting: Weighting, weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let weights = weights.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self::from_map(weighting, weights)
    }

    pub(crate) fn from_map(weighting: Weighting, weights: IndexMap<String, f64>) -> Self {
        Vector {
            inner: Arc::new(VectorInner {
                id: NEXT_VECTOR_ID.fetch_add(1, Ordering::Relaxed),
                weighting,
                weights,
                norm: OnceLock::new(),
            }),
        }
    }

    /// Create an empty vector
    pub fn empty(weighting: Weighting) -> Self {
        Self::from_map(weighting, IndexMap::new())
    }

    /// Start building a vector
    pub fn builder(weighting: Weighting) -> VectorBuilder {
        VectorBuilder {
            weighting,
            weights: IndexMap::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    #[inline]
    pub fn weighting(&self) -> Weighting {
        self.inner.weighting
    }

    /// Get the weight of a feature, if present
    #[inline]
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.inner.weights.get(feature).copied()
    }

    /// Get the weight of a feature, 0.0 if absent
    #[inline]
    pub fn weight(&self, feature: &str) -> f64 {
        self.get(feature).unwrap_or(0.0)
    }

    #[inline]
    pub fn contains(&self, feature: &str) -> bool {
        self.inner.weights.contains_key(feature)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.weights.is_empty()
    }

    /// Iterate over (feature, weight) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.inner.weights.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.inner.weights.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.inner.weights.values().copied()
    }

    pub(crate) fn as_map(&self) -> &IndexMap<String, f64> {
        &self.inner.weights
    }

    /// Sum of all weights
    pub fn sum(&self) -> f64 {
        self.values().sum()
    }

    /// L2 norm (cached)
    /// sqrt(Σ w²)
    pub fn norm(&self) -> f64 {
        *self
            .inner
            .norm
            .get_or_init(|| self.values().map(|w| w * w).sum::<f64>().sqrt())
    }

    /// Dot product
    /// Iterates over the smaller of the two vectors.
    pub fn dot(&self, other: &Vector) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .iter()
            .filter_map(|(f, w)| large.get(f).map(|o| w * o))
            .sum()
    }

    /// Cosine similarity
    /// cosθ = A・B / (|A||B|)
    /// 0.0 if either vector has no weight.
    pub fn cosine_similarity(&self, other: &Vector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        self.dot(other) / denom
    }

    /// Copy with one feature set to the given weight
    pub fn with(&self, feature: &str, weight: f64) -> Vector {
        let mut weights = self.inner.weights.clone();
        weights.insert(feature.to_string(), weight);
        Self::from_map(self.weighting(), weights)
    }

    /// Copy without the given feature
    pub fn without(&self, feature: &str) -> Vector {
        let mut weights = self.inner.weights.clone();
        weights.shift_remove(feature);
        Self::from_map(self.weighting(), weights)
    }

    /// Copy whose weights sum to 1.0
    /// An all-zero vector is returned unchanged.
    pub fn normalized(&self) -> Vector {
        let sum = self.sum();
        if sum == 0.0 {
            return self.clone();
        }
        Self::from_map(
            self.weighting(),
            self.inner.weights.iter().map(|(k, v)| (k.clone(), v / sum)).collect(),
        )
    }

    /// Copy of this vector updated with the weights of `other`
    /// Only features already present in this vector are updated, no feature is added.
    ///
    /// # Errors
    /// `MalformedInput` when mixing a TF vector with a TF-IDF vector.
    pub fn project(&self, other: &Vector) -> Result<Vector> {
        if self.weighting() != other.weighting() {
            return Err(Error::malformed(format!(
                "mixing {:?} vector with {:?} vector",
                self.weighting(),
                other.weighting()
            )));
        }
        let mut weights = self.inner.weights.clone();
        for (feature, weight) in other.iter() {
            if let Some(w) = weights.get_mut(feature) {
                *w = weight;
            }
        }
        Ok(Self::from_map(self.weighting(), weights))
    }
}

impl PartialEq for Vector {
    /// Equal weights, regardless of id and insertion order
    fn eq(&self, other: &Self) -> bool {
        self.weighting() == other.weighting()
            && self.len() == other.len()
            && self.iter().all(|(f, w)| other.get(f) == Some(w))
    }
}

impl Debug for Vector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vector")
            .field("id", &self.id())
            .field("weighting", &self.weighting())
            .field("weights", &self.inner.weights)
            .finish()
    }
}

/// Builder that does all mutation before the `Vector` escapes
#[derive(Debug, Clone)]
pub struct VectorBuilder {
    weighting: Weighting,
    weights: IndexMap<String, f64>,
}

impl VectorBuilder {
    /// Set the weight of a feature
    pub fn insert(&mut self, feature: impl Into<String>, weight: f64) -> &mut Self {
        self.weights.insert(feature.into(), weight);
        self
    }

    /// Add to the weight of a feature
    pub fn add(&mut self, feature: &str, weight: f64) -> &mut Self {
        match self.weights.get_mut(feature) {
            Some(w) => *w += weight,
            None => {
                self.weights.insert(feature.to_string(), weight);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn build(self) -> Vector {
        Vector::from_map(self.weighting, self.weights)
    }
}
