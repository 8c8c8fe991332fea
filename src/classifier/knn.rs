use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::classifier::{majority, Classifier};
use crate::utils::math::distance::Distance;
use crate::utils::rng;
use crate::vectorizer::label::Label;
use crate::vectorizer::vector::Vector;

/// Distance standing in for an exact match in inverse-distance weighting
const MIN_DISTANCE: f64 = 1e-10;

/// k-nearest neighbor classifier
/// Votes of the `k` closest training vectors, each weighted by its inverse
/// distance. Ties between labels are broken at random. Under cosine distance
/// only training vectors sharing a feature with the input are neighbors, and
/// when there are none the most frequent class wins.
#[derive(Debug, Serialize, Deserialize)]
pub struct Knn {
    k: usize,
    distance: Distance,
    seed: Option<u64>,
    examples: Vec<(Vector, Label)>,
    classes: BTreeMap<Label, f64>,
    #[serde(skip)]
    rng: RefCell<Option<ChaCha8Rng>>,
}

impl Default for Knn {
    fn default() -> Self {
        Self::new(10, Distance::Cosine, None)
    }
}

impl Clone for Knn {
    fn clone(&self) -> Self {
        Knn {
            k: self.k,
            distance: self.distance,
            seed: self.seed,
            examples: self.examples.clone(),
            classes: self.classes.clone(),
            rng: RefCell::new(None),
        }
    }
}

impl Knn {
    pub fn new(k: usize, distance: Distance, seed: Option<u64>) -> Self {
        Knn {
            k,
            distance,
            seed,
            examples: Vec::new(),
            classes: BTreeMap::new(),
            rng: RefCell::new(None),
        }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Most frequent trained class
    pub fn baseline(&self) -> Option<Label> {
        majority(self.classes.iter().map(|(l, &n)| (l, n)))
    }

    /// Inverse-distance votes per label for a vector
    pub fn votes(&self, vector: &Vector) -> BTreeMap<Label, f64> {
        let mut neighbors: Vec<(f64, &Label)> = self
            .examples
            .iter()
            .filter(|(v, _)| self.distance != Distance::Cosine || v.features().any(|f| vector.contains(f)))
            .map(|(v, l)| (self.distance.measure(vector, v), l))
            .collect();
        neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
        neighbors.truncate(self.k);
        let mut votes = BTreeMap::new();
        for (d, label) in neighbors {
            *votes.entry(label.clone()).or_insert(0.0) += 1.0 / d.max(MIN_DISTANCE);
        }
        votes
    }

    fn pick(&self, tied: &[&Label]) -> Option<Label> {
        if tied.len() < 2 {
            return tied.first().map(|l| (*l).clone());
        }
        let mut state = self.rng.borrow_mut();
        let random = state.get_or_insert_with(|| rng::seeded(self.seed));
        tied.choose(random).map(|l| (*l).clone())
    }
}

impl Classifier for Knn {
    fn train_vector(&mut self, vector: &Vector, label: Label) {
        *self.classes.entry(label.clone()).or_insert(0.0) += 1.0;
        self.examples.push((vector.clone(), label));
    }

    fn classify_vector(&self, vector: &Vector) -> Option<Label> {
        let votes = self.votes(vector);
        let Some(best) = votes.values().copied().reduce(f64::max) else {
            return self.baseline();
        };
        let tied: Vec<&Label> = votes
            .iter()
            .filter(|(_, v)| (best - **v).abs() <= best * 1e-12)
            .map(|(l, _)| l)
            .collect();
        self.pick(&tied)
    }

    fn classes(&self) -> Vec<Label> {
        self.classes.keys().cloned().collect()
    }

    fn features(&self) -> Vec<String> {
        let features: HashSet<&str> = self.examples.iter().flat_map(|(v, _)| v.features()).collect();
        let mut features: Vec<String> = features.into_iter().map(str::to_string).collect();
        features.sort();
        features
    }

    fn fresh(&self) -> Self {
        Self::new(self.k, self.distance, self.seed)
    }
}
