use std::collections::{BTreeMap, HashMap};

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::{majority, Classifier, Example};
use crate::utils::rng;
use crate::vectorizer::label::Label;
use crate::vectorizer::vector::Vector;

/// Weight of one (feature, class) pair with its running total for averaging
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct Weight {
    value: f64,
    total: f64,
    /// instance count at the last update
    stamp: f64,
}

impl Weight {
    fn update(&mut self, delta: f64, now: f64) {
        self.total += (now - self.stamp) * self.value;
        self.stamp = now;
        self.value += delta;
    }

    fn average(&self, now: f64) -> f64 {
        if now == 0.0 {
            return self.value;
        }
        (self.total + (now - self.stamp) * self.value) / now
    }
}

/// Averaged multi-class perceptron
/// Online: every `train` is one update, moving the weights of the true class
/// toward the input and those of the wrongly predicted class away from it.
/// Classification uses the weights averaged over all updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perceptron {
    iterations: usize,
    seed: Option<u64>,
    classes: BTreeMap<Label, f64>,
    weights: HashMap<String, BTreeMap<Label, Weight>>,
    instances: f64,
}

impl Default for Perceptron {
    fn default() -> Self {
        Self::new(5, None)
    }
}

impl Perceptron {
    /// # Arguments
    /// * `iterations` - passes over the data in `fit`
    /// * `seed` - seed of the shuffle between passes
    pub fn new(iterations: usize, seed: Option<u64>) -> Self {
        Perceptron {
            iterations,
            seed,
            classes: BTreeMap::new(),
            weights: HashMap::new(),
            instances: 0.0,
        }
    }

    /// Train on labeled examples for several shuffled passes
    /// Unlabeled examples are skipped.
    pub fn fit<I, E>(&mut self, examples: I)
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
        let mut random = rng::seeded(self.seed);
        for _ in 0..self.iterations {
            data.shuffle(&mut random);
            for (vector, label) in &data {
                self.train_vector(vector, label.clone());
            }
        }
        debug!(
            examples = data.len(),
            iterations = self.iterations,
            features = self.weights.len(),
            "perceptron fitted"
        );
    }

    /// Averaged score per class
    fn scores(&self, vector: &Vector, averaged: bool) -> BTreeMap<&Label, f64> {
        let mut scores: BTreeMap<&Label, f64> = self.classes.keys().map(|l| (l, 0.0)).collect();
        for (feature, x) in vector.iter() {
            let Some(weights) = self.weights.get(feature) else { continue };
            for (label, w) in weights {
                let w = if averaged { w.average(self.instances) } else { w.value };
                if let Some(score) = scores.get_mut(label) {
                    *score += x * w;
                }
            }
        }
        scores
    }

    fn best(scores: BTreeMap<&Label, f64>) -> Option<Label> {
        majority(scores)
    }
}

impl Classifier for Perceptron {
    fn train_vector(&mut self, vector: &Vector, label: Label) {
        let predicted = Self::best(self.scores(vector, false));
        *self.classes.entry(label.clone()).or_insert(0.0) += 1.0;
        self.instances += 1.0;
        if predicted.as_ref() == Some(&label) {
            return;
        }
        let now = self.instances;
        for (feature, x) in vector.iter() {
            let weights = self.weights.entry(feature.to_string()).or_default();
            weights.entry(label.clone()).or_default().update(x, now);
            if let Some(wrong) = &predicted {
                weights.entry(wrong.clone()).or_default().update(-x, now);
            }
        }
    }

    fn classify_vector(&self, vector: &Vector) -> Option<Label> {
        Self::best(self.scores(vector, true))
    }

    fn classes(&self) -> Vec<Label> {
        self.classes.keys().cloned().collect()
    }

    fn features(&self) -> Vec<String> {
        let mut features: Vec<String> = self.weights.keys().cloned().collect();
        features.sort();
        features
    }

    fn fresh(&self) -> Self {
        Self::new(self.iterations, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaged_weights() {
        let mut w = Weight::default();
        w.update(1.0, 1.0);
        assert_eq!(w.average(1.0), 0.0);
        assert_eq!(w.average(3.0), 2.0 / 3.0);
    }

    #[test]
    fn spam_and_ham_online() {
        let mut p = Perceptron::default();
        assert_eq!(p.classify("win money"), None);
        p.train_as("win money", "spam");
        p.train_as("fix bug", "ham");
        p.train_as("win money", "spam");
        assert_eq!(p.classify("win money"), Some(Label::from("spam")));
        assert_eq!(p.classify("fix bug"), Some(Label::from("ham")));
    }

    #[test]
    fn fit_separates_topics() {
        let examples = [
            ("win money now", "spam"),
            ("claim your free money", "spam"),
            ("win a free prize", "spam"),
            ("fix the failing bug", "ham"),
            ("review the patch", "ham"),
            ("bug fix merged", "ham"),
        ];
        let mut p = Perceptron::new(10, Some(3));
        p.fit(examples);
        assert_eq!(p.classify("free money"), Some(Label::from("spam")));
        assert_eq!(p.classify("patch the bug"), Some(Label::from("ham")));
        assert_eq!(p.classes().len(), 2);
        assert!(p.features().contains(&"prize".to_string()));
    }
}
