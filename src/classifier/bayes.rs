use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::classifier::Classifier;
use crate::vectorizer::label::Label;
use crate::vectorizer::vector::Vector;

/// Multinomial naive Bayes
/// Features are assumed independent given the class. Log-space scoring with
/// additive smoothing `alpha`; features never seen in training are ignored.
///
/// With `aligned`, a feature is only counted at the position it was trained
/// at (useful for fixed-length token lists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayes {
    aligned: bool,
    alpha: f64,
    /// examples per class
    classes: BTreeMap<Label, f64>,
    /// class -> (feature, position) -> summed weight
    weights: BTreeMap<Label, HashMap<(String, usize), f64>>,
    /// class -> summed weight of all its features
    totals: BTreeMap<Label, f64>,
    vocabulary: HashSet<(String, usize)>,
    count: f64,
}

impl Default for NaiveBayes {
    fn default() -> Self {
        Self::new(false, 1.0)
    }
}

impl NaiveBayes {
    pub fn new(aligned: bool, alpha: f64) -> Self {
        NaiveBayes {
            aligned,
            alpha,
            classes: BTreeMap::new(),
            weights: BTreeMap::new(),
            totals: BTreeMap::new(),
            vocabulary: HashSet::new(),
            count: 0.0,
        }
    }

    #[inline]
    pub fn aligned(&self) -> bool {
        self.aligned
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn key(&self, feature: &str, position: usize) -> (String, usize) {
        (feature.to_string(), if self.aligned { position } else { 0 })
    }

    /// Log posterior per class, up to a shared constant
    pub fn log_scores(&self, vector: &Vector) -> Vec<(f64, Label)> {
        let v = self.vocabulary.len() as f64;
        let keys: Vec<((String, usize), f64)> = vector
            .iter()
            .enumerate()
            .map(|(i, (f, w))| (self.key(f, i), w))
            .filter(|(k, _)| self.vocabulary.contains(k))
            .collect();
        self.classes
            .iter()
            .map(|(label, n)| {
                let weights = self.weights.get(label);
                let denominator = self.totals.get(label).copied().unwrap_or(0.0) + self.alpha * v;
                let mut score = (n / self.count).ln();
                for (key, w) in &keys {
                    let count = weights.and_then(|m| m.get(key)).copied().unwrap_or(0.0);
                    score += w * ((count + self.alpha) / denominator).ln();
                }
                (score, label.clone())
            })
            .collect()
    }
}

impl Classifier for NaiveBayes {
    fn train_vector(&mut self, vector: &Vector, label: Label) {
        *self.classes.entry(label.clone()).or_insert(0.0) += 1.0;
        self.count += 1.0;
        for (i, (feature, weight)) in vector.iter().enumerate() {
            let key = self.key(feature, i);
            self.vocabulary.insert(key.clone());
            *self.weights.entry(label.clone()).or_default().entry(key).or_insert(0.0) += weight;
            *self.totals.entry(label.clone()).or_insert(0.0) += weight;
        }
    }

    fn classify_vector(&self, vector: &Vector) -> Option<Label> {
        self.log_scores(vector)
            .into_iter()
            .fold(None::<(f64, Label)>, |best, (s, l)| match best {
                Some((b, _)) if b >= s => best,
                _ => Some((s, l)),
            })
            .map(|(_, l)| l)
    }

    fn classes(&self) -> Vec<Label> {
        self.classes.keys().cloned().collect()
    }

    fn features(&self) -> Vec<String> {
        let mut features: Vec<String> = self
            .vocabulary
            .iter()
            .map(|(f, _)| f.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        features.sort();
        features
    }

    fn fresh(&self) -> Self {
        Self::new(self.aligned, self.alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Example;

    #[test]
    fn untrained_has_no_opinion() {
        let nb = NaiveBayes::default();
        assert_eq!(nb.classify("win money"), None);
        assert!(nb.classes().is_empty());
    }

    #[test]
    fn spam_and_ham() {
        let mut nb = NaiveBayes::default();
        nb.train_as("win money", "spam");
        nb.train_as("fix bug", "ham");
        assert_eq!(nb.classify("win money"), Some(Label::from("spam")));
        assert_eq!(nb.classify("fix bug"), Some(Label::from("ham")));
        assert_eq!(nb.classes(), vec![Label::from("ham"), Label::from("spam")]);
        assert_eq!(nb.features(), vec!["bug", "fix", "money", "win"]);
        assert!(!nb.binary());
    }

    #[test]
    fn aligned_counts_positions() {
        let mut nb = NaiveBayes::new(true, 0.1);
        nb.train_as(["red", "apple"], "fruit");
        nb.train_as(["apple", "red"], "color");
        assert_eq!(nb.classify(["red", "apple"]), Some(Label::from("fruit")));
        assert_eq!(nb.classify(["apple", "red"]), Some(Label::from("color")));

        let mut plain = nb.fresh();
        assert!(plain.aligned());
        plain.train_as(Example::from(["x"]), true);
        assert_eq!(plain.classes(), vec![Label::Bool(true)]);
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nb.cbor");
        let mut nb = NaiveBayes::default();
        nb.train_as("win money", true);
        nb.train_as("fix bug", false);
        nb.save(&path).unwrap();
        let loaded = NaiveBayes::load(&path).unwrap();
        assert!(loaded.binary());
        assert_eq!(loaded.classify("money"), Some(Label::Bool(true)));
    }
}
