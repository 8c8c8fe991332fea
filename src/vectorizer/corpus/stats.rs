use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::vectorizer::corpus::Corpus;
use crate::vectorizer::label::Label;

/// Smoothing weight for features missing from the second distribution
const KL_SMOOTHING: f64 = 0.001;

/// Feature ranking used by `Corpus::feature_selection`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureSelection {
    /// Entropy reduction of the class distribution
    #[default]
    InformationGain,
    /// Fraction of documents containing the feature
    DocumentFrequency,
}

/// Statistical feature ranking over labeled documents
impl Corpus {
    /// Information gain of a word, in bits
    /// H(C) - P(w)·H(C|w) - P(¬w)·H(C|¬w) over the labeled documents.
    /// 0.0 for an unknown word or a corpus without labels.
    pub fn information_gain(&self, word: &str) -> f64 {
        if self.cache.information_gain.borrow().is_none() {
            let ig = self.compute_information_gain();
            *self.cache.information_gain.borrow_mut() = Some(ig);
        }
        self.cache
            .information_gain
            .borrow()
            .as_ref()
            .and_then(|ig| ig.get(word).copied())
            .unwrap_or(0.0)
    }

    fn compute_information_gain(&self) -> HashMap<String, f64> {
        let labeled: Vec<_> = self
            .raw_documents()
            .filter_map(|d| d.label().map(|l| (d, l)))
            .collect();
        let n = labeled.len() as f64;
        let mut gain = HashMap::new();
        if labeled.is_empty() {
            return gain;
        }

        let mut classes: HashMap<&Label, f64> = HashMap::new();
        let mut with: HashMap<&str, HashMap<&Label, f64>> = HashMap::new();
        for &(document, label) in &labeled {
            *classes.entry(label).or_insert(0.0) += 1.0;
            for word in document.terms().term_set_iter() {
                *with.entry(word).or_default().entry(label).or_insert(0.0) += 1.0;
            }
        }
        let h = entropy(classes.values().copied());
        for (word, present) in with {
            let n_w: f64 = present.values().sum();
            let absent = classes
                .iter()
                .map(|(label, count)| count - present.get(label).copied().unwrap_or(0.0));
            let ig = h
                - (n_w / n) * entropy(present.values().copied())
                - ((n - n_w) / n) * entropy(absent);
            gain.insert(word.to_string(), ig);
        }
        gain
    }

    /// Kullback-Leibler divergence between the term distributions of two documents
    /// Σ p(w)·ln(p(w) / q(w)) over the words of the first document; words
    /// missing from the second count with a small smoothing weight.
    /// Cached per ordered pair.
    pub fn kullback_leibler_divergence(&self, a: &str, b: &str) -> Result<f64> {
        let da = self.require(a)?;
        let db = self.require(b)?;
        let key = (a.to_string(), b.to_string());
        if let Some(d) = self.cache.divergence.borrow().get(&key) {
            return Ok(*d);
        }
        let p = da.tf_vector();
        let q = db.tf_vector();
        let d: f64 = p
            .iter()
            .filter(|(_, pw)| *pw > 0.0)
            .map(|(w, pw)| {
                let qw = q.get(w).filter(|qw| *qw > 0.0).unwrap_or(KL_SMOOTHING);
                pw * (pw / qw).ln()
            })
            .sum();
        self.cache.divergence.borrow_mut().insert(key, d);
        Ok(d)
    }

    /// The `top` features ranked by the given method
    /// Highest score first, ties in alphabetical order.
    pub fn feature_selection(&self, top: usize, method: FeatureSelection) -> Vec<String> {
        let mut ranked: Vec<(f64, String)> = self
            .features()
            .into_iter()
            .map(|f| {
                let score = match method {
                    FeatureSelection::InformationGain => self.information_gain(&f),
                    FeatureSelection::DocumentFrequency => self.document_frequency(&f),
                };
                (score, f)
            })
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        ranked.into_iter().take(top).map(|(_, f)| f).collect()
    }
}

/// Shannon entropy in bits of a distribution given by counts
fn entropy<I>(counts: I) -> f64
where
    I: Iterator<Item = f64> + Clone,
{
    let total: f64 = counts.clone().sum();
    if total == 0.0 {
        return 0.0;
    }
    counts
        .filter(|c| *c > 0.0)
        .map(|c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::document::Document;

    fn labeled() -> Corpus {
        Corpus::from_documents([
            Document::from_text("win money now").with_label("spam"),
            Document::from_text("win prize money").with_label("spam"),
            Document::from_text("fix bug today").with_label("ham"),
            Document::from_text("review bug fix").with_label("ham"),
            Document::from_text("unlabeled money"),
        ])
    }

    #[test]
    fn entropy_in_bits() {
        assert_eq!(entropy([1.0, 1.0].into_iter()), 1.0);
        assert_eq!(entropy([4.0, 0.0].into_iter()), 0.0);
        assert_eq!(entropy(std::iter::empty()), 0.0);
    }

    #[test]
    fn information_gain_ranks_discriminative_words() {
        let corpus = labeled();
        assert!((corpus.information_gain("money") - 1.0).abs() < 1e-12);
        assert!((corpus.information_gain("bug") - 1.0).abs() < 1e-12);
        assert!(corpus.information_gain("prize") < corpus.information_gain("win"));
        assert_eq!(corpus.information_gain("absent"), 0.0);

        let top = corpus.feature_selection(4, FeatureSelection::InformationGain);
        assert_eq!(top, vec!["bug", "fix", "money", "win"]);
        let common = corpus.feature_selection(1, FeatureSelection::DocumentFrequency);
        assert_eq!(common, vec!["money"]);
    }

    #[test]
    fn divergence_is_zero_for_identical_and_cached_per_ordered_pair() {
        let corpus = labeled();
        let ids: Vec<String> = corpus.ids().map(str::to_string).collect();
        assert!(corpus.kullback_leibler_divergence(&ids[0], &ids[0]).unwrap().abs() < 1e-12);
        let ab = corpus.kullback_leibler_divergence(&ids[0], &ids[2]).unwrap();
        assert!(ab > 0.0);
        corpus.kullback_leibler_divergence(&ids[2], &ids[0]).unwrap();
        assert_eq!(corpus.cache.divergence.borrow().len(), 3);
    }
}
