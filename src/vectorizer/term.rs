use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Term counts of one document
/// Counts are `f64` so that explicit feature -> count mappings with
/// fractional weights can be stored as they are.
///
/// Terms keep their first-seen order.
///
/// # Examples
/// ```
/// use tf_idf_corpus::TermFrequency;
/// let mut term_freq = TermFrequency::new();
/// term_freq.add_term("term1");
/// term_freq.add_term("term2");
/// term_freq.add_term("term1");
///
/// assert_eq!(term_freq.term_count("term1"), 2.0);
/// assert_eq!(term_freq.term_sum(), 3.0);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TermFrequency {
    #[serde(with = "indexmap::map::serde_seq")]
    term_count: IndexMap<String, f64>,
    total_term_count: f64,
}

impl TermFrequency {
    pub fn new() -> Self {
        TermFrequency {
            term_count: IndexMap::new(),
            total_term_count: 0.0,
        }
    }

    #[inline]
    pub fn add_term(&mut self, term: &str) -> &mut Self {
        self.add_term_count(term, 1.0)
    }

    /// Add `count` occurrences of a term
    ///
    /// # Arguments
    /// * `term` - term
    /// * `count` - occurrences to add
    #[inline]
    pub fn add_term_count(&mut self, term: &str, count: f64) -> &mut Self {
        match self.term_count.get_mut(term) {
            Some(c) => *c += count,
            None => {
                self.term_count.insert(term.to_string(), count);
            }
        }
        self.total_term_count += count;
        self
    }

    /// Drop the terms matching `condition`, returning their summed count
    fn remove_terms_by<F>(&mut self, condition: F) -> f64
    where
        F: Fn(&str, f64) -> bool,
    {
        let mut removed_total_count = 0.0;
        self.term_count.retain(|term, count| {
            if condition(term, *count) {
                removed_total_count += *count;
                false
            } else {
                true
            }
        });
        self.total_term_count -= removed_total_count;
        removed_total_count
    }

    /// Prune rare terms
    /// Drops terms whose count is `<= threshold`, then keeps only the `top`
    /// most frequent terms (ties broken alphabetically).
    ///
    /// # Arguments
    /// * `threshold` - counts at or below this are dropped
    /// * `top` - number of most frequent terms to keep
    pub fn prune(&mut self, threshold: f64, top: Option<usize>) -> &mut Self {
        self.remove_terms_by(|_, count| count <= threshold);
        if let Some(top) = top {
            if self.term_count.len() > top {
                let keep: std::collections::HashSet<String> = self
                    .sorted_frequency_vector()
                    .into_iter()
                    .take(top)
                    .map(|(term, _)| term)
                    .collect();
                self.remove_terms_by(|term, _| !keep.contains(term));
            }
        }
        self
    }
}

impl<K> FromIterator<(K, f64)> for TermFrequency
where
    K: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut tf = TermFrequency::new();
        for (term, count) in iter {
            tf.add_term_count(term.as_ref(), count);
        }
        tf
    }
}

/// Read access
impl TermFrequency {
    /// (term, count) pairs in first-seen order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.term_count.iter().map(|(term, &count)| (term.as_str(), count))
    }

    /// Sum of all counts
    #[inline]
    pub fn term_sum(&self) -> f64 {
        self.total_term_count
    }

    /// Count of a term, 0.0 if absent
    #[inline]
    pub fn term_count(&self, term: &str) -> f64 {
        self.term_count.get(term).copied().unwrap_or(0.0)
    }

    #[inline]
    pub fn contains_term(&self, term: &str) -> bool {
        self.term_count.contains_key(term)
    }

    #[inline]
    pub fn term_set_iter(&self) -> impl Iterator<Item = &str> {
        self.term_count.keys().map(|s| s.as_str())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.term_count.is_empty()
    }

    /// Terms by descending count, equal counts alphabetically
    #[inline]
    pub fn sorted_frequency_vector(&self) -> Vec<(String, f64)> {
        let mut term_list: Vec<(String, f64)> = self
            .term_count
            .iter()
            .map(|(term, &count)| (term.clone(), count))
            .collect();

        term_list.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        term_list
    }

}
