use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::vectorizer::corpus::Corpus;

/// Set of items, kept sorted
pub type Itemset = BTreeSet<String>;

/// Frequent itemsets of a collection of transactions
/// Level-wise: frequent singletons first, then every level joins two frequent
/// itemsets sharing all but their last item, drops candidates with an
/// infrequent subset, and counts the rest. Stops when a level comes up empty.
///
/// # Arguments
/// * `transactions` - each transaction is a collection of items, duplicates ignored
/// * `support` - minimum relative frequency in `[0, 1]`
///
/// # Returns
/// * itemset -> fraction of transactions containing it
pub fn apriori<I, T, S>(transactions: I, support: f64) -> BTreeMap<Itemset, f64>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = S>,
    S: Into<String>,
{
    let transactions: Vec<Itemset> = transactions
        .into_iter()
        .map(|t| t.into_iter().map(Into::into).collect())
        .collect();
    let mut frequent = BTreeMap::new();
    if transactions.is_empty() {
        return frequent;
    }
    let n = transactions.len() as f64;

    let mut candidates: BTreeSet<Itemset> = transactions
        .iter()
        .flatten()
        .map(|item| BTreeSet::from([item.clone()]))
        .collect();
    let mut level = 1;
    while !candidates.is_empty() {
        let survivors: BTreeMap<Itemset, f64> = candidates
            .into_iter()
            .filter_map(|set| {
                let count = transactions.iter().filter(|t| set.is_subset(t)).count() as f64;
                let frequency = count / n;
                (frequency >= support).then_some((set, frequency))
            })
            .collect();
        debug!(level, itemsets = survivors.len(), "apriori level");
        candidates = join(&survivors);
        frequent.extend(survivors);
        level += 1;
    }
    frequent
}

/// Candidates one item larger than the given level
fn join(level: &BTreeMap<Itemset, f64>) -> BTreeSet<Itemset> {
    let sets: Vec<&Itemset> = level.keys().collect();
    let mut candidates = BTreeSet::new();
    for (i, a) in sets.iter().enumerate() {
        for b in &sets[i + 1..] {
            let (Some(last_a), Some(last_b)) = (a.last(), b.last()) else { continue };
            if a.iter().rev().skip(1).ne(b.iter().rev().skip(1)) {
                continue;
            }
            let mut candidate = (*a).clone();
            candidate.insert(last_b.clone());
            debug_assert_ne!(last_a, last_b);
            let pruned = candidate.iter().any(|item| {
                let mut subset = candidate.clone();
                subset.remove(item);
                !level.contains_key(&subset)
            });
            if !pruned {
                candidates.insert(candidate);
            }
        }
    }
    candidates
}

impl Corpus {
    /// Feature sets shared by at least `support` of the documents
    pub fn frequent_features(&self, support: f64) -> BTreeMap<Itemset, f64> {
        apriori(
            self.documents().map(|d| d.terms().term_set_iter().collect::<Vec<_>>()),
            support,
        )
    }
}
