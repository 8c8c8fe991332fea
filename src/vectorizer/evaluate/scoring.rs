use std::fmt::Debug;

/// Ranked search results
/// (score, item) pairs, usually (similarity, document).
pub struct Hits<K> {
    pub list: Vec<(f64, K)>,
}

impl<K> Hits<K> {
    pub fn new(vec: Vec<(f64, K)>) -> Self {
        Hits { list: vec }
    }

    /// Highest score first, equal scores keep their input order, NaN scores dropped
    pub fn sort_by_score(&mut self) -> &mut Self {
        self.list.retain(|(s, _)| !s.is_nan());
        self.list.sort_by(|a, b| b.0.total_cmp(&a.0));
        self
    }

    /// Keep the first `n` hits
    pub fn top(&mut self, n: usize) -> &mut Self {
        self.list.truncate(n);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(f64, K)> {
        self.list.iter()
    }
}

impl<K> IntoIterator for Hits<K> {
    type Item = (f64, K);
    type IntoIter = std::vec::IntoIter<(f64, K)>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

impl<K> Debug for Hits<K>
where
    K: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            writeln!(f, "Hits [")?;
            for (score, key) in &self.list {
                writeln!(f, "    {:.6}: {:?}", score, key)?;
            }
            write!(f, "]")
        } else {
            f.debug_list().entries(&self.list).finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_is_stable_and_drops_nan() {
        let mut hits = Hits::new(vec![(0.5, "a"), (f64::NAN, "x"), (0.9, "b"), (0.5, "c")]);
        hits.sort_by_score();
        let keys: Vec<&str> = hits.iter().map(|(_, k)| *k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        hits.top(2);
        assert_eq!(hits.len(), 2);
    }
}
