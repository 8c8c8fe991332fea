use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::vectorizer::vector::Vector;

/// Distance metrics between sparse vectors
/// Missing features count as 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Distance {
    /// 1 - cosine similarity
    #[default]
    Cosine,
    /// Squared Euclidean distance
    Euclidean,
    /// Sum of absolute differences
    Manhattan,
    /// Fraction of features whose weights differ
    Hamming,
}

impl Distance {
    /// Distance between two vectors
    pub fn measure(&self, a: &Vector, b: &Vector) -> f64 {
        match self {
            Distance::Cosine => 1.0 - a.cosine_similarity(b),
            Distance::Euclidean => union_fold(a, b, |x, y| (x - y) * (x - y)),
            Distance::Manhattan => union_fold(a, b, |x, y| (x - y).abs()),
            Distance::Hamming => {
                let n = union(a, b).count();
                if n == 0 {
                    return 0.0;
                }
                union_fold(a, b, |x, y| if x != y { 1.0 } else { 0.0 }) / n as f64
            }
        }
    }
}

fn union<'a>(a: &'a Vector, b: &'a Vector) -> impl Iterator<Item = &'a str> {
    a.features().chain(b.features().filter(move |f| !a.contains(f)))
}

fn union_fold<F>(a: &Vector, b: &Vector, f: F) -> f64
where
    F: Fn(f64, f64) -> f64,
{
    union(a, b).map(|k| f(a.weight(k), b.weight(k))).sum()
}

/// Memoized pairwise distances
/// Keyed by the unordered pair of vector ids, alive for one algorithm run.
#[derive(Debug, Clone)]
pub struct DistanceMap {
    metric: Distance,
    cache: HashMap<(u64, u64), f64>,
}

impl DistanceMap {
    pub fn new(metric: Distance) -> Self {
        DistanceMap {
            metric,
            cache: HashMap::new(),
        }
    }

    #[inline]
    pub fn metric(&self) -> Distance {
        self.metric
    }

    /// Distance between two vectors, computed once per pair
    pub fn distance(&mut self, a: &Vector, b: &Vector) -> f64 {
        if a.id() == b.id() {
            return 0.0;
        }
        let key = if a.id() < b.id() { (a.id(), b.id()) } else { (b.id(), a.id()) };
        let metric = self.metric;
        *self.cache.entry(key).or_insert_with(|| metric.measure(a, b))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

/// Mean vector
/// Averages every feature over all given vectors (absent features count as 0.0).
/// An empty input yields an empty vector.
pub fn centroid<'a, I>(vectors: I) -> Vector
where
    I: IntoIterator<Item = &'a Vector>,
{
    let mut n = 0usize;
    let mut weighting = None;
    let mut sums: indexmap::IndexMap<String, f64> = indexmap::IndexMap::new();
    for v in vectors {
        n += 1;
        weighting.get_or_insert(v.weighting());
        for (f, w) in v.iter() {
            *sums.entry(f.to_string()).or_insert(0.0) += w;
        }
    }
    let weighting = weighting.unwrap_or_default();
    if n == 0 {
        return Vector::empty(weighting);
    }
    sums.values_mut().for_each(|w| *w /= n as f64);
    Vector::from_map(weighting, sums)
}

/// Sorted union of features of the given vectors
pub fn features<'a, I>(vectors: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Vector>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for v in vectors {
        for f in v.features() {
            if seen.insert(f) {
                out.push(f.to_string());
            }
        }
    }
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Weighting;

    fn v(pairs: &[(&str, f64)]) -> Vector {
        Vector::new(Weighting::Tf, pairs.iter().map(|&(k, w)| (k, w)))
    }

    #[test]
    fn metrics() {
        let a = v(&[("x", 1.0), ("y", 2.0)]);
        let b = v(&[("y", 4.0), ("z", 1.0)]);
        assert_eq!(Distance::Euclidean.measure(&a, &b), 1.0 + 4.0 + 1.0);
        assert_eq!(Distance::Manhattan.measure(&a, &b), 1.0 + 2.0 + 1.0);
        assert!((Distance::Hamming.measure(&a, &b) - 1.0).abs() < 1e-12);
        assert!(Distance::Cosine.measure(&a, &a).abs() < 1e-12);
        assert!((Distance::Cosine.measure(&v(&[("p", 1.0)]), &v(&[("q", 1.0)])) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distance_map_caches_unordered_pairs() {
        let a = v(&[("x", 1.0)]);
        let b = v(&[("x", 3.0)]);
        let mut map = DistanceMap::new(Distance::Euclidean);
        assert_eq!(map.distance(&a, &b), 4.0);
        assert_eq!(map.distance(&b, &a), 4.0);
        assert_eq!(map.len(), 1);
        assert_eq!(map.distance(&a, &a), 0.0);
    }

    #[test]
    fn centroid_averages_union() {
        let c = centroid([&v(&[("x", 2.0)]), &v(&[("y", 4.0)])]);
        assert_eq!(c.weight("x"), 1.0);
        assert_eq!(c.weight("y"), 2.0);
        assert!(centroid(std::iter::empty()).is_empty());
    }
}
