use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::utils::math::distance::{centroid, Distance, DistanceMap};
use crate::utils::rng;
use crate::vectorizer::vector::Vector;

/// Initial assignment of vectors to clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Seeding {
    /// Shuffle and deal the vectors round-robin over the clusters
    Random,
    /// k-means++: centers drawn proportionally to the squared distance to the
    /// nearest center chosen so far, keeping the best of a few local trials
    #[default]
    KMeansPlusPlus,
}

/// k-means configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters, `round(sqrt(n / 2))` when `None`
    pub k: Option<usize>,
    /// Maximum number of reassignment rounds
    pub iterations: usize,
    pub distance: Distance,
    pub seeding: Seeding,
    /// Relaxation of the triangle inequality bound
    /// A point is only compared with center `j` when
    /// `p/2 · d(center_i, center_j) < d(point, center_i)`.
    /// 1.0 is the exact bound; smaller values compare more often.
    pub p: f64,
    pub seed: Option<u64>,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            k: None,
            iterations: 10,
            distance: Distance::Cosine,
            seeding: Seeding::KMeansPlusPlus,
            p: 0.8,
            seed: None,
        }
    }
}

/// Default number of clusters for `n` vectors
pub fn default_k(n: usize) -> usize {
    ((n as f64) / 2.0).sqrt().round() as usize
}

/// k-means clustering
/// Returns `k` groups of positions into `vectors` (groups may be empty).
/// With `k < 2` everything is returned in one group.
pub fn k_means(vectors: &[Vector], config: &KMeansConfig) -> Vec<Vec<usize>> {
    let n = vectors.len();
    let k = config.k.unwrap_or_else(|| default_k(n));
    if k < 2 {
        return vec![(0..n).collect()];
    }
    let mut rng = rng::seeded(config.seed);
    let mut distances = DistanceMap::new(config.distance);

    let mut assignment = match config.seeding {
        Seeding::Random => random_partition(n, k, &mut rng),
        Seeding::KMeansPlusPlus => kmpp(vectors, k, &mut distances, &mut rng),
    };

    let half_p = 0.5 * config.p;
    let mut converged = false;
    let mut rounds = 0;
    let mut moves = 0;
    while !converged && rounds < config.iterations {
        rounds += 1;
        let centroids: Vec<Vector> = (0..k)
            .map(|c| centroid((0..n).filter(|&i| assignment[i] == c).map(|i| &vectors[i])))
            .collect();
        let mut bound = vec![vec![0.0; k]; k];
        for i in 0..k {
            for j in (i + 1)..k {
                let d = half_p * distances.distance(&centroids[i], &centroids[j]);
                bound[i][j] = d;
                bound[j][i] = d;
            }
        }

        converged = true;
        let mut moved = 0;
        for (v, current) in vectors.iter().zip(assignment.iter_mut()) {
            let i = *current;
            let mut nearest = i;
            let mut d1 = distances.distance(v, &centroids[i]);
            for j in 0..k {
                if j != i && bound[i][j] < d1 {
                    let d2 = distances.distance(v, &centroids[j]);
                    if d2 < d1 {
                        nearest = j;
                        d1 = d2;
                    }
                }
            }
            if nearest != i {
                *current = nearest;
                moved += 1;
                converged = false;
            }
        }
        moves += moved;
        trace!(round = rounds, moved, "k-means reassignment");
    }
    if converged {
        debug!(k, rounds, moves, "k-means converged");
    } else {
        warn!(k, rounds, moves, "k-means stopped before convergence");
    }

    let mut groups = vec![Vec::new(); k];
    for (i, c) in assignment.into_iter().enumerate() {
        groups[c].push(i);
    }
    groups
}

/// Shuffled round-robin assignment
fn random_partition<R: Rng>(n: usize, k: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let mut assignment = vec![0; n];
    for (slot, i) in order.into_iter().enumerate() {
        assignment[i] = slot % k;
    }
    assignment
}

/// k-means++ seeding, then assignment to the nearest center
fn kmpp<R: Rng>(vectors: &[Vector], k: usize, distances: &mut DistanceMap, rng: &mut R) -> Vec<usize> {
    let n = vectors.len();
    if n == 0 {
        return Vec::new();
    }
    let trials = 2 + (k as f64).ln() as usize;
    let mut centers = vec![rng.gen_range(0..n)];
    let mut weights: Vec<f64> = vectors
        .iter()
        .map(|v| squared(distances.distance(v, &vectors[centers[0]])))
        .collect();
    let mut potential: f64 = weights.iter().sum();

    while centers.len() < k.min(n) {
        let mut best: Option<(f64, usize)> = None;
        for _ in 0..trials {
            let candidate = if potential > 0.0 {
                weighted_choice(&weights, rng.gen::<f64>() * potential)
            } else {
                rng.gen_range(0..n)
            };
            let sum: f64 = vectors
                .iter()
                .zip(&weights)
                .map(|(v, w)| w.min(squared(distances.distance(v, &vectors[candidate]))))
                .sum();
            if best.map_or(true, |(s, _)| sum < s) {
                best = Some((sum, candidate));
            }
        }
        let Some((sum, chosen)) = best else { break };
        centers.push(chosen);
        for (v, w) in vectors.iter().zip(weights.iter_mut()) {
            *w = w.min(squared(distances.distance(v, &vectors[chosen])));
        }
        potential = sum;
    }

    vectors
        .iter()
        .map(|v| {
            let mut nearest = 0;
            let mut d0 = f64::INFINITY;
            for (c, &center) in centers.iter().enumerate() {
                let d = distances.distance(v, &vectors[center]);
                if d < d0 {
                    nearest = c;
                    d0 = d;
                }
            }
            nearest
        })
        .collect()
}

/// Index `i` such that `w0 + ... + w(i-1) < y <= w0 + ... + wi`
fn weighted_choice(weights: &[f64], mut y: f64) -> usize {
    for (i, &w) in weights.iter().enumerate() {
        if y <= w && w > 0.0 {
            return i;
        }
        y -= w;
    }
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(0)
}

#[inline]
fn squared(d: f64) -> f64 {
    d * d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Weighting;

    fn v(pairs: &[(&str, f64)]) -> Vector {
        Vector::new(Weighting::Tf, pairs.iter().map(|&(k, w)| (k, w)))
    }

    fn animals() -> Vec<Vector> {
        vec![
            v(&[("wings", 0.0), ("claws", 1.0), ("fur", 1.0)]),
            v(&[("wings", 0.0), ("claws", 0.0), ("fur", 1.0)]),
            v(&[("wings", 1.0), ("beak", 1.0), ("claws", 1.0)]),
        ]
    }

    fn separated(groups: &[Vec<usize>]) -> bool {
        let mut groups: Vec<Vec<usize>> = groups.iter().filter(|g| !g.is_empty()).cloned().collect();
        groups.sort();
        groups == vec![vec![0, 1], vec![2]]
    }

    #[test]
    fn default_k_from_size() {
        assert_eq!(default_k(2), 1);
        assert_eq!(default_k(8), 2);
        assert_eq!(default_k(50), 5);
    }

    #[test]
    fn fewer_than_two_clusters_is_one_group() {
        let config = KMeansConfig {
            k: Some(1),
            ..Default::default()
        };
        assert_eq!(k_means(&animals(), &config), vec![vec![0, 1, 2]]);
        assert_eq!(k_means(&animals()[..2], &KMeansConfig::default()), vec![vec![0, 1]]);
    }

    #[test]
    fn kmpp_separates_mammals_from_birds() {
        let vectors = animals();
        let mut correct = 0;
        for seed in 0..20 {
            let config = KMeansConfig {
                k: Some(2),
                seed: Some(seed),
                ..Default::default()
            };
            let first = k_means(&vectors, &config);
            assert_eq!(first, k_means(&vectors, &config));
            assert_eq!(first.len(), 2);
            if separated(&first) {
                correct += 1;
            }
        }
        assert!(correct >= 17, "separated with {correct} of 20 seeds");
    }

    #[test]
    fn random_seeding_keeps_every_vector() {
        let vectors: Vec<Vector> = (0..12).map(|i| v(&[("x", i as f64), ("y", 1.0)])).collect();
        let config = KMeansConfig {
            k: Some(3),
            seeding: Seeding::Random,
            distance: Distance::Euclidean,
            seed: Some(9),
            ..Default::default()
        };
        let groups = k_means(&vectors, &config);
        assert_eq!(groups.len(), 3);
        let mut all: Vec<usize> = groups.concat();
        all.sort();
        assert_eq!(all, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn weighted_choice_walks_cumulative_weights() {
        assert_eq!(weighted_choice(&[0.0, 1.0, 3.0], 0.5), 1);
        assert_eq!(weighted_choice(&[0.0, 1.0, 3.0], 1.5), 2);
        assert_eq!(weighted_choice(&[0.0, 1.0, 3.0], 9.0), 2);
    }
}
