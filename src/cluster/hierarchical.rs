use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::{Cluster, Node};
use crate::utils::math::distance::{centroid, Distance, DistanceMap};
use crate::utils::rng;
use crate::vectorizer::vector::Vector;

/// Agglomerative clustering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalConfig {
    /// Number of top-level groups to stop at
    pub k: usize,
    /// Maximum number of merges
    pub iterations: usize,
    pub distance: Distance,
    /// Seed of the initial shuffle
    pub seed: Option<u64>,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        HierarchicalConfig {
            k: 1,
            iterations: 1000,
            distance: Distance::Cosine,
            seed: None,
        }
    }
}

/// Agglomerative hierarchical clustering
/// Repeatedly merges the two clusters whose centroids are closest into a
/// nested cluster, until `k` top-level elements remain or the merge budget
/// runs out. Items are positions into `vectors`.
///
/// Each merge compares every pair of current clusters, so the whole run is
/// cubic in the number of vectors: fine for hundreds, slow for thousands.
pub fn hierarchical(vectors: &[Vector], config: &HierarchicalConfig) -> Cluster<usize> {
    let mut order: Vec<usize> = (0..vectors.len()).collect();
    order.shuffle(&mut rng::seeded(config.seed));

    let mut clusters: Vec<Node<usize>> = order.iter().map(|&i| Node::Leaf(i)).collect();
    let mut centroids: Vec<Vector> = order.iter().map(|&i| vectors[i].clone()).collect();
    let mut distances = DistanceMap::new(config.distance);
    let k = config.k.max(1);

    let mut merges = 0;
    while merges < config.iterations && clusters.len() > k {
        let mut nearest = (0, 1);
        let mut d0 = f64::INFINITY;
        for i in 0..centroids.len() {
            for j in (i + 1)..centroids.len() {
                let d = distances.distance(&centroids[i], &centroids[j]);
                if d < d0 {
                    nearest = (i, j);
                    d0 = d;
                }
            }
        }
        let (i, j) = nearest;
        let b = clusters.remove(j);
        centroids.remove(j);
        let a = clusters.remove(i);
        centroids.remove(i);
        let merged = Cluster::new(vec![a, b]);
        centroids.push(centroid(merged.leaves().into_iter().map(|&leaf| &vectors[leaf])));
        clusters.push(Node::Cluster(merged));
        merges += 1;
    }
    debug!(
        vectors = vectors.len(),
        merges,
        groups = clusters.len(),
        cached = distances.len(),
        "hierarchical clustering done"
    );
    Cluster::new(clusters)
}
