pub mod hierarchical;
pub mod kdtree;
pub mod kmeans;

use serde::{Deserialize, Serialize};

use crate::vectorizer::vector::Vector;

pub use hierarchical::HierarchicalConfig;
pub use kdtree::KdTree;
pub use kmeans::{KMeansConfig, Seeding};

/// Element of a cluster: an item or a nested cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node<T> {
    Leaf(T),
    Cluster(Cluster<T>),
}

/// Cluster
/// A possibly nested sequence of items.
///
/// k-means yields one level of nesting (one sub-cluster per group),
/// hierarchical clustering yields a tree of merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster<T> {
    items: Vec<Node<T>>,
}

impl<T> Default for Cluster<T> {
    fn default() -> Self {
        Cluster { items: Vec::new() }
    }
}

impl<T> Cluster<T> {
    pub fn new(items: Vec<Node<T>>) -> Self {
        Cluster { items }
    }

    /// Flat cluster of the given items
    pub fn from_leaves<I>(leaves: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        Cluster {
            items: leaves.into_iter().map(Node::Leaf).collect(),
        }
    }

    /// Top-level elements
    #[inline]
    pub fn items(&self) -> &[Node<T>] {
        &self.items
    }

    /// Number of top-level elements
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum nesting
    /// A flat cluster has depth 0.
    pub fn depth(&self) -> usize {
        self.items
            .iter()
            .filter_map(|n| match n {
                Node::Cluster(c) => Some(1 + c.depth()),
                Node::Leaf(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Expand nested clusters down to `depth` levels
    /// Clusters deeper than that are kept as they are.
    pub fn flatten(&self, depth: usize) -> Vec<&Node<T>> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                Node::Cluster(c) if depth > 0 => out.extend(c.flatten(depth - 1)),
                _ => out.push(item),
            }
        }
        out
    }

    /// Every item, at any depth, in order
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        for item in &self.items {
            match item {
                Node::Leaf(t) => out.push(t),
                Node::Cluster(c) => c.collect_leaves(out),
            }
        }
    }

    /// Visit this cluster and every nested cluster, pre-order
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&Cluster<T>),
    {
        self.traverse_with(&mut visit);
    }

    fn traverse_with<F>(&self, visit: &mut F)
    where
        F: FnMut(&Cluster<T>),
    {
        visit(self);
        for item in &self.items {
            if let Node::Cluster(c) = item {
                c.traverse_with(visit);
            }
        }
    }

    /// Nested clusters at the top level
    pub fn clusters(&self) -> impl Iterator<Item = &Cluster<T>> {
        self.items.iter().filter_map(|n| match n {
            Node::Cluster(c) => Some(c),
            Node::Leaf(_) => None,
        })
    }

    /// Same shape with every item mapped
    pub fn map<U, F>(self, mut f: F) -> Cluster<U>
    where
        F: FnMut(T) -> U,
    {
        self.map_with(&mut f)
    }

    fn map_with<U, F>(self, f: &mut F) -> Cluster<U>
    where
        F: FnMut(T) -> U,
    {
        Cluster {
            items: self
                .items
                .into_iter()
                .map(|n| match n {
                    Node::Leaf(t) => Node::Leaf(f(t)),
                    Node::Cluster(c) => Node::Cluster(c.map_with(f)),
                })
                .collect(),
        }
    }
}

/// Clustering algorithm with its configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterMethod {
    KMeans(KMeansConfig),
    Hierarchical(HierarchicalConfig),
}

impl Default for ClusterMethod {
    fn default() -> Self {
        ClusterMethod::KMeans(KMeansConfig::default())
    }
}

impl ClusterMethod {
    /// Cluster vectors, returning positions into `vectors`
    pub fn cluster_indices(&self, vectors: &[Vector]) -> Cluster<usize> {
        match self {
            ClusterMethod::KMeans(config) => {
                let groups = kmeans::k_means(vectors, config);
                Cluster::new(
                    groups
                        .into_iter()
                        .map(|g| Node::Cluster(Cluster::from_leaves(g)))
                        .collect(),
                )
            }
            ClusterMethod::Hierarchical(config) => hierarchical::hierarchical(vectors, config),
        }
    }

    /// Cluster vectors
    pub fn cluster(&self, vectors: Vec<Vector>) -> Cluster<Vector> {
        let shape = self.cluster_indices(&vectors);
        let mut slots: Vec<Option<Vector>> = vectors.into_iter().map(Some).collect();
        shape.map(|i| slots[i].take().unwrap_or_else(|| Vector::empty(Default::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Weighting;

    fn nested() -> Cluster<u32> {
        // Cluster(1, Cluster(2, Cluster(3, 4)))
        Cluster::new(vec![
            Node::Leaf(1),
            Node::Cluster(Cluster::new(vec![
                Node::Leaf(2),
                Node::Cluster(Cluster::from_leaves([3, 4])),
            ])),
        ])
    }

    #[test]
    fn depth_and_flatten() {
        let c = nested();
        assert_eq!(c.depth(), 2);
        assert_eq!(c.len(), 2);
        let one = c.flatten(1);
        assert_eq!(one.len(), 3);
        assert_eq!(one[0], &Node::Leaf(1));
        assert_eq!(one[1], &Node::Leaf(2));
        assert!(matches!(one[2], Node::Cluster(inner) if inner.len() == 2));
        assert_eq!(c.flatten(10).len(), 4);
        assert_eq!(c.leaves(), vec![&1, &2, &3, &4]);
        assert_eq!(Cluster::from_leaves([1]).depth(), 0);
    }

    #[test]
    fn traverse_is_pre_order() {
        let mut sizes = Vec::new();
        nested().traverse(|c| sizes.push(c.leaves().len()));
        assert_eq!(sizes, vec![4, 3, 2]);
    }

    #[test]
    fn map_keeps_shape() {
        let c = nested().map(|i| i * 10);
        assert_eq!(c.depth(), 2);
        assert_eq!(c.leaves(), vec![&10, &20, &30, &40]);
        assert_eq!(c.clusters().count(), 1);
    }

    #[test]
    fn cluster_vectors_by_method() {
        let v = |pairs: &[(&str, f64)]| Vector::new(Weighting::Tf, pairs.iter().map(|&(k, w)| (k, w)));
        let vectors = vec![
            v(&[("x", 1.0)]),
            v(&[("x", 1.0), ("y", 0.1)]),
            v(&[("z", 1.0)]),
        ];
        let method = ClusterMethod::Hierarchical(HierarchicalConfig {
            k: 2,
            seed: Some(1),
            ..Default::default()
        });
        let clusters = method.cluster(vectors.clone());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters.leaves().len(), 3);
        let pair = clusters.clusters().next().unwrap();
        let mut ids: Vec<u64> = pair.leaves().iter().map(|v| v.id()).collect();
        ids.sort();
        assert_eq!(ids, vec![vectors[0].id(), vectors[1].id()]);
    }
}
