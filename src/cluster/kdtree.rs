use crate::utils::math::distance::{features, Distance};
use crate::vectorizer::vector::Vector;

/// k-d tree over sparse vectors
/// Splits on the median of one feature per level. Features are cycled in a
/// fixed order, widest spread first. Distances are squared Euclidean.
#[derive(Debug, Clone)]
pub struct KdTree {
    axes: Vec<String>,
    root: Option<Box<KdNode>>,
    len: usize,
}

#[derive(Debug, Clone)]
struct KdNode {
    vector: Vector,
    axis: usize,
    left: Option<Box<KdNode>>,
    right: Option<Box<KdNode>>,
}

impl KdTree {
    pub fn new(vectors: Vec<Vector>) -> Self {
        let spread = |f: &str| {
            let (lo, hi) = vectors
                .iter()
                .map(|v| v.weight(f))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), w| (lo.min(w), hi.max(w)));
            hi - lo
        };
        let mut keyed: Vec<(f64, String)> = features(vectors.iter())
            .into_iter()
            .map(|f| (spread(&f), f))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let axes: Vec<String> = keyed.into_iter().map(|(_, f)| f).collect();

        let len = vectors.len();
        let root = build(&axes, vectors, 0);
        KdTree { axes, root, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The `k` vectors nearest to `query`
    /// (squared distance, vector) pairs, nearest first. The query vector itself
    /// (same id) is never returned.
    pub fn nearest(&self, query: &Vector, k: usize) -> Vec<(f64, Vector)> {
        let mut best: Vec<(f64, Vector)> = Vec::with_capacity(k + 1);
        if k > 0 {
            if let Some(root) = &self.root {
                self.search(root, query, k, &mut best);
            }
        }
        best
    }

    fn search(&self, node: &KdNode, query: &Vector, k: usize, best: &mut Vec<(f64, Vector)>) {
        if node.vector.id() != query.id() {
            let d = Distance::Euclidean.measure(query, &node.vector);
            if best.len() < k || d < best[best.len() - 1].0 {
                let at = best.partition_point(|(b, _)| *b <= d);
                best.insert(at, (d, node.vector.clone()));
                best.truncate(k);
            }
        }
        if self.axes.is_empty() {
            return;
        }
        let axis = &self.axes[node.axis];
        let diff = query.weight(axis) - node.vector.weight(axis);
        let (near, far) = if diff < 0.0 {
            (&node.left, &node.right)
        } else {
            (&node.right, &node.left)
        };
        if let Some(near) = near {
            self.search(near, query, k, best);
        }
        // the splitting plane is closer than the current worst match
        if let Some(far) = far {
            if best.len() < k || diff * diff < best[best.len() - 1].0 {
                self.search(far, query, k, best);
            }
        }
    }
}

fn build(axes: &[String], mut vectors: Vec<Vector>, depth: usize) -> Option<Box<KdNode>> {
    if vectors.is_empty() {
        return None;
    }
    let axis = if axes.is_empty() { 0 } else { depth % axes.len() };
    if let Some(feature) = axes.get(axis) {
        vectors.sort_by(|a, b| a.weight(feature).total_cmp(&b.weight(feature)));
    }
    let right = vectors.split_off(vectors.len() / 2 + 1);
    let vector = vectors.pop()?;
    Some(Box::new(KdNode {
        vector,
        axis,
        left: build(axes, vectors, depth + 1),
        right: build(axes, right, depth + 1),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorizer::Weighting;

    fn point(x: f64, y: f64) -> Vector {
        Vector::new(Weighting::Tf, [("x", x), ("y", y)])
    }

    fn brute_force(points: &[Vector], query: &Vector, k: usize) -> Vec<f64> {
        let mut d: Vec<f64> = points
            .iter()
            .filter(|p| p.id() != query.id())
            .map(|p| Distance::Euclidean.measure(query, p))
            .collect();
        d.sort_by(|a, b| a.total_cmp(b));
        d.truncate(k);
        d
    }

    #[test]
    fn nearest_excludes_query_and_sorts() {
        let points = vec![point(0.0, 0.0), point(1.0, 0.0), point(5.0, 5.0), point(0.0, 2.0)];
        let tree = KdTree::new(points.clone());
        assert_eq!(tree.len(), 4);
        let hits = tree.nearest(&points[0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, 1.0);
        assert_eq!(hits[0].1.id(), points[1].id());
        assert_eq!(hits[1].0, 4.0);
        assert!(tree.nearest(&points[0], 0).is_empty());
    }

    #[test]
    fn matches_brute_force_on_a_grid() {
        let points: Vec<Vector> = (0..7)
            .flat_map(|i| (0..5).map(move |j| point(i as f64 * 1.3, (j * j) as f64 * 0.7)))
            .collect();
        let tree = KdTree::new(points.clone());
        for query in [point(2.0, 3.0), point(-1.0, 10.0), points[11].clone()] {
            let got: Vec<f64> = tree.nearest(&query, 5).into_iter().map(|(d, _)| d).collect();
            assert_eq!(got, brute_force(&points, &query, 5));
        }
    }

    #[test]
    fn empty_tree() {
        let tree = KdTree::new(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.nearest(&point(0.0, 0.0), 3).is_empty());
    }
}
