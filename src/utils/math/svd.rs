use ndarray::{Array1, Array2, Axis};
use tracing::warn;

const MAX_SWEEPS: usize = 60;
const EPSILON: f64 = 1e-12;

/// Thin singular value decomposition
/// `matrix = u · diag(sigma) · vt`, singular values in descending order.
///
/// For an `m × n` matrix with `m <= n` (documents × features) the shapes are
/// `u: m × m`, `sigma: m`, `vt: m × n`.
#[derive(Debug, Clone)]
pub struct Svd {
    pub u: Array2<f64>,
    pub sigma: Array1<f64>,
    pub vt: Array2<f64>,
}

/// One-sided Jacobi SVD
/// Orthogonalizes the columns of the transposed matrix with plane rotations,
/// so the work per sweep grows with the square of the number of rows (documents)
/// and only linearly with the number of columns (features).
///
/// # Arguments
/// * `matrix` - `m × n` matrix, usually with `m <= n`
///
/// # Returns
/// * `Svd` - `u` (`m × m`), `sigma` (`m`), `vt` (`m × n`)
pub fn svd(matrix: &Array2<f64>) -> Svd {
    // b = matrixᵗ, b · v = w with orthogonal columns, w = u_b · Σ
    // so matrix = v · Σ · u_bᵗ
    let mut w = matrix.t().to_owned();
    let (n, m) = w.dim();
    let mut v: Array2<f64> = Array2::eye(m);

    let mut converged = m < 2;
    for _ in 0..MAX_SWEEPS {
        if converged {
            break;
        }
        let mut off = 0.0f64;
        for p in 0..m {
            for q in p + 1..m {
                let alpha = w.column(p).dot(&w.column(p));
                let beta = w.column(q).dot(&w.column(q));
                let gamma = w.column(p).dot(&w.column(q));
                if alpha == 0.0 || beta == 0.0 || gamma == 0.0 {
                    continue;
                }
                let cos = gamma.abs() / (alpha * beta).sqrt();
                if cos <= EPSILON {
                    continue;
                }
                off = off.max(cos);
                let zeta = (beta - alpha) / (2.0 * gamma);
                let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = c * t;
                rotate(&mut w, p, q, c, s);
                rotate(&mut v, p, q, c, s);
            }
        }
        converged = off <= EPSILON;
    }
    if !converged {
        warn!(rows = m, cols = n, "svd did not converge within {MAX_SWEEPS} sweeps");
    }

    let norms: Vec<f64> = w.axis_iter(Axis(1)).map(|c| c.dot(&c).sqrt()).collect();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| norms[b].total_cmp(&norms[a]));

    let mut u = Array2::zeros((m, m));
    let mut sigma = Array1::zeros(m);
    let mut vt = Array2::zeros((m, n));
    for (k, &j) in order.iter().enumerate() {
        sigma[k] = norms[j];
        u.column_mut(k).assign(&v.column(j));
        if norms[j] > EPSILON {
            vt.row_mut(k).assign(&(&w.column(j) / norms[j]));
        }
    }
    Svd { u, sigma, vt }
}

fn rotate(a: &mut Array2<f64>, p: usize, q: usize, c: f64, s: f64) {
    for i in 0..a.nrows() {
        let ap = a[[i, p]];
        let aq = a[[i, q]];
        a[[i, p]] = c * ap - s * aq;
        a[[i, q]] = s * ap + c * aq;
    }
}
