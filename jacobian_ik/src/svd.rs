//! SVD of the fixed-size Jacobian.
//!
//! nalgebra's decomposition runs on a dynamically sized copy; the thin
//! factors it returns are completed to full orthogonal bases and copied
//! back into fixed-size storage. Factors are returned by value and never
//! cached, because the joint configuration changes on every call.

use nalgebra::{DMatrix, SMatrix, SVD};
use tracing::error;

/// Relative tolerance of the reconstruction check, scaled by the largest
/// Jacobian entry (at least 1).
pub const RECONSTRUCTION_TOLERANCE: f64 = 1e-4;

/// `J = U * diag(singular_values) * V^T`.
#[derive(Debug, Clone, PartialEq)]
pub struct SvdFactors<const M: usize, const N: usize> {
    /// Left singular vectors, `M x M` orthogonal.
    pub u: SMatrix<f64, M, M>,
    /// `min(M, N)` non-negative singular values in descending order.
    pub singular_values: Vec<f64>,
    /// Right singular vectors, `N x N` orthogonal.
    pub v: SMatrix<f64, N, N>,
}

impl<const M: usize, const N: usize> SvdFactors<M, N> {
    /// `U * Sigma * V^T` with `Sigma` the `M x N` diagonal of singular values.
    pub fn reconstruct(&self) -> SMatrix<f64, M, N> {
        let mut sigma = SMatrix::<f64, M, N>::zeros();
        for (i, s) in self.singular_values.iter().enumerate() {
            sigma[(i, i)] = *s;
        }
        self.u * sigma * self.v.transpose()
    }

    pub fn reconstructs(&self, jacobian: &SMatrix<f64, M, N>) -> bool {
        let scale = jacobian.amax().max(1.0);
        (self.reconstruct() - jacobian).amax() <= RECONSTRUCTION_TOLERANCE * scale
    }

    /// Largest singular value magnitude, zero for a null Jacobian.
    pub fn max_singular_value(&self) -> f64 {
        self.singular_values.iter().fold(0.0, |acc: f64, s| acc.max(s.abs()))
    }
}

/// Decomposes the Jacobian.
///
/// # Panics
///
/// Panics if the factors do not reconstruct the Jacobian. The strategies
/// assume a valid decomposition, so there is nothing sensible to continue with.
pub fn decompose<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
) -> SvdFactors<M, N> {
    let svd = SVD::new(smat_to_dmat(jacobian), true, true);

    let thin_u = svd.u.expect("U requested from SVD");
    let thin_v = svd.v_t.expect("V^T requested from SVD").transpose();

    let factors = SvdFactors {
        u: dmat_to_smat(&complete_basis(&thin_u)),
        singular_values: svd.singular_values.iter().copied().collect(),
        v: dmat_to_smat(&complete_basis(&thin_v)),
    };

    if !factors.reconstructs(jacobian) {
        error!(
            "SVD does not reconstruct the {}x{} Jacobian (max deviation {:e})",
            M,
            N,
            (factors.reconstruct() - jacobian).amax()
        );
        panic!("defective SVD of the Jacobian");
    }

    factors
}

/// Extends orthonormal columns to a square orthogonal matrix.
///
/// The QR factorization of `[thin | I]` yields an orthogonal `Q` whose first
/// columns span the same space as `thin` (up to sign); those columns are
/// then replaced by `thin` itself.
fn complete_basis(thin: &DMatrix<f64>) -> DMatrix<f64> {
    let (dim, k) = thin.shape();
    if k >= dim {
        return thin.clone();
    }

    let augmented = DMatrix::from_fn(dim, k + dim, |r, c| {
        if c < k {
            thin[(r, c)]
        } else if r == c - k {
            1.0
        } else {
            0.0
        }
    });
    let mut q = augmented.qr().q();
    q.columns_mut(0, k).copy_from(thin);
    q
}

pub fn smat_to_dmat<const R: usize, const C: usize>(m: &SMatrix<f64, R, C>) -> DMatrix<f64> {
    DMatrix::<f64>::from_column_slice(R, C, m.as_slice())
}

pub fn dmat_to_smat<const R: usize, const C: usize>(m: &DMatrix<f64>) -> SMatrix<f64, R, C> {
    assert_eq!(m.nrows(), R);
    assert_eq!(m.ncols(), C);
    SMatrix::<f64, R, C>::from_column_slice(m.as_slice())
}
