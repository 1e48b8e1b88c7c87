//! Inverse strategies: each maps a Jacobian and a pose residual to a
//! joint-angle update.
//!
//! | Mode            | Update                                                   |
//! |-----------------|----------------------------------------------------------|
//! | `Transpose`     | `J^T * dp`                                               |
//! | `PseudoInverse` | damped pseudo-inverse with `lambda_pseudo_inverse` (0)   |
//! | `Dls`           | damped pseudo-inverse with `lambda_dls`                  |
//! | `Svd`           | `V * D * U^T * dp`, small singular values discarded      |
//! | `DlsWithSvd`    | `V * E * U^T * dp`, `E_ii = s_i / (s_i^2 + lambda^2)`    |
//! | `Sdls`          | per singular direction, each clamped to its own bound    |

use std::fmt;
use std::str::FromStr;

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::IkConfig;
use crate::error::IkError;
use crate::svd::{self, SvdFactors};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum IkMode {
    /// Cheapest; badly scaled near singularities.
    #[default]
    Transpose,
    /// Moore-Penrose inverse. Unregularized, so unstable at singularities.
    PseudoInverse,
    /// Damped least squares.
    Dls,
    /// Truncated SVD.
    Svd,
    /// Damped least squares through the SVD.
    DlsWithSvd,
    /// Selectively damped least squares.
    Sdls,
}

impl IkMode {
    pub const ALL: [IkMode; 6] = [
        IkMode::Transpose,
        IkMode::PseudoInverse,
        IkMode::Dls,
        IkMode::Svd,
        IkMode::DlsWithSvd,
        IkMode::Sdls,
    ];

    pub fn requires_svd(self) -> bool {
        matches!(self, IkMode::Svd | IkMode::DlsWithSvd | IkMode::Sdls)
    }

    pub fn name(self) -> &'static str {
        match self {
            IkMode::Transpose => "transpose",
            IkMode::PseudoInverse => "pseudo_inverse",
            IkMode::Dls => "dls",
            IkMode::Svd => "svd",
            IkMode::DlsWithSvd => "dls_with_svd",
            IkMode::Sdls => "sdls",
        }
    }
}

impl fmt::Display for IkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IkMode {
    type Err = IkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .replace(|c: char| c == '-' || c == ' ', "_");
        IkMode::ALL
            .into_iter()
            .find(|mode| mode.name() == normalized)
            .ok_or_else(|| IkError::UnknownMode(s.to_string()))
    }
}

/// Legacy integer codes: 1..=5 in table order, anything else was the
/// transpose fallback. Only 0..=5 are accepted here.
impl TryFrom<i32> for IkMode {
    type Error = IkError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|i| IkMode::ALL.get(i).copied())
            .ok_or_else(|| IkError::UnknownMode(code.to_string()))
    }
}

/// Runs the strategy selected by `mode`, decomposing the Jacobian first
/// when the strategy needs it.
pub fn solve<const M: usize, const N: usize>(
    mode: IkMode,
    jacobian: &SMatrix<f64, M, N>,
    delta_p: &SVector<f64, M>,
    config: &IkConfig,
) -> SVector<f64, N> {
    let factors = mode.requires_svd().then(|| svd::decompose(jacobian));

    match (mode, factors) {
        (IkMode::PseudoInverse, _) => {
            pseudo_inverse(jacobian, delta_p, config.lambda_pseudo_inverse)
        }
        (IkMode::Dls, _) => pseudo_inverse(jacobian, delta_p, config.lambda_dls),
        (IkMode::Svd, Some(f)) => svd_filtered(&f, delta_p, config.lambda_svd),
        (IkMode::DlsWithSvd, Some(f)) => dls_with_svd(&f, delta_p, config.lambda_dls_with_svd),
        (IkMode::Sdls, Some(f)) => sdls(jacobian, &f, delta_p, config.lambda_sdls),
        _ => transpose(jacobian, delta_p),
    }
}

pub fn transpose<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
    delta_p: &SVector<f64, M>,
) -> SVector<f64, N> {
    jacobian.transpose() * delta_p
}

/// `(J^T J + l^2 I)^-1 J^T` when `M <= N`, otherwise `J^T (J J^T + l^2 I)^-1`.
///
/// Returns `None` if the regularized normal matrix is singular, which only
/// happens for `lambda == 0`.
pub fn damped_pseudo_inverse<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
    lambda: f64,
) -> Option<SMatrix<f64, N, M>> {
    let jt = jacobian.transpose();
    let damping = lambda * lambda;

    if M <= N {
        let normal = jt * jacobian + SMatrix::<f64, N, N>::identity() * damping;
        Some(invert(&normal)? * jt)
    } else {
        let normal = jacobian * jt + SMatrix::<f64, M, M>::identity() * damping;
        Some(jt * invert(&normal)?)
    }
}

fn invert<const D: usize>(m: &SMatrix<f64, D, D>) -> Option<SMatrix<f64, D, D>> {
    svd::smat_to_dmat(m)
        .try_inverse()
        .map(|inverse| svd::dmat_to_smat(&inverse))
}

/// Pseudo-inverse and DLS update.
///
/// A singular normal matrix or a non-finite update falls back to the
/// transpose update rather than returning a partial result. Undamped, the
/// normal matrix is only invertible for a square, full-rank Jacobian.
pub fn pseudo_inverse<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
    delta_p: &SVector<f64, M>,
    lambda: f64,
) -> SVector<f64, N> {
    let update = damped_pseudo_inverse(jacobian, lambda).map(|inverse| inverse * delta_p);
    match update {
        Some(delta_theta) if delta_theta.iter().all(|v| v.is_finite()) => delta_theta,
        _ => {
            warn!(
                "Pseudo-inverse with lambda={} is singular, \
                 taking a Jacobian transpose step instead",
                lambda
            );
            transpose(jacobian, delta_p)
        }
    }
}

/// Truncated SVD: singular values at or below `lambda * max|s|` are dropped.
pub fn svd_filtered<const M: usize, const N: usize>(
    factors: &SvdFactors<M, N>,
    delta_p: &SVector<f64, M>,
    lambda: f64,
) -> SVector<f64, N> {
    let threshold = lambda * factors.max_singular_value();

    let mut d = SMatrix::<f64, N, M>::zeros();
    for (i, s) in factors.singular_values.iter().enumerate() {
        d[(i, i)] = if s.abs() > threshold { 1.0 / s } else { 0.0 };
    }

    factors.v * d * factors.u.transpose() * delta_p
}

/// Damped least squares expressed per singular value.
pub fn dls_with_svd<const M: usize, const N: usize>(
    factors: &SvdFactors<M, N>,
    delta_p: &SVector<f64, M>,
    lambda: f64,
) -> SVector<f64, N> {
    let damping = lambda * lambda;

    let mut e = SMatrix::<f64, N, M>::zeros();
    for (i, s) in factors.singular_values.iter().enumerate() {
        let denominator = s * s + damping;
        e[(i, i)] = if denominator != 0.0 { s / denominator } else { 0.0 };
    }

    factors.v * e * factors.u.transpose() * delta_p
}

/// Contribution of one singular direction to the SDLS update.
#[derive(Debug, Clone, PartialEq)]
pub struct SdlsTerm<const N: usize> {
    pub contribution: SVector<f64, N>,
    /// Bound on the largest absolute component of `contribution`.
    pub gamma: f64,
}

/// Per-direction SDLS contributions, already clamped.
///
/// For direction `i`: `alpha = u_i . dp`, `w = 1 / s_i` (0 for `s_i == 0`),
/// `M_i = w * sum_{l < M/3} sum_j |V[j][i]| * |J[l][j]|`,
/// `gamma = lambda * min(1, 1 / M_i)` (0 for `M_i == 0`), and the
/// contribution `w * alpha * v_i` is scaled down to at most `gamma`.
pub fn sdls_terms<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
    factors: &SvdFactors<M, N>,
    delta_p: &SVector<f64, M>,
    lambda: f64,
) -> Vec<SdlsTerm<N>> {
    factors
        .singular_values
        .iter()
        .enumerate()
        .map(|(i, &sigma)| {
            let u_i = factors.u.column(i);
            let v_i = factors.v.column(i).into_owned();

            let alpha = u_i.dot(delta_p);
            let omega_inverse = if sigma != 0.0 { 1.0 / sigma } else { 0.0 };

            let mut saturation = 0.0;
            for l in 0..M / 3 {
                for j in 0..N {
                    saturation += factors.v[(j, i)].abs() * jacobian[(l, j)].abs();
                }
            }
            saturation *= omega_inverse;

            let mut gamma = if saturation != 0.0 { (1.0 / saturation).abs() } else { 0.0 };
            gamma = gamma.min(1.0) * lambda;

            let contribution = clamp_max_abs(v_i * (omega_inverse * alpha), gamma);
            trace!(
                "SDLS direction {}: sigma={:e} alpha={:e} gamma={:e}",
                i, sigma, alpha, gamma
            );
            SdlsTerm { contribution, gamma }
        })
        .collect()
}

pub fn sdls<const M: usize, const N: usize>(
    jacobian: &SMatrix<f64, M, N>,
    factors: &SvdFactors<M, N>,
    delta_p: &SVector<f64, M>,
    lambda: f64,
) -> SVector<f64, N> {
    sdls_terms(jacobian, factors, delta_p, lambda)
        .into_iter()
        .fold(SVector::<f64, N>::zeros(), |acc, term| acc + term.contribution)
}

/// Scales `v` down so its largest absolute component is `gamma`; vectors
/// already within the bound are returned unchanged.
pub fn clamp_max_abs<const N: usize>(v: SVector<f64, N>, gamma: f64) -> SVector<f64, N> {
    let max_value = v.amax().max(gamma);
    if max_value == gamma {
        v
    } else {
        v / max_value * gamma
    }
}
