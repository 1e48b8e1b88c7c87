use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IkError, Result};

/// Damping constants and iteration settings of the solver.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// configuration file only has to name the values it overrides.
///
/// ```rust,ignore
/// let config = IkConfig::from_json_str(r#"{ "lambda_dls": 0.24 }"#)?;
/// assert_eq!(config.lambda_svd, 0.112);
///
/// if let Err(e) = config.validate() {
///     println!("Configuration error: {}", e);
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct IkConfig {
    /// Damping of the plain pseudo-inverse. Zero means undamped, which is
    /// unstable near singularities.
    pub lambda_pseudo_inverse: f64,
    /// Damping of damped least squares.
    pub lambda_dls: f64,
    /// Fraction of the largest singular value below which singular values
    /// are discarded, in `[0, 1]`.
    pub lambda_svd: f64,
    /// Damping of damped least squares computed through the SVD.
    pub lambda_dls_with_svd: f64,
    /// Maximum joint step per singular direction for SDLS, in radians.
    pub lambda_sdls: f64,
    /// Step budget of the iterative driver.
    pub max_steps: usize,
    /// Residual norm at which the iterative driver stops.
    pub error_threshold: f64,
}

impl IkConfig {
    pub fn new(
        lambda_pseudo_inverse: f64,
        lambda_dls: f64,
        lambda_svd: f64,
        lambda_dls_with_svd: f64,
        lambda_sdls: f64,
    ) -> Self {
        Self {
            lambda_pseudo_inverse,
            lambda_dls,
            lambda_svd,
            lambda_dls_with_svd,
            lambda_sdls,
            ..Self::default()
        }
    }

    /// Returns a copy with different iteration settings.
    pub fn with_iterations(mut self, max_steps: usize, error_threshold: f64) -> Self {
        self.max_steps = max_steps;
        self.error_threshold = error_threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let lambdas = [
            ("lambda_pseudo_inverse", self.lambda_pseudo_inverse),
            ("lambda_dls", self.lambda_dls),
            ("lambda_svd", self.lambda_svd),
            ("lambda_dls_with_svd", self.lambda_dls_with_svd),
            ("lambda_sdls", self.lambda_sdls),
        ];
        for (name, value) in lambdas {
            if !value.is_finite() || value < 0.0 {
                return Err(IkError::invalid_config(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }
        if self.lambda_svd > 1.0 {
            return Err(IkError::invalid_config(format!(
                "lambda_svd is a fraction of the largest singular value \
                 and must not exceed 1 (got {})",
                self.lambda_svd
            )));
        }
        if self.lambda_sdls == 0.0 {
            return Err(IkError::invalid_config("lambda_sdls must be greater than 0."));
        }
        if self.max_steps == 0 {
            return Err(IkError::invalid_config("max_steps must be greater than 0."));
        }
        if !self.error_threshold.is_finite() || self.error_threshold <= 0.0 {
            return Err(IkError::invalid_config(format!(
                "error_threshold must be a finite, positive number (got {})",
                self.error_threshold
            )));
        }
        Ok(())
    }

    /// Parses a JSON configuration and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            lambda_pseudo_inverse: 0.0,
            lambda_dls: 0.18,
            lambda_svd: 0.112,
            lambda_dls_with_svd: 0.18,
            lambda_sdls: std::f64::consts::FRAC_PI_4,
            max_steps: 100,
            error_threshold: 1e-3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = IkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lambda_pseudo_inverse, 0.0);
        assert!((config.lambda_sdls - 45.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = IkConfig::default();
        config.lambda_dls = -0.1;
        assert!(matches!(config.validate(), Err(IkError::InvalidConfig(_))));

        let config = IkConfig {
            lambda_svd: 1.5,
            ..IkConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IkConfig::default().with_iterations(0, 1e-3);
        assert!(config.validate().is_err());

        let config = IkConfig::default().with_iterations(10, f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = IkConfig::from_json_str(r#"{ "lambda_dls": 0.24, "max_steps": 12 }"#).unwrap();
        assert_eq!(config.lambda_dls, 0.24);
        assert_eq!(config.max_steps, 12);
        assert_eq!(config.lambda_svd, IkConfig::default().lambda_svd);
    }

    #[test]
    fn invalid_json_values_are_rejected() {
        let err = IkConfig::from_json_str(r#"{ "lambda_sdls": 0.0 }"#).unwrap_err();
        assert!(matches!(err, IkError::InvalidConfig(_)));

        let err = IkConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, IkError::Parse(_)));
    }
}
