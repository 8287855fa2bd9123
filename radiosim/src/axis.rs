//! Spectral axis handling.
//!
//! Every evaluation in this crate happens over a [`SpectralAxis`]: a sequence
//! of sample points tagged with the domain they live in (wavelength in meters
//! or frequency in Hz). A scalar request is a length-1 axis. Domain
//! conversion, including the Jacobian for spectral *densities*, is
//! centralized here so no other module needs to reason about it.

use thiserror::Error;

use crate::physics::SI;

/// Errors raised by spectral axis operations
#[derive(Debug, Error)]
pub enum AxisError {
    #[error("spectral axis holds no samples")]
    EmptyAxis,

    #[error("spectral axis values must be positive, got {0}")]
    NonPositive(f64),
}

/// Domain tag for a spectral axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    /// Wavelength in meters
    Wavelength,
    /// Frequency in Hz
    Frequency,
}

/// A sequence of spectral sample points with an explicit domain tag.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralAxis {
    kind: AxisKind,
    values: Vec<f64>,
}

impl SpectralAxis {
    /// Axis of wavelength samples (m).
    pub fn wavelengths(values: Vec<f64>) -> Self {
        Self {
            kind: AxisKind::Wavelength,
            values,
        }
    }

    /// Axis of frequency samples (Hz).
    pub fn frequencies(values: Vec<f64>) -> Self {
        Self {
            kind: AxisKind::Frequency,
            values,
        }
    }

    /// Single-wavelength axis (m).
    pub fn wavelength(value: f64) -> Self {
        Self::wavelengths(vec![value])
    }

    /// Single-frequency axis (Hz).
    pub fn frequency(value: f64) -> Self {
        Self::frequencies(vec![value])
    }

    /// Uniform wavelength grid of `n` points spanning `[lo_m, hi_m]`.
    pub fn wavelength_linspace(lo_m: f64, hi_m: f64, n: usize) -> Self {
        let values = match n {
            0 => Vec::new(),
            1 => vec![lo_m],
            _ => {
                let step = (hi_m - lo_m) / (n - 1) as f64;
                (0..n).map(|i| lo_m + step * i as f64).collect()
            }
        };
        Self::wavelengths(values)
    }

    pub fn kind(&self) -> AxisKind {
        self.kind
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample points expressed as wavelengths (m).
    pub fn wavelengths_m(&self) -> Vec<f64> {
        match self.kind {
            AxisKind::Wavelength => self.values.clone(),
            AxisKind::Frequency => self.values.iter().map(|nu| SI::SPEED_OF_LIGHT / nu).collect(),
        }
    }

    /// Sample points expressed as frequencies (Hz).
    pub fn frequencies_hz(&self) -> Vec<f64> {
        match self.kind {
            AxisKind::Wavelength => self.values.iter().map(|wl| SI::SPEED_OF_LIGHT / wl).collect(),
            AxisKind::Frequency => self.values.clone(),
        }
    }

    /// Convert a per-wavelength spectral density sampled on this axis into a
    /// density per unit of this axis's own kind.
    ///
    /// A spectral density is a "per unit axis interval" quantity, so switching
    /// domain multiplies by the Jacobian `|dλ/dν| = c/ν² = λ²/c`. Wavelength
    /// axes are returned unchanged.
    pub fn density_from_wavelength_domain(&self, per_wavelength: &[f64]) -> Vec<f64> {
        match self.kind {
            AxisKind::Wavelength => per_wavelength.to_vec(),
            AxisKind::Frequency => per_wavelength
                .iter()
                .zip(&self.values)
                .map(|(d, nu)| d * SI::SPEED_OF_LIGHT / (nu * nu))
                .collect(),
        }
    }

    /// Inverse of [`density_from_wavelength_domain`]: express a density given
    /// per unit of this axis's kind as a per-wavelength density.
    ///
    /// [`density_from_wavelength_domain`]: SpectralAxis::density_from_wavelength_domain
    pub fn density_to_wavelength_domain(&self, per_axis: &[f64]) -> Vec<f64> {
        match self.kind {
            AxisKind::Wavelength => per_axis.to_vec(),
            AxisKind::Frequency => per_axis
                .iter()
                .zip(&self.values)
                .map(|(d, nu)| d * (nu * nu) / SI::SPEED_OF_LIGHT)
                .collect(),
        }
    }

    /// Validate the axis for evaluation: at least one sample, all positive.
    pub fn check(&self) -> Result<(), AxisError> {
        if self.values.is_empty() {
            return Err(AxisError::EmptyAxis);
        }
        for &v in &self.values {
            if v <= 0.0 {
                return Err(AxisError::NonPositive(v));
            }
        }
        Ok(())
    }
}
