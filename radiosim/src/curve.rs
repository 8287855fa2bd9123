//! Tabulated spectral curves.
//!
//! The catalog/configuration layer hands the simulation tabulated
//! (axis → value) data: transmittance and emissivity curves, lamp spectra,
//! quantum efficiency tables. [`TabulatedCurve`] is the in-memory form:
//! linear interpolation inside the tabulated span, zero outside it.

use thiserror::Error;

/// Errors that can occur when building a tabulated curve
#[derive(Debug, Error)]
pub enum CurveError {
    #[error("coordinate and value tables must have the same length ({0} vs {1})")]
    LengthMismatch(usize, usize),

    #[error("a tabulated curve needs at least 2 points")]
    InsufficientData,

    #[error("curve coordinates must be strictly ascending")]
    NotAscending,
}

/// A piecewise-linear curve over a strictly ascending native grid.
///
/// Evaluation outside the tabulated span returns 0.0: an interpolated
/// transmittance is opaque outside its measured band, and an interpolated
/// spectrum is dark there.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedCurve {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl TabulatedCurve {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, CurveError> {
        if xs.len() != ys.len() {
            return Err(CurveError::LengthMismatch(xs.len(), ys.len()));
        }

        if xs.len() < 2 {
            return Err(CurveError::InsufficientData);
        }

        for i in 1..xs.len() {
            if xs[i] <= xs[i - 1] {
                return Err(CurveError::NotAscending);
            }
        }

        Ok(Self { xs, ys })
    }

    /// Interpolated value at `x`; 0.0 outside the tabulated span.
    pub fn at(&self, x: f64) -> f64 {
        let (min_x, max_x) = self.span();
        if x < min_x || x > max_x {
            return 0.0;
        }

        // Binary search for the enclosing interval
        let idx = match self.xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap()) {
            Ok(exact) => return self.ys[exact],
            Err(insert) => insert,
        };

        let x1 = self.xs[idx - 1];
        let x2 = self.xs[idx];
        let y1 = self.ys[idx - 1];
        let y2 = self.ys[idx];

        let t = (x - x1) / (x2 - x1);
        y1 * (1.0 - t) + y2 * t
    }

    /// Evaluate over a sequence of coordinates.
    pub fn sample(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.at(x)).collect()
    }

    /// The native grid the curve was tabulated on.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Tabulated span `(min_x, max_x)`.
    pub fn span(&self) -> (f64, f64) {
        (self.xs[0], *self.xs.last().unwrap())
    }

    /// The `(x, y)` pair at the maximum tabulated value, located by scanning
    /// the native grid.
    pub fn peak(&self) -> (f64, f64) {
        let mut best = 0;
        for i in 1..self.ys.len() {
            if self.ys[i] > self.ys[best] {
                best = i;
            }
        }
        (self.xs[best], self.ys[best])
    }

    /// Curve with every value replaced by `1 − y`.
    ///
    /// Catalogs tabulate some optics as emissivity rather than throughput;
    /// this converts between the two.
    pub fn complemented(&self) -> TabulatedCurve {
        TabulatedCurve {
            xs: self.xs.clone(),
            ys: self.ys.iter().map(|y| 1.0 - y).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> TabulatedCurve {
        TabulatedCurve::new(vec![1.0, 2.0, 4.0], vec![0.0, 1.0, 0.5]).unwrap()
    }

    #[test]
    fn test_interpolation() {
        let c = ramp();
        assert_relative_eq!(c.at(1.0), 0.0);
        assert_relative_eq!(c.at(1.5), 0.5);
        assert_relative_eq!(c.at(2.0), 1.0);
        assert_relative_eq!(c.at(3.0), 0.75);
    }

    #[test]
    fn test_out_of_range_is_zero() {
        let c = ramp();
        assert_eq!(c.at(0.5), 0.0);
        assert_eq!(c.at(4.5), 0.0);
    }

    #[test]
    fn test_peak_scans_native_grid() {
        let c = ramp();
        let (x, y) = c.peak();
        assert_eq!(x, 2.0);
        assert_eq!(y, 1.0);
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            TabulatedCurve::new(vec![1.0, 2.0], vec![0.0]),
            Err(CurveError::LengthMismatch(2, 1))
        ));
        assert!(matches!(
            TabulatedCurve::new(vec![1.0], vec![0.0]),
            Err(CurveError::InsufficientData)
        ));
        assert!(matches!(
            TabulatedCurve::new(vec![2.0, 1.0], vec![0.0, 1.0]),
            Err(CurveError::NotAscending)
        ));
    }

    #[test]
    fn test_complemented() {
        let c = ramp().complemented();
        assert_relative_eq!(c.at(2.0), 0.0);
        assert_relative_eq!(c.at(1.0), 1.0);
    }
}
