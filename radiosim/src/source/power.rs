//! Power-spectral-density sources.
//!
//! Calibration lamps are rated in Watts, not radiance: a [`PowerSource`]
//! produces a power spectral density (W per unit spectral axis). The
//! isotropic-radiator variant converts an underlying radiance source into a
//! PSD through `π × area`: a Lambertian sphere radiates into 2π sr with a
//! cos θ weighting, which integrates to π.

use crate::axis::SpectralAxis;
use crate::curve::TabulatedCurve;
use crate::physics::photon_energy;
use crate::source::{SourceError, SpectralSource};

#[derive(Debug, Clone)]
enum PowerKind {
    /// Lambertian sphere of the given surface area around a radiance source
    IsotropicRadiator {
        area_m2: f64,
        radiance: Box<SpectralSource>,
    },
    /// Directly tabulated PSD over wavelength (m → W/m)
    Tabulated(TabulatedCurve),
}

/// A source emitting a power spectral density (W per unit axis interval).
#[derive(Debug, Clone)]
pub struct PowerSource {
    label: String,
    rating_w: Option<f64>,
    power_factor: f64,
    attenuation: f64,
    kind: PowerKind,
}

impl PowerSource {
    /// Isotropic radiator of `area_m2` emitting the given radiance.
    pub fn isotropic_radiator(
        label: impl Into<String>,
        area_m2: f64,
        radiance: SpectralSource,
    ) -> Self {
        Self {
            label: label.into(),
            rating_w: None,
            power_factor: 1.0,
            attenuation: 0.0,
            kind: PowerKind::IsotropicRadiator {
                area_m2,
                radiance: Box::new(radiance),
            },
        }
    }

    /// Tabulated lamp PSD supplied by the catalog layer.
    pub fn tabulated(label: impl Into<String>, curve: TabulatedCurve) -> Self {
        Self {
            label: label.into(),
            rating_w: None,
            power_factor: 1.0,
            attenuation: 0.0,
            kind: PowerKind::Tabulated(curve),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Nominal power rating (W). Scaling the source power requires one.
    pub fn set_nominal_power_rating(&mut self, rating_w: f64) {
        self.rating_w = Some(rating_w);
        self.power_factor = 1.0;
    }

    pub fn power_rating(&self) -> Option<f64> {
        self.rating_w
    }

    pub fn is_adjustable(&self) -> bool {
        self.rating_w.is_some()
    }

    /// Rescale the source to emit `power_w` total, relative to its rating.
    pub fn adjust_power(&mut self, power_w: f64) -> Result<(), SourceError> {
        let rating = self.rating_w.ok_or(SourceError::PowerNotAdjustable)?;
        self.power_factor = power_w / rating;
        Ok(())
    }

    pub fn set_attenuation(&mut self, attenuation: f64) -> Result<(), SourceError> {
        if !(0.0..=1.0).contains(&attenuation) {
            return Err(SourceError::InvalidAttenuation(attenuation));
        }
        self.attenuation = attenuation;
        Ok(())
    }

    /// Raw PSD per unit wavelength at the given wavelengths (W/m).
    pub(crate) fn raw_psd_per_wavelength(&self, wavelengths_m: &[f64]) -> Result<Vec<f64>, SourceError> {
        match &self.kind {
            PowerKind::IsotropicRadiator { area_m2, radiance } => {
                let axis = SpectralAxis::wavelengths(wavelengths_m.to_vec());
                let density = radiance.density(&axis)?;
                let to_power = std::f64::consts::PI * area_m2;
                Ok(density.into_iter().map(|d| d * to_power).collect())
            }
            PowerKind::Tabulated(curve) => Ok(curve.sample(wavelengths_m)),
        }
    }

    /// Effective PSD over the axis, in W per unit of the axis's kind.
    ///
    /// Honors `power_factor × (1 − attenuation)`.
    pub fn psd(&self, axis: &SpectralAxis) -> Result<Vec<f64>, SourceError> {
        axis.check()?;
        let scale = self.power_factor * (1.0 - self.attenuation);
        let mut per_wl = self.raw_psd_per_wavelength(&axis.wavelengths_m())?;
        for v in &mut per_wl {
            *v *= scale;
        }
        Ok(axis.density_from_wavelength_domain(&per_wl))
    }

    /// Photon emission rate spectrum: PSD divided by the photon energy,
    /// photons·s⁻¹ per unit of the axis's kind.
    pub fn photon_rate(&self, axis: &SpectralAxis) -> Result<Vec<f64>, SourceError> {
        let psd = self.psd(axis)?;
        let frequencies = axis.frequencies_hz();
        Ok(psd
            .into_iter()
            .zip(frequencies)
            .map(|(p, nu)| p / photon_energy(nu))
            .collect())
    }

    /// Total emitted power over a wavelength band, by trapezoid integration
    /// of the PSD on an `n + 1` point uniform grid (W).
    pub fn integrate_power(&self, lo_m: f64, hi_m: f64, n: usize) -> Result<f64, SourceError> {
        let axis = SpectralAxis::wavelength_linspace(lo_m, hi_m, n + 1);
        let psd = self.psd(&axis)?;
        let dw = (hi_m - lo_m) / n as f64;

        let mut total = 0.0;
        for pair in psd.windows(2) {
            total += 0.5 * (pair[0] + pair[1]) * dw;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::source::SpectralSource;

    fn flat_lamp(level: f64) -> PowerSource {
        let curve = TabulatedCurve::new(vec![0.4e-6, 2.6e-6], vec![level, level]).unwrap();
        PowerSource::tabulated("flat lamp", curve)
    }

    #[test]
    fn test_isotropic_radiator_pi_area() {
        let bb = SpectralSource::blackbody("filament", 3000.0);
        let axis = SpectralAxis::wavelength(1e-6);
        let radiance = bb.density(&axis).unwrap()[0];

        let area = 2.5e-4;
        let lamp = PowerSource::isotropic_radiator("lamp", area, bb);
        let psd = lamp.psd(&axis).unwrap()[0];

        assert_relative_eq!(psd, std::f64::consts::PI * area * radiance, max_relative = 1e-12);
    }

    #[test]
    fn test_power_adjustment() {
        let mut lamp = flat_lamp(10.0);

        // No rating yet: adjustment must fail but the lamp stays usable
        assert!(matches!(
            lamp.adjust_power(5.0),
            Err(SourceError::PowerNotAdjustable)
        ));
        let axis = SpectralAxis::wavelength(1e-6);
        assert_relative_eq!(lamp.psd(&axis).unwrap()[0], 10.0);

        lamp.set_nominal_power_rating(100.0);
        lamp.adjust_power(25.0).unwrap();
        assert_relative_eq!(lamp.psd(&axis).unwrap()[0], 2.5);
    }

    #[test]
    fn test_attenuation_bounds() {
        let mut lamp = flat_lamp(10.0);
        assert!(lamp.set_attenuation(1.5).is_err());
        assert!(lamp.set_attenuation(-0.1).is_err());
        lamp.set_attenuation(0.25).unwrap();

        let axis = SpectralAxis::wavelength(1e-6);
        assert_relative_eq!(lamp.psd(&axis).unwrap()[0], 7.5);
    }

    #[test]
    fn test_integrate_power_of_flat_psd() {
        let lamp = flat_lamp(10.0);
        // 10 W/m over a 1 µm band inside the tabulated span
        let total = lamp.integrate_power(1.0e-6, 2.0e-6, 1000).unwrap();
        assert_relative_eq!(total, 10.0 * 1.0e-6, max_relative = 1e-9);
    }

    #[test]
    fn test_photon_rate_positive() {
        let lamp = flat_lamp(10.0);
        let axis = SpectralAxis::wavelength(1e-6);
        let rate = lamp.photon_rate(&axis).unwrap()[0];
        assert!(rate > 0.0);
    }
}
