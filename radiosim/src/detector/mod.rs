//! Detector model: photon flux to electrons to ADU counts.
//!
//! [`DetectorModel`] binds a [`SpectralSource`] to a detector geometry and
//! walks the signal chain: spectral radiance at the slit becomes irradiance
//! at the focal plane through the `π/(4 f²)` beam solid angle, each pixel
//! collects the photons inside its own dispersion interval, quantum
//! efficiency and binning turn them into an electron rate, shot and read
//! noise are applied per exposure and the gain converts electrons to counts.

pub mod exposure;

pub use exposure::{EstimatorError, ExposureTimeDistribution, ExposureTimeEstimator};

use rand::rngs::StdRng;
use rand::{rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Normal, Poisson};
use thiserror::Error;

use crate::axis::{AxisError, SpectralAxis};
use crate::curve::TabulatedCurve;
use crate::physics::{photon_energy, planck_wavelength, SI};
use crate::source::{SourceError, SpectralSource};

/// Errors raised by detector simulation
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("no spectral source bound to the detector")]
    NoSourceConfigured,

    #[error("the bound source produces no signal on this axis")]
    NoSignal,

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Axis(#[from] AxisError),
}

/// Detector quantum efficiency, electrons per photon.
#[derive(Debug, Clone)]
pub enum QuantumEfficiency {
    Flat(f64),
    /// Interpolated over wavelength (m); zero outside the tabulated span
    Curve(TabulatedCurve),
}

impl QuantumEfficiency {
    pub fn at(&self, wavelength_m: f64) -> f64 {
        match self {
            QuantumEfficiency::Flat(qe) => *qe,
            QuantumEfficiency::Curve(curve) => curve.at(wavelength_m),
        }
    }
}

/// Thermal background seen by every pixel.
///
/// Two graybody contributions reach the detector: the cryostat radiation
/// shield, subtending `radiation_cone_sr`, and the cold mechanisms,
/// subtending `mechanism_cone_sr` and running `mechanism_offset_k` below the
/// cryostat set point.
#[derive(Debug, Clone)]
pub struct ThermalBackground {
    pub radiation_cone_sr: f64,
    pub mechanism_cone_sr: f64,
    pub cryostat_temperature_k: f64,
    pub mechanism_offset_k: f64,
}

impl ThermalBackground {
    pub fn new(
        radiation_cone_sr: f64,
        mechanism_cone_sr: f64,
        cryostat_temperature_k: f64,
    ) -> Self {
        Self {
            radiation_cone_sr,
            mechanism_cone_sr,
            cryostat_temperature_k,
            mechanism_offset_k: 5.0,
        }
    }

    /// Background spectral radiance per unit wavelength at `wavelength_m`,
    /// weighted by the two cone solid angles (W·m⁻²·m⁻¹).
    fn radiance(&self, wavelength_m: f64) -> f64 {
        let t_cryo = self.cryostat_temperature_k;
        let t_mech = (t_cryo - self.mechanism_offset_k).max(0.0);
        self.radiation_cone_sr * planck_wavelength(wavelength_m, t_cryo)
            + self.mechanism_cone_sr * planck_wavelength(wavelength_m, t_mech)
    }
}

/// Static description of the detector and spectrograph geometry.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Pixel pitch (m); pixels are square
    pub pixel_pitch_m: f64,
    /// Spectral resolving power λ/Δλ of the disperser
    pub resolving_power: f64,
    /// Detector pixels per spectral resolution element
    pub px_per_res_element: f64,
    /// On-chip binning factor (pixels summed per sample)
    pub binning: u32,
    pub qe: QuantumEfficiency,
    /// Inverse gain, electrons per ADU
    pub gain_e_per_adu: f64,
    /// Read noise below the long-exposure threshold (e⁻ rms)
    pub read_noise_short_e: f64,
    /// Read noise at or above the threshold (e⁻ rms)
    pub read_noise_long_e: f64,
    /// Exposure time separating the two read-noise regimes (s)
    pub read_noise_threshold_s: f64,
    /// Working focal ratio of the camera
    pub f_number: f64,
    /// Thermal background geometry, when the instrument models one
    pub thermal: Option<ThermalBackground>,
    /// Sensitivity band for the thermal background integral (m)
    pub band_m: (f64, f64),
}

impl DetectorConfig {
    pub fn pixel_area_m2(&self) -> f64 {
        self.pixel_pitch_m * self.pixel_pitch_m
    }

    /// Solid-angle factor of the f/# beam, `π/(4 f²)` (sr).
    pub fn beam_solid_angle_sr(&self) -> f64 {
        std::f64::consts::PI / (4.0 * self.f_number * self.f_number)
    }

    fn ron(&self, exposure_s: f64) -> f64 {
        if exposure_s < self.read_noise_threshold_s {
            self.read_noise_short_e
        } else {
            self.read_noise_long_e
        }
    }
}

/// Exposure time to saturation and the spectral point that saturates first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxExposure {
    pub t_max_s: f64,
    pub wavelength_m: f64,
    pub frequency_hz: f64,
}

/// A detector with an optional bound source and its own noise RNG stream.
#[derive(Debug)]
pub struct DetectorModel {
    config: DetectorConfig,
    source: Option<SpectralSource>,
    rng: StdRng,
}

impl DetectorModel {
    /// Detector with its own RNG stream. A fixed seed makes every noise draw
    /// reproducible; `None` seeds from the thread RNG.
    pub fn new(config: DetectorConfig, seed: Option<u64>) -> Self {
        Self {
            config,
            source: None,
            rng: StdRng::seed_from_u64(seed.unwrap_or(rng().next_u64())),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Electrons per ADU.
    pub fn gain(&self) -> f64 {
        self.config.gain_e_per_adu
    }

    /// Bind the source whose light falls on the detector, replacing any
    /// previous binding.
    pub fn bind_source(&mut self, source: SpectralSource) {
        log::debug!("binding source '{}' to detector", source.label());
        self.source = Some(source);
    }

    pub fn source(&self) -> Option<&SpectralSource> {
        self.source.as_ref()
    }

    fn bound_source(&self) -> Result<&SpectralSource, DetectorError> {
        self.source.as_ref().ok_or(DetectorError::NoSourceConfigured)
    }

    /// Spectral irradiance at the focal plane, per unit of the axis's kind
    /// (W·m⁻² per unit axis). The source radiance is folded through the f/#
    /// beam solid angle.
    pub fn irradiance(&self, axis: &SpectralAxis) -> Result<Vec<f64>, DetectorError> {
        let density = self.bound_source()?.density(axis)?;
        let omega = self.config.beam_solid_angle_sr();
        Ok(density.into_iter().map(|d| d * omega).collect())
    }

    /// Spectral extent imaged onto one pixel at each axis sample:
    /// `λ / (R · px_per_res_element)` (m).
    pub fn dispersion_per_pixel(&self, axis: &SpectralAxis) -> Vec<f64> {
        let denom = self.config.resolving_power * self.config.px_per_res_element;
        axis.wavelengths_m().iter().map(|wl| wl / denom).collect()
    }

    /// Optical power collected by one pixel at each axis sample (W).
    pub fn flux_per_pixel(&self, axis: &SpectralAxis) -> Result<Vec<f64>, DetectorError> {
        // The per-pixel flux integrates the per-wavelength irradiance over
        // the pixel's own dispersion interval, so the wavelength-domain
        // density is the right integrand on either kind of axis.
        let per_axis = self.irradiance(axis)?;
        let per_wl = axis.density_to_wavelength_domain(&per_axis);
        let area = self.config.pixel_area_m2();

        Ok(per_wl
            .into_iter()
            .zip(self.dispersion_per_pixel(axis))
            .map(|(e, dwl)| e * area * dwl)
            .collect())
    }

    /// Photons per second collected by one pixel at each axis sample.
    pub fn photon_flux_per_pixel(&self, axis: &SpectralAxis) -> Result<Vec<f64>, DetectorError> {
        let flux = self.flux_per_pixel(axis)?;
        Ok(flux
            .into_iter()
            .zip(axis.frequencies_hz())
            .map(|(f, nu)| {
                let rate = f / photon_energy(nu);
                if rate.is_nan() {
                    0.0
                } else {
                    rate
                }
            })
            .collect())
    }

    /// Thermal background electron rate per binned sample (e⁻/s), constant
    /// across the axis: the band integral of the cone-weighted cryostat
    /// graybody radiance converted to detected photons.
    fn background_electron_rate(&self) -> f64 {
        let thermal = match &self.config.thermal {
            Some(t) => t,
            None => return 0.0,
        };

        const N: usize = 1000;
        let (lo, hi) = self.config.band_m;
        let dw = (hi - lo) / N as f64;
        let area = self.config.pixel_area_m2();

        let integrand = |wl: f64| {
            let nu = SI::SPEED_OF_LIGHT / wl;
            self.config.qe.at(wl) * thermal.radiance(wl) * area / photon_energy(nu)
        };

        let mut total = 0.0;
        for i in 0..N {
            let a = lo + dw * i as f64;
            total += 0.5 * (integrand(a) + integrand(a + dw)) * dw;
        }
        total * self.config.binning as f64
    }

    /// Noiseless electron rate per binned sample at each axis point (e⁻/s):
    /// QE-weighted photon flux times the binning factor, plus the thermal
    /// background floor.
    pub fn electron_rate(&self, axis: &SpectralAxis) -> Result<Vec<f64>, DetectorError> {
        let photons = self.photon_flux_per_pixel(axis)?;
        let background = self.background_electron_rate();
        let binning = self.config.binning as f64;

        Ok(photons
            .into_iter()
            .zip(axis.wavelengths_m())
            .map(|(p, wl)| self.config.qe.at(wl) * p * binning + background)
            .collect())
    }

    /// Collected electrons after an exposure of `exposure_s` seconds.
    ///
    /// With `noise` set, each sample draws from a Poisson distribution at the
    /// expected electron count and then adds Gaussian read noise for the
    /// exposure's regime. Samples are clipped at zero.
    pub fn electrons(
        &mut self,
        axis: &SpectralAxis,
        exposure_s: f64,
        noise: bool,
    ) -> Result<Vec<f64>, DetectorError> {
        let rate = self.electron_rate(axis)?;
        let ron = self.config.ron(exposure_s);

        Ok(rate
            .into_iter()
            .map(|r| {
                let expected = (r * exposure_s).max(0.0);
                if !noise {
                    return expected;
                }

                let mut e = if expected > 0.0 {
                    Poisson::new(expected).unwrap().sample(&mut self.rng)
                } else {
                    0.0
                };
                if ron > 0.0 {
                    e += Normal::new(0.0, ron).unwrap().sample(&mut self.rng);
                }
                e.max(0.0)
            })
            .collect())
    }

    /// ADU counts after an exposure: electrons through the gain, rounded to
    /// whole counts.
    pub fn counts(
        &mut self,
        axis: &SpectralAxis,
        exposure_s: f64,
        noise: bool,
    ) -> Result<Vec<f64>, DetectorError> {
        let gain = self.config.gain_e_per_adu;
        Ok(self
            .electrons(axis, exposure_s, noise)?
            .into_iter()
            .map(|e| (e / gain).round())
            .collect())
    }

    /// Longest exposure before the brightest axis sample saturates.
    ///
    /// Works on the noiseless, unrounded electron rate so weak signals are
    /// not quantized away. Reports the saturating sample in both domains.
    pub fn max_exposure_time(
        &self,
        axis: &SpectralAxis,
        saturation_adu: f64,
    ) -> Result<MaxExposure, DetectorError> {
        let rate = self.electron_rate(axis)?;

        let mut best = 0;
        for i in 1..rate.len() {
            if rate[i] > rate[best] {
                best = i;
            }
        }
        if rate[best] <= 0.0 {
            return Err(DetectorError::NoSignal);
        }

        Ok(MaxExposure {
            t_max_s: saturation_adu * self.config.gain_e_per_adu / rate[best],
            wavelength_m: axis.wavelengths_m()[best],
            frequency_hz: axis.frequencies_hz()[best],
        })
    }

    /// Estimator for the time to reach `count_limit` ADU at one wavelength,
    /// resolved on an `n`-point exposure grid.
    pub fn exposure_estimator(
        &self,
        wavelength_m: f64,
        count_limit: f64,
        n: usize,
    ) -> Result<ExposureTimeEstimator, DetectorError> {
        let axis = SpectralAxis::wavelength(wavelength_m);
        let rate = self.electron_rate(&axis)?[0];
        if rate <= 0.0 {
            return Err(DetectorError::NoSignal);
        }

        Ok(ExposureTimeEstimator::new(
            rate,
            count_limit,
            n,
            self.config.gain_e_per_adu,
            self.config.read_noise_short_e,
            self.config.read_noise_long_e,
            self.config.read_noise_threshold_s,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config() -> DetectorConfig {
        DetectorConfig {
            pixel_pitch_m: 15e-6,
            resolving_power: 20_000.0,
            px_per_res_element: 2.2,
            binning: 1,
            qe: QuantumEfficiency::Flat(0.8),
            gain_e_per_adu: 2.0,
            read_noise_short_e: 20.0,
            read_noise_long_e: 8.0,
            read_noise_threshold_s: 120.0,
            f_number: 2.8,
            thermal: None,
            band_m: (0.9e-6, 2.5e-6),
        }
    }

    fn bound_detector(seed: Option<u64>) -> DetectorModel {
        let mut det = DetectorModel::new(config(), seed);
        det.bind_source(SpectralSource::blackbody("lamp", 1200.0));
        det
    }

    #[test]
    fn test_unbound_detector_errors() {
        let det = DetectorModel::new(config(), Some(1));
        let axis = SpectralAxis::wavelength(2e-6);
        assert!(matches!(
            det.irradiance(&axis),
            Err(DetectorError::NoSourceConfigured)
        ));
    }

    #[test]
    fn test_irradiance_is_radiance_through_beam() {
        let det = bound_detector(Some(1));
        let axis = SpectralAxis::wavelength(2e-6);

        let radiance = det.source().unwrap().density(&axis).unwrap()[0];
        let expected = radiance * std::f64::consts::PI / (4.0 * 2.8 * 2.8);
        assert_relative_eq!(det.irradiance(&axis).unwrap()[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn test_dispersion_per_pixel() {
        let det = bound_detector(Some(1));
        let axis = SpectralAxis::wavelength(2.2e-6);
        let dwl = det.dispersion_per_pixel(&axis)[0];
        assert_relative_eq!(dwl, 2.2e-6 / (20_000.0 * 2.2), max_relative = 1e-12);
    }

    #[test]
    fn test_noiseless_electrons_scale_linearly_with_time() {
        let mut det = bound_detector(Some(1));
        let axis = SpectralAxis::wavelength(2e-6);

        let e1 = det.electrons(&axis, 1.0, false).unwrap()[0];
        let e10 = det.electrons(&axis, 10.0, false).unwrap()[0];
        assert!(e1 > 0.0);
        assert_relative_eq!(e10, 10.0 * e1, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_exposure_yields_zero_electrons() {
        let mut det = bound_detector(Some(1));
        let axis = SpectralAxis::wavelengths(vec![1.5e-6, 2.0e-6, 2.4e-6]);
        for e in det.electrons(&axis, 0.0, false).unwrap() {
            assert_eq!(e, 0.0);
        }
    }

    #[test]
    fn test_counts_scale_inversely_with_gain() {
        let axis = SpectralAxis::wavelength(2e-6);

        let count_at_gain = |gain: f64| {
            let mut cfg = config();
            cfg.gain_e_per_adu = gain;
            let mut det = DetectorModel::new(cfg, Some(1));
            det.bind_source(SpectralSource::blackbody("lamp", 1200.0));
            det.counts(&axis, 100.0, false).unwrap()[0]
        };

        let c2 = count_at_gain(2.0);
        let c4 = count_at_gain(4.0);
        assert!(c2 > 0.0);
        assert_relative_eq!(c4, (c2 * 2.0 / 4.0).round(), max_relative = 1e-3);
    }

    #[test]
    fn test_counts_round_through_gain() {
        let mut det = bound_detector(Some(1));
        let axis = SpectralAxis::wavelength(2e-6);

        let e = det.electrons(&axis, 1.0, false).unwrap()[0];
        let c = det.counts(&axis, 1.0, false).unwrap()[0];
        assert_relative_eq!(c, (e / 2.0).round());
        assert_eq!(c, c.round());
    }

    #[test]
    fn test_binning_multiplies_rate() {
        let axis = SpectralAxis::wavelength(2e-6);
        let det1 = bound_detector(Some(1));
        let rate1 = det1.electron_rate(&axis).unwrap()[0];

        let mut cfg = config();
        cfg.binning = 4;
        let mut det4 = DetectorModel::new(cfg, Some(1));
        det4.bind_source(SpectralSource::blackbody("lamp", 1200.0));
        let rate4 = det4.electron_rate(&axis).unwrap()[0];

        assert_relative_eq!(rate4, 4.0 * rate1, max_relative = 1e-12);
    }

    #[test]
    fn test_thermal_background_adds_constant_floor() {
        let mut cfg = config();
        cfg.thermal = Some(ThermalBackground::new(0.3, 0.1, 230.0));
        let mut det = DetectorModel::new(cfg, Some(1));
        det.bind_source(SpectralSource::blackbody("lamp", 1200.0));

        let axis = SpectralAxis::wavelengths(vec![1.0e-6, 2.0e-6]);
        let with_bg = det.electron_rate(&axis).unwrap();

        let det_cold = bound_detector(Some(1));
        let without_bg = det_cold.electron_rate(&axis).unwrap();

        let floor0 = with_bg[0] - without_bg[0];
        let floor1 = with_bg[1] - without_bg[1];
        assert!(floor0 > 0.0);
        assert_relative_eq!(floor0, floor1, max_relative = 1e-9);
    }

    #[test]
    fn test_noise_is_reproducible_with_a_seed() {
        let axis = SpectralAxis::wavelengths(vec![1.8e-6, 2.0e-6, 2.2e-6]);

        let mut a = bound_detector(Some(42));
        let mut b = bound_detector(Some(42));
        assert_eq!(
            a.counts(&axis, 10.0, true).unwrap(),
            b.counts(&axis, 10.0, true).unwrap()
        );

        let mut c = bound_detector(Some(43));
        assert_ne!(
            a.counts(&axis, 10.0, true).unwrap(),
            c.counts(&axis, 10.0, true).unwrap()
        );
    }

    #[test]
    fn test_read_noise_regimes() {
        let cfg = config();
        assert_eq!(cfg.ron(10.0), 20.0);
        assert_eq!(cfg.ron(119.9), 20.0);
        assert_eq!(cfg.ron(120.0), 8.0);
        assert_eq!(cfg.ron(3600.0), 8.0);
    }

    #[test]
    fn test_max_exposure_time_tracks_brightest_sample() {
        let det = bound_detector(Some(1));
        // 1200 K peaks near 2.4 µm; the reddest sample saturates first
        let axis = SpectralAxis::wavelengths(vec![1.2e-6, 1.6e-6, 2.4e-6]);

        let max = det.max_exposure_time(&axis, 65_535.0).unwrap();
        assert_relative_eq!(max.wavelength_m, 2.4e-6);
        assert_relative_eq!(
            max.frequency_hz,
            SI::SPEED_OF_LIGHT / 2.4e-6,
            max_relative = 1e-12
        );

        let rate = det.electron_rate(&axis).unwrap()[2];
        assert_relative_eq!(max.t_max_s, 65_535.0 * 2.0 / rate, max_relative = 1e-12);
    }

    #[test]
    fn test_max_exposure_time_no_signal() {
        let mut det = DetectorModel::new(config(), Some(1));
        // Fully attenuated source: zero rate everywhere
        let mut source = SpectralSource::blackbody("lamp", 1200.0);
        source.set_attenuation(1.0).unwrap();
        det.bind_source(source);

        let axis = SpectralAxis::wavelength(2e-6);
        assert!(matches!(
            det.max_exposure_time(&axis, 65_535.0),
            Err(DetectorError::NoSignal)
        ));
    }
}
