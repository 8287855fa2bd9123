//! Emission-line spectra for arc calibration lamps.
//!
//! A line set is a flat continuum (a fraction of the peak line flux) plus a
//! sum of Gaussian-broadened lines. Each line's width combines thermal
//! Doppler broadening, `σ_rel = √(2kT/m)/c` scaled by the line wavelength
//! and the species mass, with the local sampling interval of the evaluation
//! grid so coarse grids do not under-resolve a narrow line.

use crate::physics::SI;

/// Lines further than this many broadening widths outside the requested
/// range are skipped.
const BROADENING_WINDOW: f64 = 6.0;

/// A single emission line.
#[derive(Debug, Clone)]
pub struct EmissionLine {
    /// Center wavelength (m)
    pub wavelength_m: f64,
    /// Flux relative to the strongest line in the set
    pub relative_flux: f64,
    /// Emitting species mass in proton masses (hydrogen = 1)
    pub mass_amu: f64,
}

/// A thermally broadened set of emission lines over a continuum.
#[derive(Debug, Clone)]
pub struct LineSet {
    temperature_k: f64,
    peak_flux: f64,
    continuum_fraction: f64,
    lines: Vec<EmissionLine>,
}

impl LineSet {
    /// # Arguments
    /// * `peak_flux` - spectral radiance scale of the strongest line,
    ///   W·m⁻²·sr⁻¹·m⁻¹
    /// * `temperature_k` - plasma temperature driving Doppler broadening
    /// * `continuum_fraction` - continuum level as a fraction of `peak_flux`
    pub fn new(peak_flux: f64, temperature_k: f64, continuum_fraction: f64) -> Self {
        Self {
            temperature_k,
            peak_flux,
            continuum_fraction,
            lines: Vec::new(),
        }
    }

    pub fn add_line(&mut self, wavelength_m: f64, relative_flux: f64, mass_amu: f64) {
        self.lines.push(EmissionLine {
            wavelength_m,
            relative_flux,
            mass_amu,
        });
    }

    /// Wavelength of the strongest line, if any line has been added.
    pub fn peak_wavelength(&self) -> Option<f64> {
        self.lines
            .iter()
            .max_by(|a, b| a.relative_flux.partial_cmp(&b.relative_flux).unwrap())
            .map(|line| line.wavelength_m)
    }

    fn max_relative_flux(&self) -> f64 {
        self.lines
            .iter()
            .map(|l| l.relative_flux)
            .fold(0.0, f64::max)
    }

    /// Relative Doppler width, √(2kT/m_p)/c, referenced to hydrogen.
    fn relative_doppler_width(&self) -> f64 {
        (2.0 * SI::BOLTZMANN * self.temperature_k / SI::PROTON_MASS).sqrt() / SI::SPEED_OF_LIGHT
    }

    /// Evaluate the line set over a wavelength grid (m), returning spectral
    /// radiance per unit wavelength.
    pub fn evaluate(&self, wavelengths_m: &[f64]) -> Vec<f64> {
        let delta_rel = self.relative_doppler_width();

        // Widest local sampling interval of the grid; folded into each line
        // width so single-sample or coarse grids still see the line flux.
        let mut grid_delta = 0.0f64;
        for pair in wavelengths_m.windows(2) {
            grid_delta = grid_delta.max((pair[1] - pair[0]).abs());
        }

        let wl_lo = wavelengths_m.iter().cloned().fold(f64::INFINITY, f64::min);
        let wl_hi = wavelengths_m.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let window_lo = wl_lo * (1.0 - delta_rel * BROADENING_WINDOW);
        let window_hi = wl_hi * (1.0 + delta_rel * BROADENING_WINDOW);

        // The continuum is a density: its level is a fraction of the peak
        // spectral flux, independent of the band it is integrated over.
        let continuum = self.continuum_fraction * self.peak_flux;
        let mut result = vec![continuum; wavelengths_m.len()];

        let frel_max = self.max_relative_flux();
        if frel_max <= 0.0 {
            return result;
        }

        let sqrt_2pi = (2.0 * std::f64::consts::PI).sqrt();
        let k = self.peak_flux / (frel_max * 4.0 * std::f64::consts::PI * sqrt_2pi);

        for line in &self.lines {
            if line.wavelength_m <= window_lo || line.wavelength_m >= window_hi {
                continue;
            }

            let doppler_sigma = delta_rel * line.wavelength_m / line.mass_amu.sqrt();
            let sigma = (doppler_sigma * doppler_sigma + grid_delta * grid_delta).sqrt();
            let amplitude = line.relative_flux * k / sigma;

            for (out, &wl) in result.iter_mut().zip(wavelengths_m) {
                let delta = (wl - line.wavelength_m) / sigma;
                *out += amplitude * (-0.5 * delta * delta).exp();
            }
        }

        result
    }
}
