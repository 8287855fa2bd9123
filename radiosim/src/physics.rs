//! Physical constants and blackbody radiometry.
//!
//! All quantities are SI: wavelengths in meters, frequencies in Hz,
//! temperatures in Kelvin, spectral radiance in W·m⁻²·sr⁻¹·m⁻¹ (per unit
//! wavelength) or W·m⁻²·sr⁻¹·Hz⁻¹ (per unit frequency).

/// Constants in SI units
pub struct SI {}

impl SI {
    /// Speed of light in vacuum
    /// Units: m/s
    pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

    /// Planck's constant
    /// Units: J·s
    pub const PLANCK_CONSTANT: f64 = 6.626_070_15e-34;

    /// Boltzmann's constant
    /// Units: J/K
    pub const BOLTZMANN: f64 = 1.380_649e-23;

    /// Wien's displacement constant
    /// Units: m·K
    pub const WIEN_B: f64 = 2.897_771_955e-3;

    /// Proton rest mass
    /// Units: kg
    pub const PROTON_MASS: f64 = 1.672_621_9e-27;
}

/// Planck spectral radiance per unit wavelength.
///
/// Returns `2hc²/λ⁵ / (exp(hc/λkT) − 1)` in W·m⁻²·sr⁻¹·m⁻¹. Non-physical
/// inputs (λ ≤ 0 or T ≤ 0) evaluate to 0 rather than NaN, as do arguments
/// deep enough in the Wien tail that the exponential would overflow.
pub fn planck_wavelength(wavelength_m: f64, temperature_k: f64) -> f64 {
    if wavelength_m <= 0.0 || temperature_k <= 0.0 {
        return 0.0;
    }

    let h = SI::PLANCK_CONSTANT;
    let c = SI::SPEED_OF_LIGHT;
    let k = SI::BOLTZMANN;

    let x = h * c / (wavelength_m * k * temperature_k);
    if x > 700.0 {
        // exp(x) overflows f64; the radiance has underflowed to zero anyway
        return 0.0;
    }

    2.0 * h * c * c / wavelength_m.powi(5) / (x.exp() - 1.0)
}

/// Planck spectral radiance per unit frequency.
///
/// Returns `2hν³/c² / (exp(hν/kT) − 1)` in W·m⁻²·sr⁻¹·Hz⁻¹, with the same
/// zero conventions as [`planck_wavelength`].
pub fn planck_frequency(frequency_hz: f64, temperature_k: f64) -> f64 {
    if frequency_hz <= 0.0 || temperature_k <= 0.0 {
        return 0.0;
    }

    let h = SI::PLANCK_CONSTANT;
    let c = SI::SPEED_OF_LIGHT;
    let k = SI::BOLTZMANN;

    let x = h * frequency_hz / (k * temperature_k);
    if x > 700.0 {
        return 0.0;
    }

    2.0 * h * frequency_hz.powi(3) / (c * c * (x.exp() - 1.0))
}

/// Wavelength of peak blackbody emission from Wien's displacement law (m).
pub fn wien_peak(temperature_k: f64) -> f64 {
    SI::WIEN_B / temperature_k
}

/// Energy of a photon of the given frequency (J).
pub fn photon_energy(frequency_hz: f64) -> f64 {
    SI::PLANCK_CONSTANT * frequency_hz
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wien_peak_is_planck_maximum() {
        let t = 5700.0;
        let peak = wien_peak(t);

        let at_peak = planck_wavelength(peak, t);
        assert!(at_peak > 0.0);

        // Nearby wavelengths must be dimmer
        assert!(planck_wavelength(peak * 0.9, t) < at_peak);
        assert!(planck_wavelength(peak * 1.1, t) < at_peak);
    }

    #[test]
    fn test_planck_domain_consistency() {
        // I_ν = I_λ · λ²/c at the same spectral point
        let t = 1200.0;
        let wl = 2.2e-6;
        let nu = SI::SPEED_OF_LIGHT / wl;

        let per_wl = planck_wavelength(wl, t);
        let per_nu = planck_frequency(nu, t);

        assert_relative_eq!(per_nu, per_wl * wl * wl / SI::SPEED_OF_LIGHT, max_relative = 1e-12);
    }

    #[test]
    fn test_planck_degenerate_inputs() {
        assert_eq!(planck_wavelength(-1.0, 5000.0), 0.0);
        assert_eq!(planck_wavelength(500e-9, 0.0), 0.0);
        assert_eq!(planck_frequency(0.0, 5000.0), 0.0);
        // Cold stage in the visible: Wien tail underflows to zero, not NaN
        let cold = planck_wavelength(500e-9, 1.0);
        assert_eq!(cold, 0.0);
    }

    #[test]
    fn test_photon_energy() {
        // Green photon, ~2.3 eV
        let nu = SI::SPEED_OF_LIGHT / 530e-9;
        let ev = photon_energy(nu) / 1.602176634e-19;
        assert!(ev > 2.2 && ev < 2.5, "got {ev} eV");
    }
}
