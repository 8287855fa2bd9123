//! Spectral sources.
//!
//! A [`SpectralSource`] produces spectral radiance (W·m⁻²·sr⁻¹ per unit
//! axis interval) as a function of wavelength or frequency. Concrete shapes
//! are tagged variants rather than a class hierarchy: blackbody, tabulated
//! curve, emission-line set, integrating sphere, pipeline-attenuated wrapper
//! and additive overlap. Every variant honors the same effective scaling,
//! `power_factor × (1 − attenuation) × raw_density`.

pub mod lines;
pub mod power;

pub use lines::{EmissionLine, LineSet};
pub use power::PowerSource;

use thiserror::Error;

use crate::axis::{AxisError, SpectralAxis};
use crate::curve::TabulatedCurve;
use crate::optics::{OpticsError, Pipeline, Transmission};
use crate::physics::{photon_energy, planck_wavelength, wien_peak};

/// Errors raised by spectral source operations
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid attenuation {0}: must lie in [0, 1]")]
    InvalidAttenuation(f64),

    #[error("cannot adjust source power: no nominal power rating set")]
    PowerNotAdjustable,

    #[error(transparent)]
    Axis(#[from] AxisError),

    #[error(transparent)]
    Optics(#[from] OpticsError),
}

/// What a source illuminates: the calibration path or the sky path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Calibration,
    Sky,
}

/// An integrating sphere turning lamp power inputs into output radiance.
///
/// Multiple reflections off the wall (reflectance ρ, weighted by the
/// geometric efficiency of the non-aperture area) give the familiar sphere
/// gain `ρ/((1 − ρ)·A)`. The wall also emits as a graybody at its own
/// temperature, weighted by `1 − reflectance`.
#[derive(Debug, Clone)]
pub struct IntegratingSphere {
    radius_m: f64,
    aperture_area_m2: f64,
    wall: Transmission,
    wall_temperature_k: f64,
    lamps: Vec<PowerSource>,
}

impl IntegratingSphere {
    pub fn new(
        radius_m: f64,
        aperture_area_m2: f64,
        wall_reflectance: Transmission,
        wall_temperature_k: f64,
    ) -> Result<Self, OpticsError> {
        wall_reflectance.validate()?;
        if wall_temperature_k < 0.0 {
            return Err(OpticsError::NegativeTemperature(wall_temperature_k));
        }

        Ok(Self {
            radius_m,
            aperture_area_m2,
            wall: wall_reflectance,
            wall_temperature_k,
            lamps: Vec::new(),
        })
    }

    pub fn push_lamp(&mut self, lamp: PowerSource) {
        self.lamps.push(lamp);
    }

    pub fn set_wall_temperature(&mut self, temperature_k: f64) {
        self.wall_temperature_k = temperature_k;
    }

    fn sphere_area_m2(&self) -> f64 {
        4.0 * std::f64::consts::PI * self.radius_m * self.radius_m
    }

    fn geometric_efficiency(&self) -> f64 {
        1.0 - self.aperture_area_m2 / self.sphere_area_m2()
    }

    /// Output radiance per unit wavelength at the given wavelengths.
    fn radiance(&self, wavelengths_m: &[f64]) -> Result<Vec<f64>, SourceError> {
        let area = self.sphere_area_m2();
        let geom = self.geometric_efficiency();

        let mut psd_total = vec![0.0; wavelengths_m.len()];
        let axis = SpectralAxis::wavelengths(wavelengths_m.to_vec());
        for lamp in &self.lamps {
            for (total, value) in psd_total.iter_mut().zip(lamp.psd(&axis)?) {
                *total += value;
            }
        }

        Ok(wavelengths_m
            .iter()
            .zip(psd_total)
            .map(|(&wl, psd)| {
                let reflectance = self.wall.at(wl);
                let rho = reflectance * geom;
                let gain = rho / ((1.0 - rho) * area);
                let wall_emission =
                    (1.0 - reflectance) * planck_wavelength(wl, self.wall_temperature_k);
                gain * psd + wall_emission
            })
            .collect())
    }
}

/// Shape-specific payload of a spectral source.
#[derive(Debug, Clone)]
enum SourceKind {
    Blackbody { temperature_k: f64 },
    Tabulated(TabulatedCurve),
    Lines(LineSet),
    IntegratingSphere(IntegratingSphere),
    Attenuated {
        inner: Box<SpectralSource>,
        optics: Pipeline,
    },
    Overlapped(Vec<SpectralSource>),
}

/// A spectral radiance source.
#[derive(Debug, Clone)]
pub struct SpectralSource {
    label: String,
    role: Option<Role>,
    rating_w: Option<f64>,
    power_factor: f64,
    attenuation: f64,
    native_grid_m: Option<Vec<f64>>,
    kind: SourceKind,
}

impl SpectralSource {
    fn with_kind(label: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            label: label.into(),
            role: None,
            rating_w: None,
            power_factor: 1.0,
            attenuation: 0.0,
            native_grid_m: None,
            kind,
        }
    }

    /// Constant-temperature blackbody (Planck's law).
    pub fn blackbody(label: impl Into<String>, temperature_k: f64) -> Self {
        Self::with_kind(label, SourceKind::Blackbody { temperature_k })
    }

    /// Interpolated radiance table (wavelength m → W·m⁻²·sr⁻¹·m⁻¹); the
    /// table's grid becomes the source's native sampling grid.
    pub fn tabulated(label: impl Into<String>, curve: TabulatedCurve) -> Self {
        let grid = curve.xs().to_vec();
        let mut source = Self::with_kind(label, SourceKind::Tabulated(curve));
        source.native_grid_m = Some(grid);
        source
    }

    /// Doppler-broadened emission-line set over a continuum.
    pub fn lines(label: impl Into<String>, set: LineSet) -> Self {
        Self::with_kind(label, SourceKind::Lines(set))
    }

    /// Integrating-sphere output radiance.
    pub fn integrating_sphere(label: impl Into<String>, sphere: IntegratingSphere) -> Self {
        Self::with_kind(label, SourceKind::IntegratingSphere(sphere))
    }

    /// Wrap a source behind an optical pipeline. The pipeline's transmission
    /// (and graybody stage emission) shapes the inner source's density; the
    /// wrapper does not re-derive any optics.
    pub fn attenuated(label: impl Into<String>, inner: SpectralSource, optics: Pipeline) -> Self {
        Self::with_kind(
            label,
            SourceKind::Attenuated {
                inner: Box::new(inner),
                optics,
            },
        )
    }

    /// Additive overlap of several sources.
    pub fn overlapped(label: impl Into<String>, sources: Vec<SpectralSource>) -> Self {
        Self::with_kind(label, SourceKind::Overlapped(sources))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    /// True when a role is set and matches.
    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    /// Nominal power rating (W); required before `adjust_power`.
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

    /// Set `power_factor = power / rating`. Without a nominal rating the
    /// source is not adjustable; it stays usable with a factor of 1.
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

    pub fn attenuation(&self) -> f64 {
        self.attenuation
    }

    /// Native sampling grid (wavelength, m) when the source has one.
    pub fn native_grid(&self) -> Option<&[f64]> {
        match &self.kind {
            SourceKind::Attenuated { inner, .. } => inner.native_grid(),
            _ => self.native_grid_m.as_deref(),
        }
    }

    /// Raw (unscaled) radiance per unit wavelength at the given wavelengths.
    fn raw_density_per_wavelength(&self, wavelengths_m: &[f64]) -> Result<Vec<f64>, SourceError> {
        match &self.kind {
            SourceKind::Blackbody { temperature_k } => Ok(wavelengths_m
                .iter()
                .map(|&wl| planck_wavelength(wl, *temperature_k))
                .collect()),
            SourceKind::Tabulated(curve) => Ok(curve.sample(wavelengths_m)),
            SourceKind::Lines(set) => Ok(set.evaluate(wavelengths_m)),
            SourceKind::IntegratingSphere(sphere) => sphere.radiance(wavelengths_m),
            SourceKind::Attenuated { inner, optics } => {
                let axis = SpectralAxis::wavelengths(wavelengths_m.to_vec());
                let density = inner.density(&axis)?;
                Ok(optics.apply(&axis, &density, true)?)
            }
            SourceKind::Overlapped(sources) => {
                let axis = SpectralAxis::wavelengths(wavelengths_m.to_vec());
                let mut total = vec![0.0; wavelengths_m.len()];
                for source in sources {
                    for (acc, value) in total.iter_mut().zip(source.density(&axis)?) {
                        *acc += value;
                    }
                }
                Ok(total)
            }
        }
    }

    /// Effective spectral radiance over the axis, per unit of the axis's own
    /// kind: `power_factor × (1 − attenuation) × raw`.
    pub fn density(&self, axis: &SpectralAxis) -> Result<Vec<f64>, SourceError> {
        axis.check()?;
        let scale = self.power_factor * (1.0 - self.attenuation);
        let mut per_wl = self.raw_density_per_wavelength(&axis.wavelengths_m())?;
        for v in &mut per_wl {
            *v *= scale;
        }
        Ok(axis.density_from_wavelength_domain(&per_wl))
    }

    /// Photon radiance over the axis: the density divided by the photon
    /// energy `h·ν` at each sample, photons·s⁻¹·m⁻²·sr⁻¹ per unit axis.
    pub fn photon_rate(&self, axis: &SpectralAxis) -> Result<Vec<f64>, SourceError> {
        let density = self.density(axis)?;
        let frequencies = axis.frequencies_hz();
        Ok(density
            .into_iter()
            .zip(frequencies)
            .map(|(d, nu)| d / photon_energy(nu))
            .collect())
    }

    /// Wavelength of peak emission, when the source has a tractable one.
    ///
    /// Overlapped and sphere sources report `None`: their combined peak is
    /// not analytically available without a full scan of an external grid.
    pub fn peak_wavelength(&self) -> Option<f64> {
        match &self.kind {
            SourceKind::Blackbody { temperature_k } => Some(wien_peak(*temperature_k)),
            SourceKind::Tabulated(curve) => Some(curve.peak().0),
            SourceKind::Lines(set) => set.peak_wavelength(),
            SourceKind::IntegratingSphere(_) | SourceKind::Overlapped(_) => None,
            SourceKind::Attenuated { inner, .. } => match inner.native_grid() {
                Some(grid) => {
                    let axis = SpectralAxis::wavelengths(grid.to_vec());
                    let density = self.density(&axis).ok()?;
                    let mut best = 0;
                    for i in 1..density.len() {
                        if density[i] > density[best] {
                            best = i;
                        }
                    }
                    Some(grid[best])
                }
                None => inner.peak_wavelength(),
            },
        }
    }
}
