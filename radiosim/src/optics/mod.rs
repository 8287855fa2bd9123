//! Optical stages and the composable pipeline.
//!
//! An [`OpticalStage`] is a wavelength-dependent transmittance with an
//! associated temperature. Stages compose, in insertion order, into a
//! [`Pipeline`]; pipelines nest as groups and may repeat their whole chain an
//! integer number of times. `apply` threads a spectral density through the
//! chain, and every lossy, emission-enabled stage re-radiates the lost
//! fraction as a graybody at its own temperature.

use thiserror::Error;

use crate::axis::{AxisKind, SpectralAxis};
use crate::curve::TabulatedCurve;
use crate::physics::{planck_frequency, planck_wavelength};

/// Errors raised while building or evaluating optical chains
#[derive(Debug, Error)]
pub enum OpticsError {
    #[error("transmittance {0} outside [0, 1]")]
    InvalidTransmittance(f64),

    #[error("stage temperature must be non-negative, got {0} K")]
    NegativeTemperature(f64),

    #[error("axis has {axis} samples but spectrum has {spectrum}")]
    ShapeMismatch { axis: usize, spectrum: usize },

    #[error("no stage labelled '{0}' in the pipeline")]
    UndefinedStage(String),
}

/// Wavelength-dependent transmittance of a single element, t(λ) ∈ [0, 1].
#[derive(Debug, Clone)]
pub enum Transmission {
    /// Constant transmittance across the supported band
    Flat(f64),
    /// Interpolated transmittance curve over wavelength (m); opaque outside
    /// the tabulated span
    Curve(TabulatedCurve),
}

impl Transmission {
    pub(crate) fn validate(&self) -> Result<(), OpticsError> {
        match self {
            Transmission::Flat(t) => {
                if !(0.0..=1.0).contains(t) {
                    return Err(OpticsError::InvalidTransmittance(*t));
                }
            }
            Transmission::Curve(curve) => {
                for &wl in curve.xs() {
                    let t = curve.at(wl);
                    if !(0.0..=1.0).contains(&t) {
                        return Err(OpticsError::InvalidTransmittance(t));
                    }
                }
            }
        }
        Ok(())
    }

    /// Transmittance at a wavelength (m).
    pub fn at(&self, wavelength_m: f64) -> f64 {
        match self {
            Transmission::Flat(t) => *t,
            Transmission::Curve(curve) => curve.at(wavelength_m),
        }
    }
}

/// One element of the optical chain: transmittance, temperature, repeat count
/// and a graybody emission toggle.
#[derive(Debug, Clone)]
pub struct OpticalStage {
    label: String,
    temperature_k: f64,
    multiplicity: f64,
    emissive: bool,
    transmission: Transmission,
}

impl OpticalStage {
    pub fn new(
        label: impl Into<String>,
        transmission: Transmission,
        temperature_k: f64,
    ) -> Result<Self, OpticsError> {
        if temperature_k < 0.0 {
            return Err(OpticsError::NegativeTemperature(temperature_k));
        }
        transmission.validate()?;

        Ok(Self {
            label: label.into(),
            temperature_k,
            multiplicity: 1.0,
            emissive: true,
            transmission,
        })
    }

    /// Stage with a constant transmittance.
    pub fn flat(
        label: impl Into<String>,
        transmittance: f64,
        temperature_k: f64,
    ) -> Result<Self, OpticsError> {
        Self::new(label, Transmission::Flat(transmittance), temperature_k)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn temperature_k(&self) -> f64 {
        self.temperature_k
    }

    /// Repeat count for physically repeated elements. Fractional values are
    /// rounded to the nearest non-negative integer on use.
    pub fn set_multiplicity(&mut self, multiplicity: f64) {
        self.multiplicity = multiplicity;
    }

    /// Enable or disable this stage's graybody background emission.
    pub fn set_emissive(&mut self, emissive: bool) {
        self.emissive = emissive;
    }

    fn repeats(&self) -> u32 {
        self.multiplicity.round().max(0.0) as u32
    }

    /// Effective transmittance at a wavelength, with multiplicity applied.
    pub fn t(&self, wavelength_m: f64) -> f64 {
        let t = self.transmission.at(wavelength_m);
        match self.repeats() {
            1 => t,
            n => t.powi(n as i32),
        }
    }

    /// Thread one density sample through the stage.
    ///
    /// `value` is the axis sample in its native domain (used for the graybody
    /// term), `wavelength_m` the same point as a wavelength (used for the
    /// transmittance lookup). The lost fraction `(1 − t)` re-radiates as a
    /// graybody at the stage temperature when emission applies.
    fn apply_one(&self, kind: AxisKind, value: f64, wavelength_m: f64, input: f64, thermal: bool) -> f64 {
        let t = self.t(wavelength_m);
        let mut out = t * input;

        if thermal && self.emissive && t < 1.0 {
            let background = match kind {
                AxisKind::Wavelength => planck_wavelength(value, self.temperature_k),
                AxisKind::Frequency => planck_frequency(value, self.temperature_k),
            };
            out += (1.0 - t) * background;
        }

        out
    }

    /// Band-averaged response over a Gaussian passband centered on
    /// `center_wavelength_m` with the given FWHM (m).
    pub fn band_average_t(&self, center_wavelength_m: f64, fwhm_m: f64) -> f64 {
        band_average(center_wavelength_m, fwhm_m, |wl| self.t(wl))
    }
}

/// A pipeline member: either a leaf stage or a nested sub-chain.
#[derive(Debug, Clone)]
enum Element {
    Stage(OpticalStage),
    Group(Pipeline),
}

impl Element {
    fn label(&self) -> &str {
        match self {
            Element::Stage(stage) => stage.label(),
            Element::Group(pipeline) => pipeline.label(),
        }
    }
}

/// An ordered chain of optical stages with an optional whole-chain repeat
/// count.
#[derive(Debug, Clone)]
pub struct Pipeline {
    label: String,
    elements: Vec<Element>,
    multiplicity: f64,
}

impl Pipeline {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            elements: Vec::new(),
            multiplicity: 1.0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn push_back(&mut self, stage: OpticalStage) {
        self.elements.push(Element::Stage(stage));
    }

    pub fn push_front(&mut self, stage: OpticalStage) {
        self.elements.insert(0, Element::Stage(stage));
    }

    /// Nest a whole sub-chain as a single element.
    pub fn push_group(&mut self, group: Pipeline) {
        self.elements.push(Element::Group(group));
    }

    /// Repeat the whole chain end-to-end `round(multiplicity)` times.
    pub fn set_multiplicity(&mut self, multiplicity: f64) {
        self.multiplicity = multiplicity;
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Labels of the chain's members, in order (groups contribute their own
    /// label, not their children's).
    pub fn stage_labels(&self) -> Vec<String> {
        self.elements.iter().map(|e| e.label().to_string()).collect()
    }

    fn repeats(&self) -> u32 {
        self.multiplicity.round().max(0.0) as u32
    }

    /// Composite transmittance at a single wavelength: the product of member
    /// transmittances, raised to the chain repeat count. Background emission
    /// never contributes here.
    pub fn t_at(&self, wavelength_m: f64) -> f64 {
        let mut t = 1.0;
        for element in &self.elements {
            t *= match element {
                Element::Stage(stage) => stage.t(wavelength_m),
                Element::Group(group) => group.t_at(wavelength_m),
            };
        }
        match self.repeats() {
            1 => t,
            n => t.powi(n as i32),
        }
    }

    /// Composite transmittance over an axis.
    pub fn get_t(&self, axis: &SpectralAxis) -> Vec<f64> {
        axis.wavelengths_m().iter().map(|&wl| self.t_at(wl)).collect()
    }

    /// Thread a spectral density through the chain in insertion order.
    ///
    /// `input` is a density per unit of the axis's own kind. When `thermal`
    /// is set, each emission-enabled stage injects its graybody background;
    /// power-type spectra are threaded with `thermal = false` since a power
    /// density cannot absorb a radiance term.
    pub fn apply(
        &self,
        axis: &SpectralAxis,
        input: &[f64],
        thermal: bool,
    ) -> Result<Vec<f64>, OpticsError> {
        if axis.len() != input.len() {
            return Err(OpticsError::ShapeMismatch {
                axis: axis.len(),
                spectrum: input.len(),
            });
        }

        let wavelengths = axis.wavelengths_m();
        let mut current = input.to_vec();
        for _ in 0..self.repeats() {
            self.apply_chain(axis.kind(), axis.values(), &wavelengths, &mut current, thermal);
        }
        Ok(current)
    }

    fn apply_chain(
        &self,
        kind: AxisKind,
        values: &[f64],
        wavelengths: &[f64],
        current: &mut [f64],
        thermal: bool,
    ) {
        for element in &self.elements {
            match element {
                Element::Stage(stage) => {
                    for i in 0..current.len() {
                        current[i] = stage.apply_one(kind, values[i], wavelengths[i], current[i], thermal);
                    }
                }
                Element::Group(group) => {
                    for _ in 0..group.repeats() {
                        group.apply_chain(kind, values, wavelengths, current, thermal);
                    }
                }
            }
        }
    }

    /// Remove the named stages from the chain, recursing into groups.
    ///
    /// Every label must match at least one member; a miss reports
    /// [`OpticsError::UndefinedStage`] and leaves the pipeline unchanged.
    pub fn prune(&mut self, labels: &[&str]) -> Result<(), OpticsError> {
        for &label in labels {
            if !self.contains_label(label) {
                return Err(OpticsError::UndefinedStage(label.to_string()));
            }
        }

        log::debug!("pruning stages {:?} from pipeline '{}'", labels, self.label);
        self.prune_matching(labels);
        Ok(())
    }

    fn contains_label(&self, label: &str) -> bool {
        self.elements.iter().any(|e| {
            e.label() == label
                || matches!(e, Element::Group(group) if group.contains_label(label))
        })
    }

    fn prune_matching(&mut self, labels: &[&str]) {
        self.elements.retain(|e| !labels.contains(&e.label()));
        for element in &mut self.elements {
            if let Element::Group(group) = element {
                group.prune_matching(labels);
            }
        }
    }

    /// Band-averaged composite response over a Gaussian passband.
    pub fn band_average_t(&self, center_wavelength_m: f64, fwhm_m: f64) -> f64 {
        band_average(center_wavelength_m, fwhm_m, |wl| self.t_at(wl))
    }
}

/// Average a response under a unit-area Gaussian passband, integrated over
/// ±5σ with 1000 samples.
fn band_average<F: Fn(f64) -> f64>(center_m: f64, fwhm_m: f64, response: F) -> f64 {
    const N: usize = 1000;
    let sigma = fwhm_m / 2.355;
    let lo = center_m - 5.0 * sigma;
    let hi = center_m + 5.0 * sigma;
    let dw = (hi - lo) / (N - 1) as f64;

    let norm = 1.0 / (sigma * (2.0 * std::f64::consts::PI).sqrt());
    let mut sum = 0.0;
    for i in 0..N {
        let wl = lo + dw * i as f64;
        let weight = norm * (-0.5 * ((wl - center_m) / sigma).powi(2)).exp();
        sum += weight * response(wl);
    }
    sum * dw
}
