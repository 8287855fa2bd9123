//! Radiometric signal-chain simulation for a dispersive spectrograph.
//!
//! The crate models the path from light source to detector counts:
//!
//! * [`source`] - spectral radiance sources (blackbodies, tabulated spectra,
//!   emission-line lamps, integrating spheres, attenuated and overlapped
//!   compositions)
//! * [`optics`] - transmissive stages composed into pipelines, with graybody
//!   re-emission of the lost light
//! * [`detector`] - photon flux to electron rate to noisy ADU counts, plus a
//!   resumable exposure time estimator
//! * [`axis`] - wavelength/frequency axes and the density Jacobian
//! * [`grating`] - the disperser catalog
//!
//! All quantities are SI.

pub mod axis;
pub mod curve;
pub mod detector;
pub mod grating;
pub mod optics;
pub mod physics;
pub mod source;

pub use axis::{AxisError, AxisKind, SpectralAxis};
pub use curve::{CurveError, TabulatedCurve};
pub use detector::{
    DetectorConfig, DetectorError, DetectorModel, EstimatorError, ExposureTimeDistribution,
    ExposureTimeEstimator, MaxExposure, QuantumEfficiency, ThermalBackground,
};
pub use grating::{Grating, GratingError, GratingTable};
pub use optics::{OpticalStage, OpticsError, Pipeline, Transmission};
pub use source::{
    EmissionLine, IntegratingSphere, LineSet, PowerSource, Role, SourceError, SpectralSource,
};
