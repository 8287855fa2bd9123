//! Disperser catalog.
//!
//! The instrument carries a wheel of gratings, each defined by a resolving
//! power and a sensitivity band. [`GratingTable`] is the lookup layer the
//! configuration code registers them into.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::axis::SpectralAxis;

#[derive(Debug, Error)]
pub enum GratingError {
    #[error("no grating named '{0}' is registered")]
    Undefined(String),
}

/// A disperser: resolving power over a wavelength band.
#[derive(Debug, Clone, PartialEq)]
pub struct Grating {
    name: String,
    resolving_power: f64,
    band_m: (f64, f64),
}

impl Grating {
    pub fn new(name: impl Into<String>, resolving_power: f64, band_m: (f64, f64)) -> Self {
        Self {
            name: name.into(),
            resolving_power,
            band_m,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resolving_power(&self) -> f64 {
        self.resolving_power
    }

    /// Sensitivity band `(lo, hi)` in meters.
    pub fn band_m(&self) -> (f64, f64) {
        self.band_m
    }

    /// Uniform `n`-point wavelength axis spanning the grating's band.
    pub fn axis(&self, n: usize) -> SpectralAxis {
        SpectralAxis::wavelength_linspace(self.band_m.0, self.band_m.1, n)
    }
}

/// Name-keyed registry of the instrument's gratings.
#[derive(Debug, Default)]
pub struct GratingTable {
    gratings: BTreeMap<String, Grating>,
}

impl GratingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grating, replacing any previous one of the same name.
    pub fn register(&mut self, grating: Grating) {
        log::debug!("registering grating '{}'", grating.name());
        self.gratings.insert(grating.name().to_string(), grating);
    }

    pub fn get(&self, name: &str) -> Result<&Grating, GratingError> {
        self.gratings
            .get(name)
            .ok_or_else(|| GratingError::Undefined(name.to_string()))
    }

    /// Registered grating names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.gratings.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.gratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gratings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> GratingTable {
        let mut t = GratingTable::new();
        t.register(Grating::new("J", 18_000.0, (1.17e-6, 1.33e-6)));
        t.register(Grating::new("H", 20_000.0, (1.49e-6, 1.78e-6)));
        t.register(Grating::new("K", 20_000.0, (1.99e-6, 2.4e-6)));
        t
    }

    #[test]
    fn test_lookup() {
        let t = table();
        assert_relative_eq!(t.get("H").unwrap().resolving_power(), 20_000.0);
        assert!(matches!(t.get("L"), Err(GratingError::Undefined(_))));
    }

    #[test]
    fn test_names_are_sorted() {
        assert_eq!(table().names(), vec!["H", "J", "K"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut t = table();
        t.register(Grating::new("K", 25_000.0, (1.99e-6, 2.4e-6)));
        assert_eq!(t.len(), 3);
        assert_relative_eq!(t.get("K").unwrap().resolving_power(), 25_000.0);
    }

    #[test]
    fn test_axis_spans_band() {
        let t = table();
        let axis = t.get("K").unwrap().axis(11);
        assert_eq!(axis.len(), 11);
        assert_relative_eq!(axis.values()[0], 1.99e-6);
        assert_relative_eq!(axis.values()[10], 2.4e-6);
    }
}
