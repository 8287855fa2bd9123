//! End-to-end signal chain tests: source through optics to detector counts
//! and exposure time estimation.

use std::time::Duration;

use approx::assert_relative_eq;
use radiosim::{
    DetectorConfig, DetectorModel, Grating, GratingTable, OpticalStage, Pipeline,
    QuantumEfficiency, SpectralSource, ThermalBackground,
};

fn init_logging() {
    let _ = env_logger::try_init();
}

fn instrument_chain() -> Pipeline {
    let mut chain = Pipeline::new("spectrograph");
    chain.push_back(OpticalStage::flat("entrance window", 0.95, 280.0).unwrap());

    let mut mirror = OpticalStage::flat("fold mirror", 0.98, 120.0).unwrap();
    mirror.set_multiplicity(3.0);
    chain.push_back(mirror);

    chain.push_back(OpticalStage::flat("grating", 0.7, 120.0).unwrap());
    chain
}

fn detector_config(grating: &Grating) -> DetectorConfig {
    DetectorConfig {
        pixel_pitch_m: 15e-6,
        resolving_power: grating.resolving_power(),
        px_per_res_element: 2.2,
        binning: 1,
        qe: QuantumEfficiency::Flat(0.8),
        gain_e_per_adu: 2.0,
        read_noise_short_e: 20.0,
        read_noise_long_e: 8.0,
        read_noise_threshold_s: 120.0,
        f_number: 2.8,
        thermal: Some(ThermalBackground::new(0.3, 0.1, 230.0)),
        band_m: grating.band_m(),
    }
}

fn k_band() -> Grating {
    Grating::new("K", 20_000.0, (1.99e-6, 2.4e-6))
}

#[test]
fn test_blackbody_through_chain_to_counts() {
    init_logging();

    let grating = k_band();
    let lamp = SpectralSource::blackbody("cal lamp", 1200.0);
    let fed = SpectralSource::attenuated("fed lamp", lamp, instrument_chain());

    let mut detector = DetectorModel::new(detector_config(&grating), Some(7));
    detector.bind_source(fed);

    let axis = grating.axis(64);
    let noiseless = detector.counts(&axis, 10.0, false).unwrap();
    assert_eq!(noiseless.len(), 64);
    assert!(noiseless.iter().all(|c| *c >= 0.0 && *c == c.round()));
    // A 1200 K source must register in the K band through this chain
    assert!(noiseless.iter().any(|c| *c > 0.0));

    // Noise perturbs but does not overwhelm a bright exposure
    let noisy = detector.counts(&axis, 10.0, true).unwrap();
    let total_clean: f64 = noiseless.iter().sum();
    let total_noisy: f64 = noisy.iter().sum();
    assert_relative_eq!(total_noisy, total_clean, max_relative = 0.05);
}

#[test]
fn test_optics_attenuation_lowers_rate() {
    init_logging();

    let grating = k_band();
    let axis = grating.axis(16);

    let mut bare = DetectorModel::new(detector_config(&grating), Some(1));
    bare.bind_source(SpectralSource::blackbody("lamp", 1200.0));

    let mut chain = Pipeline::new("neutral density");
    let mut nd = OpticalStage::flat("nd filter", 0.1, 120.0).unwrap();
    nd.set_emissive(false);
    chain.push_back(nd);

    let mut fed = DetectorModel::new(detector_config(&grating), Some(1));
    fed.bind_source(SpectralSource::attenuated(
        "filtered lamp",
        SpectralSource::blackbody("lamp", 1200.0),
        chain,
    ));

    let bare_rate = bare.electron_rate(&axis).unwrap();
    let fed_rate = fed.electron_rate(&axis).unwrap();
    for (b, f) in bare_rate.iter().zip(&fed_rate) {
        assert!(f < b);
    }
}

#[test]
fn test_saturation_then_estimator_roundtrip() {
    init_logging();

    let grating = k_band();
    let lamp = SpectralSource::blackbody("cal lamp", 1200.0);

    let mut detector = DetectorModel::new(detector_config(&grating), Some(7));
    detector.bind_source(lamp);

    let axis = grating.axis(64);
    let max = detector.max_exposure_time(&axis, 65_535.0).unwrap();
    assert!(max.t_max_s > 0.0);
    // 1200 K brightens toward the red end of the K band
    assert_relative_eq!(max.wavelength_m, 2.4e-6, max_relative = 1e-9);

    // The estimator's nominal time at that wavelength is the same
    // saturation time, and its grid brackets it
    let mut est = detector
        .exposure_estimator(max.wavelength_m, 65_535.0, 101)
        .unwrap();
    assert_relative_eq!(est.nominal_time_s(), max.t_max_s, max_relative = 1e-9);

    let dist = est.run_to_completion();
    assert!(dist.times_s().first().unwrap() <= &max.t_max_s);
    assert!(dist.times_s().last().unwrap() >= &max.t_max_s);
    assert!(dist.density().iter().all(|p| p.is_finite() && *p >= 0.0));
}

#[test]
fn test_estimator_is_resumable_under_small_budgets() {
    init_logging();

    let grating = k_band();
    let mut detector = DetectorModel::new(detector_config(&grating), Some(7));
    detector.bind_source(SpectralSource::blackbody("cal lamp", 1200.0));

    let mut est = detector.exposure_estimator(2.2e-6, 10_000.0, 37).unwrap();
    assert!(est.result().is_err());

    let mut last = 0.0;
    while !est.done() {
        est.step(Duration::from_micros(10));
        let p = est.progress();
        assert!(p > last);
        assert!(p <= 1.0);
        last = p;
    }
    assert_eq!(est.progress(), 1.0);
    assert!(est.result().is_ok());
}

#[test]
fn test_seeded_chains_reproduce() {
    init_logging();

    let grating = k_band();
    let axis = grating.axis(32);

    let run = |seed| {
        let mut detector = DetectorModel::new(detector_config(&grating), Some(seed));
        detector.bind_source(SpectralSource::blackbody("cal lamp", 1200.0));
        detector.counts(&axis, 30.0, true).unwrap()
    };

    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}

#[test]
fn test_grating_table_drives_the_detector() {
    init_logging();

    let mut table = GratingTable::new();
    table.register(k_band());
    table.register(Grating::new("H", 20_000.0, (1.49e-6, 1.78e-6)));

    let grating = table.get("H").unwrap();
    let mut detector = DetectorModel::new(detector_config(grating), Some(3));
    detector.bind_source(SpectralSource::blackbody("cal lamp", 1500.0));

    let counts = detector.counts(&grating.axis(16), 5.0, false).unwrap();
    assert_eq!(counts.len(), 16);
    assert!(counts.iter().any(|c| *c > 0.0));
}
