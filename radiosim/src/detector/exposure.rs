//! Time-boxed exposure time estimation.
//!
//! Given an electron rate and a target count level, the probability that an
//! exposure of length `t` reads out exactly the target count is a Poisson
//! shot-noise distribution convolved with Gaussian read noise and the ADU
//! rounding window. [`ExposureTimeEstimator`] evaluates that probability over
//! a grid of candidate exposure times bracketing the nominal time, one grid
//! point at a time, under a caller-supplied wall-clock budget per call, so a
//! control loop can interleave the computation with other work.

use std::time::{Duration, Instant};

use statrs::function::erf::erf;
use statrs::function::gamma::gamma;
use thiserror::Error;

/// Errors raised by exposure time estimation
#[derive(Debug, Error)]
pub enum EstimatorError {
    #[error("estimation is not finished; call step() until done()")]
    NotFinished,
}

/// Above this expected electron count the Poisson pmf is evaluated through
/// its Gaussian limit to dodge factorial overflow.
const GAUSSIAN_RATE_CUTOFF: f64 = 20.0;

/// Probability density of the exposure time needed to read a target count.
#[derive(Debug, Clone)]
pub struct ExposureTimeDistribution {
    times_s: Vec<f64>,
    density: Vec<f64>,
}

impl ExposureTimeDistribution {
    /// Candidate exposure times (s).
    pub fn times_s(&self) -> &[f64] {
        &self.times_s
    }

    /// Normalized probability density over [`times_s`].
    ///
    /// [`times_s`]: ExposureTimeDistribution::times_s
    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Expected exposure time, `∫ t·p(t) dt` by trapezoid (s).
    pub fn mean_s(&self) -> f64 {
        let weighted: Vec<f64> = self
            .times_s
            .iter()
            .zip(&self.density)
            .map(|(t, p)| t * p)
            .collect();
        trapezoid(&self.times_s, &weighted)
    }

    /// Exposure time of maximum probability (s).
    pub fn mode_s(&self) -> f64 {
        let mut best = 0;
        for i in 1..self.density.len() {
            if self.density[i] > self.density[best] {
                best = i;
            }
        }
        self.times_s[best]
    }
}

/// Resumable estimator of the time to reach a target ADU count.
#[derive(Debug, Clone)]
pub struct ExposureTimeEstimator {
    rate_e_per_s: f64,
    count_limit: f64,
    gain_e_per_adu: f64,
    ron_short_e: f64,
    ron_long_e: f64,
    ron_threshold_s: f64,
    times_s: Vec<f64>,
    density: Vec<f64>,
    cursor: usize,
}

impl ExposureTimeEstimator {
    /// # Arguments
    /// * `rate_e_per_s` - noiseless electron rate at the sample of interest
    /// * `count_limit` - target readout level (ADU)
    /// * `n` - number of candidate exposure times
    /// * `gain_e_per_adu` - electrons per ADU
    /// * `ron_short_e`, `ron_long_e`, `ron_threshold_s` - two-regime read
    ///   noise model (e⁻ rms below/at the threshold exposure)
    pub fn new(
        rate_e_per_s: f64,
        count_limit: f64,
        n: usize,
        gain_e_per_adu: f64,
        ron_short_e: f64,
        ron_long_e: f64,
        ron_threshold_s: f64,
    ) -> Self {
        // Shot noise dominates the spread: bracket the nominal time by ±√t₀
        let t0 = count_limit * gain_e_per_adu / rate_e_per_s;
        let lo = (t0 - t0.sqrt()).max(0.0);
        let hi = t0 + t0.sqrt();

        let times_s = match n {
            0 => Vec::new(),
            1 => vec![t0],
            _ => {
                let step = (hi - lo) / (n - 1) as f64;
                (0..n).map(|i| lo + step * i as f64).collect()
            }
        };

        Self {
            rate_e_per_s,
            count_limit,
            gain_e_per_adu,
            ron_short_e,
            ron_long_e,
            ron_threshold_s,
            density: vec![0.0; times_s.len()],
            times_s,
            cursor: 0,
        }
    }

    /// Advance the computation for up to `budget` of wall-clock time.
    ///
    /// At least one grid point is evaluated per call, so arbitrarily small
    /// budgets still make progress. Calling after [`done`] is a no-op.
    ///
    /// [`done`]: ExposureTimeEstimator::done
    pub fn step(&mut self, budget: Duration) {
        let start = Instant::now();
        while self.cursor < self.times_s.len() {
            self.density[self.cursor] = self.point_probability(self.times_s[self.cursor]);
            self.cursor += 1;
            if start.elapsed() >= budget {
                break;
            }
        }
    }

    /// Nominal time to reach the target count, ignoring noise (s). The
    /// candidate grid brackets this value.
    pub fn nominal_time_s(&self) -> f64 {
        self.count_limit * self.gain_e_per_adu / self.rate_e_per_s
    }

    /// Fraction of the grid evaluated so far, in [0, 1].
    pub fn progress(&self) -> f64 {
        if self.times_s.is_empty() {
            return 1.0;
        }
        self.cursor as f64 / self.times_s.len() as f64
    }

    pub fn done(&self) -> bool {
        self.cursor >= self.times_s.len()
    }

    /// Run the remaining grid to completion and return the distribution.
    pub fn run_to_completion(&mut self) -> ExposureTimeDistribution {
        while !self.done() {
            self.step(Duration::from_millis(10));
        }
        match self.result() {
            Ok(dist) => dist,
            Err(EstimatorError::NotFinished) => unreachable!("loop runs until done"),
        }
    }

    /// The finished, normalized distribution.
    pub fn result(&self) -> Result<ExposureTimeDistribution, EstimatorError> {
        if !self.done() {
            return Err(EstimatorError::NotFinished);
        }

        let mut density: Vec<f64> = self
            .density
            .iter()
            .map(|p| if p.is_nan() { 0.0 } else { *p })
            .collect();

        let integral = trapezoid(&self.times_s, &density);
        // A flat-zero result (target unreachable on this grid) is returned
        // as-is rather than divided to NaN
        let norm = if integral > 0.0 { integral } else { 1.0 };
        for p in &mut density {
            *p /= norm;
        }

        Ok(ExposureTimeDistribution {
            times_s: self.times_s.clone(),
            density,
        })
    }

    fn ron(&self, exposure_s: f64) -> f64 {
        if exposure_s < self.ron_threshold_s {
            self.ron_short_e
        } else {
            self.ron_long_e
        }
    }

    /// Probability that an exposure of length `t` reads out exactly the
    /// target count: the Poisson distribution over electron counts, each
    /// smeared by read noise into the target's half-count rounding window.
    fn point_probability(&self, exposure_s: f64) -> f64 {
        let expected_e = self.rate_e_per_s * exposure_s;
        let sigma_adu = self.ron(exposure_s) / self.gain_e_per_adu;
        let window = (self.count_limit - 0.5, self.count_limit + 0.5);

        // All the Poisson mass sits within a few √λ of the mean; scanning
        // further only burns time on zero terms
        let (support_lo, support_hi) = if expected_e > GAUSSIAN_RATE_CUTOFF {
            let spread = 8.0 * expected_e.sqrt();
            (
                (expected_e - spread).floor().max(0.0) as u64,
                (expected_e + spread).ceil() as u64,
            )
        } else {
            (0, (5.0 * expected_e.ceil()).max(1.0) as u64)
        };

        let mut total = 0.0;
        for ne in support_lo..=support_hi {
            let p_shot = poisson_pmf(ne as f64, expected_e);
            if p_shot <= 0.0 {
                continue;
            }
            let mu_adu = ne as f64 / self.gain_e_per_adu;
            total += p_shot * window_probability(window.0, window.1, mu_adu, sigma_adu);
        }
        total
    }
}

/// Poisson pmf at integer `x` for mean `rate`, through the Gaussian limit
/// above [`GAUSSIAN_RATE_CUTOFF`].
fn poisson_pmf(x: f64, rate: f64) -> f64 {
    if rate <= 0.0 {
        return if x == 0.0 { 1.0 } else { 0.0 };
    }

    if rate > GAUSSIAN_RATE_CUTOFF {
        let d = x - rate;
        (-d * d / (2.0 * rate)).exp() / (2.0 * std::f64::consts::PI * rate).sqrt()
    } else {
        (-rate).exp() * rate.powf(x) / gamma(x + 1.0)
    }
}

/// Probability that a N(μ, σ) variate lands in `(a, b)`. A zero σ collapses
/// to the indicator of μ ∈ (a, b).
fn window_probability(a: f64, b: f64, mu: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if a < mu && mu < b { 1.0 } else { 0.0 };
    }
    let q = 1.0 / (std::f64::consts::SQRT_2 * sigma);
    0.5 * (erf((b - mu) * q) - erf((a - mu) * q))
}

fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    let mut total = 0.0;
    for i in 1..xs.len() {
        total += 0.5 * (ys[i] + ys[i - 1]) * (xs[i] - xs[i - 1]);
    }
    total
}
