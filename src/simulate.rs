//! Local stand-in for the topology solver.
//!
//! The simulated solver answers when the external solver cannot be reached.
//! Its metrics follow from the requested volume fraction and density only, and
//! its density field is a synthetic blob near the top centre of the domain. It
//! is not derived from any mechanical analysis and every result it returns is
//! tagged [`SourceOfTruth::Simulated`].

use std::thread;
use std::time::Duration;

use log::info;
use ndarray::Array3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use uom::si::f64::{Mass, MassDensity, Volume};
use uom::si::mass::gram;
use uom::si::mass_density::kilogram_per_cubic_meter;
use uom::si::volume::cubic_millimeter;

use crate::parameters::OptimizationParameters;
use crate::result::{Metrics, OptimizationResult, SourceOfTruth};

/// Initial volume reported by every simulated run, in mm³.
///
/// This is a fixed reference cylinder, not the brief's geometry.
pub const REFERENCE_VOLUME: f64 = 282_743.0;

/// Safety factor reported by every simulated run. Illustrative only.
pub const ILLUSTRATIVE_SAFETY_FACTOR: f64 = 2.1;

/// Peak stress in pascals reported by every simulated run. Illustrative only.
pub const ILLUSTRATIVE_MAX_STRESS: f64 = 132.0e6;

/// Compliance reported by every simulated run. Illustrative only.
pub const ILLUSTRATIVE_COMPLIANCE: f64 = 0.0045;

/// Mesh location returned by simulated runs.
pub const SIMULATED_ARTIFACT: &str = "/mock-optimized-part.stl";

/// Emulated solver latency.
pub const DEFAULT_LATENCY: Duration = Duration::from_secs(3);

/// Upper bound (exclusive) of the per-voxel noise.
const NOISE_AMPLITUDE: f64 = 0.2;

/// How quickly density falls off with distance from the top centre.
const FALLOFF: f64 = 1.5;

/// Deterministic-shape fallback solver.
#[derive(Clone, Debug)]
pub struct SimulatedSolver {
    /// Source of the per-voxel noise.
    rng: SmallRng,
    /// Artificial delay before answering.
    latency: Duration,
}

impl Default for SimulatedSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSolver {
    /// Create a solver with random noise and the default latency.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random::<u64>())
    }

    /// Create a solver whose noise is reproducible from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            latency: DEFAULT_LATENCY,
        }
    }

    /// Replace the emulated latency; `Duration::ZERO` answers immediately.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Produce a simulated result for `params`.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use topobrief::{OptimizationParameters, SimulatedSolver};
    ///
    /// let mut solver = SimulatedSolver::with_seed(7).with_latency(Duration::ZERO);
    /// let result = solver.simulate(&OptimizationParameters::default());
    /// assert!(result.is_simulated());
    /// assert_eq!(result.metrics.unwrap().volume_reduction_percent, 60.0);
    /// ```
    pub fn simulate(&mut self, params: &OptimizationParameters) -> OptimizationResult {
        info!(
            "running simulated optimization at {}³ voxels",
            params.optimization.resolution
        );
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let resolution = params.optimization.resolution;
        OptimizationResult {
            success: true,
            source_of_truth: SourceOfTruth::Simulated,
            metrics: Some(simulated_metrics(params)),
            density_field: Some(self.density_field(resolution)),
            artifact_reference: Some(SIMULATED_ARTIFACT.to_string()),
            message: Some(
                "simulated result: topology solver unavailable; density field is synthetic, \
                 safety factor and max stress are illustrative"
                    .to_string(),
            ),
            error: None,
        }
    }

    /// Synthetic `n × n × n` field concentrated near the top centre.
    ///
    /// Axes 0 and 1 are horizontal; axis 2 counts layers down from the top
    /// face. Values lie in `[0, 1 + NOISE_AMPLITUDE)`.
    fn density_field(&mut self, resolution: usize) -> Array3<f64> {
        let n = resolution as f64;
        let center = n / 2.0;
        let rng = &mut self.rng;
        Array3::from_shape_fn((resolution, resolution, resolution), |(i, j, k)| {
            let dx = (i as f64 - center) / n;
            let dy = (j as f64 - center) / n;
            let dz = k as f64 / n;
            let distance = (dx * dx + dy * dy + dz * dz).sqrt();
            let noise = rng.random::<f64>() * NOISE_AMPLITUDE;
            (1.0 - FALLOFF * distance + noise).max(0.0)
        })
    }
}

/// Metrics derived from the requested volume fraction and material density.
fn simulated_metrics(params: &OptimizationParameters) -> Metrics {
    let volume_fraction = params.constraints.volume_fraction;
    let volume_optimized = REFERENCE_VOLUME * volume_fraction;

    let mass: Mass = Volume::new::<cubic_millimeter>(volume_optimized)
        * MassDensity::new::<kilogram_per_cubic_meter>(params.material.density);
    let mass_grams = mass.get::<gram>();

    Metrics {
        volume_initial: REFERENCE_VOLUME,
        volume_optimized,
        volume_reduction_percent: ((1.0 - volume_fraction) * 100.0).round(),
        mass_grams: Some(mass_grams),
        mass_kg: Some(mass_grams / 1000.0),
        safety_factor: Some(ILLUSTRATIVE_SAFETY_FACTOR),
        max_stress: Some(ILLUSTRATIVE_MAX_STRESS),
        compliance: Some(ILLUSTRATIVE_COMPLIANCE),
        final_compliance: Some(ILLUSTRATIVE_COMPLIANCE),
        final_volume_fraction: Some(volume_fraction),
        iterations_completed: Some(params.optimization.iterations),
        illustrative: ["safety_factor", "max_stress", "compliance", "final_compliance"]
            .map(String::from)
            .to_vec(),
        extra: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn solver() -> SimulatedSolver {
        SimulatedSolver::with_seed(42).with_latency(Duration::ZERO)
    }

    #[test]
    fn metrics_follow_volume_fraction_and_density() {
        let mut params = OptimizationParameters::default();
        params.constraints.volume_fraction = 0.3;
        params.material.density = 7850.0;

        let metrics = solver().simulate(&params).metrics.expect("metrics present");
        assert_eq!(metrics.volume_initial, REFERENCE_VOLUME);
        assert_relative_eq!(metrics.volume_optimized, REFERENCE_VOLUME * 0.3);
        assert_eq!(metrics.volume_reduction_percent, 70.0);
        let expected_grams = REFERENCE_VOLUME * 0.3 / 1.0e9 * 7850.0 * 1000.0;
        assert_relative_eq!(
            metrics.mass_grams.expect("mass present"),
            expected_grams,
            max_relative = 1.0e-12
        );
        assert_relative_eq!(
            metrics.mass_kg.expect("mass present"),
            expected_grams / 1000.0,
            max_relative = 1.0e-12
        );
    }

    #[test]
    fn stress_figures_are_fixed_and_flagged() {
        let mut params = OptimizationParameters::default();
        params.constraints.safety_factor = 4.0;

        let metrics = solver().simulate(&params).metrics.expect("metrics present");
        assert_eq!(metrics.safety_factor, Some(ILLUSTRATIVE_SAFETY_FACTOR));
        assert_eq!(metrics.max_stress, Some(ILLUSTRATIVE_MAX_STRESS));
        assert!(metrics.is_illustrative("safety_factor"));
        assert!(metrics.is_illustrative("max_stress"));
        assert!(!metrics.is_illustrative("volume_optimized"));
    }

    #[test]
    fn density_field_is_a_cube_of_bounded_values() {
        let mut params = OptimizationParameters::default();
        params.optimization.resolution = 12;

        let field = solver()
            .simulate(&params)
            .density_field
            .expect("field present");
        assert_eq!(field.dim(), (12, 12, 12));
        assert!(field.iter().all(|&value| (0.0..1.0 + NOISE_AMPLITUDE).contains(&value)));
    }

    #[test]
    fn density_concentrates_at_top_centre() {
        let mut params = OptimizationParameters::default();
        params.optimization.resolution = 10;

        let field = solver()
            .simulate(&params)
            .density_field
            .expect("field present");
        assert!(field[[5, 5, 0]] >= 1.0);
        // Corner at the far face is more than 1/1.5 away, so only noise remains.
        assert!(field[[0, 0, 9]] < NOISE_AMPLITUDE);
    }

    #[test]
    fn same_seed_gives_same_field() {
        let params = OptimizationParameters::default();
        let first = solver().simulate(&params);
        let second = solver().simulate(&params);
        assert_eq!(first.density_field, second.density_field);
    }

    #[test]
    fn zero_resolution_gives_empty_field() {
        let mut params = OptimizationParameters::default();
        params.optimization.resolution = 0;
        let field = solver()
            .simulate(&params)
            .density_field
            .expect("field present");
        assert_eq!(field.len(), 0);
    }
}
