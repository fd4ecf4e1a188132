//! The fully specified optimisation problem handed to a solver.

use serde::{Deserialize, Serialize};

use crate::errors::ParameterError;
use crate::geometry::{LoadDirection, Shape};
use crate::material::Material;

/// Part envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Envelope shape.
    pub shape: Shape,
    /// Lengths in millimetres, two or three entries.
    pub dimensions: Vec<f64>,
    /// Envelope volume in cubic millimetres, derived from shape and dimensions.
    pub volume: f64,
}

impl Geometry {
    /// Build a geometry record and derive its volume.
    #[must_use]
    pub fn new(shape: Shape, dimensions: Vec<f64>) -> Self {
        let volume = shape.volume(&dimensions);
        Self {
            shape,
            dimensions,
            volume,
        }
    }
}

/// Material as requested by the brief: resolved table values plus overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialProperties {
    /// Free-text material name from the brief.
    pub name: String,
    /// Young's modulus in pascals.
    #[serde(rename = "E")]
    pub youngs_modulus: f64,
    /// Poisson's ratio.
    #[serde(rename = "nu")]
    pub poisson_ratio: f64,
    /// Yield stress in pascals.
    #[serde(rename = "sigma_ys", default, skip_serializing_if = "Option::is_none")]
    pub yield_stress: Option<f64>,
    /// Density in kilograms per cubic metre.
    pub density: f64,
}

impl MaterialProperties {
    /// Take every property from a table entry, keeping the brief's name.
    #[must_use]
    pub fn from_material(name: impl Into<String>, material: &Material) -> Self {
        Self {
            name: name.into(),
            youngs_modulus: material.youngs_modulus,
            poisson_ratio: material.poisson_ratio,
            yield_stress: material.yield_stress,
            density: material.density,
        }
    }
}

/// Support applied to the part. Only a fixed bottom face is modelled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditions {
    /// Supported face.
    pub position: String,
    /// Support kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Height of the supported face.
    pub z: f64,
}

impl Default for BoundaryConditions {
    fn default() -> Self {
        Self {
            position: "bottom".to_string(),
            kind: "fixed".to_string(),
            z: 0.0,
        }
    }
}

/// Single external load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Loads {
    /// Load magnitude in newtons.
    pub magnitude: f64,
    /// Signed cardinal axis the load acts along.
    pub direction: LoadDirection,
    /// Where the load is applied.
    pub position: String,
}

/// Design constraints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Fraction of the initial volume to retain, in (0, 1].
    pub volume_fraction: f64,
    /// Ratio between yield stress and admissible stress.
    pub safety_factor: f64,
    /// Admissible stress in pascals, always `yield_stress / safety_factor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stress: Option<f64>,
}

impl Constraints {
    /// Build constraints, deriving the admissible stress from `yield_stress`.
    ///
    /// # Examples
    /// ```
    /// use topobrief::Constraints;
    ///
    /// let constraints = Constraints::new(0.3, 2.5, Some(276.0e6));
    /// assert_eq!(constraints.max_stress, Some(110.4e6));
    /// ```
    #[must_use]
    pub fn new(volume_fraction: f64, safety_factor: f64, yield_stress: Option<f64>) -> Self {
        Self {
            volume_fraction,
            safety_factor,
            max_stress: yield_stress.map(|yield_stress| yield_stress / safety_factor),
        }
    }
}

/// Largest voxel resolution accepted per axis.
///
/// A field at this resolution holds one million voxels; anything larger is
/// refused before it reaches the solver or the simulated fallback.
pub const MAX_RESOLUTION: usize = 100;

/// Solver controls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSettings {
    /// Voxels per axis.
    pub resolution: usize,
    /// SIMP penalty exponent.
    pub penalty: f64,
    /// Iteration budget.
    pub iterations: usize,
    /// Convergence tolerance.
    pub convergence: f64,
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            resolution: 25,
            penalty: 3.0,
            iterations: 40,
            convergence: 0.01,
        }
    }
}

/// Solver controls chosen outside the brief, e.g. in a settings panel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolverSettings {
    /// Replacement voxel resolution.
    pub resolution: Option<usize>,
    /// Replacement SIMP penalty.
    pub penalty: Option<f64>,
    /// Replacement iteration budget.
    pub iterations: Option<usize>,
}

/// Complete optimisation problem: the wire request sent to a solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationParameters {
    /// Part envelope.
    pub geometry: Geometry,
    /// Material properties.
    pub material: MaterialProperties,
    /// Supports.
    pub boundary_conditions: BoundaryConditions,
    /// External load.
    pub loads: Loads,
    /// Design constraints.
    pub constraints: Constraints,
    /// Solver controls.
    pub optimization: OptimizationSettings,
}

impl Default for OptimizationParameters {
    /// The record extracted from a brief that names no recognised field.
    fn default() -> Self {
        let material = Material::default();
        Self {
            geometry: Geometry::new(Shape::Cylinder, vec![100.0, 100.0, 20.0]),
            material: MaterialProperties::from_material("Aluminium", &material),
            boundary_conditions: BoundaryConditions::default(),
            loads: Loads {
                magnitude: 1000.0,
                direction: LoadDirection::NegZ,
                position: "top".to_string(),
            },
            constraints: Constraints::new(0.4, 2.0, material.yield_stress),
            optimization: OptimizationSettings::default(),
        }
    }
}

impl OptimizationParameters {
    /// Return a copy with the solver controls replaced by `settings`.
    ///
    /// Only the `optimization` group changes; every other group is copied.
    ///
    /// # Examples
    /// ```
    /// use topobrief::{OptimizationParameters, SolverSettings};
    ///
    /// let params = OptimizationParameters::default();
    /// let tuned = params.with_solver_settings(SolverSettings {
    ///     resolution: Some(30),
    ///     ..SolverSettings::default()
    /// });
    /// assert_eq!(tuned.optimization.resolution, 30);
    /// assert_eq!(tuned.optimization.iterations, params.optimization.iterations);
    /// assert_eq!(tuned.geometry, params.geometry);
    /// ```
    #[must_use]
    pub fn with_solver_settings(&self, settings: SolverSettings) -> Self {
        let current = &self.optimization;
        Self {
            optimization: OptimizationSettings {
                resolution: settings.resolution.unwrap_or(current.resolution),
                penalty: settings.penalty.unwrap_or(current.penalty),
                iterations: settings.iterations.unwrap_or(current.iterations),
                convergence: current.convergence,
            },
            ..self.clone()
        }
    }

    /// Check that the record describes a problem a solver can accept.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParameterError`] found, checking geometry, material,
    /// load, constraints and solver controls in that order.
    pub fn validate(&self) -> Result<(), ParameterError> {
        let dimensions = &self.geometry.dimensions;
        if !(2..=3).contains(&dimensions.len()) {
            return Err(ParameterError::DimensionCount(dimensions.len()));
        }
        for (index, &value) in dimensions.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParameterError::NonPositiveDimension { index, value });
            }
        }

        let material = &self.material;
        if !(material.youngs_modulus > 0.0) {
            return Err(ParameterError::NonPositiveModulus(material.youngs_modulus));
        }
        if !(material.poisson_ratio > 0.0 && material.poisson_ratio < 0.5) {
            return Err(ParameterError::PoissonRatioOutOfRange(material.poisson_ratio));
        }
        if !(material.density > 0.0) {
            return Err(ParameterError::NonPositiveDensity(material.density));
        }

        if !(self.loads.magnitude > 0.0) {
            return Err(ParameterError::NonPositiveLoad(self.loads.magnitude));
        }

        let constraints = &self.constraints;
        if !(constraints.volume_fraction > 0.0 && constraints.volume_fraction <= 1.0) {
            return Err(ParameterError::VolumeFractionOutOfRange(
                constraints.volume_fraction,
            ));
        }
        if !(constraints.safety_factor > 1.0) {
            return Err(ParameterError::SafetyFactorTooLow(constraints.safety_factor));
        }

        let optimization = &self.optimization;
        if optimization.resolution == 0 {
            return Err(ParameterError::ZeroResolution);
        }
        if optimization.resolution > MAX_RESOLUTION {
            return Err(ParameterError::ResolutionTooHigh {
                max: MAX_RESOLUTION,
                received: optimization.resolution,
            });
        }
        if optimization.iterations == 0 {
            return Err(ParameterError::ZeroIterations);
        }
        if !(optimization.penalty > 0.0) {
            return Err(ParameterError::NonPositivePenalty(optimization.penalty));
        }
        if !(optimization.convergence > 0.0) {
            return Err(ParameterError::NonPositiveConvergence(optimization.convergence));
        }
        Ok(())
    }
}
