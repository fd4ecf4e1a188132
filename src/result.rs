//! Optimisation outcomes and their wire representation.

use std::collections::BTreeMap;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::errors::ResponseError;

/// Where an [`OptimizationResult`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOfTruth {
    /// Produced or rejected by the external solver.
    External,
    /// Produced by the local stand-in solver.
    Simulated,
}

/// Summary figures for an optimised part.
///
/// Keys a solver reports beyond the ones named here are kept in
/// [`Metrics::extra`] so a real result is passed on unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Envelope volume before optimisation in mm³.
    #[serde(default)]
    pub volume_initial: f64,
    /// Retained volume in mm³.
    #[serde(default)]
    pub volume_optimized: f64,
    /// Removed share of the initial volume, in percent.
    #[serde(rename = "volume_reduction", default)]
    pub volume_reduction_percent: f64,
    /// Mass of the retained volume in grams.
    #[serde(
        rename = "mass",
        alias = "mass_g",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub mass_grams: Option<f64>,
    /// Mass of the retained volume in kilograms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_kg: Option<f64>,
    /// Factor of safety of the optimised part.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_factor: Option<f64>,
    /// Peak stress in pascals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stress: Option<f64>,
    /// Compliance at the first iteration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance: Option<f64>,
    /// Compliance at the last iteration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_compliance: Option<f64>,
    /// Volume fraction reached by the solver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_volume_fraction: Option<f64>,
    /// Number of iterations actually run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations_completed: Option<usize>,
    /// Keys of metrics whose values are illustrative rather than computed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub illustrative: Vec<String>,
    /// Any other metric reported by the solver.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metrics {
    /// Whether the metric stored under `key` is illustrative.
    #[must_use]
    pub fn is_illustrative(&self, key: &str) -> bool {
        self.illustrative.iter().any(|name| name == key)
    }
}

/// Outcome of one optimisation request.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizationResult {
    /// Whether an optimised part was produced.
    pub success: bool,
    /// Which solver produced (or rejected) the request.
    pub source_of_truth: SourceOfTruth,
    /// Summary figures, present on success.
    pub metrics: Option<Metrics>,
    /// Voxel densities indexed `[x, y, z]`.
    pub density_field: Option<Array3<f64>>,
    /// Location of the exported mesh.
    pub artifact_reference: Option<String>,
    /// Informational note from the solver.
    pub message: Option<String>,
    /// Failure reason when `success` is false.
    pub error: Option<String>,
}

impl OptimizationResult {
    /// A failed result carrying `error`.
    #[must_use]
    pub fn failure(source_of_truth: SourceOfTruth, error: impl Into<String>) -> Self {
        Self {
            success: false,
            source_of_truth,
            metrics: None,
            density_field: None,
            artifact_reference: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Whether this result came from the local stand-in solver.
    #[must_use]
    pub fn is_simulated(&self) -> bool {
        self.source_of_truth == SourceOfTruth::Simulated
    }
}

/// JSON document exchanged with the solver endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireResponse {
    /// Whether the optimisation succeeded.
    pub success: bool,
    /// Tag added when the document leaves this crate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_of_truth: Option<SourceOfTruth>,
    /// Mesh location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stl_url: Option<String>,
    /// Summary figures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    /// Nested `[x][y][z]` densities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density_field: Option<Vec<Vec<Vec<f64>>>>,
    /// Informational note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WireResponse {
    /// Decode a solver reply body.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Malformed`] when `body` is not a reply document.
    pub fn from_json(body: &str) -> Result<Self, ResponseError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Convert into a result tagged with `source_of_truth`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::RaggedDensityField`] when the density field is
    /// not a rectangular block.
    pub fn into_result(
        self,
        source_of_truth: SourceOfTruth,
    ) -> Result<OptimizationResult, ResponseError> {
        let density_field = self.density_field.map(nested_to_array).transpose()?;
        Ok(OptimizationResult {
            success: self.success,
            source_of_truth,
            metrics: self.metrics,
            density_field,
            artifact_reference: self.stl_url,
            message: self.message,
            error: self.error,
        })
    }
}

impl From<&OptimizationResult> for WireResponse {
    fn from(result: &OptimizationResult) -> Self {
        Self {
            success: result.success,
            source_of_truth: Some(result.source_of_truth),
            stl_url: result.artifact_reference.clone(),
            metrics: result.metrics.clone(),
            density_field: result.density_field.as_ref().map(array_to_nested),
            message: result.message.clone(),
            error: result.error.clone(),
        }
    }
}

/// Pack nested `[x][y][z]` rows into an array.
fn nested_to_array(nested: Vec<Vec<Vec<f64>>>) -> Result<Array3<f64>, ResponseError> {
    let nx = nested.len();
    let ny = nested.first().map_or(0, Vec::len);
    let nz = nested.first().and_then(|plane| plane.first()).map_or(0, Vec::len);

    let mut data = Vec::with_capacity(nx * ny * nz);
    for plane in nested {
        if plane.len() != ny {
            return Err(ResponseError::RaggedDensityField {
                expected: ny,
                found: plane.len(),
            });
        }
        for row in plane {
            if row.len() != nz {
                return Err(ResponseError::RaggedDensityField {
                    expected: nz,
                    found: row.len(),
                });
            }
            data.extend(row);
        }
    }

    let found = data.len();
    Array3::from_shape_vec((nx, ny, nz), data).map_err(|_| ResponseError::RaggedDensityField {
        expected: nx * ny * nz,
        found,
    })
}

/// Unpack an array into nested `[x][y][z]` rows.
fn array_to_nested(field: &Array3<f64>) -> Vec<Vec<Vec<f64>>> {
    field
        .outer_iter()
        .map(|plane| plane.outer_iter().map(|row| row.to_vec()).collect())
        .collect()
}
