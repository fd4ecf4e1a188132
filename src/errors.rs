//! Error types produced while validating parameters or decoding solver replies.

use thiserror::Error;

/// Error returned when an [`OptimizationParameters`](crate::OptimizationParameters)
/// record is not fit to be sent to a solver.
///
/// Extraction never produces these on its own; they surface when a record is
/// validated before dispatch so a malformed request is rejected locally instead
/// of being forwarded.
///
/// # Examples
///
/// ```
/// use topobrief::{extract, ParameterError};
///
/// let params = extract("**Dimensions** : 0x50x20");
/// let error = params.validate().expect_err("zero dimension is rejected");
/// assert_eq!(error, ParameterError::NonPositiveDimension { index: 0, value: 0.0 });
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ParameterError {
    /// Returned when the geometry does not carry two or three dimensions.
    #[error("geometry needs 2 or 3 dimensions (received {0})")]
    DimensionCount(usize),
    /// Returned when a dimension is zero, negative or not finite.
    #[error("dimension {index} must be positive (received {value} mm)")]
    NonPositiveDimension {
        /// Position of the offending entry.
        index: usize,
        /// Rejected length in millimetres.
        value: f64,
    },
    /// Returned when the retained volume fraction lies outside (0, 1].
    #[error("volume fraction must lie in (0, 1] (received {0})")]
    VolumeFractionOutOfRange(f64),
    /// Returned when the safety factor does not exceed one.
    #[error("safety factor must be greater than 1 (received {0})")]
    SafetyFactorTooLow(f64),
    /// Returned when Poisson's ratio lies outside (0, 0.5).
    #[error("Poisson's ratio must lie in (0, 0.5) (received {0})")]
    PoissonRatioOutOfRange(f64),
    /// Returned when Young's modulus is zero or negative.
    #[error("Young's modulus must be positive (received {0} Pa)")]
    NonPositiveModulus(f64),
    /// Returned when the material density is zero or negative.
    #[error("density must be positive (received {0} kg/m³)")]
    NonPositiveDensity(f64),
    /// Returned when the load magnitude is zero or negative.
    #[error("load magnitude must be positive (received {0} N)")]
    NonPositiveLoad(f64),
    /// Returned when the voxel resolution is zero.
    #[error("resolution must be at least one voxel per axis")]
    ZeroResolution,
    /// Returned when the voxel resolution exceeds the supported maximum.
    #[error("resolution must not exceed {max} voxels per axis (received {received})")]
    ResolutionTooHigh {
        /// Largest accepted resolution.
        max: usize,
        /// Rejected resolution.
        received: usize,
    },
    /// Returned when the iteration budget is zero.
    #[error("iteration count must be at least one")]
    ZeroIterations,
    /// Returned when the SIMP penalty exponent is zero or negative.
    #[error("SIMP penalty must be positive (received {0})")]
    NonPositivePenalty(f64),
    /// Returned when the convergence tolerance is zero or negative.
    #[error("convergence tolerance must be positive (received {0})")]
    NonPositiveConvergence(f64),
}

/// Error returned when a reply reached us from the solver but cannot be used.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The body was not the JSON document the solver contract describes.
    #[error("solver reply is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The density field rows did not all have the same length.
    #[error("density field is ragged (expected {expected} entries, found {found})")]
    RaggedDensityField {
        /// Length implied by the first plane or row.
        expected: usize,
        /// Length of the first plane or row that disagreed.
        found: usize,
    },
}

/// Error returned when a record cannot be dispatched at all.
///
/// Solver-side rejections are not errors: they come back as an
/// [`OptimizationResult`](crate::OptimizationResult) with `success == false`.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The record failed validation and was not sent.
    #[error("invalid optimization parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    /// The record could not be encoded as JSON.
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Error returned while preparing a brief for extraction.
#[derive(Debug, Error, PartialEq)]
pub enum BriefError {
    /// The brief-writing collaborator failed to produce any text.
    #[error("brief author failed: {0}")]
    Author(String),
}
