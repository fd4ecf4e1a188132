#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

mod brief;
mod dispatch;
mod errors;
mod extract;
mod geometry;
mod material;
mod parameters;
mod report;
mod result;
mod simulate;

pub use brief::{
    prepare_authored_brief, BriefAuthor, BriefRequest, ManualBrief, PreparedBrief,
    BRIEF_PROMPT_TEMPLATE,
};
pub use dispatch::{
    Dispatcher, HttpTransport, SolverConfig, SolverTransport, TransportOutcome,
    DEFAULT_SOLVER_URL, OPTIMIZE_PATH, SOLVER_TIMEOUT_VAR, SOLVER_URL_VAR,
};
pub use errors::{BriefError, DispatchError, ParameterError, ResponseError};
pub use extract::extract;
pub use geometry::{LoadDirection, Shape, UnknownDirection};
pub use material::{lookup, Material, MATERIAL_TABLE};
pub use parameters::{
    BoundaryConditions, Constraints, Geometry, Loads, MaterialProperties,
    OptimizationParameters, OptimizationSettings, SolverSettings, MAX_RESOLUTION,
};
pub use report::render_summary;
pub use result::{Metrics, OptimizationResult, SourceOfTruth, WireResponse};
pub use simulate::{
    SimulatedSolver, DEFAULT_LATENCY, ILLUSTRATIVE_COMPLIANCE, ILLUSTRATIVE_MAX_STRESS,
    ILLUSTRATIVE_SAFETY_FACTOR, REFERENCE_VOLUME, SIMULATED_ARTIFACT,
};
