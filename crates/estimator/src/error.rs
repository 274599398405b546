//! Result and Error types for ntally-estimator

// crate modules
use crate::discretization::PhaseSpaceDimension;

/// Type alias for Result<T, estimator::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `ntally-estimator` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    #[error("failed to (de)serialise binary estimator data")]
    BincodeError(#[from] Box<bincode::ErrorKind>),

    #[error("failed serde JSON operation")]
    JSONError(#[from] serde_json::Error),

    #[error("mesh geometry error")]
    GeometryError(#[from] ntally_geometry::Error),

    #[error("invalid {dimension} boundaries: {reason}")]
    InvalidBoundaries {
        dimension: PhaseSpaceDimension,
        reason: String,
    },

    #[error("entity {0} is not assigned to the estimator")]
    UnknownEntity(u64),

    #[error("{dimension} bins are not supported by {estimator} estimators")]
    DimensionNotSupported {
        dimension: PhaseSpaceDimension,
        estimator: String,
    },

    #[error("thread {requested} requested but support only enabled for {available} thread(s)")]
    ThreadSupportNotEnabled { requested: usize, available: usize },

    #[error("reduction failed: {0}")]
    ReductionFailed(String),

    #[error("root rank {root} is outside of the communicator (size {size})")]
    InvalidRoot { root: usize, size: usize },

    #[error("norm constant {value} for entity {id} must be finite and positive")]
    InvalidNormConstant { id: u64, value: f64 },

    #[error("estimator multiplier {0} must be finite and positive")]
    InvalidMultiplier(f64),

    #[error("total cross section {0} must be finite and positive")]
    InvalidCrossSection(f64),

    #[error("angle cosine {0} must be within [-1, 1]")]
    InvalidAngleCosine(f64),

    #[error("cosine cutoff {0} must be within (0, 1]")]
    InvalidCosineCutoff(f64),

    #[error("invalid response function \"{name}\": {reason}")]
    InvalidResponseFunction { name: String, reason: String },

    #[error("inconsistent estimator state: {0}")]
    InconsistentState(String),

    #[error("failed to infer particle from \"{0}\"")]
    FailedToInferParticle(String),
}
