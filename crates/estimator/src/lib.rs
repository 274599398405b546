//! Monte Carlo estimators with per-history moment statistics
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod cell_collision;
mod communicator;
mod discretization;
mod error;
mod estimator;
mod mesh_track_length;
mod moments;
mod multiplier;
mod particle;
mod response;
mod statistics;
mod surface;

pub mod io;
pub mod pqla;

/// Identifier of a cell, surface, or mesh element scored by an estimator
pub type EntityId = u64;

#[doc(inline)]
pub use error::{Error, Result};

#[doc(inline)]
pub use particle::{ParticleState, ParticleType};

#[doc(inline)]
pub use multiplier::MultiplierPolicy;

#[doc(inline)]
pub use response::{ResponseFunction, ResponseKind};

#[doc(inline)]
pub use discretization::{
    DimensionDiscretization, PhaseSpaceDimension, PhaseSpaceDiscretization, PhaseSpacePoint,
};

#[doc(inline)]
pub use statistics::{
    figure_of_merit, mean, relative_error, relative_vov, HistoryCounter, ProcessedData,
    ProcessedTotalData, RunStatistics,
};

#[doc(inline)]
pub use estimator::{Estimator, EstimatorKind, Worker};

#[doc(inline)]
pub use communicator::{Communicator, LocalCommunicator};

#[doc(inline)]
pub use cell_collision::{CellCollisionFluxEstimator, CellCollisionFluxWorker};

#[doc(inline)]
pub use mesh_track_length::{MeshSummary, MeshTrackLengthFluxEstimator, MeshTrackLengthFluxWorker};

#[doc(inline)]
pub use surface::{
    SurfaceCurrentEstimator, SurfaceCurrentWorker, SurfaceFluxEstimator, SurfaceFluxWorker,
    DEFAULT_COSINE_CUTOFF,
};
