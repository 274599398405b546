//! Flux and current estimators on surfaces, scored from crossings
//!
//! Both estimators take the angle cosine between the particle direction and
//! the surface normal with every crossing. It is available to the cosine
//! dimension of the phase-space bins, and the flux estimator weights each
//! crossing by its inverse.

// crate modules
use crate::discretization::PhaseSpacePoint;
use crate::error::{Error, Result};
use crate::estimator::{Estimator, EstimatorKind, Worker};
use crate::multiplier::MultiplierPolicy;
use crate::particle::ParticleState;
use crate::EntityId;

// ntally modules
use ntally_utils::f;

// external crates
use log::debug;
use serde::{Deserialize, Serialize};

/// Default cosine below which a crossing is treated as grazing
pub const DEFAULT_COSINE_CUTOFF: f64 = 0.001;

/// Flux through surfaces, scoring `1 / |cosine|` per crossing
///
/// The surfaces are the estimator entities, with their area as the norm
/// constant. Grazing crossings with `|cosine|` below the cutoff score as if
/// the cosine were half of the cutoff.
///
/// ```rust
/// # use ntally_estimator::*;
/// let mut estimator = SurfaceFluxEstimator::new(
///     0,
///     1.0,
///     MultiplierPolicy::WeightOnly,
///     &[(5, 2.0)],
/// ).unwrap();
/// estimator.estimator_mut().set_particle_types(&[ParticleType::Photon]);
///
/// let state = ParticleState::new(ParticleType::Photon);
/// estimator.update_from_particle_crossing_surface_event(&state, 5, -0.5).unwrap();
/// estimator.commit_history_contribution();
///
/// let moments = estimator.estimator().entity_bin_data_first_moments(5).unwrap();
/// assert_eq!(moments, vec![2.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurfaceFluxState", into = "SurfaceFluxState")]
pub struct SurfaceFluxEstimator {
    estimator: Estimator,
    cosine_cutoff: f64,
}

impl SurfaceFluxEstimator {
    /// Create an estimator over surfaces with their norm constants (areas)
    pub fn new(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        surfaces: &[(EntityId, f64)],
    ) -> Result<Self> {
        Ok(Self {
            estimator: Estimator::with_kind(
                EstimatorKind::SurfaceFlux,
                id,
                multiplier,
                policy,
                surfaces,
            )?,
            cosine_cutoff: DEFAULT_COSINE_CUTOFF,
        })
    }

    /// Underlying estimator for configuration and queries
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut Estimator {
        &mut self.estimator
    }

    pub fn cosine_cutoff(&self) -> f64 {
        self.cosine_cutoff
    }

    /// Set the cosine below which crossings are treated as grazing
    ///
    /// The cutoff must be within (0, 1].
    pub fn set_cosine_cutoff(&mut self, cutoff: f64) -> Result<()> {
        validate_cutoff(cutoff)?;
        debug!(
            "Surface flux estimator {} cosine cutoff set to {cutoff}",
            self.estimator.id()
        );
        self.cosine_cutoff = cutoff;
        Ok(())
    }

    /// Score a crossing on the first thread
    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        state: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) -> Result<()> {
        self.worker(0)?
            .update_from_particle_crossing_surface_event(state, surface, angle_cosine)
    }

    /// Commit the current history of every thread
    pub fn commit_history_contribution(&mut self) {
        self.estimator.commit_history_contribution();
    }

    /// Worker for a single thread
    pub fn worker(&mut self, thread_id: usize) -> Result<SurfaceFluxWorker<'_>> {
        Ok(SurfaceFluxWorker {
            worker: self.estimator.worker(thread_id)?,
            cosine_cutoff: self.cosine_cutoff,
        })
    }

    /// One worker per thread slot
    pub fn workers(&mut self) -> Vec<SurfaceFluxWorker<'_>> {
        let cosine_cutoff = self.cosine_cutoff;
        self.estimator
            .workers()
            .into_iter()
            .map(|worker| SurfaceFluxWorker {
                worker,
                cosine_cutoff,
            })
            .collect()
    }
}

/// Surface flux scoring handle for a single thread
#[derive(Debug)]
pub struct SurfaceFluxWorker<'a> {
    worker: Worker<'a>,
    cosine_cutoff: f64,
}

impl SurfaceFluxWorker<'_> {
    /// Score `1 / |cosine|` on the crossed surface
    ///
    /// Particle types the estimator is not assigned are ignored.
    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        state: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) -> Result<()> {
        if !self.worker.is_particle_type_assigned(state.particle) {
            return Ok(());
        }
        validate_cosine(angle_cosine)?;

        let mut magnitude = angle_cosine.abs();
        if magnitude < self.cosine_cutoff {
            magnitude = 0.5 * self.cosine_cutoff;
        }

        self.worker.add_partial_history_contribution(
            surface,
            &PhaseSpacePoint::with_cosine(state, angle_cosine),
            1.0 / magnitude,
        )
    }

    pub fn commit_history_contribution(&mut self) {
        self.worker.commit_history_contribution();
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.worker.has_uncommitted_history_contribution()
    }

    pub fn thread_id(&self) -> usize {
        self.worker.thread_id()
    }
}

/// Current through surfaces, scoring one per crossing
///
/// Cosine bins split the current by the direction of the crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Estimator", into = "Estimator")]
pub struct SurfaceCurrentEstimator {
    estimator: Estimator,
}

impl SurfaceCurrentEstimator {
    /// Create an estimator over surfaces with their norm constants
    pub fn new(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        surfaces: &[(EntityId, f64)],
    ) -> Result<Self> {
        Ok(Self {
            estimator: Estimator::with_kind(
                EstimatorKind::SurfaceCurrent,
                id,
                multiplier,
                policy,
                surfaces,
            )?,
        })
    }

    /// Underlying estimator for configuration and queries
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut Estimator {
        &mut self.estimator
    }

    /// Score a crossing on the first thread
    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        state: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) -> Result<()> {
        self.worker(0)?
            .update_from_particle_crossing_surface_event(state, surface, angle_cosine)
    }

    /// Commit the current history of every thread
    pub fn commit_history_contribution(&mut self) {
        self.estimator.commit_history_contribution();
    }

    /// Worker for a single thread
    pub fn worker(&mut self, thread_id: usize) -> Result<SurfaceCurrentWorker<'_>> {
        Ok(SurfaceCurrentWorker {
            worker: self.estimator.worker(thread_id)?,
        })
    }

    /// One worker per thread slot
    pub fn workers(&mut self) -> Vec<SurfaceCurrentWorker<'_>> {
        self.estimator
            .workers()
            .into_iter()
            .map(|worker| SurfaceCurrentWorker { worker })
            .collect()
    }
}

/// Surface current scoring handle for a single thread
#[derive(Debug)]
pub struct SurfaceCurrentWorker<'a> {
    worker: Worker<'a>,
}

impl SurfaceCurrentWorker<'_> {
    /// Score a unit contribution on the crossed surface
    ///
    /// Particle types the estimator is not assigned are ignored.
    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        state: &ParticleState,
        surface: EntityId,
        angle_cosine: f64,
    ) -> Result<()> {
        if !self.worker.is_particle_type_assigned(state.particle) {
            return Ok(());
        }
        validate_cosine(angle_cosine)?;

        self.worker.add_partial_history_contribution(
            surface,
            &PhaseSpacePoint::with_cosine(state, angle_cosine),
            1.0,
        )
    }

    pub fn commit_history_contribution(&mut self) {
        self.worker.commit_history_contribution();
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.worker.has_uncommitted_history_contribution()
    }

    pub fn thread_id(&self) -> usize {
        self.worker.thread_id()
    }
}

fn validate_cosine(angle_cosine: f64) -> Result<()> {
    // written this way round so NAN is rejected
    if !(angle_cosine.abs() <= 1.0) {
        return Err(Error::InvalidAngleCosine(angle_cosine));
    }
    Ok(())
}

fn validate_cutoff(cutoff: f64) -> Result<()> {
    if !(cutoff > 0.0 && cutoff <= 1.0) {
        return Err(Error::InvalidCosineCutoff(cutoff));
    }
    Ok(())
}

fn check_kind(estimator: &Estimator, expected: EstimatorKind) -> Result<()> {
    if estimator.kind() != expected {
        return Err(Error::InconsistentState(f!(
            "expected a {expected} estimator, found {}",
            estimator.kind()
        )));
    }
    Ok(())
}

/// Estimator and cutoff used to validate deserialised surface flux estimators
#[derive(Serialize, Deserialize)]
struct SurfaceFluxState {
    estimator: Estimator,
    cosine_cutoff: f64,
}

impl TryFrom<SurfaceFluxState> for SurfaceFluxEstimator {
    type Error = Error;

    fn try_from(raw: SurfaceFluxState) -> Result<Self> {
        check_kind(&raw.estimator, EstimatorKind::SurfaceFlux)?;
        validate_cutoff(raw.cosine_cutoff)?;
        Ok(Self {
            estimator: raw.estimator,
            cosine_cutoff: raw.cosine_cutoff,
        })
    }
}

impl From<SurfaceFluxEstimator> for SurfaceFluxState {
    fn from(estimator: SurfaceFluxEstimator) -> Self {
        Self {
            estimator: estimator.estimator,
            cosine_cutoff: estimator.cosine_cutoff,
        }
    }
}

impl TryFrom<Estimator> for SurfaceCurrentEstimator {
    type Error = Error;

    fn try_from(estimator: Estimator) -> Result<Self> {
        check_kind(&estimator, EstimatorKind::SurfaceCurrent)?;
        Ok(Self { estimator })
    }
}

impl From<SurfaceCurrentEstimator> for Estimator {
    fn from(estimator: SurfaceCurrentEstimator) -> Self {
        estimator.estimator
    }
}
