//! Collision estimator of the flux in cells

// crate modules
use crate::discretization::PhaseSpacePoint;
use crate::error::{Error, Result};
use crate::estimator::{Estimator, EstimatorKind, Worker};
use crate::multiplier::MultiplierPolicy;
use crate::particle::ParticleState;
use crate::EntityId;

// external crates
use serde::{Deserialize, Serialize};

/// Flux in cells from collisions, scoring `1 / total cross section`
///
/// The cells are the estimator entities. Cosine bins are not supported and
/// are ignored with a warning.
///
/// ```rust
/// # use ntally_estimator::*;
/// let mut estimator = CellCollisionFluxEstimator::new(
///     0,
///     1.0,
///     MultiplierPolicy::WeightOnly,
///     &[(10, 1.0), (20, 4.0)],
/// ).unwrap();
/// estimator.estimator_mut().set_particle_types(&[ParticleType::Neutron]);
///
/// let state = ParticleState { weight: 2.0, ..Default::default() };
/// estimator.update_from_particle_colliding_in_cell_event(&state, 20, 0.5).unwrap();
/// estimator.commit_history_contribution();
///
/// let run = RunStatistics::new(1, 1.0);
/// let data = estimator.estimator().entity_bin_processed_data(20, &run).unwrap();
/// assert_eq!(data.mean, vec![1.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellCollisionFluxEstimator {
    estimator: Estimator,
}

impl CellCollisionFluxEstimator {
    /// Create an estimator over cells with their norm constants (volumes)
    pub fn new(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        cells: &[(EntityId, f64)],
    ) -> Result<Self> {
        Ok(Self {
            estimator: Estimator::with_kind(
                EstimatorKind::CellCollisionFlux,
                id,
                multiplier,
                policy,
                cells,
            )?,
        })
    }

    /// Create an estimator over cells with unit norm constants
    pub fn with_unit_norms(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        cells: &[EntityId],
    ) -> Result<Self> {
        let cells: Vec<(EntityId, f64)> = cells.iter().map(|c| (*c, 1.0)).collect();
        Self::new(id, multiplier, policy, &cells)
    }

    /// Underlying estimator for configuration and queries
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut Estimator {
        &mut self.estimator
    }

    /// Score a collision on the first thread
    pub fn update_from_particle_colliding_in_cell_event(
        &mut self,
        state: &ParticleState,
        cell: EntityId,
        total_cross_section: f64,
    ) -> Result<()> {
        self.worker(0)?
            .update_from_particle_colliding_in_cell_event(state, cell, total_cross_section)
    }

    /// Commit the current history of every thread
    pub fn commit_history_contribution(&mut self) {
        self.estimator.commit_history_contribution();
    }

    /// Worker for a single thread
    pub fn worker(&mut self, thread_id: usize) -> Result<CellCollisionFluxWorker<'_>> {
        Ok(CellCollisionFluxWorker {
            worker: self.estimator.worker(thread_id)?,
        })
    }

    /// One worker per thread slot
    pub fn workers(&mut self) -> Vec<CellCollisionFluxWorker<'_>> {
        self.estimator
            .workers()
            .into_iter()
            .map(|worker| CellCollisionFluxWorker { worker })
            .collect()
    }
}

/// Collision scoring handle for a single thread
#[derive(Debug)]
pub struct CellCollisionFluxWorker<'a> {
    worker: Worker<'a>,
}

impl CellCollisionFluxWorker<'_> {
    /// Score `1 / total cross section` in the collision cell
    ///
    /// Particle types the estimator is not assigned are ignored.
    pub fn update_from_particle_colliding_in_cell_event(
        &mut self,
        state: &ParticleState,
        cell: EntityId,
        total_cross_section: f64,
    ) -> Result<()> {
        if !self.worker.is_particle_type_assigned(state.particle) {
            return Ok(());
        }

        if !(total_cross_section > 0.0 && total_cross_section.is_finite()) {
            return Err(Error::InvalidCrossSection(total_cross_section));
        }

        self.worker.add_partial_history_contribution(
            cell,
            &PhaseSpacePoint::new(state),
            1.0 / total_cross_section,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretization::PhaseSpaceDimension;
    use crate::particle::ParticleType;
    use rstest::{fixture, rstest};

    #[fixture]
    fn estimator() -> CellCollisionFluxEstimator {
        let mut estimator = CellCollisionFluxEstimator::with_unit_norms(
            1,
            1.0,
            MultiplierPolicy::WeightOnly,
            &[0, 1],
        )
        .unwrap();
        estimator
            .estimator_mut()
            .set_particle_types(&[ParticleType::Photon]);
        estimator
    }

    #[rstest]
    fn unassigned_particles_are_ignored(mut estimator: CellCollisionFluxEstimator) {
        let state = ParticleState::new(ParticleType::Neutron);
        estimator
            .update_from_particle_colliding_in_cell_event(&state, 0, 1.0)
            .unwrap();
        assert!(!estimator.estimator().has_uncommitted_history_contribution());
    }

    #[rstest]
    fn inverse_cross_section(mut estimator: CellCollisionFluxEstimator) {
        let state = ParticleState::new(ParticleType::Photon);
        estimator
            .update_from_particle_colliding_in_cell_event(&state, 1, 4.0)
            .unwrap();
        estimator.commit_history_contribution();

        let e = estimator.estimator();
        assert_eq!(e.entity_bin_data_first_moments(1).unwrap(), vec![0.25]);
        assert_eq!(e.entity_bin_data_first_moments(0).unwrap(), vec![0.0]);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::INFINITY)]
    fn invalid_cross_section(mut estimator: CellCollisionFluxEstimator, #[case] xs: f64) {
        let state = ParticleState::new(ParticleType::Photon);
        assert!(matches!(
            estimator.update_from_particle_colliding_in_cell_event(&state, 1, xs),
            Err(Error::InvalidCrossSection(_))
        ));
    }

    #[rstest]
    fn unknown_cell(mut estimator: CellCollisionFluxEstimator) {
        let state = ParticleState::new(ParticleType::Photon);
        assert!(matches!(
            estimator.update_from_particle_colliding_in_cell_event(&state, 7, 1.0),
            Err(Error::UnknownEntity(7))
        ));
    }

    #[rstest]
    fn cosine_bins_are_ignored(mut estimator: CellCollisionFluxEstimator) {
        estimator
            .estimator_mut()
            .set_cosine_discretization(vec![-1.0, 0.0, 1.0])
            .unwrap();
        let e = estimator.estimator();
        assert_eq!(e.discretization().number_of_bins(PhaseSpaceDimension::Cosine), 1);
        assert_eq!(e.number_of_bins(), 1);
    }
}
