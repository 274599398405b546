//! Track-length estimator of the flux on hexahedral or tetrahedral meshes

// crate modules
use crate::discretization::PhaseSpacePoint;
use crate::error::{Error, Result};
use crate::estimator::{Estimator, EstimatorKind, Worker};
use crate::multiplier::MultiplierPolicy;
use crate::particle::ParticleState;
use crate::statistics::RunStatistics;
use crate::EntityId;

// ntally modules
use ntally_geometry::vtk::{CellData, MeshToVtk};
use ntally_geometry::Mesh;
use ntally_utils::f;

// external crates
use log::trace;
use serde::{Deserialize, Serialize};
use vtkio::model::Vtk;

/// Flux on mesh elements from the track length of every sub-step
///
/// Mesh elements are the estimator entities, with their volume as the norm
/// constant. Only a single particle type is scored, and the cosine and time
/// dimensions are ignored with a warning.
///
/// ```rust
/// # use ntally_estimator::*;
/// # use ntally_geometry::StructuredHexMesh;
/// let mesh = StructuredHexMesh::new(
///     vec![0.0, 1.0, 2.0],
///     vec![0.0, 1.0],
///     vec![0.0, 1.0],
/// ).unwrap();
///
/// let mut estimator =
///     MeshTrackLengthFluxEstimator::new(0, 1.0, MultiplierPolicy::WeightOnly, mesh).unwrap();
/// estimator.estimator_mut().set_particle_types(&[ParticleType::Neutron]);
///
/// // crosses both elements, half of the track is outside of the mesh
/// let state = ParticleState::default();
/// estimator
///     .update_from_global_particle_subtrack_ending_event(&state, [-2.0, 0.5, 0.5], [2.0, 0.5, 0.5])
///     .unwrap();
/// estimator.commit_history_contribution();
///
/// let e = estimator.estimator();
/// assert_eq!(e.entity_bin_data_first_moments(0).unwrap(), vec![1.0]);
/// assert_eq!(e.entity_bin_data_first_moments(1).unwrap(), vec![1.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MeshEstimatorState", into = "MeshEstimatorState")]
pub struct MeshTrackLengthFluxEstimator {
    estimator: Estimator,
    mesh: Mesh,
}

impl MeshTrackLengthFluxEstimator {
    /// Create an estimator over every element of a mesh
    pub fn new(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        mesh: impl Into<Mesh>,
    ) -> Result<Self> {
        let mesh = mesh.into();
        let elements = mesh
            .element_ids()
            .into_iter()
            .map(|id| -> Result<(EntityId, f64)> { Ok((id, mesh.volume(id)?)) })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            estimator: Estimator::with_kind(
                EstimatorKind::MeshTrackLengthFlux,
                id,
                multiplier,
                policy,
                &elements,
            )?,
            mesh,
        })
    }

    /// Mesh the estimator scores on
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Underlying estimator for configuration and queries
    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut Estimator {
        &mut self.estimator
    }

    /// Score a sub-step on the first thread
    pub fn update_from_global_particle_subtrack_ending_event(
        &mut self,
        state: &ParticleState,
        start: [f64; 3],
        end: [f64; 3],
    ) -> Result<()> {
        self.worker(0)?
            .update_from_global_particle_subtrack_ending_event(state, start, end)
    }

    /// Commit the current history of every thread
    pub fn commit_history_contribution(&mut self) {
        self.estimator.commit_history_contribution();
    }

    /// Worker for a single thread
    pub fn worker(&mut self, thread_id: usize) -> Result<MeshTrackLengthFluxWorker<'_>> {
        Ok(MeshTrackLengthFluxWorker {
            worker: self.estimator.worker(thread_id)?,
            mesh: &self.mesh,
        })
    }

    /// One worker per thread slot
    pub fn workers(&mut self) -> Vec<MeshTrackLengthFluxWorker<'_>> {
        let mesh = &self.mesh;
        self.estimator
            .workers()
            .into_iter()
            .map(|worker| MeshTrackLengthFluxWorker { worker, mesh })
            .collect()
    }

    /// Per-element results as a VTK dataset
    ///
    /// One array of means for every bin and response, named after both, then
    /// one array of the per-response totals. Relative errors are attached to
    /// every array and written if the converter includes errors.
    pub fn to_vtk(&self, run: &RunStatistics, converter: &MeshToVtk) -> Result<Vtk> {
        let e = &self.estimator;
        let n_responses = e.number_of_responses();
        let n_values = e.number_of_bins() * n_responses;

        let mut bin_means = vec![Vec::new(); n_values];
        let mut bin_errors = vec![Vec::new(); n_values];
        let mut total_means = vec![Vec::new(); n_responses];
        let mut total_errors = vec![Vec::new(); n_responses];

        for id in e.entity_ids() {
            let bins = e.entity_bin_processed_data(*id, run)?;
            for (i, (mean, error)) in bins.mean.iter().zip(&bins.relative_error).enumerate() {
                bin_means[i].push(*mean);
                bin_errors[i].push(*error);
            }

            let totals = e.entity_total_processed_data(*id, run)?;
            for (r, (mean, error)) in totals.mean.iter().zip(&totals.relative_error).enumerate() {
                total_means[r].push(*mean);
                total_errors[r].push(*error);
            }
        }

        let mut data = Vec::with_capacity(n_values + n_responses);
        for (i, (means, errors)) in bin_means.into_iter().zip(bin_errors).enumerate() {
            let response = &e.response_functions()[i % n_responses];
            let name = f!("{}: {}", response.name(), e.bin_name(i / n_responses));
            data.push(CellData::new(&name, means).with_errors(errors));
        }
        for (r, (means, errors)) in total_means.into_iter().zip(total_errors).enumerate() {
            let name = f!("{}: Total", e.response_functions()[r].name());
            data.push(CellData::new(&name, means).with_errors(errors));
        }

        Ok(converter.convert(&self.mesh, &data))
    }

    /// Convergence overview of the first response over all elements
    ///
    /// Relative error thresholds only count elements that were scored.
    pub fn summary(&self, run: &RunStatistics) -> Result<MeshSummary> {
        let e = &self.estimator;
        let mut summary = MeshSummary {
            elements: e.entity_ids().len(),
            ..Default::default()
        };

        for id in e.entity_ids() {
            let totals = e.entity_total_processed_data(*id, run)?;
            let (Some(mean), Some(error)) = (totals.mean.first(), totals.relative_error.first())
            else {
                continue;
            };

            if *mean == 0.0 {
                summary.zero += 1;
                continue;
            }

            for (threshold, count) in [
                (0.10, &mut summary.below_10_percent),
                (0.05, &mut summary.below_5_percent),
                (0.01, &mut summary.below_1_percent),
            ] {
                if *error <= threshold {
                    *count += 1;
                }
            }
        }

        Ok(summary)
    }
}

/// Estimator and mesh used to validate deserialised mesh estimators
#[derive(Serialize, Deserialize)]
struct MeshEstimatorState {
    estimator: Estimator,
    mesh: Mesh,
}

impl TryFrom<MeshEstimatorState> for MeshTrackLengthFluxEstimator {
    type Error = Error;

    fn try_from(raw: MeshEstimatorState) -> Result<Self> {
        if raw.estimator.kind() != EstimatorKind::MeshTrackLengthFlux {
            return Err(Error::InconsistentState(f!(
                "expected a mesh estimator, found {}",
                raw.estimator.kind()
            )));
        }
        if raw.estimator.entity_ids() != raw.mesh.element_ids().as_slice() {
            return Err(Error::InconsistentState(f!(
                "{} entities do not match the {} {} mesh elements",
                raw.estimator.entity_ids().len(),
                raw.mesh.number_of_elements(),
                raw.mesh.element_name()
            )));
        }

        Ok(Self {
            estimator: raw.estimator,
            mesh: raw.mesh,
        })
    }
}

impl From<MeshTrackLengthFluxEstimator> for MeshEstimatorState {
    fn from(estimator: MeshTrackLengthFluxEstimator) -> Self {
        Self {
            estimator: estimator.estimator,
            mesh: estimator.mesh,
        }
    }
}

/// Element counts describing how well a mesh estimator has converged
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSummary {
    /// Number of mesh elements
    pub elements: usize,
    /// Elements with a zero total
    pub zero: usize,
    /// Scored elements with a relative error at or below 10%
    pub below_10_percent: usize,
    /// Scored elements with a relative error at or below 5%
    pub below_5_percent: usize,
    /// Scored elements with a relative error at or below 1%
    pub below_1_percent: usize,
}

impl MeshSummary {
    /// Share of all elements as a percentage
    pub fn percentage(&self, count: usize) -> f64 {
        match self.elements {
            0 => 0.0,
            n => 100.0 * count as f64 / n as f64,
        }
    }
}

impl std::fmt::Display for MeshSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh elements: {}", self.elements)?;
        writeln!(f, "  zero total      : {:>6.2}%", self.percentage(self.zero))?;
        writeln!(
            f,
            "  rel. err <= 10% : {:>6.2}%",
            self.percentage(self.below_10_percent)
        )?;
        writeln!(
            f,
            "  rel. err <= 5%  : {:>6.2}%",
            self.percentage(self.below_5_percent)
        )?;
        write!(
            f,
            "  rel. err <= 1%  : {:>6.2}%",
            self.percentage(self.below_1_percent)
        )
    }
}

/// Track-length scoring handle for a single thread
#[derive(Debug)]
pub struct MeshTrackLengthFluxWorker<'a> {
    worker: Worker<'a>,
    mesh: &'a Mesh,
}

impl MeshTrackLengthFluxWorker<'_> {
    /// Score the length of a sub-step in every element it crosses
    ///
    /// The phase-space bin is taken from the state at the end of the
    /// sub-step. Parts of the track outside of the mesh are not scored.
    pub fn update_from_global_particle_subtrack_ending_event(
        &mut self,
        state: &ParticleState,
        start: [f64; 3],
        end: [f64; 3],
    ) -> Result<()> {
        if !self.worker.is_particle_type_assigned(state.particle) {
            return Ok(());
        }

        let Some(bin) = self.worker.bin_index(&PhaseSpacePoint::new(state)) else {
            return Ok(());
        };

        let lengths = self.mesh.track_lengths(start, end);
        trace!(
            "Thread {} sub-track crossed {} elements",
            self.worker.thread_id(),
            lengths.len()
        );

        for (element, length) in lengths {
            self.worker.add_to_bin(element, bin, state, length)?;
        }
        Ok(())
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
