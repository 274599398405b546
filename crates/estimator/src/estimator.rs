//! Entity-based estimator core shared by every estimator type
//!
//! An [Estimator] owns its configuration, the entities it scores on, and one
//! [ThreadSlot] per worker thread. Workers borrow the configuration
//! immutably and exactly one slot mutably, so concurrent scoring needs no
//! locks. Queries sum over the slots.

// standard library
use std::collections::BTreeMap;

// crate modules
use crate::communicator::Communicator;
use crate::discretization::{
    DimensionDiscretization, PhaseSpaceDimension, PhaseSpaceDiscretization, PhaseSpacePoint,
};
use crate::error::{Error, Result};
use crate::moments::{Layout, ThreadSlot};
use crate::multiplier::MultiplierPolicy;
use crate::particle::{ParticleState, ParticleType};
use crate::response::ResponseFunction;
use crate::statistics::{ProcessedData, ProcessedTotalData, RunStatistics};
use crate::EntityId;

// external crates
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

/// Estimator types, which decide the phase-space and particle type rules
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimatorKind {
    /// No restrictions
    Standard,
    /// Collision estimator of the flux in cells
    CellCollisionFlux,
    /// Track-length estimator of the flux on a mesh
    MeshTrackLengthFlux,
    /// Flux through surfaces from crossings
    SurfaceFlux,
    /// Current through surfaces from crossings
    SurfaceCurrent,
}

impl EstimatorKind {
    /// Whether a dimension can be binned by this kind of estimator
    pub fn supports(&self, dimension: PhaseSpaceDimension) -> bool {
        match self {
            Self::Standard | Self::SurfaceFlux | Self::SurfaceCurrent => true,
            Self::CellCollisionFlux => dimension != PhaseSpaceDimension::Cosine,
            Self::MeshTrackLengthFlux => !matches!(
                dimension,
                PhaseSpaceDimension::Cosine | PhaseSpaceDimension::Time
            ),
        }
    }

    /// Mesh estimators only honour the first particle type given
    fn single_particle_type(&self) -> bool {
        matches!(self, Self::MeshTrackLengthFlux)
    }
}

impl std::fmt::Display for EstimatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Standard => "standard",
            Self::CellCollisionFlux => "cell collision flux",
            Self::MeshTrackLengthFlux => "mesh track-length flux",
            Self::SurfaceFlux => "surface flux",
            Self::SurfaceCurrent => "surface current",
        };
        write!(f, "{name}")
    }
}

/// Read-only state shared by all workers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EstimatorConfig {
    id: u32,
    kind: EstimatorKind,
    multiplier: f64,
    policy: MultiplierPolicy,
    discretization: PhaseSpaceDiscretization,
    responses: Vec<ResponseFunction>,
    particle_types: Vec<ParticleType>,
    /// Sorted entity ids, the position is the entity index
    entity_ids: Vec<EntityId>,
    norm_constants: Vec<f64>,
    layout: Layout,
}

impl EstimatorConfig {
    fn entity_index(&self, id: EntityId) -> Result<usize> {
        self.entity_ids
            .binary_search(&id)
            .map_err(|_| Error::UnknownEntity(id))
    }
}

/// Per-history moment tallies for a set of entities
///
/// Contributions for the current history are staged per thread and folded
/// into the moments on [Estimator::commit_history_contribution], so that
/// each bin sees exactly one sample per history.
///
/// ```rust
/// # use ntally_estimator::*;
/// let mut estimator = Estimator::new(0, 1.0, MultiplierPolicy::WeightOnly, &[(1, 1.0)]).unwrap();
/// estimator.set_energy_discretization(vec![0.0, 1.0, 10.0]).unwrap();
///
/// let state = ParticleState { energy: 5.0, ..Default::default() };
/// let point = PhaseSpacePoint::new(&state);
///
/// // two contributions in the same history
/// estimator.add_partial_history_contribution(1, &point, 1.0).unwrap();
/// estimator.add_partial_history_contribution(1, &point, 2.0).unwrap();
/// estimator.commit_history_contribution();
///
/// assert_eq!(estimator.entity_bin_data_first_moments(1).unwrap(), vec![0.0, 3.0]);
/// assert_eq!(estimator.entity_bin_data_second_moments(1).unwrap(), vec![0.0, 9.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EstimatorState", into = "EstimatorState")]
pub struct Estimator {
    config: EstimatorConfig,
    slots: Vec<ThreadSlot>,
}

impl Estimator {
    /// Create an estimator with no phase-space restrictions
    ///
    /// Entities are given as `(id, norm constant)` pairs. Repeated ids keep
    /// the last norm constant given.
    pub fn new(
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        entities: &[(EntityId, f64)],
    ) -> Result<Self> {
        Self::with_kind(EstimatorKind::Standard, id, multiplier, policy, entities)
    }

    pub(crate) fn with_kind(
        kind: EstimatorKind,
        id: u32,
        multiplier: f64,
        policy: MultiplierPolicy,
        entities: &[(EntityId, f64)],
    ) -> Result<Self> {
        if !(multiplier > 0.0 && multiplier.is_finite()) {
            return Err(Error::InvalidMultiplier(multiplier));
        }

        if let Some((id, value)) = entities.iter().find(|(_, n)| !(*n > 0.0 && n.is_finite())) {
            return Err(Error::InvalidNormConstant {
                id: *id,
                value: *value,
            });
        }

        let (entity_ids, norm_constants): (Vec<EntityId>, Vec<f64>) = entities
            .iter()
            .copied()
            .collect::<BTreeMap<EntityId, f64>>()
            .into_iter()
            .unzip();

        let layout = Layout {
            entities: entity_ids.len(),
            bins: 1,
            responses: 1,
            totals: true,
        };

        debug!(
            "New {kind} estimator {id} with {} entities",
            entity_ids.len()
        );

        Ok(Self {
            config: EstimatorConfig {
                id,
                kind,
                multiplier,
                policy,
                discretization: PhaseSpaceDiscretization::default(),
                responses: vec![ResponseFunction::default()],
                particle_types: Vec::new(),
                entity_ids,
                norm_constants,
                layout,
            },
            slots: vec![ThreadSlot::new(&layout)],
        })
    }

    /// Estimator id
    pub fn id(&self) -> u32 {
        self.config.id
    }

    /// Estimator type
    pub fn kind(&self) -> EstimatorKind {
        self.config.kind
    }

    /// Constant applied to every mean
    pub fn multiplier(&self) -> f64 {
        self.config.multiplier
    }

    /// Per-event multiplier policy
    pub fn multiplier_policy(&self) -> MultiplierPolicy {
        self.config.policy
    }

    /// Sorted ids of every entity
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.config.entity_ids
    }

    pub fn is_entity_assigned(&self, id: EntityId) -> bool {
        self.config.entity_index(id).is_ok()
    }

    pub fn entity_norm_constant(&self, id: EntityId) -> Result<f64> {
        let index = self.config.entity_index(id)?;
        Ok(self.config.norm_constants[index])
    }

    /// Sum of the norm constants of every entity
    pub fn total_norm_constant(&self) -> f64 {
        self.config.norm_constants.iter().sum()
    }

    /// Set the bins of a phase-space dimension
    ///
    /// Dimensions the estimator type cannot bin are ignored with a warning.
    /// Changing the bin structure clears any accumulated data.
    pub fn set_discretization(
        &mut self,
        dimension: PhaseSpaceDimension,
        discretization: DimensionDiscretization,
    ) -> Result<()> {
        if !self.config.kind.supports(dimension) {
            warn!(
                "{dimension} bins are ignored by {} estimator {}",
                self.config.kind, self.config.id
            );
            return Ok(());
        }

        self.config
            .discretization
            .set_discretization(dimension, discretization)?;
        self.update_layout();
        Ok(())
    }

    /// Set energy bin boundaries
    pub fn set_energy_discretization(&mut self, boundaries: Vec<f64>) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::Energy,
            DimensionDiscretization::Continuous(boundaries),
        )
    }

    /// Set time bin boundaries
    pub fn set_time_discretization(&mut self, boundaries: Vec<f64>) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::Time,
            DimensionDiscretization::Continuous(boundaries),
        )
    }

    /// Set angle cosine bin boundaries
    pub fn set_cosine_discretization(&mut self, boundaries: Vec<f64>) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::Cosine,
            DimensionDiscretization::Continuous(boundaries),
        )
    }

    /// Set source energy bin boundaries
    pub fn set_source_energy_discretization(&mut self, boundaries: Vec<f64>) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::SourceEnergy,
            DimensionDiscretization::Continuous(boundaries),
        )
    }

    /// Set collision number upper limits
    pub fn set_collision_number_discretization(&mut self, limits: Vec<u32>) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::CollisionNumber,
            DimensionDiscretization::CollisionNumber(limits),
        )
    }

    /// Set PQLA direction bins of a given order
    pub fn set_direction_discretization(&mut self, order: u32, forward: bool) -> Result<()> {
        self.set_discretization(
            PhaseSpaceDimension::Direction,
            DimensionDiscretization::Direction { order, forward },
        )
    }

    /// Phase-space bin structure
    pub fn discretization(&self) -> &PhaseSpaceDiscretization {
        &self.config.discretization
    }

    /// Total number of phase-space bins
    pub fn number_of_bins(&self) -> usize {
        self.config.layout.bins
    }

    /// Human-readable description of a phase-space bin
    pub fn bin_name(&self, bin: usize) -> String {
        self.config.discretization.bin_name(bin)
    }

    /// Replace the response functions
    ///
    /// An empty list restores the default unity response. Clears any
    /// accumulated data.
    pub fn set_response_functions(&mut self, responses: Vec<ResponseFunction>) {
        self.config.responses = if responses.is_empty() {
            vec![ResponseFunction::default()]
        } else {
            responses
        };
        self.update_layout();
    }

    pub fn response_functions(&self) -> &[ResponseFunction] {
        &self.config.responses
    }

    pub fn number_of_responses(&self) -> usize {
        self.config.responses.len()
    }

    /// Particle types scored by the event handlers
    ///
    /// Repeated types are dropped, keeping the first-seen order. Mesh
    /// estimators only honour the first type. An empty set scores nothing.
    pub fn set_particle_types(&mut self, types: &[ParticleType]) {
        let mut unique: Vec<ParticleType> = Vec::with_capacity(types.len());
        for particle in types {
            if !unique.contains(particle) {
                unique.push(*particle);
            }
        }

        if unique.is_empty() {
            warn!(
                "Estimator {} has no particle types and will not score",
                self.config.id
            );
        }

        if self.config.kind.single_particle_type() && unique.len() > 1 {
            warn!(
                "{} estimator {} only scores {}, ignoring {} other particle type(s)",
                self.config.kind,
                self.config.id,
                unique[0],
                unique.len() - 1
            );
            unique.truncate(1);
        }

        self.config.particle_types = unique;
    }

    pub fn particle_types(&self) -> &[ParticleType] {
        &self.config.particle_types
    }

    pub fn is_particle_type_assigned(&self, particle: ParticleType) -> bool {
        self.config.particle_types.contains(&particle)
    }

    /// Enable or disable the total moments, clearing any accumulated data
    pub fn set_total_moments(&mut self, enabled: bool) {
        self.config.layout.totals = enabled;
        self.rebuild_slots();
    }

    /// Any new bins or responses invalidate the moments, even at the same size
    fn update_layout(&mut self) {
        self.config.layout.bins = self.config.discretization.total_number_of_bins();
        self.config.layout.responses = self.config.responses.len();
        self.rebuild_slots();
    }

    fn rebuild_slots(&mut self) {
        debug!(
            "Estimator {} reset for {} bins x {} responses",
            self.config.id, self.config.layout.bins, self.config.layout.responses
        );
        self.slots = vec![ThreadSlot::new(&self.config.layout); self.slots.len().max(1)];
    }

    /// Allocate one slot per worker thread
    ///
    /// Committed data is kept by folding it into the first slot. Zero threads
    /// is treated as one.
    pub fn enable_thread_support(&mut self, threads: usize) {
        let threads = threads.max(1);
        let collapsed = self.collapsed();

        self.slots = vec![ThreadSlot::new(&self.config.layout); threads];
        self.slots[0] = collapsed;
        debug!(
            "Estimator {} thread support enabled for {threads} thread(s)",
            self.config.id
        );
    }

    /// Number of worker slots
    pub fn number_of_threads(&self) -> usize {
        self.slots.len()
    }

    /// Worker for a single thread
    pub fn worker(&mut self, thread_id: usize) -> Result<Worker<'_>> {
        let available = self.slots.len();
        let slot = self
            .slots
            .get_mut(thread_id)
            .ok_or(Error::ThreadSupportNotEnabled {
                requested: thread_id,
                available,
            })?;

        Ok(Worker {
            config: &self.config,
            slot,
            thread_id,
        })
    }

    /// One worker per thread slot, indexed by thread id
    ///
    /// Workers can be sent to separate threads. Queries on the estimator are
    /// only possible once every worker has been dropped.
    pub fn workers(&mut self) -> Vec<Worker<'_>> {
        let config = &self.config;
        self.slots
            .iter_mut()
            .enumerate()
            .map(|(thread_id, slot)| Worker {
                config,
                slot,
                thread_id,
            })
            .collect()
    }

    /// Stage a contribution on the first thread
    pub fn add_partial_history_contribution(
        &mut self,
        entity: EntityId,
        point: &PhaseSpacePoint,
        raw_contribution: f64,
    ) -> Result<()> {
        self.worker(0)?
            .add_partial_history_contribution(entity, point, raw_contribution)
    }

    /// Stage an already weighted contribution on the first thread
    pub fn add_partial_history_contribution_at(
        &mut self,
        entity: EntityId,
        bin: usize,
        response: usize,
        contribution: f64,
    ) -> Result<()> {
        self.worker(0)?
            .add_partial_history_contribution_at(entity, bin, response, contribution)
    }

    /// Commit the current history of every thread
    pub fn commit_history_contribution(&mut self) {
        for mut worker in self.workers() {
            worker.commit_history_contribution();
        }
    }

    /// True if any thread has staged a non-zero contribution
    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.slots.iter().any(ThreadSlot::has_uncommitted)
    }

    fn sum_slots<F>(&self, select: F) -> Vec<f64>
    where
        F: Fn(&ThreadSlot) -> &Vec<f64>,
    {
        let mut slots = self.slots.iter();
        let Some(first) = slots.next() else {
            return Vec::new();
        };

        let mut sum = select(first).clone();
        for slot in slots {
            for (s, v) in sum.iter_mut().zip(select(slot)) {
                *s += v;
            }
        }
        sum
    }

    /// All slots summed into a single one, without uncommitted data
    fn collapsed(&self) -> ThreadSlot {
        let mut collapsed = ThreadSlot::new(&self.config.layout);
        for slot in &self.slots {
            collapsed.merge(slot);
        }
        collapsed
    }

    pub fn entity_bin_data_first_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_bins[e].first))
    }

    pub fn entity_bin_data_second_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_bins[e].second))
    }

    pub fn total_bin_data_first_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_bins.first)
    }

    pub fn total_bin_data_second_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_bins.second)
    }

    pub fn entity_total_data_first_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_totals[e].first))
    }

    pub fn entity_total_data_second_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_totals[e].second))
    }

    pub fn entity_total_data_third_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_totals[e].third))
    }

    pub fn entity_total_data_fourth_moments(&self, id: EntityId) -> Result<Vec<f64>> {
        let e = self.config.entity_index(id)?;
        Ok(self.sum_slots(|s| &s.entity_totals[e].fourth))
    }

    pub fn total_total_data_first_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_totals.first)
    }

    pub fn total_total_data_second_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_totals.second)
    }

    pub fn total_total_data_third_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_totals.third)
    }

    pub fn total_total_data_fourth_moments(&self) -> Vec<f64> {
        self.sum_slots(|s| &s.total_totals.fourth)
    }

    /// Mean, relative error and figure of merit for every bin of an entity
    ///
    /// Values are ordered by `bin * number_of_responses + response`.
    pub fn entity_bin_processed_data(
        &self,
        id: EntityId,
        run: &RunStatistics,
    ) -> Result<ProcessedData> {
        Ok(ProcessedData::from_moments(
            &self.entity_bin_data_first_moments(id)?,
            &self.entity_bin_data_second_moments(id)?,
            self.config.multiplier,
            self.entity_norm_constant(id)?,
            run,
        ))
    }

    /// Processed bin data summed over all entities
    pub fn total_bin_processed_data(&self, run: &RunStatistics) -> ProcessedData {
        ProcessedData::from_moments(
            &self.total_bin_data_first_moments(),
            &self.total_bin_data_second_moments(),
            self.config.multiplier,
            self.total_norm_constant(),
            run,
        )
    }

    /// Processed per-response totals of an entity
    pub fn entity_total_processed_data(
        &self,
        id: EntityId,
        run: &RunStatistics,
    ) -> Result<ProcessedTotalData> {
        let moments = [
            self.entity_total_data_first_moments(id)?,
            self.entity_total_data_second_moments(id)?,
            self.entity_total_data_third_moments(id)?,
            self.entity_total_data_fourth_moments(id)?,
        ];

        Ok(ProcessedTotalData::from_moments(
            moments.each_ref().map(|m| m.as_slice()),
            self.config.multiplier,
            self.entity_norm_constant(id)?,
            run,
        ))
    }

    /// Processed per-response totals over all entities
    pub fn total_total_processed_data(&self, run: &RunStatistics) -> ProcessedTotalData {
        let moments = [
            self.total_total_data_first_moments(),
            self.total_total_data_second_moments(),
            self.total_total_data_third_moments(),
            self.total_total_data_fourth_moments(),
        ];

        ProcessedTotalData::from_moments(
            moments.each_ref().map(|m| m.as_slice()),
            self.config.multiplier,
            self.total_norm_constant(),
            run,
        )
    }

    /// Zero every moment and buffer, keeping the configuration
    pub fn reset_data(&mut self) {
        let layout = self.config.layout;
        for slot in &mut self.slots {
            slot.reset(&layout);
        }
    }

    /// Sum the moments of every rank onto the root
    ///
    /// Collective and blocking, every rank of the communicator must call it.
    /// On success the root holds the global sums in its first slot and every
    /// other rank is reset. On failure no rank is modified. Uncommitted
    /// contributions are discarded.
    pub fn reduce_data<C>(&mut self, comm: &C, root: usize) -> Result<()>
    where
        C: Communicator + ?Sized,
    {
        if root >= comm.size() {
            return Err(Error::InvalidRoot {
                root,
                size: comm.size(),
            });
        }

        let mut flat = self.collapsed().to_flat();
        comm.reduce_sum(&mut flat, root)?;

        self.reset_data();
        if comm.rank() == root {
            if let Some(slot) = self.slots.first_mut() {
                slot.load_flat(&flat);
            }
        }

        debug!(
            "Estimator {} reduced {} values onto rank {root}",
            self.config.id,
            flat.len()
        );
        Ok(())
    }
}

/// Configuration and slots used to validate deserialised estimators
#[derive(Serialize, Deserialize)]
struct EstimatorState {
    config: EstimatorConfig,
    slots: Vec<ThreadSlot>,
}

impl TryFrom<EstimatorState> for Estimator {
    type Error = Error;

    fn try_from(raw: EstimatorState) -> Result<Self> {
        let config = raw.config;
        let fail = |reason: &str| Err(Error::InconsistentState(reason.to_string()));

        if !(config.multiplier > 0.0 && config.multiplier.is_finite()) {
            return Err(Error::InvalidMultiplier(config.multiplier));
        }
        if let Some((id, value)) = config
            .entity_ids
            .iter()
            .zip(&config.norm_constants)
            .find(|(_, n)| !(**n > 0.0 && n.is_finite()))
        {
            return Err(Error::InvalidNormConstant {
                id: *id,
                value: *value,
            });
        }

        if !config.entity_ids.windows(2).all(|w| w[0] < w[1]) {
            return fail("entity ids are not sorted and unique");
        }
        if config.norm_constants.len() != config.entity_ids.len() {
            return fail("one norm constant is required per entity");
        }
        if config.responses.is_empty() {
            return fail("at least one response function is required");
        }
        if let Some(dimension) = config
            .discretization
            .discretized_dimensions()
            .into_iter()
            .find(|d| !config.kind.supports(*d))
        {
            return Err(Error::DimensionNotSupported {
                dimension,
                estimator: config.kind.to_string(),
            });
        }

        let layout = config.layout;
        if layout.entities != config.entity_ids.len()
            || layout.bins != config.discretization.total_number_of_bins()
            || layout.responses != config.responses.len()
        {
            return fail("moment layout does not match the configuration");
        }
        if raw.slots.is_empty() {
            return fail("at least one thread slot is required");
        }
        if !raw.slots.iter().all(|slot| slot.fits(&layout)) {
            return fail("thread slot sizes do not match the moment layout");
        }

        Ok(Self {
            config,
            slots: raw.slots,
        })
    }
}

impl From<Estimator> for EstimatorState {
    fn from(estimator: Estimator) -> Self {
        Self {
            config: estimator.config,
            slots: estimator.slots,
        }
    }
}

/// Scoring handle for a single thread
///
/// Holds the shared configuration and exclusive access to one thread slot.
#[derive(Debug)]
pub struct Worker<'a> {
    config: &'a EstimatorConfig,
    slot: &'a mut ThreadSlot,
    thread_id: usize,
}

impl Worker<'_> {
    /// Id of the thread slot this worker writes to
    pub fn thread_id(&self) -> usize {
        self.thread_id
    }

    pub fn is_particle_type_assigned(&self, particle: ParticleType) -> bool {
        self.config.particle_types.contains(&particle)
    }

    /// Stage a raw contribution for the current history
    ///
    /// The contribution is scaled by the multiplier policy and every
    /// response function. Points outside of the binned phase space are not
    /// scored.
    pub fn add_partial_history_contribution(
        &mut self,
        entity: EntityId,
        point: &PhaseSpacePoint,
        raw_contribution: f64,
    ) -> Result<()> {
        let index = self.config.entity_index(entity)?;
        if let Some(bin) = self.bin_index(point) {
            self.add_weighted(index, bin, point.state(), raw_contribution);
        }
        Ok(())
    }

    /// Stage an already weighted contribution in a specific bin and response
    ///
    /// Out of range bins or responses are not scored.
    pub fn add_partial_history_contribution_at(
        &mut self,
        entity: EntityId,
        bin: usize,
        response: usize,
        contribution: f64,
    ) -> Result<()> {
        let index = self.config.entity_index(entity)?;
        let layout = &self.config.layout;
        if bin < layout.bins && response < layout.responses {
            self.slot
                .add_uncommitted(index, bin * layout.responses + response, contribution);
        } else {
            trace!("Bin {bin} response {response} outside of estimator, not scored");
        }
        Ok(())
    }

    /// Phase-space bin of a point
    pub(crate) fn bin_index(&self, point: &PhaseSpacePoint) -> Option<usize> {
        self.config.discretization.calculate_bin_index(point)
    }

    /// Stage a raw contribution in a known bin
    pub(crate) fn add_to_bin(
        &mut self,
        entity: EntityId,
        bin: usize,
        state: &ParticleState,
        raw_contribution: f64,
    ) -> Result<()> {
        let index = self.config.entity_index(entity)?;
        self.add_weighted(index, bin, state, raw_contribution);
        Ok(())
    }

    fn add_weighted(&mut self, index: usize, bin: usize, state: &ParticleState, raw: f64) {
        let weighted = raw * self.config.policy.evaluate(state);
        let responses = &self.config.responses;
        for (r, response) in responses.iter().enumerate() {
            self.slot.add_uncommitted(
                index,
                bin * responses.len() + r,
                weighted * response.evaluate(state),
            );
        }
    }

    /// Fold the current history into the moments of this thread
    pub fn commit_history_contribution(&mut self) {
        self.slot.commit(&self.config.layout);
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.slot.has_uncommitted()
    }
}
