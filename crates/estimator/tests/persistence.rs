//! Checkpointing estimators part way through a run

use ntally_estimator::*;
use ntally_geometry::StructuredHexMesh;
use rstest::{fixture, rstest};

use std::path::PathBuf;

#[fixture]
fn cell_estimator() -> CellCollisionFluxEstimator {
    let mut estimator = CellCollisionFluxEstimator::new(
        3,
        2.0,
        MultiplierPolicy::WeightOnly,
        &[(10, 1.0), (20, 4.0)],
    )
    .unwrap();

    let e = estimator.estimator_mut();
    e.set_energy_discretization(vec![0.0, 1.0, 10.0]).unwrap();
    e.set_collision_number_discretization(vec![0, 2]).unwrap();
    e.set_response_functions(vec![
        ResponseFunction::unity(),
        ResponseFunction::constant("half", 0.5).unwrap(),
    ]);
    e.set_particle_types(&[ParticleType::Neutron]);
    estimator
}

#[fixture]
fn mesh_estimator() -> MeshTrackLengthFluxEstimator {
    let planes = vec![0.0, 1.0, 2.0];
    let mesh = StructuredHexMesh::new(planes.clone(), planes.clone(), planes).unwrap();
    let mut estimator =
        MeshTrackLengthFluxEstimator::new(4, 1.0, MultiplierPolicy::WeightOnly, mesh).unwrap();
    estimator
        .estimator_mut()
        .set_particle_types(&[ParticleType::Photon]);
    estimator
}

fn neutron(energy: f64, collision_number: u32) -> ParticleState {
    ParticleState {
        energy,
        collision_number,
        ..Default::default()
    }
}

fn score_cells(estimator: &mut CellCollisionFluxEstimator, history: u32) {
    let energy = if history % 2 == 0 { 0.5 } else { 5.0 };
    for (cell, xs) in [(10, 0.5), (20, 2.0), (10, 0.25)] {
        estimator
            .update_from_particle_colliding_in_cell_event(&neutron(energy, history % 3), cell, xs)
            .unwrap();
    }
    estimator.commit_history_contribution();
}

fn score_mesh(estimator: &mut MeshTrackLengthFluxEstimator, x: f64) {
    let photon = ParticleState {
        particle: ParticleType::Photon,
        ..Default::default()
    };
    estimator
        .update_from_global_particle_subtrack_ending_event(&photon, [x, 0.5, 0.0], [x, 0.5, 2.0])
        .unwrap();
    estimator.commit_history_contribution();
}

fn scratch_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ntally_{}_{name}", std::process::id()))
}

#[rstest]
fn json_checkpoint_continues(mut cell_estimator: CellCollisionFluxEstimator) {
    let mut uninterrupted = cell_estimator.clone();
    for history in 0..4 {
        score_cells(&mut cell_estimator, history);
        score_cells(&mut uninterrupted, history);
    }

    let path = scratch_file("cells.json");
    io::save_json(&cell_estimator, &path).unwrap();
    let mut restored: CellCollisionFluxEstimator = io::load_json(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(restored, cell_estimator);

    // carrying on from the checkpoint matches never having stopped
    score_cells(&mut restored, 4);
    score_cells(&mut uninterrupted, 4);
    assert_eq!(restored, uninterrupted);

    let run = RunStatistics::new(5, 1.0);
    assert_eq!(
        restored.estimator().total_total_processed_data(&run),
        uninterrupted.estimator().total_total_processed_data(&run)
    );
}

#[rstest]
fn binary_checkpoint_continues(mut mesh_estimator: MeshTrackLengthFluxEstimator) {
    let mut uninterrupted = mesh_estimator.clone();
    for x in [0.5, 1.5, 0.25] {
        score_mesh(&mut mesh_estimator, x);
        score_mesh(&mut uninterrupted, x);
    }

    let path = scratch_file("mesh.bin");
    io::save_binary(&mesh_estimator, &path).unwrap();
    let mut restored: MeshTrackLengthFluxEstimator = io::load_binary(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(restored, mesh_estimator);
    assert_eq!(restored.mesh().number_of_elements(), 8);

    score_mesh(&mut restored, 0.75);
    score_mesh(&mut uninterrupted, 0.75);
    assert_eq!(restored, uninterrupted);
    assert_eq!(
        restored.estimator().entity_bin_data_first_moments(0).unwrap(),
        vec![3.0]
    );
}

#[rstest]
fn uncommitted_contributions_survive(mut cell_estimator: CellCollisionFluxEstimator) {
    cell_estimator
        .update_from_particle_colliding_in_cell_event(&neutron(0.5, 0), 10, 0.5)
        .unwrap();

    let bytes = bincode::serialize(&cell_estimator).unwrap();
    let mut restored: CellCollisionFluxEstimator = bincode::deserialize(&bytes).unwrap();
    assert!(restored.estimator().has_uncommitted_history_contribution());

    restored.commit_history_contribution();
    cell_estimator.commit_history_contribution();
    assert_eq!(restored, cell_estimator);
}

#[rstest]
fn configuration_round_trips(cell_estimator: CellCollisionFluxEstimator) {
    let text = serde_json::to_string(&cell_estimator).unwrap();
    let restored: CellCollisionFluxEstimator = serde_json::from_str(&text).unwrap();

    let e = restored.estimator();
    assert_eq!(e.id(), 3);
    assert_eq!(e.entity_ids(), &[10, 20]);
    assert_eq!(e.entity_norm_constant(20).unwrap(), 4.0);
    assert_eq!(e.number_of_bins(), 4);
    assert_eq!(e.number_of_responses(), 2);
    assert_eq!(e.response_functions()[1].name(), "half");
    assert!(e.is_particle_type_assigned(ParticleType::Neutron));
    assert_eq!(e.bin_name(3), cell_estimator.estimator().bin_name(3));
}

#[rstest]
fn malformed_checkpoints_are_rejected(cell_estimator: CellCollisionFluxEstimator) {
    let mut value = serde_json::to_value(&cell_estimator).unwrap();
    let config = &mut value["estimator"]["config"];

    // energy table with fewer values than energies
    config["responses"][1] = serde_json::json!({
        "name": "broken",
        "kind": { "EnergyTable": { "energies": [1.0, 2.0], "values": [1.0] } }
    });
    assert!(serde_json::from_value::<CellCollisionFluxEstimator>(value.clone()).is_err());

    // moments sized for a different bin structure
    let mut value = serde_json::to_value(&cell_estimator).unwrap();
    value["estimator"]["config"]["discretization"][0][1]["Continuous"] =
        serde_json::json!([0.0, 1.0, 5.0, 10.0]);
    assert!(serde_json::from_value::<CellCollisionFluxEstimator>(value).is_err());
}

#[test]
fn surface_checkpoint_keeps_cutoff() {
    let mut flux =
        SurfaceFluxEstimator::new(5, 1.0, MultiplierPolicy::WeightOnly, &[(1, 1.0)]).unwrap();
    let e = flux.estimator_mut();
    e.set_cosine_discretization(vec![-1.0, 0.0, 1.0]).unwrap();
    e.set_particle_types(&[ParticleType::Neutron]);
    flux.set_cosine_cutoff(0.5).unwrap();

    let state = ParticleState::default();
    flux.update_from_particle_crossing_surface_event(&state, 1, -1.0)
        .unwrap();
    flux.commit_history_contribution();

    let path = scratch_file("surface.bin");
    io::save_binary(&flux, &path).unwrap();
    let mut restored: SurfaceFluxEstimator = io::load_binary(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(restored.cosine_cutoff(), 0.5);

    // grazing at the restored cutoff scores 1 / 0.25
    restored
        .update_from_particle_crossing_surface_event(&state, 1, 0.1)
        .unwrap();
    restored.commit_history_contribution();
    assert_eq!(
        restored.estimator().entity_bin_data_first_moments(1).unwrap(),
        vec![1.0, 4.0]
    );
}
