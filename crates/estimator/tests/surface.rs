//! Two surfaces, eight bins, one crossing per bin per surface

use ntally_estimator::*;
use rayon::prelude::*;
use rstest::{fixture, rstest};

const SURFACES: [(EntityId, f64); 2] = [(0, 1.0), (1, 2.0)];

/// Energy, cosine and time bins, two of each
fn bin(estimator: &mut Estimator, particle: ParticleType) {
    estimator.set_energy_discretization(vec![0.0, 0.1, 1.0]).unwrap();
    estimator.set_cosine_discretization(vec![-1.0, 0.0, 1.0]).unwrap();
    estimator.set_time_discretization(vec![0.0, 1.0, 2.0]).unwrap();
    estimator.set_particle_types(&[particle]);
}

#[fixture]
fn flux() -> SurfaceFluxEstimator {
    let mut estimator =
        SurfaceFluxEstimator::new(0, 10.0, MultiplierPolicy::WeightOnly, &SURFACES).unwrap();
    bin(estimator.estimator_mut(), ParticleType::Photon);
    estimator
}

#[fixture]
fn current() -> SurfaceCurrentEstimator {
    let mut estimator =
        SurfaceCurrentEstimator::new(1, 10.0, MultiplierPolicy::WeightOnly, &SURFACES).unwrap();
    bin(estimator.estimator_mut(), ParticleType::Photon);
    estimator
}

/// One (state, cosine) pair in each of the eight bins
fn crossings_in_every_bin(particle: ParticleType) -> Vec<(ParticleState, f64)> {
    let mut crossings = Vec::new();
    for time in [0.5, 1.5] {
        for cosine in [-0.5, 0.5] {
            for energy in [0.1, 1.0] {
                let state = ParticleState {
                    particle,
                    energy,
                    time,
                    ..Default::default()
                };
                crossings.push((state, cosine));
            }
        }
    }
    crossings
}

#[rstest]
fn flux_moments(mut flux: SurfaceFluxEstimator) {
    assert_eq!(flux.estimator().number_of_bins(), 8);

    for (state, cosine) in crossings_in_every_bin(ParticleType::Photon) {
        for (surface, _) in SURFACES {
            flux.update_from_particle_crossing_surface_event(&state, surface, cosine)
                .unwrap();
        }
    }
    flux.commit_history_contribution();

    let e = flux.estimator();
    for (surface, _) in SURFACES {
        assert_eq!(e.entity_bin_data_first_moments(surface).unwrap(), vec![2.0; 8]);
        assert_eq!(e.entity_bin_data_second_moments(surface).unwrap(), vec![4.0; 8]);
        assert_eq!(e.entity_total_data_first_moments(surface).unwrap(), vec![16.0]);
    }
    assert_eq!(e.total_bin_data_first_moments(), vec![4.0; 8]);
    assert_eq!(e.total_total_data_first_moments(), vec![32.0]);

    // area of surface 1 divides the mean
    let run = RunStatistics::new(1, 1.0);
    let data = e.entity_bin_processed_data(1, &run).unwrap();
    assert_eq!(data.mean, vec![10.0; 8]);
}

#[rstest]
fn current_moments(mut current: SurfaceCurrentEstimator) {
    for (state, cosine) in crossings_in_every_bin(ParticleType::Photon) {
        for (surface, _) in SURFACES {
            current
                .update_from_particle_crossing_surface_event(&state, surface, cosine)
                .unwrap();
        }
    }
    current.commit_history_contribution();

    let e = current.estimator();
    for (surface, _) in SURFACES {
        assert_eq!(e.entity_bin_data_first_moments(surface).unwrap(), vec![1.0; 8]);
        assert_eq!(e.entity_bin_data_second_moments(surface).unwrap(), vec![1.0; 8]);
    }
    assert_eq!(e.total_bin_data_first_moments(), vec![2.0; 8]);
    assert_eq!(e.total_bin_data_second_moments(), vec![4.0; 8]);
}

#[test]
fn charge_weighted_flux() {
    let mut flux =
        SurfaceFluxEstimator::new(2, 1.0, MultiplierPolicy::WeightTimesCharge, &SURFACES)
            .unwrap();
    bin(flux.estimator_mut(), ParticleType::Electron);

    for (state, cosine) in crossings_in_every_bin(ParticleType::Electron) {
        flux.update_from_particle_crossing_surface_event(&state, 0, cosine)
            .unwrap();
    }
    flux.commit_history_contribution();

    let e = flux.estimator();
    assert_eq!(e.entity_bin_data_first_moments(0).unwrap(), vec![-2.0; 8]);
    assert_eq!(e.entity_bin_data_second_moments(0).unwrap(), vec![4.0; 8]);
}

#[rstest]
fn flux_workers(mut flux: SurfaceFluxEstimator) {
    let threads = 4;
    flux.estimator_mut().enable_thread_support(threads);

    flux.workers().into_par_iter().for_each(|mut worker| {
        let state = ParticleState {
            particle: ParticleType::Photon,
            energy: 1.0,
            time: 0.5,
            ..Default::default()
        };
        // upper energy and cosine bins, lower time bin
        worker
            .update_from_particle_crossing_surface_event(&state, 0, 0.5)
            .unwrap();
        worker.commit_history_contribution();
    });

    let e = flux.estimator();
    let mut expected = vec![0.0; 8];
    expected[3] = 2.0 * threads as f64;
    assert_eq!(e.entity_bin_data_first_moments(0).unwrap(), expected);
}
