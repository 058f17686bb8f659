use approx::assert_abs_diff_eq;
use twostream_common::{
    DepositionScheme, FieldOrdering, GradientScheme, InitialConditions, PushScheme,
};
use twostream_simulator::{
    utils::{
        fft::SpectralSolver,
        grid::{deposit, integrate, Grid},
    },
    ParticleSet, RuntimeError, SimulationObject, SimulationParameters,
};

/// The reference run: L = 100, N = 1000, unit cells, dt = 0.1, 100 steps
fn reference_parameters(seed: u64) -> SimulationParameters {
    SimulationParameters::new(100.0, 1000, 100, 0.1, 100, -1.0, seed, "reference")
}

fn field_for(particles: &ParticleSet, grid: &Grid, scheme: DepositionScheme) -> Vec<f64> {
    let rho: Vec<f64> = deposit(particles, grid, scheme)
        .iter()
        .map(|n| n * particles.charge())
        .collect();
    SpectralSolver::new(grid, GradientScheme::Centered)
        .solve(&rho)
        .field
}

#[test]
fn test_charge_conservation_every_step() {
    for deposition in [DepositionScheme::NearestGridPoint, DepositionScheme::CloudInCell] {
        let mut params = reference_parameters(1);
        params.deposition = deposition;
        params.total_steps = 25;
        let mut simulation_object = SimulationObject::new(params).unwrap();

        while simulation_object.not_finished() {
            simulation_object.advance().unwrap();
            let fields = simulation_object.fields();
            let total = integrate(&fields.density, simulation_object.grid());
            assert_abs_diff_eq!(total, 1000.0, epsilon = 1e-8);
        }
    }
}

#[test]
fn test_positions_stay_in_domain() {
    let mut simulation_object = SimulationObject::new(reference_parameters(2)).unwrap();

    while simulation_object.not_finished() {
        let particles = simulation_object.advance().unwrap();
        assert!(particles
            .positions()
            .iter()
            .all(|&x| (0.0..100.0).contains(&x)));
    }
    assert_eq!(simulation_object.step_index(), 100);
}

#[test]
fn test_potential_zero_mean_from_particles() {
    let mut simulation_object = SimulationObject::new(reference_parameters(3)).unwrap();
    for _ in 0..5 {
        simulation_object.advance().unwrap();
        let fields = simulation_object.fields();
        let mean = fields.potential.iter().sum::<f64>() / fields.potential.len() as f64;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
    }
}

#[test]
fn test_resting_neutral_particles_do_not_move() {
    let particles = ParticleSet::from_state(vec![10.0, 60.0], vec![0.0, 0.0], 0.0, 100.0).unwrap();
    let params = SimulationParameters::new(100.0, 2, 100, 0.1, 50, 0.0, 0, "symmetry");
    let mut simulation_object = SimulationObject::from_particles(params, particles).unwrap();

    while simulation_object.not_finished() {
        simulation_object.advance().unwrap();
    }
    assert_eq!(simulation_object.particles().positions(), &[10.0, 60.0]);
    assert_eq!(simulation_object.particles().velocities(), &[0.0, 0.0]);
}

#[test]
fn test_two_stream_split_survives_one_step() {
    let mut params = SimulationParameters::new(100.0, 100, 100, 1e-3, 10, -1.0, 4, "split");
    params.ics = InitialConditions::TwoStream {
        stream_velocity: 1.0,
        velocity_spread: 0.0,
    };
    let mut simulation_object = SimulationObject::new(params).unwrap();

    let velocities = simulation_object.particles().velocities();
    assert!(velocities[..50].iter().all(|&v| v == 1.0));
    assert!(velocities[50..].iter().all(|&v| v == -1.0));

    let particles = simulation_object.advance().unwrap();
    for &v in &particles.velocities()[..50] {
        assert_abs_diff_eq!(v, 1.0, epsilon = 0.05);
    }
    for &v in &particles.velocities()[50..] {
        assert_abs_diff_eq!(v, -1.0, epsilon = 0.05);
    }
}

#[test]
fn test_same_seed_is_deterministic() {
    let mut first = SimulationObject::new(reference_parameters(42)).unwrap();
    let mut second = SimulationObject::new(reference_parameters(42)).unwrap();

    while first.not_finished() {
        first.advance().unwrap();
        second.advance().unwrap();
    }
    assert_eq!(first.particles(), second.particles());
    assert_eq!(first.diagnostics(), second.diagnostics());
}

#[test]
fn test_boundary_wrap() {
    let particles = ParticleSet::from_state(vec![100.0 - 0.05], vec![1.0], -1.0, 100.0).unwrap();
    let params = SimulationParameters::new(100.0, 1, 100, 0.1, 1, -1.0, 0, "wrap");
    let mut simulation_object = SimulationObject::from_particles(params, particles).unwrap();

    let particles = simulation_object.advance().unwrap();
    assert_abs_diff_eq!(particles.positions()[0], 0.05, epsilon = 1e-9);
    assert!(simulation_object.is_finished());
}

#[test]
fn test_consistent_ordering_uses_current_density() {
    let grid = Grid::new(16.0, 16).unwrap();
    let initial = ParticleSet::from_state(
        vec![1.2, 1.7, 2.2, 5.5, 9.1, 12.4],
        vec![0.3, -0.2, 0.1, 0.0, -0.4, 0.25],
        -1.0,
        16.0,
    )
    .unwrap();

    let params = SimulationParameters::new(16.0, 6, 16, 0.2, 2, -1.0, 0, "consistent");
    let mut simulation_object = SimulationObject::from_particles(params, initial.clone()).unwrap();
    simulation_object.advance().unwrap();

    let mut expected = initial.clone();
    let field = field_for(&initial, &grid, DepositionScheme::NearestGridPoint);
    expected.advance(&field, &grid, 0.2, DepositionScheme::NearestGridPoint);

    assert_eq!(simulation_object.particles(), &expected);
}

#[test]
fn test_lagged_ordering_uses_previous_potential() {
    let grid = Grid::new(16.0, 16).unwrap();
    let initial = ParticleSet::from_state(
        vec![1.2, 1.7, 2.2, 5.5, 9.1, 12.4],
        vec![0.3, -0.2, 0.1, 0.0, -0.4, 0.25],
        -1.0,
        16.0,
    )
    .unwrap();

    let mut params = SimulationParameters::new(16.0, 6, 16, 0.2, 2, -1.0, 0, "lagged");
    params.field_ordering = FieldOrdering::Lagged;
    let mut simulation_object = SimulationObject::from_particles(params, initial.clone()).unwrap();

    // First step: no previous potential, so no force
    simulation_object.advance().unwrap();
    let mut expected = initial.clone();
    expected.drift(0.2);
    assert_eq!(simulation_object.particles(), &expected);

    // Second step: field from the density of the first step
    simulation_object.advance().unwrap();
    let field = field_for(&initial, &grid, DepositionScheme::NearestGridPoint);
    expected.advance(&field, &grid, 0.2, DepositionScheme::NearestGridPoint);
    assert_eq!(simulation_object.particles(), &expected);
}

#[test]
fn test_reset_restores_initial_state() {
    let mut params = reference_parameters(9);
    params.pusher = PushScheme::Leapfrog;
    params.field_ordering = FieldOrdering::Lagged;
    let mut simulation_object = SimulationObject::new(params).unwrap();
    let initial = simulation_object.particles().clone();

    for _ in 0..10 {
        simulation_object.advance().unwrap();
    }
    let after_ten = simulation_object.particles().clone();

    simulation_object.reset();
    assert_eq!(simulation_object.step_index(), 0);
    assert_eq!(simulation_object.particles(), &initial);
    assert!(simulation_object.diagnostics().is_none());

    for _ in 0..10 {
        simulation_object.advance().unwrap();
    }
    assert_eq!(simulation_object.particles(), &after_ten);
}

#[test]
fn test_advance_after_finish_errors() {
    let mut params = reference_parameters(5);
    params.total_steps = 3;
    let mut simulation_object = SimulationObject::new(params).unwrap();

    for _ in 0..3 {
        simulation_object.advance().unwrap();
    }
    assert!(simulation_object.is_finished());
    assert!(!simulation_object.not_finished());
    assert!(matches!(
        simulation_object.advance(),
        Err(RuntimeError::Finished { total_steps: 3 })
    ));
    assert_eq!(simulation_object.step_index(), 3);
}

#[test]
fn test_numeric_instability_halts() {
    let particles =
        ParticleSet::from_state(vec![0.5, 0.6], vec![0.0, 0.0], f64::MAX, 4.0).unwrap();
    let params = SimulationParameters::new(4.0, 2, 4, 1.0, 10, f64::MAX, 0, "blowup");
    let mut simulation_object = SimulationObject::from_particles(params, particles).unwrap();

    assert!(matches!(
        simulation_object.advance(),
        Err(RuntimeError::NanOrInf { step: 1 })
    ));
    assert!(simulation_object.is_halted());
    assert!(!simulation_object.not_finished());
    assert!(matches!(simulation_object.advance(), Err(RuntimeError::Halted)));
}

#[test]
fn test_advance_to_frame() {
    let mut simulation_object = SimulationObject::new(reference_parameters(6)).unwrap();

    simulation_object.advance_to_frame(5).unwrap();
    assert_eq!(simulation_object.step_index(), 5);

    // Earlier frames never rewind
    simulation_object.advance_to_frame(2).unwrap();
    assert_eq!(simulation_object.step_index(), 5);

    let particles = simulation_object.advance_to_frame(10_000).unwrap();
    assert_eq!(particles.len(), 1000);
    assert!(simulation_object.is_finished());

    let points: Vec<(f64, f64)> = simulation_object.plot_points().collect();
    assert_eq!(points.len(), 1000);
    assert!(points.iter().all(|&(_, y)| y == 0.0));
}

#[test]
fn test_all_scheme_combinations_stay_bounded() {
    for deposition in [DepositionScheme::NearestGridPoint, DepositionScheme::CloudInCell] {
        for pusher in [PushScheme::Euler, PushScheme::Leapfrog] {
            for gradient in [GradientScheme::Centered, GradientScheme::Spectral] {
                let mut params = reference_parameters(11);
                params.num_cells = 128;
                params.total_steps = 30;
                params.deposition = deposition;
                params.pusher = pusher;
                params.gradient = gradient;

                let mut simulation_object = SimulationObject::new(params).unwrap();
                while simulation_object.not_finished() {
                    simulation_object.advance().unwrap();
                }
                let particles = simulation_object.particles();
                assert!(particles.is_finite());
                assert!(particles.positions().iter().all(|&x| (0.0..100.0).contains(&x)));
            }
        }
    }
}

#[test]
fn test_seeded_mode_grows() {
    let mut params = reference_parameters(0);
    params.ics = InitialConditions::QuietTwoStream {
        stream_velocity: 1.0,
        velocity_spread: 0.0,
        amplitude: 1e-3,
        mode: 10,
    };
    params.deposition = DepositionScheme::CloudInCell;
    let mut simulation_object = SimulationObject::new(params).unwrap();

    simulation_object.advance().unwrap();
    let initial_field_energy = simulation_object.diagnostics().unwrap().field_energy;
    assert!(initial_field_energy > 0.0);

    let mut max_field_energy = initial_field_energy;
    while simulation_object.not_finished() {
        simulation_object.advance().unwrap();
        max_field_energy = max_field_energy.max(simulation_object.diagnostics().unwrap().field_energy);
    }
    assert!(max_field_energy > 100.0 * initial_field_energy);
}

#[test]
fn test_lagged_dump_writes_applied_field() {
    use ndarray::Array1;
    use ndarray_npy::read_npy;
    use twostream_simulator::utils::io::dump_path;

    let mut params = reference_parameters(12);
    params.total_steps = 2;
    params.field_ordering = FieldOrdering::Lagged;
    params.num_data_dumps = 2;
    params.output_dir = std::env::temp_dir().join(format!("twostream-lagged-{}", std::process::id()));
    let sim_dir = params.sim_dir();
    let mut simulation_object = SimulationObject::new(params).unwrap();

    // No potential before the first step, so the first push feels no field
    simulation_object.update(false).unwrap();
    let dumped: Array1<f64> = read_npy(dump_path(&sim_dir, "field", 1)).unwrap();
    assert!(dumped.iter().all(|&e| e == 0.0));
    assert_eq!(simulation_object.diagnostics().unwrap().field_energy, 0.0);
    assert!(simulation_object.fields().field.iter().any(|&e| e != 0.0));

    let density: Array1<f64> = read_npy(dump_path(&sim_dir, "density", 1)).unwrap();
    assert_eq!(density.to_vec(), simulation_object.fields().density);

    std::fs::remove_dir_all(simulation_object.parameters.output_dir.clone()).unwrap();
}
