use rand::{rngs::StdRng, SeedableRng};
use twostream_common::InitialConditions;

use crate::{
    particles::ParticleSet, simulation_object::SimulationParameters,
    utils::error::ParameterError,
};

/// Samples the initial particle state described by `parameters.ics`.
/// The same seed always produces the same particles.
pub fn particles_from_ics(parameters: &SimulationParameters) -> Result<ParticleSet, ParameterError> {
    let mut rng = StdRng::seed_from_u64(parameters.seed);

    match parameters.ics {
        InitialConditions::TwoStream {
            stream_velocity,
            velocity_spread,
        } => ParticleSet::initialize(
            parameters.num_particles,
            parameters.axis_length,
            stream_velocity,
            velocity_spread,
            parameters.charge,
            &mut rng,
        ),
        InitialConditions::QuietTwoStream {
            stream_velocity,
            velocity_spread,
            amplitude,
            mode,
        } => ParticleSet::quiet_start(
            parameters.num_particles,
            parameters.axis_length,
            stream_velocity,
            velocity_spread,
            amplitude,
            mode,
            parameters.charge,
            &mut rng,
        ),
    }
}

#[test]
fn test_same_seed_same_particles() {
    let parameters = SimulationParameters::new(100.0, 500, 100, 0.1, 10, -1.0, 17, "seeded");
    let first = particles_from_ics(&parameters).unwrap();
    let second = particles_from_ics(&parameters).unwrap();
    assert_eq!(first, second);

    let other = SimulationParameters::new(100.0, 500, 100, 0.1, 10, -1.0, 18, "seeded");
    assert_ne!(first, particles_from_ics(&other).unwrap());
}

#[test]
fn test_quiet_ics() {
    let mut parameters = SimulationParameters::new(10.0, 10, 10, 0.1, 10, -1.0, 0, "quiet");
    parameters.ics = InitialConditions::QuietTwoStream {
        stream_velocity: 2.0,
        velocity_spread: 0.0,
        amplitude: 0.0,
        mode: 1,
    };
    let particles = particles_from_ics(&parameters).unwrap();
    assert_eq!(particles.positions()[..5], [1.0, 3.0, 5.0, 7.0, 9.0]);
    assert!(particles.velocities()[5..].iter().all(|&v| v == -2.0));
}
