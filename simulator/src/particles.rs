use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use twostream_common::DepositionScheme;

use crate::utils::{
    error::ParameterError,
    grid::{check_for_nans, gather, Grid},
};

/// Positions and velocities of every particle, stored as two parallel arrays.
/// All particles share one charge (unit mass).
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleSet {
    positions: Vec<f64>,
    velocities: Vec<f64>,
    charge: f64,
    axis_length: f64,
}

/// Sizes of the (+v0, -v0) beams. For odd `num_particles` the +v0 beam gets
/// the extra particle: `(ceil(N/2), floor(N/2))`.
pub fn stream_split(num_particles: usize) -> (usize, usize) {
    let second = num_particles / 2;
    (num_particles - second, second)
}

/// Periodic wrap into `[0, length)`. `rem_euclid` can round up to `length`
/// for tiny negative inputs, which is mapped back to 0.
pub fn wrap(position: f64, length: f64) -> f64 {
    let wrapped = position.rem_euclid(length);
    if wrapped >= length {
        0.0
    } else {
        wrapped
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::NonFinite { name, value })
    }
}

fn check_common(
    num_particles: usize,
    axis_length: f64,
    velocity_spread: f64,
    charge: f64,
) -> Result<(), ParameterError> {
    if num_particles == 0 {
        return Err(ParameterError::NoParticles);
    }
    if !(axis_length.is_finite() && axis_length > 0.0) {
        return Err(ParameterError::InvalidAxisLength { axis_length });
    }
    if !(velocity_spread.is_finite() && velocity_spread >= 0.0) {
        return Err(ParameterError::InvalidVelocitySpread {
            sigma: velocity_spread,
        });
    }
    check_finite("charge", charge)
}

/// Samples `count` velocities around `mean`
fn sample_beam<R: Rng + ?Sized>(
    count: usize,
    mean: f64,
    spread: f64,
    rng: &mut R,
) -> Result<Vec<f64>, ParameterError> {
    let normal = Normal::new(mean, spread)
        .map_err(|_| ParameterError::InvalidVelocitySpread { sigma: spread })?;
    Ok((0..count).map(|_| normal.sample(rng)).collect())
}

impl ParticleSet {
    /// Two counter-streaming beams with uniformly random positions in
    /// `[0, axis_length)`. The first `ceil(N/2)` particles stream at
    /// `+stream_velocity`, the remaining `floor(N/2)` at `-stream_velocity`,
    /// both with gaussian spread `velocity_spread`.
    pub fn initialize<R: Rng + ?Sized>(
        num_particles: usize,
        axis_length: f64,
        stream_velocity: f64,
        velocity_spread: f64,
        charge: f64,
        rng: &mut R,
    ) -> Result<Self, ParameterError> {
        check_common(num_particles, axis_length, velocity_spread, charge)?;
        check_finite("stream velocity", stream_velocity)?;

        let uniform = Uniform::new(0.0, axis_length);
        let positions: Vec<f64> = (0..num_particles).map(|_| uniform.sample(rng)).collect();

        let (first, second) = stream_split(num_particles);
        let mut velocities = sample_beam(first, stream_velocity, velocity_spread, rng)?;
        velocities.extend(sample_beam(second, -stream_velocity, velocity_spread, rng)?);

        let mut particles = ParticleSet {
            positions,
            velocities,
            charge,
            axis_length,
        };
        particles.wrap_positions();
        Ok(particles)
    }

    /// Quiet start: each beam evenly spaced over the domain, then displaced by
    /// `amplitude * sin(2π mode x / L)`. Same beam ordering as [`initialize`].
    ///
    /// [`initialize`]: ParticleSet::initialize
    #[allow(clippy::too_many_arguments)]
    pub fn quiet_start<R: Rng + ?Sized>(
        num_particles: usize,
        axis_length: f64,
        stream_velocity: f64,
        velocity_spread: f64,
        amplitude: f64,
        mode: usize,
        charge: f64,
        rng: &mut R,
    ) -> Result<Self, ParameterError> {
        check_common(num_particles, axis_length, velocity_spread, charge)?;
        check_finite("stream velocity", stream_velocity)?;
        check_finite("amplitude", amplitude)?;
        if mode == 0 {
            return Err(ParameterError::InvalidMode);
        }

        let k = 2.0 * std::f64::consts::PI * mode as f64 / axis_length;
        let (first, second) = stream_split(num_particles);
        let beam = |count: usize| {
            let spacing = axis_length / count as f64;
            (0..count).map(move |i| {
                let x = (i as f64 + 0.5) * spacing;
                x + amplitude * (k * x).sin()
            })
        };
        let positions: Vec<f64> = beam(first).chain(beam(second)).collect();

        let mut velocities = sample_beam(first, stream_velocity, velocity_spread, rng)?;
        velocities.extend(sample_beam(second, -stream_velocity, velocity_spread, rng)?);

        let mut particles = ParticleSet {
            positions,
            velocities,
            charge,
            axis_length,
        };
        particles.wrap_positions();
        Ok(particles)
    }

    /// Particles from explicit state. Positions are wrapped on entry.
    pub fn from_state(
        positions: Vec<f64>,
        velocities: Vec<f64>,
        charge: f64,
        axis_length: f64,
    ) -> Result<Self, ParameterError> {
        if positions.len() != velocities.len() {
            return Err(ParameterError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        check_common(positions.len(), axis_length, 0.0, charge)?;
        if let Some(&x) = positions.iter().find(|x| !x.is_finite()) {
            return Err(ParameterError::NonFinite {
                name: "position",
                value: x,
            });
        }
        if let Some(&v) = velocities.iter().find(|v| !v.is_finite()) {
            return Err(ParameterError::NonFinite {
                name: "velocity",
                value: v,
            });
        }

        let mut particles = ParticleSet {
            positions,
            velocities,
            charge,
            axis_length,
        };
        particles.wrap_positions();
        Ok(particles)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn axis_length(&self) -> f64 {
        self.axis_length
    }

    /// Applies `x <- x mod L` to every particle
    pub fn wrap_positions(&mut self) {
        let length = self.axis_length;
        for x in self.positions.iter_mut() {
            *x = wrap(*x, length);
        }
    }

    /// Velocity update only: `v += q E(x) dt`
    pub fn kick(&mut self, field: &[f64], grid: &Grid, dt: f64, scheme: DepositionScheme) {
        let charge = self.charge;
        for (v, &x) in self.velocities.iter_mut().zip(&self.positions) {
            *v += charge * gather(field, x, grid, scheme) * dt;
        }
    }

    /// Position update only: `x += v dt`, then wrap
    pub fn drift(&mut self, dt: f64) {
        for (x, &v) in self.positions.iter_mut().zip(&self.velocities) {
            *x += v * dt;
        }
        self.wrap_positions();
    }

    /// One explicit step: gather the field at each particle, update the
    /// velocity, move with the new velocity, wrap.
    pub fn advance(&mut self, field: &[f64], grid: &Grid, dt: f64, scheme: DepositionScheme) {
        self.kick(field, grid, dt, scheme);
        self.drift(dt);
    }

    pub fn is_finite(&self) -> bool {
        check_for_nans(&self.positions) && check_for_nans(&self.velocities)
    }
}

#[test]
fn test_stream_split() {
    assert_eq!(stream_split(100), (50, 50));
    assert_eq!(stream_split(101), (51, 50));
    assert_eq!(stream_split(1), (1, 0));
}

#[test]
fn test_wrap() {
    assert_eq!(wrap(5.0, 10.0), 5.0);
    assert!((wrap(10.5, 10.0) - 0.5).abs() < 1e-12);
    assert!((wrap(-0.5, 10.0) - 9.5).abs() < 1e-12);
    assert_eq!(wrap(10.0, 10.0), 0.0);
    // rem_euclid rounds this up to exactly 10.0
    let wrapped = wrap(-1e-17, 10.0);
    assert!((0.0..10.0).contains(&wrapped));
}

#[test]
fn test_initialize_two_cold_beams() {
    use rand::{rngs::StdRng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let particles = ParticleSet::initialize(101, 100.0, 1.0, 0.0, -1.0, &mut rng).unwrap();

    assert_eq!(particles.len(), 101);
    assert!(particles.positions().iter().all(|&x| (0.0..100.0).contains(&x)));
    assert!(particles.velocities()[..51].iter().all(|&v| v == 1.0));
    assert!(particles.velocities()[51..].iter().all(|&v| v == -1.0));
}

#[test]
fn test_initialize_rejects_bad_parameters() {
    use rand::{rngs::StdRng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(
        ParticleSet::initialize(0, 100.0, 1.0, 0.1, -1.0, &mut rng),
        Err(ParameterError::NoParticles)
    );
    assert!(matches!(
        ParticleSet::initialize(10, 100.0, 1.0, -0.1, -1.0, &mut rng),
        Err(ParameterError::InvalidVelocitySpread { .. })
    ));
    assert!(matches!(
        ParticleSet::initialize(10, 0.0, 1.0, 0.1, -1.0, &mut rng),
        Err(ParameterError::InvalidAxisLength { .. })
    ));
    assert!(matches!(
        ParticleSet::initialize(10, 100.0, f64::NAN, 0.1, -1.0, &mut rng),
        Err(ParameterError::NonFinite { .. })
    ));
}

#[test]
fn test_quiet_start_is_evenly_spaced() {
    use rand::{rngs::StdRng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(0);
    let particles =
        ParticleSet::quiet_start(8, 8.0, 1.0, 0.0, 0.0, 1, -1.0, &mut rng).unwrap();
    assert_eq!(
        particles.positions(),
        &[1.0, 3.0, 5.0, 7.0, 1.0, 3.0, 5.0, 7.0]
    );
    assert_eq!(particles.velocities(), &[1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0]);

    assert_eq!(
        ParticleSet::quiet_start(8, 8.0, 1.0, 0.0, 0.1, 0, -1.0, &mut rng),
        Err(ParameterError::InvalidMode)
    );
}

#[test]
fn test_from_state_validates_and_wraps() {
    let particles = ParticleSet::from_state(vec![-1.0, 12.0], vec![0.0, 0.0], 1.0, 10.0).unwrap();
    assert_eq!(particles.positions(), &[9.0, 2.0]);

    assert_eq!(
        ParticleSet::from_state(vec![1.0], vec![], 1.0, 10.0),
        Err(ParameterError::LengthMismatch {
            positions: 1,
            velocities: 0
        })
    );
    assert!(ParticleSet::from_state(vec![f64::NAN], vec![0.0], 1.0, 10.0).is_err());
    assert!(ParticleSet::from_state(vec![], vec![], 1.0, 10.0).is_err());
}

#[test]
fn test_advance_updates_velocity_before_position() {
    let grid = Grid::new(10.0, 10).unwrap();
    let mut particles = ParticleSet::from_state(vec![2.5], vec![1.0], 2.0, 10.0).unwrap();
    let field = vec![0.5; 10];

    particles.advance(&field, &grid, 0.1, DepositionScheme::NearestGridPoint);

    // v = 1 + 2 * 0.5 * 0.1 = 1.1, x = 2.5 + 1.1 * 0.1
    assert!((particles.velocities()[0] - 1.1).abs() < 1e-12);
    assert!((particles.positions()[0] - 2.61).abs() < 1e-12);
}
