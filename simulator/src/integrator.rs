use twostream_common::{DepositionScheme, PushScheme};

use crate::{particles::ParticleSet, utils::grid::Grid};

/// Advances particles one step in the order
/// compute acceleration -> update velocity -> update position -> wrap.
///
/// `PushScheme::Euler` uses the same step's field for both updates.
/// `PushScheme::Leapfrog` pushes velocities back half a step before the first
/// update, after which the identical kick/drift sequence is second order and
/// velocities are reported at half steps.
#[derive(Debug, Clone)]
pub struct Integrator {
    scheme: PushScheme,
    dt: f64,
    staggered: bool,
}

impl Integrator {
    pub fn new(scheme: PushScheme, dt: f64) -> Self {
        Integrator {
            scheme,
            dt,
            staggered: false,
        }
    }

    pub fn push(
        &mut self,
        particles: &mut ParticleSet,
        field: &[f64],
        grid: &Grid,
        deposition: DepositionScheme,
    ) {
        if self.scheme == PushScheme::Leapfrog && !self.staggered {
            particles.kick(field, grid, -0.5 * self.dt, deposition);
            self.staggered = true;
        }
        particles.advance(field, grid, self.dt, deposition);
    }

    /// Forget the half-step offset, e.g. after particles were re-initialized
    pub fn reset(&mut self) {
        self.staggered = false;
    }
}

#[test]
fn test_euler_push() {
    let grid = Grid::new(10.0, 10).unwrap();
    let mut particles = ParticleSet::from_state(vec![1.5], vec![0.0], -1.0, 10.0).unwrap();
    let field = vec![2.0; 10];

    let mut integrator = Integrator::new(PushScheme::Euler, 0.5);
    integrator.push(&mut particles, &field, &grid, DepositionScheme::NearestGridPoint);

    // v = -1 * 2 * 0.5, x = 1.5 - 0.5
    assert_eq!(particles.velocities(), &[-1.0]);
    assert_eq!(particles.positions(), &[1.0]);
}

#[test]
fn test_leapfrog_staggers_first_step_only() {
    let grid = Grid::new(10.0, 10).unwrap();
    let mut particles = ParticleSet::from_state(vec![1.5], vec![0.0], -1.0, 10.0).unwrap();
    let field = vec![2.0; 10];

    let mut integrator = Integrator::new(PushScheme::Leapfrog, 0.5);
    integrator.push(&mut particles, &field, &grid, DepositionScheme::NearestGridPoint);

    // Back half a step (+0.5) then a full kick (-1.0): v(1/2) = -0.5
    assert_eq!(particles.velocities(), &[-0.5]);
    assert_eq!(particles.positions(), &[1.25]);

    integrator.push(&mut particles, &field, &grid, DepositionScheme::NearestGridPoint);
    assert_eq!(particles.velocities(), &[-1.5]);
    assert_eq!(particles.positions(), &[0.5]);

    integrator.reset();
    integrator.push(&mut particles, &field, &grid, DepositionScheme::NearestGridPoint);
    assert_eq!(particles.velocities(), &[-2.0]);
}
