use std::fmt::Display;

use crate::{particles::ParticleSet, utils::grid::Grid};

/// Global quantities after a step. Unit particle mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub step: usize,
    /// ½ Σ v²
    pub kinetic_energy: f64,
    /// ½ ∫ E² dx
    pub field_energy: f64,
    pub total_energy: f64,
    /// Σ v
    pub momentum: f64,
}

impl Diagnostics {
    pub fn compute(step: usize, particles: &ParticleSet, field: &[f64], grid: &Grid) -> Self {
        let kinetic_energy = 0.5 * particles.velocities().iter().map(|v| v * v).sum::<f64>();
        let field_energy = 0.5 * field.iter().map(|e| e * e).sum::<f64>() * grid.dx();
        let momentum = particles.velocities().iter().sum();

        Diagnostics {
            step,
            kinetic_energy,
            field_energy,
            total_energy: kinetic_energy + field_energy,
            momentum,
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "step {:>6}: KE = {:.6e}, FE = {:.6e}, E = {:.6e}, P = {:.6e}",
            self.step, self.kinetic_energy, self.field_energy, self.total_energy, self.momentum
        )
    }
}

#[test]
fn test_diagnostics() {
    let grid = Grid::new(4.0, 4).unwrap();
    let particles = ParticleSet::from_state(vec![0.5, 1.5], vec![1.0, -3.0], -1.0, 4.0).unwrap();
    let diagnostics = Diagnostics::compute(3, &particles, &[1.0, 0.0, -1.0, 2.0], &grid);

    assert_eq!(diagnostics.step, 3);
    assert_eq!(diagnostics.kinetic_energy, 5.0);
    assert_eq!(diagnostics.field_energy, 3.0);
    assert_eq!(diagnostics.total_energy, 8.0);
    assert_eq!(diagnostics.momentum, -2.0);
}
