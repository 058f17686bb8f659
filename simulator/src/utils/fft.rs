use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;
use twostream_common::{GradientScheme, EPSILON_0};

use super::grid::Grid;

/// Angular wavenumbers in standard DFT ordering: non-negative modes first,
/// then the negative ones. For even `num_cells` the Nyquist mode is negative.
pub fn get_kgrid(num_cells: usize, dx: f64) -> Vec<f64> {
    let length = num_cells as f64 * dx;
    let dk = 2.0 * std::f64::consts::PI / length;

    (0..num_cells as i64)
        .map(|i| {
            if i < (num_cells as i64 + 1) / 2 {
                i as f64 * dk
            } else {
                (i - num_cells as i64) as f64 * dk
            }
        })
        .collect()
}

/// 1/k^2 with the zero mode set to zero
pub fn inv_spec_grid(kgrid: &[f64]) -> Vec<f64> {
    kgrid
        .iter()
        .map(|&k| if k == 0.0 { 0.0 } else { 1.0 / (k * k) })
        .collect()
}

/// `E = -dφ/dx` by centered difference with periodic neighbours
pub fn centered_gradient(potential: &[f64], dx: f64) -> Vec<f64> {
    let n = potential.len();
    (0..n)
        .map(|i| {
            let right = potential[(i + 1) % n];
            let left = potential[(i + n - 1) % n];
            -(right - left) / (2.0 * dx)
        })
        .collect()
}

/// Potential and electric field on the grid for one step
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSolution {
    pub potential: Vec<f64>,
    pub field: Vec<f64>,
}

/// Periodic Poisson solver `d²φ/dx² = -ρ/ε₀`.
///
/// Forward transforms are unnormalized and inverse transforms carry the
/// `1/M` factor, so a forward/inverse pair is the identity. The zero mode of
/// the potential is held at zero.
pub struct SpectralSolver {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    kgrid: Vec<f64>,
    inv_k2: Vec<f64>,
    dx: f64,
    gradient: GradientScheme,
    buffer: Vec<Complex<f64>>,
}

impl SpectralSolver {
    pub fn new(grid: &Grid, gradient: GradientScheme) -> Self {
        let num_cells = grid.num_cells();
        let mut planner = FftPlanner::new();
        let kgrid = get_kgrid(num_cells, grid.dx());
        let inv_k2 = inv_spec_grid(&kgrid);

        SpectralSolver {
            forward: planner.plan_fft_forward(num_cells),
            inverse: planner.plan_fft_inverse(num_cells),
            kgrid,
            inv_k2,
            dx: grid.dx(),
            gradient,
            buffer: vec![Complex::new(0.0, 0.0); num_cells],
        }
    }

    pub fn num_cells(&self) -> usize {
        self.kgrid.len()
    }

    /// Potential and field from the charge density
    pub fn solve(&mut self, rho: &[f64]) -> FieldSolution {
        let potential = self.potential(rho);
        let field = self.field_from_potential(&potential);
        FieldSolution { potential, field }
    }

    /// Solves for the potential only
    pub fn potential(&mut self, rho: &[f64]) -> Vec<f64> {
        self.load(rho);
        self.forward.process(&mut self.buffer);

        for (value, &inv_k2) in self.buffer.iter_mut().zip(&self.inv_k2) {
            *value = *value * (inv_k2 / EPSILON_0);
        }

        self.inverse.process(&mut self.buffer);
        let potential = self.unload();
        log::trace!(
            "spectral solve: max |φ| = {:.5e}",
            potential.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
        );
        potential
    }

    /// `E = -dφ/dx` using the configured gradient scheme
    pub fn field_from_potential(&mut self, potential: &[f64]) -> Vec<f64> {
        match self.gradient {
            GradientScheme::Centered => centered_gradient(potential, self.dx),
            GradientScheme::Spectral => {
                let num_cells = self.num_cells();
                self.load(potential);
                self.forward.process(&mut self.buffer);

                for (i, (value, &k)) in self.buffer.iter_mut().zip(&self.kgrid).enumerate() {
                    // The Nyquist mode has no odd part to differentiate
                    if num_cells % 2 == 0 && i == num_cells / 2 {
                        *value = Complex::new(0.0, 0.0);
                    } else {
                        *value = *value * Complex::new(0.0, -k);
                    }
                }

                self.inverse.process(&mut self.buffer);
                self.unload()
            }
        }
    }

    fn load(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.buffer.len());
        for (slot, &x) in self.buffer.iter_mut().zip(values) {
            *slot = Complex::new(x, 0.0);
        }
    }

    /// Real part of the buffer, normalized by 1/M
    fn unload(&self) -> Vec<f64> {
        let norm = 1.0 / self.buffer.len() as f64;
        self.buffer.iter().map(|c| c.re * norm).collect()
    }
}

#[test]
fn test_k_grid() {
    // Generate simple k grid and ensure it's correct
    let k_grid = get_kgrid(4, 0.25);
    let two_pi = 2.0 * std::f64::consts::PI;
    let modes: Vec<f64> = k_grid.iter().map(|k| k / two_pi).collect();
    assert_eq!(modes, vec![0.0, 1.0, -2.0, -1.0]);

    let odd: Vec<f64> = get_kgrid(5, 0.2).iter().map(|k| (k / two_pi).round()).collect();
    assert_eq!(odd, vec![0.0, 1.0, 2.0, -2.0, -1.0]);
}

#[test]
fn test_inv_spec_grid_zero_mode() {
    let inv = inv_spec_grid(&[0.0, 2.0, -2.0]);
    assert_eq!(inv, vec![0.0, 0.25, 0.25]);
}

#[test]
fn test_centered_gradient_wraps() {
    // φ = [0, 1, 2, 3] on unit cells; ends see their periodic neighbours
    let field = centered_gradient(&[0.0, 1.0, 2.0, 3.0], 1.0);
    assert_eq!(field, vec![1.0, -1.0, -1.0, 1.0]);
}

#[test]
fn test_single_mode_poisson() {
    use approx::assert_abs_diff_eq;

    // ρ = cos(k x) ⇒ φ = cos(k x) / k², E = sin(k x) / k
    let grid = Grid::new(2.0 * std::f64::consts::PI, 64).unwrap();
    let k = 3.0;
    let x: Vec<f64> = (0..64).map(|i| i as f64 * grid.dx()).collect();
    let rho: Vec<f64> = x.iter().map(|x| (k * x).cos()).collect();

    let mut solver = SpectralSolver::new(&grid, GradientScheme::Spectral);
    let solution = solver.solve(&rho);
    for (i, x) in x.iter().enumerate() {
        assert_abs_diff_eq!(solution.potential[i], (k * x).cos() / (k * k), epsilon = 1e-10);
        assert_abs_diff_eq!(solution.field[i], (k * x).sin() / k, epsilon = 1e-10);
    }

    // Centered differences approach the same field with O(dx²) error
    let mut solver = SpectralSolver::new(&grid, GradientScheme::Centered);
    let solution = solver.solve(&rho);
    for (i, x) in x.iter().enumerate() {
        assert_abs_diff_eq!(solution.field[i], (k * x).sin() / k, epsilon = 2e-2);
    }
}

#[test]
fn test_potential_has_zero_mean() {
    use approx::assert_abs_diff_eq;

    let grid = Grid::new(10.0, 10).unwrap();
    let rho = vec![3.0, 0.0, 1.0, 7.0, 2.0, 2.0, 0.0, 0.0, 5.0, 1.0];

    for gradient in [GradientScheme::Centered, GradientScheme::Spectral] {
        let mut solver = SpectralSolver::new(&grid, gradient);
        let solution = solver.solve(&rho);
        let mean = solution.potential.iter().sum::<f64>() / 10.0;
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-12);

        // Periodic field integrates to zero
        assert_abs_diff_eq!(solution.field.iter().sum::<f64>(), 0.0, epsilon = 1e-10);
    }
}

#[test]
fn test_uniform_density_has_no_field() {
    let grid = Grid::new(5.0, 8).unwrap();
    let mut solver = SpectralSolver::new(&grid, GradientScheme::Centered);
    let solution = solver.solve(&[1.6; 8]);
    assert!(solution.potential.iter().all(|p| p.abs() < 1e-12));
    assert!(solution.field.iter().all(|e| e.abs() < 1e-12));
}
