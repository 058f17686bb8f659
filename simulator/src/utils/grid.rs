use twostream_common::DepositionScheme;

use super::error::ParameterError;
use crate::particles::ParticleSet;

/// Uniform periodic grid on `[0, length)`. Cell `i` spans `[i dx, (i + 1) dx)`
/// and its field value lives at the cell center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    length: f64,
    num_cells: usize,
    dx: f64,
}

impl Grid {
    pub fn new(length: f64, num_cells: usize) -> Result<Self, ParameterError> {
        if !(length.is_finite() && length > 0.0) {
            return Err(ParameterError::InvalidAxisLength {
                axis_length: length,
            });
        }
        if num_cells < 2 {
            return Err(ParameterError::TooFewCells { num_cells });
        }
        Ok(Grid {
            length,
            num_cells,
            dx: length / num_cells as f64,
        })
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    /// Index of the cell containing `position`, which must already be wrapped
    /// into `[0, length)`. Clamped so that round-up at the top edge stays in range.
    pub fn cell_index(&self, position: f64) -> usize {
        // Saturating cast sends tiny negatives to 0
        let index = (position / self.dx).floor() as usize;
        index.min(self.num_cells - 1)
    }

    pub fn cell_center(&self, index: usize) -> f64 {
        (index as f64 + 0.5) * self.dx
    }

    /// Left cell, right cell and the weight of the right cell for linear
    /// weighting between cell centers. Wraps periodically.
    pub fn linear_weights(&self, position: f64) -> (usize, usize, f64) {
        let s = position / self.dx - 0.5;
        let floor = s.floor();
        let weight = s - floor;
        let left = if floor < 0.0 {
            self.num_cells - 1
        } else {
            (floor as usize).min(self.num_cells - 1)
        };
        (left, (left + 1) % self.num_cells, weight)
    }
}

/// Number density (particles per unit length) in every cell.
/// Both schemes conserve the total: `sum(density) * dx == N`.
pub fn deposit(particles: &ParticleSet, grid: &Grid, scheme: DepositionScheme) -> Vec<f64> {
    let mut density = vec![0.0; grid.num_cells()];
    let inv_dx = 1.0 / grid.dx();

    match scheme {
        DepositionScheme::NearestGridPoint => {
            for &x in particles.positions() {
                density[grid.cell_index(x)] += inv_dx;
            }
        }
        DepositionScheme::CloudInCell => {
            for &x in particles.positions() {
                let (left, right, weight) = grid.linear_weights(x);
                density[left] += (1.0 - weight) * inv_dx;
                density[right] += weight * inv_dx;
            }
        }
    }

    log::trace!(
        "deposited {} particles onto {} cells",
        particles.len(),
        grid.num_cells()
    );
    density
}

/// Interpolates a grid quantity to `position` with the same weights used for
/// deposition, so the particle never feels its own field.
pub fn gather(values: &[f64], position: f64, grid: &Grid, scheme: DepositionScheme) -> f64 {
    match scheme {
        DepositionScheme::NearestGridPoint => values[grid.cell_index(position)],
        DepositionScheme::CloudInCell => {
            let (left, right, weight) = grid.linear_weights(position);
            (1.0 - weight) * values[left] + weight * values[right]
        }
    }
}

/// Integral of a grid quantity over the domain
pub fn integrate(values: &[f64], grid: &Grid) -> f64 {
    values.iter().sum::<f64>() * grid.dx()
}

/// Returns true when every value is finite
pub fn check_for_nans(values: &[f64]) -> bool {
    values.iter().all(|x| x.is_finite())
}

#[test]
fn test_grid_rejects_degenerate_parameters() {
    assert_eq!(
        Grid::new(0.0, 16),
        Err(ParameterError::InvalidAxisLength { axis_length: 0.0 })
    );
    assert!(Grid::new(-1.0, 16).is_err());
    assert!(Grid::new(f64::NAN, 16).is_err());
    assert_eq!(
        Grid::new(1.0, 1),
        Err(ParameterError::TooFewCells { num_cells: 1 })
    );
    assert!(Grid::new(1.0, 0).is_err());
}

#[test]
fn test_cell_index_unit_cells_is_floor() {
    let grid = Grid::new(100.0, 100).unwrap();
    assert_eq!(grid.cell_index(0.0), 0);
    assert_eq!(grid.cell_index(10.0), 10);
    assert_eq!(grid.cell_index(59.999), 59);
    assert_eq!(grid.cell_index(99.999_999), 99);
}

#[test]
fn test_cell_index_clamps_top_edge() {
    let grid = Grid::new(1.0, 3).unwrap();
    assert_eq!(grid.cell_index(1.0 - f64::EPSILON), 2);
    assert_eq!(grid.cell_index(1.0), 2);
    assert_eq!(grid.cell_index(-0.0), 0);
}

#[test]
fn test_linear_weights_wrap() {
    let grid = Grid::new(10.0, 10).unwrap();

    assert_eq!(grid.cell_center(0), 0.5);
    assert_eq!(grid.cell_center(3), 3.5);

    // Exactly on a cell center
    let (left, right, weight) = grid.linear_weights(grid.cell_center(3));
    assert_eq!((left, right), (3, 4));
    assert!(weight.abs() < 1e-12);

    // Left of the first center wraps to the last cell
    let (left, right, weight) = grid.linear_weights(0.25);
    assert_eq!((left, right), (9, 0));
    assert!((weight - 0.75).abs() < 1e-12);

    // Right of the last center wraps to the first cell
    let (left, right, weight) = grid.linear_weights(9.75);
    assert_eq!((left, right), (9, 0));
    assert!((weight - 0.25).abs() < 1e-12);
}

#[test]
fn test_deposit_conserves_charge() {
    use approx::assert_abs_diff_eq;

    let grid = Grid::new(10.0, 8).unwrap();
    let positions = vec![0.1, 1.3, 2.6, 4.4, 5.0, 7.7, 9.99, 9.2, 3.3];
    let n = positions.len();
    let particles = ParticleSet::from_state(positions, vec![0.0; n], -1.0, 10.0).unwrap();

    for scheme in [DepositionScheme::NearestGridPoint, DepositionScheme::CloudInCell] {
        let density = deposit(&particles, &grid, scheme);
        assert_eq!(density.len(), 8);
        assert!(density.iter().all(|&d| d >= 0.0));
        assert_abs_diff_eq!(integrate(&density, &grid), n as f64, epsilon = 1e-10);
    }
}

#[test]
fn test_ngp_deposit_counts_per_cell() {
    let grid = Grid::new(4.0, 4).unwrap();
    let particles =
        ParticleSet::from_state(vec![0.5, 0.7, 2.1, 3.9], vec![0.0; 4], 1.0, 4.0).unwrap();
    let density = deposit(&particles, &grid, DepositionScheme::NearestGridPoint);
    assert_eq!(density, vec![2.0, 0.0, 1.0, 1.0]);
}

#[test]
fn test_gather_matches_deposit_weights() {
    let grid = Grid::new(4.0, 4).unwrap();
    let values = [0.0, 1.0, 2.0, 3.0];

    assert_eq!(gather(&values, 2.9, &grid, DepositionScheme::NearestGridPoint), 2.0);

    // Halfway between centers of cells 1 and 2
    let gathered = gather(&values, 2.0, &grid, DepositionScheme::CloudInCell);
    assert!((gathered - 1.5).abs() < 1e-12);

    // Halfway between the last and first centers
    let gathered = gather(&values, 0.0, &grid, DepositionScheme::CloudInCell);
    assert!((gathered - 1.5).abs() < 1e-12);
}

#[test]
fn test_check_for_nans() {
    assert!(check_for_nans(&[0.0, 1.0, -3.5]));
    assert!(!check_for_nans(&[0.0, f64::NAN]));
    assert!(!check_for_nans(&[f64::INFINITY]));
}
