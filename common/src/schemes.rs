use serde::{Deserialize, Serialize};

/// How particle charge is assigned to grid cells (and how the field is
/// gathered back to particles).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DepositionScheme {
    /// Whole particle goes to the cell containing it
    #[default]
    NearestGridPoint,
    /// Linear weighting between the two nearest cell centers
    CloudInCell,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PushScheme {
    /// Velocity then position, both from the same step's field
    #[default]
    Euler,
    /// Staggered leapfrog; velocities live at half steps
    Leapfrog,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GradientScheme {
    /// Periodic centered finite difference
    #[default]
    Centered,
    /// Multiplication by -ik in Fourier space
    Spectral,
}

/// Which potential the particle push sees.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FieldOrdering {
    /// deposit -> solve -> field -> push, all from the current density
    #[default]
    Consistent,
    /// Field comes from the potential solved in the previous step
    Lagged,
}
