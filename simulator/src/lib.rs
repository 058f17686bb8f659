//! One-dimensional electrostatic particle-in-cell simulation of the
//! two-stream instability on a periodic domain.
//!
//! Each step deposits particle charge onto a [`Grid`], solves Poisson's
//! equation spectrally, gathers the electric field back to the particles and
//! pushes them. [`SimulationObject`] owns all state and exposes the step as
//! [`SimulationObject::advance`].
//!
//! [`Grid`]: utils::grid::Grid

pub mod diagnostics;
pub mod ics;
pub mod integrator;
pub mod particles;
pub mod simulation_object;
pub mod utils;

pub use particles::ParticleSet;
pub use simulation_object::{SimulationObject, SimulationParameters, StepFields};
pub use utils::error::{ParameterError, RuntimeError};
