use thiserror::Error;
use twostream_common::CommonError;

/// Invalid construction parameters. Raised before any simulation state exists.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    #[error("Axis length must be positive and finite (got {axis_length})")]
    InvalidAxisLength { axis_length: f64 },

    #[error("Grid needs at least 2 cells (got {num_cells})")]
    TooFewCells { num_cells: usize },

    #[error("Particle count must be positive")]
    NoParticles,

    #[error("Timestep must be positive and finite (got {dt})")]
    InvalidTimestep { dt: f64 },

    #[error("Total number of steps must be positive")]
    NoSteps,

    #[error("Velocity spread must be non-negative and finite (got {sigma})")]
    InvalidVelocitySpread { sigma: f64 },

    #[error("Perturbation mode must be positive")]
    InvalidMode,

    #[error("{name} must be finite (got {value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("Position and velocity arrays differ in length ({positions} vs {velocities})")]
    LengthMismatch { positions: usize, velocities: usize },

    #[error("Particles live on a domain of length {particles}, parameters say {parameters}")]
    AxisMismatch { particles: f64, parameters: f64 },
}

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to write to disk: {msg}")]
    IOError { msg: String },

    #[error("A NaN or Inf value was produced at step {step}")]
    NanOrInf { step: usize },

    #[error("Simulation already finished all {total_steps} steps")]
    Finished { total_steps: usize },

    #[error("Simulation was halted by an earlier numeric instability")]
    Halted,

    #[error("Error in common: {err}")]
    TomlReadError {
        #[from]
        err: CommonError,
    },

    #[error("Invalid parameters: {err}")]
    InvalidParameters {
        #[from]
        err: ParameterError,
    },
}
