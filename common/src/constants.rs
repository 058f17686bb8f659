/// Vacuum permittivity (normalized units)
pub const EPSILON_0: f64 = 1.0;

/// Particle charge of the electron beams (normalized units)
pub const ELECTRON_CHARGE: f64 = -1.0;

// Reference two-stream setup
pub const DEFAULT_AXIS_LENGTH: f64 = 100.0;
pub const DEFAULT_NUM_PARTICLES: usize = 1000;
pub const DEFAULT_DT: f64 = 0.1;
pub const DEFAULT_TOTAL_STEPS: usize = 100;
pub const DEFAULT_STREAM_VELOCITY: f64 = 1.0;
pub const DEFAULT_VELOCITY_SPREAD: f64 = 0.1;

/// Root directory for data dumps when none is given
pub const DEFAULT_OUTPUT_DIR: &str = "sim_data";
