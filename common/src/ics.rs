use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_STREAM_VELOCITY, DEFAULT_VELOCITY_SPREAD};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum InitialConditions {
    /// Uniformly random positions with two counter-streaming beams at
    /// `+stream_velocity` and `-stream_velocity`, each with gaussian spread
    /// `velocity_spread`.
    TwoStream {
        stream_velocity: f64,
        velocity_spread: f64,
    },

    /// Evenly spaced beams displaced by `amplitude * sin(2π mode x / L)`.
    /// Seeds a single mode instead of relying on shot noise.
    QuietTwoStream {
        stream_velocity: f64,
        velocity_spread: f64,
        amplitude: f64,
        mode: usize,
    },
}

impl Default for InitialConditions {
    fn default() -> Self {
        InitialConditions::TwoStream {
            stream_velocity: DEFAULT_STREAM_VELOCITY,
            velocity_spread: DEFAULT_VELOCITY_SPREAD,
        }
    }
}

impl InitialConditions {
    pub fn stream_velocity(&self) -> f64 {
        match *self {
            InitialConditions::TwoStream { stream_velocity, .. }
            | InitialConditions::QuietTwoStream { stream_velocity, .. } => stream_velocity,
        }
    }

    pub fn velocity_spread(&self) -> f64 {
        match *self {
            InitialConditions::TwoStream { velocity_spread, .. }
            | InitialConditions::QuietTwoStream { velocity_spread, .. } => velocity_spread,
        }
    }
}

#[test]
fn test_parse_tagged_ics() {
    #[derive(Deserialize)]
    struct Wrapper {
        ics: InitialConditions,
    }

    let parsed: Wrapper = toml::from_str(
        r#"
        ics = { type = "QuietTwoStream", stream_velocity = 2.0, velocity_spread = 0.0, amplitude = 0.01, mode = 3 }
        "#,
    )
    .unwrap();
    assert_eq!(
        parsed.ics,
        InitialConditions::QuietTwoStream {
            stream_velocity: 2.0,
            velocity_spread: 0.0,
            amplitude: 0.01,
            mode: 3
        }
    );
    assert_eq!(parsed.ics.stream_velocity(), 2.0);
    assert_eq!(parsed.ics.velocity_spread(), 0.0);
}
