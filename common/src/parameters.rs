use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    constants::*,
    error::CommonError,
    ics::InitialConditions,
    schemes::{DepositionScheme, FieldOrdering, GradientScheme, PushScheme},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TomlParameters {
    /// Physical length of the periodic domain
    pub axis_length: f64,
    /// Number of particles
    pub num_particles: usize,
    /// Number of grid cells. Defaults to unit-width cells, i.e. floor(axis_length)
    pub num_cells: Option<usize>,
    /// Timestep
    pub dt: f64,
    /// Number of steps to run
    pub total_steps: usize,
    /// Charge shared by every particle
    #[serde(default = "default_charge")]
    pub charge: f64,
    /// Name of simulation (used for directories)
    pub sim_name: String,
    /// Initial Conditions
    #[serde(default)]
    pub ics: InitialConditions,
    /// One run per seed. Accepts `a..=b`, `a to b` or `[a, b, c]`
    #[serde(default, deserialize_with = "deserialize_seeds")]
    pub seeds: Option<Vec<u64>>,
    /// Number of data dumps (0 disables output)
    #[serde(default)]
    pub num_data_dumps: u32,
    /// Root directory for data dumps
    pub output_dir: Option<String>,

    #[serde(default)]
    pub deposition: DepositionScheme,
    #[serde(default)]
    pub pusher: PushScheme,
    #[serde(default)]
    pub gradient: GradientScheme,
    #[serde(default)]
    pub field_ordering: FieldOrdering,
}

fn default_charge() -> f64 {
    ELECTRON_CHARGE
}

impl Default for TomlParameters {
    fn default() -> Self {
        TomlParameters {
            axis_length: DEFAULT_AXIS_LENGTH,
            num_particles: DEFAULT_NUM_PARTICLES,
            num_cells: None,
            dt: DEFAULT_DT,
            total_steps: DEFAULT_TOTAL_STEPS,
            charge: ELECTRON_CHARGE,
            sim_name: "two-stream".to_string(),
            ics: InitialConditions::default(),
            seeds: None,
            num_data_dumps: 0,
            output_dir: None,
            deposition: DepositionScheme::default(),
            pusher: PushScheme::default(),
            gradient: GradientScheme::default(),
            field_ordering: FieldOrdering::default(),
        }
    }
}

impl TomlParameters {
    /// Grid cell count, falling back to cells of unit width
    pub fn num_cells(&self) -> usize {
        self.num_cells
            .unwrap_or_else(|| self.axis_length.max(0.0).floor() as usize)
    }

    pub fn output_dir(&self) -> &str {
        self.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }
}

/// This function reads toml files
pub fn read_toml(path: &str) -> Result<TomlParameters, CommonError> {
    // Read toml config file
    let toml_contents: &str =
        &std::fs::read_to_string(path).map_err(|_| CommonError::TomlReadError {
            path: path.to_string(),
        })?;

    parse_toml(toml_contents)
}

pub fn parse_toml(toml_contents: &str) -> Result<TomlParameters, CommonError> {
    toml::from_str(toml_contents).map_err(|e| CommonError::TomlParseError {
        msg: format!("{e}"),
    })
}

fn deserialize_seeds<'de, D>(deserializer: D) -> Result<Option<Vec<u64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let parsed_string = String::deserialize(deserializer)?;
    parse_seeds(&parsed_string)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// NOTE: this compiles the regexes on every call. It runs once per toml.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>, CommonError> {
    let inclusive = Regex::new(r"^\s*(\d+)\s*\.\.=\s*(\d+)\s*$").expect("valid regex");
    let to = Regex::new(r"^\s*(\d+)\s+to\s+(\d+)\s*$").expect("valid regex");
    let list = Regex::new(r"^\s*\[?\s*\d+\s*(,\s*\d+\s*)*,?\s*\]?\s*$").expect("valid regex");
    let digits = Regex::new(r"\d+").expect("valid regex");

    let error = |msg: &'static str| CommonError::SeedParseError {
        input: s.to_string(),
        msg,
    };
    let parse = |digits: &str| {
        digits
            .parse::<u64>()
            .map_err(|_| error("seed does not fit in a u64"))
    };

    // Range inclusive (a..=b) or custom syntax (a to b)
    if let Some(captures) = inclusive.captures(s).or_else(|| to.captures(s)) {
        let start = parse(&captures[1])?;
        let end = parse(&captures[2])?;
        if start > end {
            return Err(error("range start is larger than range end"));
        }
        return Ok((start..=end).collect());
    }

    // Comma separated digits, optionally bracketed
    if list.is_match(s) {
        return digits.find_iter(s).map(|m| parse(m.as_str())).collect();
    }

    Err(error(
        "seeds did not match expected patterns: low..=high, low to high, [s1, s2, s3]",
    ))
}

#[test]
fn test_regex_range_inclusive() {
    let seeds = parse_seeds("0..=55").unwrap();
    assert_eq!(seeds, (0..=55).collect::<Vec<u64>>());
}

#[test]
fn test_regex_to() {
    let seeds = parse_seeds("3 to 7").unwrap();
    assert_eq!(seeds, vec![3, 4, 5, 6, 7]);
}

#[test]
fn test_regex_comma_separated() {
    assert_eq!(parse_seeds("[1, 3]").unwrap(), vec![1, 3]);
    assert_eq!(parse_seeds("1, 3").unwrap(), vec![1, 3]);
    assert_eq!(parse_seeds("42").unwrap(), vec![42]);
}

#[test]
fn test_regex_rejects_garbage() {
    assert!(parse_seeds("seven").is_err());
    assert!(parse_seeds("9..=2").is_err());
}

#[test]
fn test_parse_minimal_toml_uses_defaults() {
    let toml = parse_toml(
        r#"
        axis_length = 100.0
        num_particles = 1000
        dt = 0.1
        total_steps = 100
        sim_name = "reference"
        "#,
    )
    .unwrap();

    assert_eq!(toml.num_cells(), 100);
    assert_eq!(toml.charge, ELECTRON_CHARGE);
    assert_eq!(toml.ics, InitialConditions::default());
    assert_eq!(toml.seeds, None);
    assert_eq!(toml.deposition, DepositionScheme::NearestGridPoint);
    assert_eq!(toml.field_ordering, FieldOrdering::Consistent);
    assert_eq!(toml.output_dir(), DEFAULT_OUTPUT_DIR);
}

#[test]
fn test_parse_full_toml() {
    let toml = parse_toml(
        r#"
        axis_length = 64.0
        num_particles = 2048
        num_cells = 128
        dt = 0.05
        total_steps = 400
        charge = -0.5
        sim_name = "quiet"
        seeds = "0..=3"
        num_data_dumps = 10
        output_dir = "/tmp/two-stream"
        deposition = "CloudInCell"
        pusher = "Leapfrog"
        gradient = "Spectral"
        field_ordering = "Lagged"

        [ics]
        type = "QuietTwoStream"
        stream_velocity = 1.0
        velocity_spread = 0.0
        amplitude = 0.001
        mode = 2
        "#,
    )
    .unwrap();

    assert_eq!(toml.num_cells(), 128);
    assert_eq!(toml.seeds, Some(vec![0, 1, 2, 3]));
    assert_eq!(toml.deposition, DepositionScheme::CloudInCell);
    assert_eq!(toml.pusher, PushScheme::Leapfrog);
    assert_eq!(toml.gradient, GradientScheme::Spectral);
    assert_eq!(toml.field_ordering, FieldOrdering::Lagged);
    assert_eq!(toml.output_dir(), "/tmp/two-stream");
}

#[test]
fn test_parse_toml_reports_missing_field() {
    let err = parse_toml("axis_length = 1.0").unwrap_err();
    assert!(matches!(err, CommonError::TomlParseError { .. }));
}
