use ndarray::ArrayView1;
use ndarray_npy::write_npy;
use std::path::{Path, PathBuf};
use std::time::Instant;
use twostream_common::TomlParameters;

use super::error::RuntimeError;
use crate::{
    particles::ParticleSet,
    simulation_object::{SimulationParameters, StepFields},
};

/// Writes a slice to disk in .npy format
pub fn array_to_disk(path: &Path, values: &[f64]) -> Result<(), RuntimeError> {
    write_npy(path, &ArrayView1::from(values)).map_err(|e| RuntimeError::IOError {
        msg: format!("{}: {e}", path.display()),
    })
}

/// Path of one dumped quantity, e.g. `{dir}/positions_000100.npy`
pub fn dump_path(dir: &Path, name: &str, step: usize) -> PathBuf {
    dir.join(format!("{name}_{step:06}.npy"))
}

/// Writes particle state and grid quantities of one step under `dir`
pub fn dump_step(
    dir: &Path,
    step: usize,
    particles: &ParticleSet,
    fields: &StepFields,
) -> Result<(), RuntimeError> {
    let timer = Instant::now();

    std::fs::create_dir_all(dir).map_err(|e| RuntimeError::IOError {
        msg: format!("{}: {e}", dir.display()),
    })?;

    let arrays: [(&str, &[f64]); 5] = [
        ("positions", particles.positions()),
        ("velocities", particles.velocities()),
        ("density", fields.density.as_slice()),
        ("potential", fields.potential.as_slice()),
        ("field", fields.field.as_slice()),
    ];
    for (name, values) in arrays {
        array_to_disk(&dump_path(dir, name, step), values)?;
    }

    log::info!(
        "dumped step {step} to {} in {} millis",
        dir.display(),
        timer.elapsed().as_millis()
    );
    Ok(())
}

/// Yields one `SimulationParameters` per seed listed in the toml. Without a
/// seed list there is a single stream seeded from entropy.
pub struct SimulationIter {
    toml: TomlParameters,
    seeds: std::vec::IntoIter<u64>,
    named_streams: bool,
    original_len: usize,
}

impl SimulationIter {
    pub fn len(&self) -> usize {
        self.original_len
    }

    pub fn is_empty(&self) -> bool {
        self.original_len == 0
    }
}

pub fn parameters_from_toml(toml: TomlParameters) -> SimulationIter {
    let (seeds, named_streams) = match toml.seeds.clone() {
        Some(seeds) => (seeds, true),
        None => {
            let seed: u64 = rand::random();
            log::info!("no seeds given, using seed {seed}");
            (vec![seed], false)
        }
    };
    SimulationIter {
        toml,
        original_len: seeds.len(),
        seeds: seeds.into_iter(),
        named_streams,
    }
}

impl Iterator for SimulationIter {
    type Item = SimulationParameters;

    fn next(&mut self) -> Option<Self::Item> {
        let seed = self.seeds.next()?;
        let toml = &self.toml;

        let sim_name = if self.named_streams {
            format!("{}-stream{:05}", toml.sim_name, seed)
        } else {
            toml.sim_name.clone()
        };

        let mut parameters = SimulationParameters::new(
            toml.axis_length,
            toml.num_particles,
            toml.num_cells(),
            toml.dt,
            toml.total_steps,
            toml.charge,
            seed,
            sim_name,
        );
        parameters.ics = toml.ics.clone();
        parameters.deposition = toml.deposition;
        parameters.pusher = toml.pusher;
        parameters.gradient = toml.gradient;
        parameters.field_ordering = toml.field_ordering;
        parameters.num_data_dumps = toml.num_data_dumps;
        parameters.output_dir = PathBuf::from(toml.output_dir());

        Some(parameters)
    }
}

#[test]
fn test_parameters_from_toml_streams() {
    let toml = TomlParameters {
        seeds: Some(vec![3, 4]),
        num_cells: Some(64),
        sim_name: "beams".to_string(),
        ..TomlParameters::default()
    };

    let streams: Vec<SimulationParameters> = parameters_from_toml(toml).collect();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].sim_name, "beams-stream00003");
    assert_eq!(streams[1].sim_name, "beams-stream00004");
    assert_eq!(streams[1].seed, 4);
    assert_eq!(streams[0].num_cells, 64);
    assert_eq!(streams[0].output_dir, PathBuf::from("sim_data"));
}

#[test]
fn test_parameters_from_toml_single_stream() {
    let toml = TomlParameters::default();
    let mut streams = parameters_from_toml(toml);
    assert_eq!(streams.len(), 1);

    let parameters = streams.next().unwrap();
    assert_eq!(parameters.sim_name, "two-stream");
    assert_eq!(parameters.num_cells, 100);
    assert!(streams.next().is_none());
}

#[test]
fn test_dump_step_writes_npy() {
    use ndarray::Array1;
    use ndarray_npy::read_npy;

    let dir = std::env::temp_dir().join(format!("twostream-dump-{}", std::process::id()));
    let particles = ParticleSet::from_state(vec![1.0, 2.0], vec![0.5, -0.5], -1.0, 4.0).unwrap();
    let fields = StepFields {
        density: vec![0.0, 1.0, 1.0, 0.0],
        potential: vec![0.0; 4],
        field: vec![0.0; 4],
    };

    dump_step(&dir, 7, &particles, &fields).unwrap();

    let positions: Array1<f64> = read_npy(dump_path(&dir, "positions", 7)).unwrap();
    assert_eq!(positions.to_vec(), vec![1.0, 2.0]);
    let density: Array1<f64> = read_npy(dump_path(&dir, "density", 7)).unwrap();
    assert_eq!(density.to_vec(), fields.density);

    std::fs::remove_dir_all(&dir).unwrap();
}
