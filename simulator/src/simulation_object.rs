use std::fmt::Display;
use std::path::PathBuf;

use twostream_common::{
    DepositionScheme, FieldOrdering, GradientScheme, InitialConditions, PushScheme,
    DEFAULT_OUTPUT_DIR,
};

use crate::{
    diagnostics::Diagnostics,
    ics::particles_from_ics,
    integrator::Integrator,
    particles::ParticleSet,
    utils::{
        error::{ParameterError, RuntimeError},
        fft::{FieldSolution, SpectralSolver},
        grid::{deposit, Grid},
        io,
    },
};

/// This `SimulationParameters` struct stores simulations parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    // Grid Parameters
    /// Physical length of the periodic domain
    pub axis_length: f64,
    /// Number of grid cells
    pub num_cells: usize,

    // Particle Parameters
    /// Number of particles
    pub num_particles: usize,
    /// Charge shared by every particle
    pub charge: f64,
    /// Initial conditions
    pub ics: InitialConditions,
    /// Seed for the initial condition sampler
    pub seed: u64,

    // Temporal Parameters
    /// Timestep
    pub dt: f64,
    /// Number of steps to run
    pub total_steps: usize,

    // Numerical schemes
    pub deposition: DepositionScheme,
    pub pusher: PushScheme,
    pub gradient: GradientScheme,
    pub field_ordering: FieldOrdering,

    // Output
    /// Number of data dumps (0 disables output)
    pub num_data_dumps: u32,
    /// Root directory for data dumps
    pub output_dir: PathBuf,

    // Metadata
    /// Simulation name
    pub sim_name: String,
}

impl SimulationParameters {
    /// Parameters with the default two-stream initial conditions, schemes
    /// and no output
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        axis_length: f64,
        num_particles: usize,
        num_cells: usize,
        dt: f64,
        total_steps: usize,
        charge: f64,
        seed: u64,
        sim_name: impl Into<String>,
    ) -> Self {
        SimulationParameters {
            axis_length,
            num_cells,
            num_particles,
            charge,
            ics: InitialConditions::default(),
            seed,
            dt,
            total_steps,
            deposition: DepositionScheme::default(),
            pusher: PushScheme::default(),
            gradient: GradientScheme::default(),
            field_ordering: FieldOrdering::default(),
            num_data_dumps: 0,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sim_name: sim_name.into(),
        }
    }

    /// Checks everything that does not depend on the particle sampler
    pub fn validate(&self) -> Result<(), ParameterError> {
        Grid::new(self.axis_length, self.num_cells)?;
        if self.num_particles == 0 {
            return Err(ParameterError::NoParticles);
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ParameterError::InvalidTimestep { dt: self.dt });
        }
        if self.total_steps == 0 {
            return Err(ParameterError::NoSteps);
        }
        if !self.charge.is_finite() {
            return Err(ParameterError::NonFinite {
                name: "charge",
                value: self.charge,
            });
        }
        Ok(())
    }

    /// Steps between data dumps
    pub fn dump_interval(&self) -> Option<usize> {
        match self.num_data_dumps {
            0 => None,
            n => Some((self.total_steps / n as usize).max(1)),
        }
    }

    /// Directory holding this simulation's data dumps
    pub fn sim_dir(&self) -> PathBuf {
        self.output_dir.join(&self.sim_name)
    }
}

impl Display for SimulationParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "axis_length    = {}", self.axis_length)?;
        writeln!(f, "num_cells      = {}", self.num_cells)?;
        writeln!(f, "dx             = {}", self.axis_length / self.num_cells as f64)?;
        writeln!(f, "num_particles  = {}", self.num_particles)?;
        writeln!(f, "charge         = {}", self.charge)?;
        writeln!(f, "ics            = {:?}", self.ics)?;
        writeln!(f, "seed           = {}", self.seed)?;
        writeln!(f, "dt             = {}", self.dt)?;
        writeln!(f, "total_steps    = {}", self.total_steps)?;
        writeln!(f, "deposition     = {:?}", self.deposition)?;
        writeln!(f, "pusher         = {:?}", self.pusher)?;
        writeln!(f, "gradient       = {:?}", self.gradient)?;
        writeln!(f, "field_ordering = {:?}", self.field_ordering)?;
        writeln!(f, "num_data_dumps = {}", self.num_data_dumps)?;
        writeln!(f, "sim_name       = {}", self.sim_name)?;
        writeln!(f, "{}", "-".repeat(40))?;
        Ok(())
    }
}

/// Grid quantities for the current particle state
#[derive(Debug, Clone, PartialEq)]
pub struct StepFields {
    pub density: Vec<f64>,
    pub potential: Vec<f64>,
    pub field: Vec<f64>,
}

/// Owns the grid, particles and clock of one simulation. `advance` is the
/// only mutator; particle state is stable between calls.
pub struct SimulationObject {
    /// This has the simulation parameters
    pub parameters: SimulationParameters,

    grid: Grid,
    particles: ParticleSet,
    initial_particles: ParticleSet,
    solver: SpectralSolver,
    integrator: Integrator,

    step_index: usize,
    halted: bool,
    /// Potential solved in the previous step, kept only for `FieldOrdering::Lagged`
    previous_potential: Option<Vec<f64>>,
    /// Potential and field the particles felt in the last push
    applied: Option<FieldSolution>,
    diagnostics: Option<Diagnostics>,
}

impl SimulationObject {
    /// Builds the simulation and samples the initial conditions
    pub fn new(parameters: SimulationParameters) -> Result<Self, ParameterError> {
        parameters.validate()?;
        let particles = particles_from_ics(&parameters)?;
        SimulationObject::from_particles(parameters, particles)
    }

    /// Builds the simulation around an explicit particle state.
    /// `parameters.num_particles` and `parameters.charge` are taken from `particles`.
    pub fn from_particles(
        mut parameters: SimulationParameters,
        particles: ParticleSet,
    ) -> Result<Self, ParameterError> {
        if particles.axis_length() != parameters.axis_length {
            return Err(ParameterError::AxisMismatch {
                particles: particles.axis_length(),
                parameters: parameters.axis_length,
            });
        }
        parameters.num_particles = particles.len();
        parameters.charge = particles.charge();
        parameters.validate()?;

        let grid = Grid::new(parameters.axis_length, parameters.num_cells)?;
        let solver = SpectralSolver::new(&grid, parameters.gradient);
        let integrator = Integrator::new(parameters.pusher, parameters.dt);

        Ok(SimulationObject {
            parameters,
            grid,
            initial_particles: particles.clone(),
            particles,
            solver,
            integrator,
            step_index: 0,
            halted: false,
            previous_potential: None,
            applied: None,
            diagnostics: None,
        })
    }

    /// Runs deposit -> solve -> push once and returns the updated particles
    pub fn advance(&mut self) -> Result<&ParticleSet, RuntimeError> {
        if self.halted {
            return Err(RuntimeError::Halted);
        }
        if self.is_finished() {
            return Err(RuntimeError::Finished {
                total_steps: self.parameters.total_steps,
            });
        }

        // Charge density
        let density = deposit(&self.particles, &self.grid, self.parameters.deposition);
        let rho: Vec<f64> = density
            .iter()
            .map(|n| n * self.parameters.charge)
            .collect();

        // Field seen by the particles this step
        let potential = self.solver.potential(&rho);
        let applied = match self.parameters.field_ordering {
            FieldOrdering::Consistent => {
                let field = self.solver.field_from_potential(&potential);
                FieldSolution { potential, field }
            }
            FieldOrdering::Lagged => match self.previous_potential.replace(potential) {
                Some(previous) => {
                    let field = self.solver.field_from_potential(&previous);
                    FieldSolution {
                        potential: previous,
                        field,
                    }
                }
                None => FieldSolution {
                    potential: vec![0.0; self.grid.num_cells()],
                    field: vec![0.0; self.grid.num_cells()],
                },
            },
        };

        // Push
        self.integrator.push(
            &mut self.particles,
            &applied.field,
            &self.grid,
            self.parameters.deposition,
        );
        self.step_index += 1;

        if !self.particles.is_finite() {
            self.halted = true;
            log::warn!(
                "{}: non-finite particle state at step {}, halting",
                self.parameters.sim_name,
                self.step_index
            );
            return Err(RuntimeError::NanOrInf {
                step: self.step_index,
            });
        }

        let diagnostics =
            Diagnostics::compute(self.step_index, &self.particles, &applied.field, &self.grid);
        log::debug!("{}", diagnostics);
        self.diagnostics = Some(diagnostics);
        self.applied = Some(applied);

        Ok(&self.particles)
    }

    /// Advances until `frame` steps have run (or the simulation finishes).
    /// The physics depends only on the number of steps taken.
    pub fn advance_to_frame(&mut self, frame: usize) -> Result<&ParticleSet, RuntimeError> {
        let target = frame.min(self.parameters.total_steps);
        while self.step_index < target {
            self.advance()?;
        }
        Ok(&self.particles)
    }

    /// This function advances one step and writes a data dump when one is due
    pub fn update(&mut self, verbose: bool) -> Result<(), RuntimeError> {
        self.advance()?;

        if let Some(interval) = self.parameters.dump_interval() {
            if self.step_index % interval == 0 || self.is_finished() {
                self.dump()?;
            }
        }

        if verbose {
            if let Some(diagnostics) = self.diagnostics {
                log::info!("{}: {}", self.parameters.sim_name, diagnostics);
            }
        }
        Ok(())
    }

    /// Writes the current particles and density to disk, together with the
    /// potential and field applied in the last push (the ones behind
    /// `Diagnostics::field_energy`). Before the first step those are solved
    /// from the current density.
    pub fn dump(&mut self) -> Result<(), RuntimeError> {
        let mut fields = self.fields();
        if let Some(applied) = &self.applied {
            fields.potential.clone_from(&applied.potential);
            fields.field.clone_from(&applied.field);
        }
        io::dump_step(
            &self.parameters.sim_dir(),
            self.step_index,
            &self.particles,
            &fields,
        )
    }

    /// Density, potential and field for the current particle state. Does not
    /// touch the lagged potential.
    pub fn fields(&mut self) -> StepFields {
        let density = deposit(&self.particles, &self.grid, self.parameters.deposition);
        let rho: Vec<f64> = density
            .iter()
            .map(|n| n * self.parameters.charge)
            .collect();
        let FieldSolution { potential, field } = self.solver.solve(&rho);
        StepFields {
            density,
            potential,
            field,
        }
    }

    /// Back to the initial particles at step 0
    pub fn reset(&mut self) {
        self.particles = self.initial_particles.clone();
        self.integrator.reset();
        self.step_index = 0;
        self.halted = false;
        self.previous_potential = None;
        self.applied = None;
        self.diagnostics = None;
    }

    pub fn is_finished(&self) -> bool {
        self.step_index == self.parameters.total_steps
    }

    pub fn not_finished(&self) -> bool {
        !self.is_finished() && !self.halted
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Diagnostics of the last completed step
    pub fn diagnostics(&self) -> Option<Diagnostics> {
        self.diagnostics
    }

    /// `(x, 0)` pairs for a flat scatter plot of the particles
    pub fn plot_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.particles.positions().iter().map(|&x| (x, 0.0))
    }
}

#[test]
fn test_new_sim_parameters() {
    let params = SimulationParameters::new(100.0, 1000, 100, 0.1, 100, -1.0, 0, "my-sim");
    assert!(params.validate().is_ok());
    assert_eq!(params.dump_interval(), None);
    println!("{}", params);
}

#[test]
fn test_invalid_parameters_rejected() {
    let base = SimulationParameters::new(100.0, 10, 100, 0.1, 10, -1.0, 0, "bad");

    let mut params = base.clone();
    params.dt = 0.0;
    assert_eq!(
        SimulationObject::new(params).err(),
        Some(ParameterError::InvalidTimestep { dt: 0.0 })
    );

    let mut params = base.clone();
    params.total_steps = 0;
    assert_eq!(SimulationObject::new(params).err(), Some(ParameterError::NoSteps));

    let mut params = base.clone();
    params.num_cells = 1;
    assert_eq!(
        SimulationObject::new(params).err(),
        Some(ParameterError::TooFewCells { num_cells: 1 })
    );

    let mut params = base.clone();
    params.num_particles = 0;
    assert_eq!(SimulationObject::new(params).err(), Some(ParameterError::NoParticles));

    let mut params = base;
    params.axis_length = -5.0;
    assert!(matches!(
        SimulationObject::new(params).err(),
        Some(ParameterError::InvalidAxisLength { .. })
    ));
}

#[test]
fn test_dump_interval() {
    let mut params = SimulationParameters::new(100.0, 10, 100, 0.1, 100, -1.0, 0, "dumps");
    params.num_data_dumps = 10;
    assert_eq!(params.dump_interval(), Some(10));
    params.num_data_dumps = 1000;
    assert_eq!(params.dump_interval(), Some(1));
}

#[test]
fn test_from_particles_rejects_other_domain() {
    let params = SimulationParameters::new(100.0, 2, 100, 0.1, 10, 0.0, 0, "mismatch");
    let particles = ParticleSet::from_state(vec![1.0, 2.0], vec![0.0, 0.0], 0.0, 50.0).unwrap();
    assert!(matches!(
        SimulationObject::from_particles(params, particles).err(),
        Some(ParameterError::AxisMismatch { .. })
    ));
}
