use clap::Parser;
use std::error::Error;
use std::time::Instant;
use twostream_common::read_toml;
use twostream_simulator::{utils::io::parameters_from_toml, SimulationObject, SimulationParameters};

#[derive(Parser)]
#[command(author, version, about = "1D electrostatic PIC simulation of the two-stream instability")]
pub struct CommandLineArguments {
    /// Path to the simulation toml
    #[arg(long, short)]
    toml: String,
    /// Log diagnostics after every step
    #[arg(long, short)]
    verbose: bool,
    /// Only parse the toml and construct the simulations
    #[arg(long)]
    test: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp_secs().init();

    // Start timer
    let now = Instant::now();

    // Parse path to toml
    let args = CommandLineArguments::parse();

    // If seeds are being used, one simulation per seed
    let toml = read_toml(&args.toml)?;
    let streams: Vec<SimulationParameters> = parameters_from_toml(toml).collect();
    let multi_stream: bool = streams.len() > 1;

    for stream in streams {
        let mut simulation_object = SimulationObject::new(stream)?;

        log::info!(
            "Working on simulation {}\n{}",
            simulation_object.parameters.sim_name,
            simulation_object.parameters
        );

        if args.test {
            continue;
        }

        // Dump initial condition
        if simulation_object.parameters.num_data_dumps > 0 {
            simulation_object.dump()?;
        }

        // Main evolve loop
        let start = Instant::now();
        while simulation_object.not_finished() {
            simulation_object.update(args.verbose)?;
        }

        if let Some(diagnostics) = simulation_object.diagnostics() {
            log::info!("final {}", diagnostics);
        }
        log::info!(
            "Finished {} in {} millis",
            simulation_object.parameters.sim_name,
            start.elapsed().as_millis()
        );
    }

    if multi_stream {
        log::info!("Finished all streams in {} seconds", now.elapsed().as_secs());
    }

    Ok(())
}
