/* 3rd party libraries */
use clap::{Arg, Command as Cli};
use crossbeam_channel as cbc;
use log::{info, warn};
use std::io;
use std::thread::Builder;

/* Custom libraries */
use config::{Backend, Config, ConfigError};
use console::Console;
use elevator::hardware::{OutputPin, RangeSensor, RelayBank};
use elevator::{HoistDriver, PositionController, SimulatedHoist};
use shared::{Command, ElevatorState};
use telemetry::Telemetry;

/* Modules */
#[macro_use]
mod shared;
mod config;
mod console;
mod elevator;
mod telemetry;

const DEFAULT_CONFIG: &str = "config.toml";

/* Main */
fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Cli::new("hoist")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Position controller for a freight-elevator platform")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .default_value(DEFAULT_CONFIG)
                .help("Path to the TOML configuration file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print every telemetry snapshot as a JSON line"),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_name("BACKEND")
                .takes_value(true)
                .possible_values(["simulator", "gpio"])
                .help("Overrides [hardware] backend"),
        )
        .get_matches();

    // Load the configuration
    let config_path = matches.value_of("config").unwrap_or(DEFAULT_CONFIG);
    let mut config = match config::load_config(config_path) {
        Err(ConfigError::Read { .. }) if config_path == DEFAULT_CONFIG => {
            warn!("No {} found, using built-in defaults", DEFAULT_CONFIG);
            Config::default()
        }
        result => unwrap_or_exit!(result, "Configuration"),
    };
    if matches.is_present("json") {
        config.telemetry.json = true;
    }
    match matches.value_of("backend") {
        Some("gpio") => config.hardware.backend = Backend::Gpio,
        Some("simulator") => config.hardware.backend = Backend::Simulator,
        _ => {}
    }

    // Wire the controller to the selected shaft
    match config.hardware.backend {
        Backend::Simulator => {
            let hoist = SimulatedHoist::build(&config.simulator, &config.hardware);
            info!("Simulated platform at {:.1} cm", hoist.position());
            run_hoist(&config, hoist.relays, hoist.sensor)
        }
        #[cfg(feature = "gpio")]
        Backend::Gpio => {
            let hoist = unwrap_or_exit!(elevator::GpioHoist::open(&config.hardware), "GPIO");
            run_hoist(&config, hoist.relays, hoist.sensor)
        }
        #[cfg(not(feature = "gpio"))]
        Backend::Gpio => {
            log::error!("This build has no GPIO support, rebuild with the 'gpio' feature");
            std::process::exit(1);
        }
    }
}

fn run_hoist<P, S>(config: &Config, relays: RelayBank<P>, sensor: S) -> io::Result<()>
where
    P: OutputPin + Send + 'static,
    S: RangeSensor + Send + 'static,
{
    let controller = PositionController::new(&config.controller, relays, sensor);

    // Initialize channels
    let (command_tx, command_rx) = cbc::unbounded::<Command>();
    let (state_tx, state_rx) = cbc::unbounded::<ElevatorState>();
    let (terminate_tx, terminate_rx) = cbc::unbounded::<()>();

    // Start the telemetry module
    let telemetry = Telemetry::new(&config.telemetry, state_rx, io::stdout());
    let latest = telemetry.latest();
    let telemetry_thread = unwrap_or_exit!(
        Builder::new()
            .name("telemetry".into())
            .spawn(move || telemetry.run()),
        "Spawning telemetry thread"
    );

    // Start the driver module
    let driver = HoistDriver::new(
        &config.controller,
        controller,
        command_rx,
        state_tx,
        terminate_rx,
    );
    let driver_thread = unwrap_or_exit!(
        Builder::new()
            .name("hoist_driver".into())
            .spawn(move || {
                driver.run();
            }),
        "Spawning driver thread"
    );

    // The console runs on the main thread until quit or end of input
    info!("Hoist ready, type 'help' for commands");
    let console = Console::new(command_tx, terminate_tx, latest);
    console.run(io::stdin().lock(), io::stdout())?;

    if driver_thread.join().is_err() {
        warn!("Driver thread panicked");
    }
    if telemetry_thread.join().is_err() {
        warn!("Telemetry thread panicked");
    }

    Ok(())
}
