use std::process::ExitCode;

use log::error;
use quicksilver::prelude::*;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional first argument: an equirectangular PNG/JPEG to reflect
    let mut simulation = FluidSimulation::new();
    if let Some(path) = std::env::args().nth(1) {
        simulation = simulation.with_environment_image(path);
    }

    match simulation.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
