use ar_particles::config::SimulationConfig;
use ar_particles::core::{Engine, SimulationResult};

fn load_config() -> SimulationResult<SimulationConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::load_or_default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn main() {
    let result = load_config().and_then(Engine::run);
    match result {
        Ok(report) => println!(
            "{} frames in {:.2?}, {} toggles requested, final emitter {:?} with {} particles",
            report.frames,
            report.elapsed,
            report.toggles_requested,
            report.final_kind,
            report.final_population
        ),
        Err(e) => {
            eprintln!("Simulation failed to start: {}", e);
            std::process::exit(1);
        }
    }
}
