//! Lockstep binary entry point.
//!
//! Usage:
//!   lockstep [config.toml]
//!
//! Keys are read line by line from stdin (type a key, then Enter).

use std::io::{self, BufReader};

use anyhow::{Context, Result};
use lockstep_core::config::ConfigManager;
use lockstep_core::input::LineInputSource;
use lockstep_core::logging::init_tracing;
use lockstep_core::presentation::LogPresenter;
use lockstep_core::stages::default_catalog;
use lockstep_core::Engine;

const DEFAULT_CONFIG: &str = "lockstep.toml";

const KEY_HELP: &str = "\
Keys (followed by Enter):
  d / right    next frame
  a / left     previous frame
  p / space    play / pause
  q / quit     stop";

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    let mut config = ConfigManager::new(&config_path);
    config
        .load_or_create()
        .with_context(|| format!("loading {}", config_path))?;

    init_tracing(config.settings().logging.level);
    tracing::info!("Lockstep v{} starting", lockstep_core::version());

    let settings = config.settings().clone();
    let visualize = settings.visualization.enabled;

    let run_name = format!("run_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let mut engine = Engine::with_run_log(settings, default_catalog(), &run_name)?;
    if visualize {
        let logger = engine.logger();
        engine.add_presenter(Box::new(LogPresenter::new(logger)));
    }
    engine.set_input(Box::new(LineInputSource::new(BufReader::new(io::stdin()))));

    engine.configure()?;
    println!("{}", KEY_HELP);

    let presented = engine.run()?;
    tracing::info!(presented, "Lockstep finished");
    Ok(())
}
