mod app;

use app::App;
use iced::{Application, Settings};
use tracing::warn;

use battery_additive_mixer::config::{default_config_path, ControllerConfig};
use battery_additive_mixer::logging::init_tracing;

fn main() -> iced::Result {
    init_tracing();

    let config = match ControllerConfig::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            warn!("ignoring {}: {:#}", default_config_path().display(), e);
            ControllerConfig::default()
        }
    };

    println!("Battery Additives Experiment");
    println!("----------------------------");
    println!("Pump controller: {} @ {} baud", config.pump_port, config.baud_rate);
    println!("Conductivity meter: {} (simulated)", config.meter_port);
    println!("Batch volume: {:.2} ml", config.total_volume_ml);
    println!("Experiment summaries are printed here after each run.");
    println!("CLI: cargo run --bin additive-mixer-cli -- --help");
    println!();
    App::run(Settings::with_flags(config))
}
