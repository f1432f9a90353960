use clap::{Args, Parser, Subcommand};

use crate::sensors::SensorKind;

#[derive(Debug, Parser)]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Regulacja temperatury sterowana z konsoli (stdin)
    Run(RunArgs),
    /// Test przekaźników: chłodzenie, neutral, grzanie w pętli
    Cycle(CycleArgs),
}

#[derive(Debug, Args)]
pub struct RelayArgs {
    #[arg(long, default_value_t = 15)]
    pub heater_pin: u8,
    #[arg(long, default_value_t = 14)]
    pub fan_pin: u8,
    #[arg(long)]
    pub active_low: bool,
    //bez GPIO, przełączenia tylko w logach
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub relays: RelayArgs,
    #[arg(long, default_value_t = 21.0, value_parser = celsius)]
    pub desired: f32,
    #[arg(short, long)]
    pub power_saving: bool,
    #[arg(long, default_value_t = 5.0, value_parser = deadband)]
    pub deadband: f32,
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,
    #[arg(long, value_enum, default_value_t = SensorKind::Bmp280)]
    pub sensor: SensorKind,
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub sample_secs: u64,
    #[arg(long, default_value_t = 1800, value_parser = clap::value_parser!(u64).range(1..))]
    pub power_saving_sample_secs: u64,
    //bez konsoli (np. jako usługa systemd), działa aż do zakończenia procesu
    #[arg(long)]
    pub no_console: bool,
}

fn celsius(raw: &str) -> Result<f32, String> {
    match raw.parse::<f32>() {
        Ok(temp) if temp.is_finite() => Ok(temp),
        _ => Err(format!("`{raw}` is not a temperature")),
    }
}

//ujemna strefa odwróciłaby pasmo komfortu
fn deadband(raw: &str) -> Result<f32, String> {
    match celsius(raw)? {
        width if width >= 0.0 => Ok(width),
        _ => Err(format!("deadband must not be negative, got `{raw}`")),
    }
}

#[derive(Debug, Args)]
pub struct CycleArgs {
    #[command(flatten)]
    pub relays: RelayArgs,
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    pub dwell_ms: u64,
    #[arg(short, long, default_value_t = 3)]
    pub rounds: u32,
}
