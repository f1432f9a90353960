mod cli;
mod climate;
mod console;
mod error;
mod sensors;

use std::io;
use std::thread;
use std::time::Duration;

use clap::Parser;
use cli::{Action, Cli, CycleArgs, RelayArgs, RunArgs};
use climate::control_loop::{shared_inputs, ControlInputs};
use climate::{Actuator, Bands, ControlLoop, GpioRelay, LoggingActuator, TemperatureControlUnit};
use error::Error;
use rppal::gpio::Gpio;
use sensors::{bmp, Bmp280Source, Dht22Source, SensorKind, SensorPoller, TemperatureSource};
use tracing::{error, info, Level};

type Relay = Box<dyn Actuator + Send>;

fn main() -> Result<(), Error> {
    //Analizuj argumenty programu i utwórz strukturę Cli na jej podstawie
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.action {
        Action::Run(args) => run(args),
        Action::Cycle(args) => cycle(args),
    }
}

fn relays(args: &RelayArgs) -> Result<(Relay, Relay), Error> {
    if args.dry_run {
        info!("dry run, relays are simulated");
        return Ok((
            Box::new(LoggingActuator::new("heater")),
            Box::new(LoggingActuator::new("fan")),
        ));
    }

    let gpio = Gpio::new()?;
    let heater = GpioRelay::new(&gpio, args.heater_pin, "heater", args.active_low)?;
    let fan = GpioRelay::new(&gpio, args.fan_pin, "fan", args.active_low)?;
    info!(heater = args.heater_pin, fan = args.fan_pin, active_low = args.active_low, "gpio relays ready");
    Ok((Box::new(heater), Box::new(fan)))
}

fn temperature_source(kind: SensorKind) -> Result<Box<dyn TemperatureSource + Send>, Error> {
    let source: Box<dyn TemperatureSource + Send> = match kind {
        SensorKind::Bmp280 => Box::new(Bmp280Source::new(bmp::DEFAULT_I2C_PATH, bmp::DEFAULT_ADDRESS)?),
        SensorKind::Dht22 => Box::new(Dht22Source::default()),
    };
    Ok(source)
}

fn run(args: RunArgs) -> Result<(), Error> {
    let (heater, fan) = relays(&args.relays)?;
    let bands = Bands {
        power_saving_deadband: args.deadband,
        ..Bands::default()
    };
    let unit = TemperatureControlUnit::new("TCU", heater, fan, bands);

    let inputs = shared_inputs(ControlInputs {
        desired_temp: Some(args.desired),
        power_saving: args.power_saving,
        ..ControlInputs::default()
    });

    let mut poller = SensorPoller::new(
        temperature_source(args.sensor)?,
        inputs.clone(),
        Duration::from_secs(args.sample_secs),
        Duration::from_secs(args.power_saving_sample_secs),
    );
    let mut control = ControlLoop::new(unit, inputs, Duration::from_millis(args.interval_ms));

    poller.start_thread();
    control.start_thread();

    if args.no_console {
        //bez konsoli program kończy się tylko razem z procesem
        info!(desired = args.desired, power_saving = args.power_saving, "console disabled, running until terminated");
        loop {
            thread::park();
        }
    }

    info!(
        desired = args.desired,
        power_saving = args.power_saving,
        "commands: set <°C>, saving on|off, refresh <s>|now, auto, heat, cool, off, status, quit"
    );

    //konsola zastępuje panel sterowania, koniec wejścia kończy program
    let result = console::run(
        io::stdin().lock(),
        io::stdout(),
        &control.inputs(),
        &poller.get_tx(),
        || control.active_state(),
    );
    match &result {
        Ok(()) => info!("console closed (quit or end of input), switching outputs off"),
        Err(e) => error!(error = %e, "console failed, switching outputs off"),
    }

    poller.stop();
    control.stop();
    result?;
    Ok(())
}

fn cycle(args: CycleArgs) -> Result<(), Error> {
    let (heater, fan) = relays(&args.relays)?;
    let mut unit = TemperatureControlUnit::new("TCU", heater, fan, Bands::default());
    let dwell = Duration::from_millis(args.dwell_ms);

    //chłodzenie, neutral, grzanie, po `dwell` każde
    for round in 1..=args.rounds {
        info!(round, rounds = args.rounds, "relay test");
        unit.set_to_cool()?;
        thread::sleep(dwell);
        unit.set_to_neutral()?;
        thread::sleep(dwell);
        unit.set_to_heat()?;
        thread::sleep(dwell);
    }

    unit.set_to_neutral()?;
    Ok(())
}
