use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::sync::PoisonError;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::climate::control_loop::{snapshot, ControlInputs, Mode, SharedInputs};
use crate::climate::State;
use crate::sensors::poller::{self, Message};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    SetDesired(f32),
    PowerSaving(bool),
    Auto,
    Manual(State),
    Refresh(Refresh),
    Status,
    Quit,
}

//odpowiednik przycisków odświeżania z panelu
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Refresh {
    Every(Duration),
    Now,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` is not a temperature")]
    BadTemperature(String),
    #[error("expected `on` or `off`, got `{0}`")]
    BadToggle(String),
    #[error("expected `now` or seconds, got `{0}`")]
    BadRefresh(String),
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(ParseCommandError::Empty);
        };
        let arg = words.next().unwrap_or_default();

        match word.to_ascii_lowercase().as_str() {
            "set" => match arg.parse::<f32>() {
                Ok(temp) if temp.is_finite() => Ok(Command::SetDesired(temp)),
                _ => Err(ParseCommandError::BadTemperature(arg.to_string())),
            },
            "saving" => match arg {
                "on" => Ok(Command::PowerSaving(true)),
                "off" => Ok(Command::PowerSaving(false)),
                _ => Err(ParseCommandError::BadToggle(arg.to_string())),
            },
            "refresh" => match (arg, arg.parse::<u64>()) {
                ("now", _) => Ok(Command::Refresh(Refresh::Now)),
                (_, Ok(secs)) => Ok(Command::Refresh(Refresh::Every(poller::refresh_interval(
                    Duration::from_secs(secs),
                )))),
                _ => Err(ParseCommandError::BadRefresh(arg.to_string())),
            },
            "auto" => Ok(Command::Auto),
            "heat" => Ok(Command::Manual(State::Heating)),
            "cool" => Ok(Command::Manual(State::Cooling)),
            "off" => Ok(Command::Manual(State::Neutral)),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

//zmiany trafiają do pętli sterującej wyłącznie przez wspólne wejścia
pub fn apply(command: Command, inputs: &SharedInputs) {
    let mut inputs = inputs.write().unwrap_or_else(PoisonError::into_inner);
    match command {
        Command::SetDesired(temp) => inputs.desired_temp = Some(temp),
        Command::PowerSaving(on) => inputs.power_saving = on,
        Command::Auto => inputs.mode = Mode::Auto,
        Command::Manual(state) => inputs.mode = Mode::Manual(state),
        Command::Refresh(_) | Command::Status | Command::Quit => return,
    }
    info!(?command, "inputs updated");
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "off"
    }
}

fn celsius(temp: Option<f32>) -> String {
    match temp {
        Some(temp) => format!("{temp:.1} °C"),
        None => "--".to_string(),
    }
}

/// Linia statusu; wskaźniki "Heater" i "AC" wynikają z aktywnego stanu.
pub fn status_line(state: State, inputs: &ControlInputs) -> String {
    let (heater, ac) = state.outputs();
    let mode = match inputs.mode {
        Mode::Auto => "auto".to_string(),
        Mode::Manual(state) => format!("manual ({state})"),
    };
    format!(
        "state: {state} | Heater: {} | AC: {} | indoor: {} | desired: {} | saving: {} | mode: {mode}",
        on_off(heater),
        on_off(ac),
        celsius(inputs.current_temp),
        celsius(inputs.desired_temp),
        on_off(inputs.power_saving),
    )
}

//odświeżanie należy do wątku czujnika, trafia do niego przez kanał
fn refresh<W: Write>(request: Refresh, sensor: &Sender<Message>, output: &mut W) -> io::Result<()> {
    let message = match request {
        Refresh::Every(interval) => Message::SetInterval(interval),
        Refresh::Now => Message::ReadNow,
    };
    if sensor.send(message).is_err() {
        warn!(?request, "sensor polling is not running");
        writeln!(output, "error: sensor polling is not running")?;
    }
    Ok(())
}

/// Czyta polecenia do końca wejścia albo do `quit`.
pub fn run<R, W, S>(
    input: R,
    mut output: W,
    inputs: &SharedInputs,
    sensor: &Sender<Message>,
    active_state: S,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    S: Fn() -> State,
{
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Refresh(request)) => refresh(request, sensor, &mut output)?,
            Ok(Command::Status) => writeln!(output, "{}", status_line(active_state(), &snapshot(inputs)))?,
            Ok(command) => apply(command, inputs),
            Err(e) => writeln!(output, "error: {e}")?,
        }
    }
    Ok(())
}
