use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info, warn};

use super::actuator::Actuator;
use super::tcu::{State, TemperatureControlUnit};

/// Przełącznik "Auto": w trybie ręcznym pętla wymusza wybrany stan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Auto,
    Manual(State),
}

/// Wejścia regulatora zapisywane przez inne wątki (czujnik, konsola).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlInputs {
    pub current_temp: Option<f32>,
    pub desired_temp: Option<f32>,
    pub power_saving: bool,
    pub mode: Mode,
}

pub type SharedInputs = Arc<RwLock<ControlInputs>>;

pub fn shared_inputs(inputs: ControlInputs) -> SharedInputs {
    Arc::new(RwLock::new(inputs))
}

//kopia wejść pod blokadą odczytu, żeby nie czytać połowy zapisu innego wątku
pub fn snapshot(inputs: &SharedInputs) -> ControlInputs {
    *inputs.read().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub enum Message {
    Break,
}

type Unit<H, F> = TemperatureControlUnit<H, F>;

pub struct ControlLoop<H, F>
where
    H: Actuator + Send + 'static,
    F: Actuator + Send + 'static,
{
    unit: Option<Unit<H, F>>,
    inputs: SharedInputs,
    active: Arc<RwLock<State>>,
    interval: Duration,
    tx: Option<Sender<Message>>,
    thread_handler: Option<JoinHandle<Unit<H, F>>>,
}

impl<H, F> ControlLoop<H, F>
where
    H: Actuator + Send + 'static,
    F: Actuator + Send + 'static,
{
    pub fn new(unit: Unit<H, F>, inputs: SharedInputs, interval: Duration) -> ControlLoop<H, F> {
        let active = Arc::new(RwLock::new(unit.active_state()));
        ControlLoop {
            unit: Some(unit),
            inputs,
            active,
            interval,
            tx: None,
            thread_handler: None,
        }
    }

    pub fn start_thread(&mut self) {
        let Some(unit) = self.unit.take() else {
            return;
        };

        let (tx, rx) = mpsc::channel();
        let inputs = self.inputs.clone();
        let active = self.active.clone();
        let interval = self.interval;

        info!(unit = unit.name(), ?interval, "control loop started");
        let thread_handle = thread::spawn(move || thread_loop(unit, inputs, active, interval, rx));

        self.tx = Some(tx);
        self.thread_handler = Some(thread_handle);
    }

    /// Stan aktywny w chwili ostatniego taktu pętli.
    pub fn active_state(&self) -> State {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn inputs(&self) -> SharedInputs {
        self.inputs.clone()
    }

    /// Zatrzymuje wątek; przed wyjściem jednostka przechodzi w Neutral.
    /// Zwraca jednostkę, jeśli wątek zakończył się poprawnie.
    pub fn stop(&mut self) -> Option<Unit<H, F>> {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Message::Break);
        }
        match self.thread_handler.take()?.join() {
            Ok(unit) => Some(unit),
            Err(_) => {
                error!("control loop thread panicked");
                None
            }
        }
    }
}

impl<H, F> Drop for ControlLoop<H, F>
where
    H: Actuator + Send + 'static,
    F: Actuator + Send + 'static,
{
    fn drop(&mut self) {
        if self.thread_handler.is_some() {
            self.stop();
        }
    }
}

fn thread_loop<H: Actuator, F: Actuator>(
    mut unit: Unit<H, F>,
    inputs: SharedInputs,
    active: Arc<RwLock<State>>,
    interval: Duration,
    rx: Receiver<Message>,
) -> Unit<H, F> {
    let publish = |state: State| {
        *active.write().unwrap_or_else(PoisonError::into_inner) = state;
    };

    loop {
        tick(&mut unit, snapshot(&inputs));
        publish(unit.active_state());

        //oczekiwanie na kolejny takt, wiadomość Break przerywa je od razu
        match rx.recv_timeout(interval) {
            Ok(Message::Break) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => (),
        }
    }

    //bezpieczne wyłączenie: grzałka i wentylator wyłączone
    if let Err(e) = unit.set_to_neutral() {
        error!(unit = unit.name(), error = %e, "failed to switch outputs off on shutdown");
    }
    publish(unit.active_state());
    info!(unit = unit.name(), "control loop stopped");
    unit
}

fn tick<H: Actuator, F: Actuator>(unit: &mut Unit<H, F>, inputs: ControlInputs) {
    let result = match inputs.mode {
        Mode::Auto => unit
            .control(inputs.current_temp, inputs.desired_temp, inputs.power_saving)
            .map(|_| ()),
        Mode::Manual(state) => unit.force_state(state).map(|_| ()),
    };

    //awaria przekaźnika nie może zatrzymać regulacji, ponowienie w następnym takcie
    if let Err(e) = result {
        warn!(unit = unit.name(), error = %e, "actuator failure, retrying on next tick");
    }
}
