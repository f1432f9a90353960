use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::PoisonError;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::TemperatureSource;
use crate::climate::control_loop::{snapshot, SharedInputs};

//granice ręcznej zmiany odświeżania z konsoli
pub const MIN_REFRESH: Duration = Duration::from_secs(1);
pub const MAX_REFRESH: Duration = Duration::from_secs(120);

#[derive(Debug, PartialEq)]
pub enum Message {
    SetInterval(Duration),
    ReadNow,
    Break,
}

/// Wątek odczytujący temperaturę i zapisujący ją do wspólnych wejść regulatora.
pub struct SensorPoller {
    source: Option<Box<dyn TemperatureSource + Send>>,
    inputs: SharedInputs,
    interval: Duration,
    power_saving_interval: Duration,
    tx: Sender<Message>,
    rx: Option<Receiver<Message>>,
    thread_handler: Option<JoinHandle<()>>,
}

impl SensorPoller {
    pub fn new(
        source: Box<dyn TemperatureSource + Send>,
        inputs: SharedInputs,
        interval: Duration,
        power_saving_interval: Duration,
    ) -> SensorPoller {
        //kanał tworzony od razu, żeby konsola mogła dostać nadajnik przed startem wątku
        let (tx, rx) = mpsc::channel();
        SensorPoller {
            source: Some(source),
            inputs,
            interval,
            power_saving_interval,
            tx,
            rx: Some(rx),
            thread_handler: None,
        }
    }

    pub fn start_thread(&mut self) {
        let (Some(source), Some(rx)) = (self.source.take(), self.rx.take()) else {
            return;
        };

        let inputs = self.inputs.clone();
        let interval = self.interval;
        let power_saving_interval = self.power_saving_interval;

        let thread_handle =
            thread::spawn(move || thread_loop(source, inputs, interval, power_saving_interval, rx));

        self.thread_handler = Some(thread_handle);
    }

    pub fn get_tx(&self) -> Sender<Message> {
        self.tx.clone()
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.thread_handler.take() {
            let _ = self.tx.send(Message::Break);
            let _ = handle.join();
        }
    }
}

impl Drop for SensorPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

/// W trybie oszczędzania energii odczyty są rzadsze (co najmniej `power_saving_interval`).
pub fn sample_interval(interval: Duration, power_saving_interval: Duration, power_saving: bool) -> Duration {
    if power_saving {
        interval.max(power_saving_interval)
    } else {
        interval
    }
}

pub fn refresh_interval(requested: Duration) -> Duration {
    requested.clamp(MIN_REFRESH, MAX_REFRESH)
}

//wyjście z trybu oszczędzania przywraca odświeżanie z konfiguracji
pub fn interval_after_toggle(current: Duration, configured: Duration, was_saving: bool, power_saving: bool) -> Duration {
    if was_saving && !power_saving {
        configured
    } else {
        current
    }
}

fn thread_loop(
    mut source: Box<dyn TemperatureSource + Send>,
    inputs: SharedInputs,
    configured: Duration,
    power_saving_interval: Duration,
    rx: Receiver<Message>,
) {
    info!(interval = ?configured, ?power_saving_interval, "sensor polling started");
    let mut interval = configured;
    let mut last_read: Option<Instant> = None;
    let mut was_saving = false;
    let mut read_now = false;

    loop {
        //przełącznik oszczędzania sprawdzany co `interval`, więc zmiana działa od razu
        let power_saving = snapshot(&inputs).power_saving;
        interval = interval_after_toggle(interval, configured, was_saving, power_saving);
        was_saving = power_saving;

        let period = sample_interval(interval, power_saving_interval, power_saving);
        let due = read_now || last_read.map_or(true, |at| at.elapsed() >= period);
        read_now = false;

        if due {
            last_read = Some(Instant::now());
            match source.read_celsius() {
                Ok(temp) => {
                    debug!(temp, "indoor temperature");
                    let mut inputs = inputs.write().unwrap_or_else(PoisonError::into_inner);
                    inputs.current_temp = Some(temp);
                }
                //ostatni poprawny odczyt zostaje w mocy
                Err(e) => warn!(error = %e, "temperature read failed"),
            }
        }

        match rx.recv_timeout(interval) {
            Ok(Message::Break) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(Message::SetInterval(requested)) => {
                interval = refresh_interval(requested);
                info!(?interval, "refresh interval changed");
            }
            Ok(Message::ReadNow) => read_now = true,
            Err(RecvTimeoutError::Timeout) => (),
        }
    }
    info!("sensor polling stopped");
}
