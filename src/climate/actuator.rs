use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rppal::gpio::{Gpio, OutputPin};
use tracing::{debug, info};

use crate::error::ActuatorError;

/// Wyjście dwustanowe sterowane przez jednostkę: przekaźnik wentylatora lub grzałki.
pub trait Actuator {
    fn on(&mut self) -> Result<(), ActuatorError>;
    fn off(&mut self) -> Result<(), ActuatorError>;
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn on(&mut self) -> Result<(), ActuatorError> {
        (**self).on()
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        (**self).off()
    }
}

/// Przekaźnik (albo dioda LED) podłączony do pinu GPIO.
pub struct GpioRelay {
    name: String,
    pin: OutputPin,
    active_low: bool,
}

impl GpioRelay {
    //przejmuje pin jako wyjście, przekaźnik zostaje wyłączony
    pub fn new(gpio: &Gpio, pin: u8, name: &str, active_low: bool) -> Result<GpioRelay, ActuatorError> {
        let pin = gpio.get(pin)?;
        //stan nieaktywny zależy od sposobu podłączenia przekaźnika
        let mut pin = if active_low {
            pin.into_output_high()
        } else {
            pin.into_output_low()
        };
        //po zamknięciu programu pin zostaje w ostatnim stanie (Neutral = wyłączony)
        pin.set_reset_on_drop(false);

        debug!(relay = name, pin = pin.pin(), active_low, "gpio relay ready");
        Ok(GpioRelay {
            name: name.to_string(),
            pin,
            active_low,
        })
    }

    fn write(&mut self, energized: bool) {
        debug!(relay = %self.name, energized, "gpio write");
        if energized != self.active_low {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

impl Actuator for GpioRelay {
    fn on(&mut self) -> Result<(), ActuatorError> {
        self.write(true);
        Ok(())
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.write(false);
        Ok(())
    }
}

/// Podgląd stanu [`LoggingActuator`], działa także po przeniesieniu aktuatora do wątku sterującego.
#[derive(Clone, Debug, Default)]
pub struct ActuatorProbe {
    on: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl ActuatorProbe {
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    //każde kolejne wywołanie on/off zwróci błąd aż do wyczyszczenia flagi
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

/// Aktuator bez sprzętu, tylko loguje przełączenia. Używany przy `--dry-run` i w testach.
pub struct LoggingActuator {
    name: String,
    probe: ActuatorProbe,
}

impl LoggingActuator {
    pub fn new(name: &str) -> LoggingActuator {
        LoggingActuator {
            name: name.to_string(),
            probe: ActuatorProbe::default(),
        }
    }

    pub fn probe(&self) -> ActuatorProbe {
        self.probe.clone()
    }

    pub fn is_on(&self) -> bool {
        self.probe.is_on()
    }

    fn switch(&mut self, on: bool) -> Result<(), ActuatorError> {
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(ActuatorError::Unavailable(self.name.clone()));
        }
        let was_on = self.probe.on.swap(on, Ordering::SeqCst);
        if was_on != on {
            info!(actuator = %self.name, on, "switched");
        }
        Ok(())
    }
}

impl Actuator for LoggingActuator {
    fn on(&mut self) -> Result<(), ActuatorError> {
        self.switch(true)
    }

    fn off(&mut self) -> Result<(), ActuatorError> {
        self.switch(false)
    }
}
