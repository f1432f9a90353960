use thiserror::Error;

/// Błąd sterowania wyjściem przekaźnika.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("gpio error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("actuator `{0}` is unavailable")]
    Unavailable(String),
}

/// Błąd odczytu temperatury.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor bus error: {0}")]
    Bus(String),

    #[error("sensor io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed sensor value: {0}")]
    Parse(String),
}

/// Błąd zwracany z `main`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("gpio setup failed: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
