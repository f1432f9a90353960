pub mod bmp;
pub mod dht22;
pub mod poller;

use clap::ValueEnum;

use crate::error::SensorError;

pub use bmp::Bmp280Source;
pub use dht22::Dht22Source;
pub use poller::SensorPoller;

/// Źródło temperatury w pomieszczeniu (°C).
pub trait TemperatureSource {
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

impl<S: TemperatureSource + ?Sized> TemperatureSource for Box<S> {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        (**self).read_celsius()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SensorKind {
    Bmp280,
    Dht22,
}
