use bmp280::{Bmp280, Bmp280Builder};
use tracing::debug;

use super::TemperatureSource;
use crate::error::SensorError;

pub const DEFAULT_I2C_PATH: &str = "/dev/i2c-1";
pub const DEFAULT_ADDRESS: u16 = 0x76;

pub struct Bmp280Source {
    controller: Bmp280,
}

impl Bmp280Source {
    pub fn new(path: &str, address: u16) -> Result<Bmp280Source, SensorError> {
        let controller = Bmp280Builder::new()
            .path(path)
            .address(address)
            .build()
            .map_err(|e| SensorError::Bus(e.to_string()))?;

        debug!(path, address, "bmp280 ready");
        Ok(Bmp280Source { controller })
    }
}

impl TemperatureSource for Bmp280Source {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.controller
            .temperature_celsius()
            .map_err(|e| SensorError::Bus(format!("{e:?}")))
    }
}
