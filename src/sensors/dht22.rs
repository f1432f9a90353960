use std::path::PathBuf;

use super::TemperatureSource;
use crate::error::SensorError;

//Dostęp do danych z DHT22 poprzez sterownik Linuksa
pub const DEFAULT_TEMP_PATH: &str = "/sys/bus/iio/devices/iio:device0/in_temp_input";

pub struct Dht22Source {
    temp_path: PathBuf,
}

impl Dht22Source {
    pub fn new(temp_path: impl Into<PathBuf>) -> Dht22Source {
        Dht22Source {
            temp_path: temp_path.into(),
        }
    }
}

impl Default for Dht22Source {
    fn default() -> Self {
        Dht22Source::new(DEFAULT_TEMP_PATH)
    }
}

impl TemperatureSource for Dht22Source {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let raw = std::fs::read_to_string(&self.temp_path)?;
        parse_millidegrees(&raw)
    }
}

//sterownik iio podaje wartość w tysięcznych częściach stopnia
pub fn parse_millidegrees(raw: &str) -> Result<f32, SensorError> {
    let raw = raw.trim_end();
    match raw.parse::<f32>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed / 1000.0),
        _ => Err(SensorError::Parse(raw.to_string())),
    }
}
