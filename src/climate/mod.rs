pub mod actuator;
pub mod control_loop;
pub mod tcu;

pub use actuator::{Actuator, GpioRelay, LoggingActuator};
pub use control_loop::ControlLoop;
pub use tcu::{Bands, State, TemperatureControlUnit};
