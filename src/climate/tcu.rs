use std::fmt;

use tracing::{debug, info, warn};

use super::actuator::Actuator;
use crate::error::ActuatorError;

/// Stan jednostki. Każdy stan ma stałą kombinację wyjść grzałki i wentylatora.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Cooling,
    Neutral,
    Heating,
}

impl State {
    /// (grzałka, wentylator)
    pub fn outputs(self) -> (bool, bool) {
        match self {
            State::Cooling => (false, true),
            State::Neutral => (false, false),
            State::Heating => (true, false),
        }
    }

    //najpierw wyłączenie, potem włączenie, żeby oba wyjścia nigdy nie były aktywne naraz
    pub fn apply<H: Actuator, F: Actuator>(self, heater: &mut H, fan: &mut F) -> Result<(), ActuatorError> {
        match self {
            State::Cooling => {
                heater.off()?;
                fan.on()
            }
            State::Neutral => {
                heater.off()?;
                fan.off()
            }
            State::Heating => {
                fan.off()?;
                heater.on()
            }
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Cooling => "cooling",
            State::Neutral => "neutral",
            State::Heating => "heating",
        };
        f.write_str(name)
    }
}

/// Geometria histerezy, wszystkie wartości w °C.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bands {
    pub power_saving_deadband: f32,
    pub enter_margin: f32,
    pub exit_margin: f32,
}

impl Bands {
    pub fn deadband(&self, power_saving: bool) -> f32 {
        //ujemna (albo NaN) strefa odwróciłaby pasmo, traktowana jak zero
        if power_saving {
            self.power_saving_deadband.max(0.0)
        } else {
            0.0
        }
    }
}

impl Default for Bands {
    fn default() -> Self {
        Bands {
            power_saving_deadband: 5.0,
            enter_margin: 3.0,
            exit_margin: 1.0,
        }
    }
}

pub struct TemperatureControlUnit<H, F> {
    name: String,
    heater: H,
    fan: F,
    bands: Bands,
    current_state: State,
    //ostatnie ustawienie wyjść się nie powiodło, ponów przy następnym wywołaniu
    outputs_stale: bool,
}

impl<H: Actuator, F: Actuator> TemperatureControlUnit<H, F> {
    pub fn new(name: &str, heater: H, fan: F, bands: Bands) -> TemperatureControlUnit<H, F> {
        let mut unit = TemperatureControlUnit {
            name: name.to_string(),
            heater,
            fan,
            bands,
            current_state: State::Neutral,
            outputs_stale: false,
        };
        //stan początkowy: Neutral, oba wyjścia wyłączone
        if let Err(e) = unit.enter(State::Neutral) {
            warn!(unit = %unit.name, error = %e, "initial neutral state not applied");
        }
        unit
    }

    /// Jeden krok regulatora. Brak odczytu (`None`) nic nie zmienia.
    ///
    /// Zwraca nowy stan, jeśli nastąpiło przejście.
    pub fn control(
        &mut self,
        current_temp: Option<f32>,
        desired_temp: Option<f32>,
        power_saving: bool,
    ) -> Result<Option<State>, ActuatorError> {
        let (Some(current), Some(desired)) = (current_temp, desired_temp) else {
            return Ok(None);
        };

        if self.outputs_stale {
            self.enter(self.current_state)?;
        }

        let deadband = self.bands.deadband(power_saving);
        let next = self.next_state(current, desired, deadband);
        if next == self.current_state {
            return Ok(None);
        }

        info!(
            unit = %self.name,
            from = %self.current_state,
            to = %next,
            current,
            desired,
            deadband,
            "state transition"
        );
        self.enter(next)?;
        Ok(Some(next))
    }

    //decyzja zależy od bieżącego stanu, progi wejścia i wyjścia są różne
    fn next_state(&self, current: f32, desired: f32, deadband: f32) -> State {
        let Bands {
            enter_margin,
            exit_margin,
            ..
        } = self.bands;

        match self.current_state {
            State::Cooling if current < desired + deadband - exit_margin => State::Neutral,
            State::Neutral if current > desired + deadband + enter_margin => State::Cooling,
            State::Neutral if current < desired - deadband - enter_margin => State::Heating,
            State::Heating if current > desired - deadband + exit_margin => State::Neutral,
            state => state,
        }
    }

    pub fn set_to_cool(&mut self) -> Result<(), ActuatorError> {
        self.enter(State::Cooling)
    }

    pub fn set_to_neutral(&mut self) -> Result<(), ActuatorError> {
        self.enter(State::Neutral)
    }

    pub fn set_to_heat(&mut self) -> Result<(), ActuatorError> {
        self.enter(State::Heating)
    }

    /// Tryb ręczny: ustawia `state` z pominięciem histerezy, o ile nie jest już aktywny
    /// (albo jego wyjścia nie zostały ustawione). Zwraca `true`, gdy coś zmieniono.
    pub fn force_state(&mut self, state: State) -> Result<bool, ActuatorError> {
        if state == self.current_state && !self.outputs_stale {
            return Ok(false);
        }
        info!(unit = %self.name, from = %self.current_state, to = %state, "forced state");
        self.enter(state)?;
        Ok(true)
    }

    //stan jest zapisywany nawet gdy wyjścia zawiodą, kolejne wywołanie control() je ponowi
    fn enter(&mut self, state: State) -> Result<(), ActuatorError> {
        self.current_state = state;
        self.outputs_stale = true;
        state.apply(&mut self.heater, &mut self.fan)?;
        self.outputs_stale = false;
        debug!(unit = %self.name, %state, "outputs applied");
        Ok(())
    }

    pub fn active_state(&self) -> State {
        self.current_state
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heater(&self) -> &H {
        &self.heater
    }

    pub fn fan(&self) -> &F {
        &self.fan
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::climate::actuator::LoggingActuator;

    type Unit = TemperatureControlUnit<LoggingActuator, LoggingActuator>;

    fn unit() -> Unit {
        TemperatureControlUnit::new(
            "TCU",
            LoggingActuator::new("heater"),
            LoggingActuator::new("fan"),
            Bands::default(),
        )
    }

    fn outputs(unit: &Unit) -> (bool, bool) {
        (unit.heater().is_on(), unit.fan().is_on())
    }

    #[test]
    fn starts_neutral_with_outputs_off() {
        let unit = unit();
        assert_eq!(unit.active_state(), State::Neutral);
        assert_eq!(outputs(&unit), (false, false));
        assert_eq!(unit.name(), "TCU");
    }

    #[test]
    fn neutral_enters_cooling_only_above_upper_band() {
        let mut unit = unit();

        assert_eq!(unit.control(Some(23.0), Some(20.0), false).unwrap(), None);
        assert_eq!(unit.active_state(), State::Neutral);

        assert_eq!(unit.control(Some(23.001), Some(20.0), false).unwrap(), Some(State::Cooling));
        assert_eq!(outputs(&unit), (false, true));
    }

    #[test]
    fn neutral_enters_heating_only_below_lower_band() {
        let mut unit = unit();

        unit.control(Some(17.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Neutral);

        unit.control(Some(16.9), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Heating);
        assert_eq!(outputs(&unit), (true, false));
    }

    #[test]
    fn cooling_exits_below_setpoint_minus_one() {
        let mut unit = unit();
        unit.set_to_cool().unwrap();

        assert_eq!(unit.control(Some(19.5), Some(20.0), false).unwrap(), None);
        assert_eq!(unit.active_state(), State::Cooling);

        assert_eq!(unit.control(Some(18.99), Some(20.0), false).unwrap(), Some(State::Neutral));
        assert_eq!(outputs(&unit), (false, false));
    }

    #[test]
    fn heating_exits_above_setpoint_plus_one() {
        let mut unit = unit();
        unit.set_to_heat().unwrap();

        unit.control(Some(21.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Heating);

        unit.control(Some(21.01), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Neutral);
    }

    #[test]
    fn cooling_never_jumps_straight_to_heating() {
        let mut unit = unit();
        unit.set_to_cool().unwrap();

        unit.control(Some(0.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Neutral);
        unit.control(Some(0.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Heating);
    }

    #[test]
    fn exit_threshold_differs_from_entry_threshold() {
        let mut unit = unit();

        //22 °C: za mało, żeby zacząć chłodzić, ale za dużo, żeby przestać
        unit.control(Some(22.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Neutral);

        unit.control(Some(24.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Cooling);

        unit.control(Some(22.0), Some(20.0), false).unwrap();
        assert_eq!(unit.active_state(), State::Cooling);
    }

    #[test]
    fn power_saving_widens_the_band() {
        let mut saving = unit();
        saving.control(Some(25.0), Some(20.0), true).unwrap();
        assert_eq!(saving.active_state(), State::Neutral);

        let mut normal = unit();
        normal.control(Some(25.0), Some(20.0), false).unwrap();
        assert_eq!(normal.active_state(), State::Cooling);

        saving.control(Some(28.5), Some(20.0), true).unwrap();
        assert_eq!(saving.active_state(), State::Cooling);
        //w trybie oszczędzania chłodzenie kończy się już poniżej 24 °C
        saving.control(Some(23.9), Some(20.0), true).unwrap();
        assert_eq!(saving.active_state(), State::Neutral);
    }

    #[test]
    fn custom_deadband_is_used() {
        let bands = Bands {
            power_saving_deadband: 2.0,
            ..Bands::default()
        };
        let mut unit = TemperatureControlUnit::new(
            "TCU",
            LoggingActuator::new("heater"),
            LoggingActuator::new("fan"),
            bands,
        );

        unit.control(Some(25.0), Some(20.0), true).unwrap();
        assert_eq!(unit.active_state(), State::Neutral);
        unit.control(Some(25.1), Some(20.0), true).unwrap();
        assert_eq!(unit.active_state(), State::Cooling);
    }

    #[test]
    fn invalid_deadband_does_not_invert_the_band() {
        for width in [-10.0, f32::NAN] {
            let bands = Bands {
                power_saving_deadband: width,
                ..Bands::default()
            };
            assert_eq!(bands.deadband(true), 0.0);

            let mut unit = TemperatureControlUnit::new(
                "TCU",
                LoggingActuator::new("heater"),
                LoggingActuator::new("fan"),
                bands,
            );
            for _ in 0..5 {
                unit.control(Some(20.0), Some(20.0), true).unwrap();
                assert_eq!(unit.active_state(), State::Neutral);
            }
        }
    }

    #[test]
    fn missing_reading_holds_state() {
        let mut unit = unit();
        unit.set_to_heat().unwrap();

        assert_eq!(unit.control(None, Some(20.0), false).unwrap(), None);
        assert_eq!(unit.control(Some(30.0), None, false).unwrap(), None);
        assert_eq!(unit.control(None, None, true).unwrap(), None);

        assert_eq!(unit.active_state(), State::Heating);
        assert_eq!(outputs(&unit), (true, false));
    }

    #[test]
    fn last_forced_state_wins() {
        let mut unit = unit();
        unit.set_to_heat().unwrap();
        unit.set_to_cool().unwrap();

        assert_eq!(unit.active_state(), State::Cooling);
        assert_eq!(outputs(&unit), (false, true));

        unit.set_to_neutral().unwrap();
        assert_eq!(outputs(&unit), (false, false));
    }

    #[test]
    fn failed_outputs_are_reapplied_on_next_tick() {
        let mut unit = unit();
        let fan = unit.fan().probe();

        fan.set_failing(true);
        assert!(unit.control(Some(30.0), Some(20.0), false).is_err());
        assert_eq!(unit.active_state(), State::Cooling);
        assert!(!unit.fan().is_on());

        fan.set_failing(false);
        assert_eq!(unit.control(Some(30.0), Some(20.0), false).unwrap(), None);
        assert_eq!(outputs(&unit), (false, true));
    }

    #[test]
    fn force_state_skips_an_already_active_state() {
        let mut unit = unit();

        assert!(!unit.force_state(State::Neutral).unwrap());
        assert!(unit.force_state(State::Heating).unwrap());
        assert!(!unit.force_state(State::Heating).unwrap());
        assert_eq!(outputs(&unit), (true, false));
    }

    #[test]
    fn state_outputs_are_exclusive() {
        for state in [State::Cooling, State::Neutral, State::Heating] {
            let (heater, fan) = state.outputs();
            assert!(!(heater && fan), "{state} drives both outputs");
        }
    }

    proptest! {
        #[test]
        fn outputs_always_match_the_active_state(
            steps in proptest::collection::vec(
                (proptest::option::of(-20.0f32..50.0), proptest::option::of(5.0f32..35.0), any::<bool>()),
                1..40,
            ),
        ) {
            let mut unit = unit();
            for (current, desired, saving) in steps {
                unit.control(current, desired, saving).unwrap();
                let (heater, fan) = outputs(&unit);
                prop_assert!(!(heater && fan));
                prop_assert_eq!((heater, fan), unit.active_state().outputs());
            }
        }
    }
}
