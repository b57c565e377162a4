use crate::config::{HardwareConfig, SimulatorConfig};
use crate::elevator::hardware::{distance_to_echo, OutputPin, RangeSensor, RangingError, RelayBank};
use crate::shared::RelayOutputs;
use embedded_hal::digital::ErrorType;
use log::trace;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/**
 * # Simulated hoist
 * Stand-in for the shaft when no relay board or sensor is attached.
 *
 * A single `HoistModel` is shared between the four relay pins and the range
 * sensor. Pin writes set the relay levels of the model; each sensor probe first
 * integrates the platform motion over the wall time since the previous probe
 * and then answers with the echo time of the new position.
 *
 * # Fields
 *
 * - `relays`:  Relay bank wired to the model, ready for the controller.
 * - `sensor`:  Range sensor reading the model.
 * - `model`:   Shared handle for inspection.
 */
pub struct SimulatedHoist {
    pub relays: RelayBank<SimulatedRelayPin>,
    pub sensor: SimulatedSensor,
    pub model: Arc<Mutex<HoistModel>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayLine {
    Up,
    Down,
    Fast,
    Power,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoistModel {
    position: f32,
    min_distance: f32,
    max_distance: f32,
    slow_speed: f32,
    fast_speed: f32,
    relays: RelayOutputs,
}

pub struct SimulatedRelayPin {
    model: Arc<Mutex<HoistModel>>,
    line: RelayLine,
}

pub struct SimulatedSensor {
    model: Arc<Mutex<HoistModel>>,
    last_probe: Option<Instant>,
    probes: u32,
    dropout_every: u32,
    echo_timeout: Duration,
}

impl SimulatedHoist {
    pub fn build(config: &SimulatorConfig, hardware: &HardwareConfig) -> SimulatedHoist {
        let model = Arc::new(Mutex::new(HoistModel::new(config)));
        let pin = |line| SimulatedRelayPin {
            model: model.clone(),
            line,
        };
        let relays = RelayBank::new(
            pin(RelayLine::Up),
            pin(RelayLine::Down),
            pin(RelayLine::Fast),
            pin(RelayLine::Power),
        );
        let sensor = SimulatedSensor {
            model: model.clone(),
            last_probe: None,
            probes: 0,
            dropout_every: config.dropout_every,
            echo_timeout: hardware.echo_timeout(),
        };
        SimulatedHoist {
            relays,
            sensor,
            model,
        }
    }

    pub fn position(&self) -> f32 {
        lock(&self.model).position()
    }
}

impl HoistModel {
    pub fn new(config: &SimulatorConfig) -> HoistModel {
        HoistModel {
            position: config
                .start_distance
                .min(config.max_distance)
                .max(config.min_distance),
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            slow_speed: config.slow_speed,
            fast_speed: config.fast_speed,
            relays: RelayOutputs::default(),
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    #[cfg(test)]
    pub fn relays(&self) -> RelayOutputs {
        self.relays
    }

    pub fn set_line(&mut self, line: RelayLine, active: bool) {
        match line {
            RelayLine::Up => self.relays.up = active,
            RelayLine::Down => self.relays.down = active,
            RelayLine::Fast => self.relays.fast = active,
            RelayLine::Power => self.relays.power = active,
        }
    }

    /// Platform velocity in cm/s, positive moving up (away from the sensor).
    pub fn velocity(&self) -> f32 {
        if !self.relays.power {
            return 0.0;
        }
        let speed = if self.relays.fast {
            self.fast_speed
        } else {
            self.slow_speed
        };
        match (self.relays.up, self.relays.down) {
            (true, false) => speed,
            (false, true) => -speed,
            // Both contactors pulled in is a fault; the motor does not turn
            _ => 0.0,
        }
    }

    pub fn step(&mut self, dt: Duration) {
        let moved = self.velocity() * dt.as_secs_f32();
        self.position = (self.position + moved)
            .min(self.max_distance)
            .max(self.min_distance);
    }
}

fn lock(model: &Mutex<HoistModel>) -> MutexGuard<'_, HoistModel> {
    model.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ErrorType for SimulatedRelayPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedRelayPin {
    fn set_high(&mut self) -> Result<(), Infallible> {
        lock(&self.model).set_line(self.line, false);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Infallible> {
        lock(&self.model).set_line(self.line, true);
        Ok(())
    }
}

impl SimulatedSensor {
    fn probe_at(&mut self, now: Instant) -> Result<Duration, RangingError> {
        let mut model = lock(&self.model);
        if let Some(last) = self.last_probe {
            model.step(now.saturating_duration_since(last));
        }
        self.last_probe = Some(now);
        self.probes = self.probes.wrapping_add(1);
        trace!("Simulated platform at {:.2} cm", model.position());

        let timeout = RangingError::Timeout {
            waited: self.echo_timeout,
        };
        if self.dropout_every > 0 && self.probes % self.dropout_every == 0 {
            return Err(timeout);
        }
        let echo = distance_to_echo(model.position());
        if echo > self.echo_timeout {
            return Err(timeout);
        }
        Ok(echo)
    }
}

impl RangeSensor for SimulatedSensor {
    fn trigger(&mut self) -> Result<Duration, RangingError> {
        self.probe_at(Instant::now())
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod simulator_tests {
    use super::*;
    use crate::elevator::hardware::echo_to_distance_cm;

    fn sim_config() -> SimulatorConfig {
        SimulatorConfig {
            start_distance: 50.0,
            min_distance: 2.0,
            max_distance: 100.0,
            slow_speed: 4.0,
            fast_speed: 10.0,
            dropout_every: 0,
        }
    }

    #[test]
    fn test_model_needs_master_power() {
        // Arrange
        let mut model = HoistModel::new(&sim_config());
        model.set_line(RelayLine::Up, true);

        // Act
        model.step(Duration::from_secs(1));

        // Assert
        assert_eq!(model.position(), 50.0);
    }

    #[test]
    fn test_model_moves_with_relays() {
        let mut model = HoistModel::new(&sim_config());
        model.set_line(RelayLine::Power, true);

        model.set_line(RelayLine::Up, true);
        model.step(Duration::from_secs(2));
        assert!((model.position() - 58.0).abs() < 1e-4);

        model.set_line(RelayLine::Fast, true);
        model.step(Duration::from_secs(1));
        assert!((model.position() - 68.0).abs() < 1e-4);

        model.set_line(RelayLine::Up, false);
        model.set_line(RelayLine::Down, true);
        model.step(Duration::from_secs(1));
        assert!((model.position() - 58.0).abs() < 1e-4);

        model.set_line(RelayLine::Up, true);
        model.step(Duration::from_secs(1));
        assert!((model.position() - 58.0).abs() < 1e-4);
    }

    #[test]
    fn test_model_clamps_to_travel_limits() {
        let mut model = HoistModel::new(&sim_config());
        model.set_line(RelayLine::Power, true);
        model.set_line(RelayLine::Down, true);

        model.step(Duration::from_secs(60));

        assert_eq!(model.position(), 2.0);
    }

    #[test]
    fn test_relay_pins_are_active_low() {
        // Arrange
        let hoist = SimulatedHoist::build(&sim_config(), &HardwareConfig::default());
        let mut relays = hoist.relays;

        // Act
        relays.power.activate();
        relays.down.activate();

        // Assert
        let model = lock(&hoist.model);
        assert_eq!(
            model.relays(),
            RelayOutputs {
                down: true,
                power: true,
                ..RelayOutputs::default()
            }
        );
    }

    #[test]
    fn test_sensor_integrates_motion_between_probes() {
        // Arrange
        let hoist = SimulatedHoist::build(&sim_config(), &HardwareConfig::default());
        let mut sensor = hoist.sensor;
        {
            let mut model = lock(&hoist.model);
            model.set_line(RelayLine::Power, true);
            model.set_line(RelayLine::Up, true);
        }
        let start = Instant::now();

        // Act
        let first = sensor.probe_at(start).unwrap();
        let second = sensor.probe_at(start + Duration::from_millis(500)).unwrap();

        // Assert
        assert!((echo_to_distance_cm(first) - 50.0).abs() < 1e-2);
        assert!((echo_to_distance_cm(second) - 52.0).abs() < 1e-2);
    }

    #[test]
    fn test_sensor_dropout() {
        let config = SimulatorConfig {
            dropout_every: 3,
            ..sim_config()
        };
        let hoist = SimulatedHoist::build(&config, &HardwareConfig::default());
        let mut sensor = hoist.sensor;

        let results: Vec<bool> = (0..6).map(|_| sensor.trigger().is_ok()).collect();

        assert_eq!(results, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_sensor_out_of_range_times_out() {
        let config = SimulatorConfig {
            start_distance: 700.0,
            max_distance: 800.0,
            ..sim_config()
        };
        let hoist = SimulatedHoist::build(&config, &HardwareConfig::default());
        let mut sensor = hoist.sensor;

        assert!(sensor.trigger().is_err());
    }
}
