use crate::config::HardwareConfig;
use crate::shared::RelayOutputs;
use embedded_hal::delay::DelayNs;
pub use embedded_hal::digital::{InputPin, OutputPin};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Speed of sound in cm per microsecond.
pub const SOUND_CM_PER_US: f32 = 0.034;

/**
 * # Hardware interface
 * Capability traits the position controller is written against.
 *
 * The controller never touches hardware registers directly. It is handed
 * embedded-hal pins and a range sensor at construction, so the same control
 * logic runs against Linux GPIO, the simulated hoist, or the fakes used by the
 * unit tests.
 *
 * # Traits
 *
 * - `OutputPin`:    embedded-hal digital output (relay coil, sensor trigger).
 * - `InputPin`:     embedded-hal digital input (sensor echo).
 * - `RangeSensor`:  One ranging probe returning the echo pulse width.
 */
pub trait RangeSensor {
    fn trigger(&mut self) -> Result<Duration, RangingError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangingError {
    #[error("no echo within {waited:?}")]
    Timeout { waited: Duration },
    #[error("echo line could not be read")]
    EchoRead,
}

/// Converts an echo pulse width into a distance in centimeters.
pub fn echo_to_distance_cm(echo: Duration) -> f32 {
    let micros = echo.as_nanos() as f64 / 1000.0;
    (micros as f32) * SOUND_CM_PER_US / 2.0
}

/// Inverse of [`echo_to_distance_cm`].
pub fn distance_to_echo(distance_cm: f32) -> Duration {
    let micros = f64::from(distance_cm.max(0.0)) * 2.0 / f64::from(SOUND_CM_PER_US);
    Duration::from_nanos((micros * 1000.0).round() as u64)
}

/***************************************/
/*               Relays                */
/***************************************/

/// Active-low relay: a low level energises the coil.
pub struct Relay<P: OutputPin> {
    pin: P,
    active: bool,
}

impl<P: OutputPin> Relay<P> {
    pub fn new(mut pin: P) -> Relay<P> {
        pin.set_high().ok();
        Relay { pin, active: false }
    }

    pub fn activate(&mut self) {
        self.pin.set_low().ok();
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.pin.set_high().ok();
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn pin(&self) -> &P {
        &self.pin
    }
}

/**
 * The four relays of the hoist contactor panel.
 *
 * # Fields
 *
 * - `up`:      Up direction, slow winding.
 * - `down`:    Down direction, slow winding.
 * - `fast`:    Fast winding, only meaningful together with a direction relay.
 * - `power`:   Master power contactor.
 */
pub struct RelayBank<P: OutputPin> {
    pub up: Relay<P>,
    pub down: Relay<P>,
    pub fast: Relay<P>,
    pub power: Relay<P>,
}

impl<P: OutputPin> RelayBank<P> {
    /// Takes ownership of the four relay pins and drives them all inactive.
    pub fn new(up: P, down: P, fast: P, power: P) -> RelayBank<P> {
        RelayBank {
            up: Relay::new(up),
            down: Relay::new(down),
            fast: Relay::new(fast),
            power: Relay::new(power),
        }
    }

    pub fn release_motion(&mut self) {
        self.up.deactivate();
        self.down.deactivate();
        self.fast.deactivate();
    }

    pub fn release_all(&mut self) {
        self.release_motion();
        self.power.deactivate();
    }

    pub fn outputs(&self) -> RelayOutputs {
        RelayOutputs {
            up: self.up.is_active(),
            down: self.down.is_active(),
            fast: self.fast.is_active(),
            power: self.power.is_active(),
        }
    }
}

/***************************************/
/*         Ultrasonic sensor           */
/***************************************/

/**
 * # Ultrasonic Sensor
 * Trigger/echo ranging probe (HC-SR04 style).
 *
 * A probe drives the trigger line low for `trigger_settle_us`, high for
 * `trigger_pulse_us`, then low again, and times the high pulse on the echo
 * line. Every echo wait is a bounded busy-wait sharing a single `echo_timeout`
 * budget; running out of budget yields `RangingError::Timeout` instead of a
 * zero reading.
 */
pub struct UltrasonicSensor<T: OutputPin, E: InputPin, D: DelayNs> {
    trigger: T,
    echo: E,
    delay: D,
    echo_timeout: Duration,
    trigger_pulse_us: u32,
    trigger_settle_us: u32,
}

impl<T: OutputPin, E: InputPin, D: DelayNs> UltrasonicSensor<T, E, D> {
    pub fn new(config: &HardwareConfig, mut trigger: T, echo: E, delay: D) -> UltrasonicSensor<T, E, D> {
        trigger.set_low().ok();
        UltrasonicSensor {
            trigger,
            echo,
            delay,
            echo_timeout: config.echo_timeout(),
            trigger_pulse_us: config.trigger_pulse_us,
            trigger_settle_us: config.trigger_settle_us,
        }
    }

    fn wait_for_echo(&mut self, high: bool, deadline: Instant) -> Result<Instant, RangingError> {
        loop {
            let now = Instant::now();
            let level = self.echo.is_high().map_err(|_| RangingError::EchoRead)?;
            if level == high {
                return Ok(now);
            }
            if now >= deadline {
                return Err(RangingError::Timeout {
                    waited: self.echo_timeout,
                });
            }
            std::hint::spin_loop();
        }
    }
}

impl<T: OutputPin, E: InputPin, D: DelayNs> RangeSensor for UltrasonicSensor<T, E, D> {
    fn trigger(&mut self) -> Result<Duration, RangingError> {
        self.trigger.set_low().ok();
        self.delay.delay_us(self.trigger_settle_us);
        self.trigger.set_high().ok();
        self.delay.delay_us(self.trigger_pulse_us);
        self.trigger.set_low().ok();

        let deadline = Instant::now() + self.echo_timeout;

        // A previous pulse may still be on the line
        self.wait_for_echo(false, deadline)?;
        let rise = self.wait_for_echo(true, deadline)?;
        let fall = self.wait_for_echo(false, deadline)?;
        Ok(fall.duration_since(rise))
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
