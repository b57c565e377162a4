use crate::config::HardwareConfig;
use crate::elevator::hardware::{RelayBank, UltrasonicSensor};
use linux_embedded_hal::{Delay, SysfsPin};
use log::info;
use sysfs_gpio::{Direction as PinDirection, Pin};
use thiserror::Error;

pub type GpioRelays = RelayBank<SysfsPin>;
pub type GpioSensor = UltrasonicSensor<SysfsPin, SysfsPin, Delay>;

#[derive(Debug, Error)]
#[error("GPIO {pin}: {source}")]
pub struct HardwareError {
    pin: u64,
    source: sysfs_gpio::Error,
}

/**
 * # GPIO hoist
 * Relay board and ultrasonic sensor on Linux sysfs GPIO lines.
 *
 * Relay lines are exported as outputs that start high, so every coil stays
 * released until the controller drives it. The echo line is an input.
 */
pub struct GpioHoist {
    pub relays: GpioRelays,
    pub sensor: GpioSensor,
}

impl GpioHoist {
    pub fn open(config: &HardwareConfig) -> Result<GpioHoist, HardwareError> {
        let relays = RelayBank::new(
            export(config.up_pin, PinDirection::High)?,
            export(config.down_pin, PinDirection::High)?,
            export(config.fast_pin, PinDirection::High)?,
            export(config.power_pin, PinDirection::High)?,
        );
        let sensor = UltrasonicSensor::new(
            config,
            export(config.trigger_pin, PinDirection::Low)?,
            export(config.echo_pin, PinDirection::In)?,
            Delay,
        );
        info!(
            "GPIO relays up={} down={} fast={} power={}, sensor trigger={} echo={}",
            config.up_pin, config.down_pin, config.fast_pin, config.power_pin, config.trigger_pin, config.echo_pin
        );
        Ok(GpioHoist { relays, sensor })
    }
}

fn export(number: u64, direction: PinDirection) -> Result<SysfsPin, HardwareError> {
    let pin = Pin::new(number);
    pin.export()
        .and_then(|_| pin.set_direction(direction))
        .map_err(|source| HardwareError { pin: number, source })?;
    Ok(SysfsPin(pin))
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod gpio_tests {
    use super::*;

    #[test]
    fn test_hardware_error_names_the_pin() {
        let error = HardwareError {
            pin: 27,
            source: sysfs_gpio::Error::Unexpected("not exported".to_string()),
        };

        assert!(error.to_string().starts_with("GPIO 27: "));
    }
}
