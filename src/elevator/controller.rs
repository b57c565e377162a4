use crate::config::ControllerConfig;
use crate::elevator::hardware::{echo_to_distance_cm, OutputPin, RangeSensor, RangingError, RelayBank};
use crate::shared::{Command, Direction, ElevatorState, Mode, MotorState, Speed};
use log::{debug, info, warn};

/**
 * Position controller for the hoist platform.
 *
 * The `PositionController` owns the relay bank and the range sensor. Manual
 * commands drive the relays directly; in automatic mode `update()` servoes the
 * platform toward the pending destination with two discrete speeds, switching
 * to slow once the remaining distance drops under the fast threshold.
 *
 * Every operation runs to completion on the caller's stack. Callers sharing a
 * controller across threads must serialise all mutating calls.
 *
 * # Fields
 * - `relays`:              Up, down, fast and master-power relays (active-low).
 * - `sensor`:              Ranging probe polled once per `update()`.
 * - `powered`:             Master enable.
 * - `mode`:                Manual or automatic operation.
 * - `current_distance`:    Last successful distance reading (cm).
 * - `destination`:         Pending automatic target, if any.
 * - `motor_state`:         Mirrors whether a direction relay is active.
 * - `direction`:           Active direction relay.
 * - `speed`:               Speed tier of the active move.
 * - `arrival_tolerance`:   Error band accepted as arrived.
 * - `fast_threshold`:      Remaining distance above which the fast relay is used.
 */
pub struct PositionController<P: OutputPin, S: RangeSensor> {
    relays: RelayBank<P>,
    sensor: S,

    powered: bool,
    mode: Mode,
    current_distance: f32,
    destination: Option<f32>,
    motor_state: MotorState,
    direction: Direction,
    speed: Speed,

    arrival_tolerance: f32,
    fast_threshold: f32,
}

impl<P: OutputPin, S: RangeSensor> PositionController<P, S> {
    pub fn new(config: &ControllerConfig, mut relays: RelayBank<P>, sensor: S) -> PositionController<P, S> {
        relays.release_all();
        PositionController {
            relays,
            sensor,
            powered: false,
            mode: Mode::Manual,
            current_distance: 0.0,
            destination: None,
            motor_state: MotorState::Stopped,
            direction: Direction::None,
            speed: Speed::None,
            arrival_tolerance: config.arrival_tolerance,
            fast_threshold: config.fast_threshold,
        }
    }

    /***************************************/
    /*            Power control            */
    /***************************************/
    pub fn power_on(&mut self) {
        if !self.powered {
            info!("Power on");
        }
        self.relays.power.activate();
        self.powered = true;
    }

    pub fn power_off(&mut self) {
        if self.powered {
            info!("Power off");
        }
        self.relays.release_all();
        self.powered = false;
        self.destination = None;
        self.mark_stopped();
    }

    /***************************************/
    /*            Mode control             */
    /***************************************/
    pub fn set_manual(&mut self) {
        if self.mode != Mode::Manual {
            info!("Mode: manual");
        }
        self.mode = Mode::Manual;
        self.destination = None;
    }

    pub fn set_automatic(&mut self) {
        if self.mode != Mode::Automatic {
            info!("Mode: automatic");
        }
        self.mode = Mode::Automatic;
        self.halt();
    }

    /***************************************/
    /*           Manual commands           */
    /***************************************/
    pub fn move_up_slow(&mut self) {
        if !self.manual_allowed("move up") {
            return;
        }
        self.destination = None;
        self.relays.down.deactivate();
        self.relays.up.activate();
        self.relays.fast.deactivate();
        self.mark_running(Direction::Up, Speed::Slow);
    }

    pub fn move_down_slow(&mut self) {
        if !self.manual_allowed("move down") {
            return;
        }
        self.destination = None;
        self.relays.up.deactivate();
        self.relays.down.activate();
        self.relays.fast.deactivate();
        self.mark_running(Direction::Down, Speed::Slow);
    }

    pub fn engage_fast(&mut self) {
        if !self.manual_allowed("engage fast") {
            return;
        }
        if self.direction == Direction::None {
            debug!("Ignoring fast: platform is not moving");
            return;
        }
        self.relays.fast.activate();
        self.mark_running(self.direction, Speed::Fast);
    }

    pub fn stop(&mut self) {
        if !self.manual_allowed("stop") {
            return;
        }
        self.halt();
    }

    /***************************************/
    /*         Automatic control           */
    /***************************************/
    pub fn go_to_destination(&mut self, target: f32) {
        if !self.powered || self.mode != Mode::Automatic {
            debug!("Ignoring destination {:.1}: needs power and automatic mode", target);
            return;
        }
        if !target.is_finite() {
            warn!("Ignoring non-finite destination {}", target);
            return;
        }
        info!("New destination: {:.1} cm", target);
        self.destination = Some(target);
    }

    /// Runs one control cycle: probe the sensor, then servo toward the destination.
    pub fn update(&mut self) {
        match self.measure_distance() {
            Ok(distance) => self.current_distance = distance,
            Err(e) => warn!(
                "Ranging failed ({}), keeping {:.1} cm",
                e, self.current_distance
            ),
        }

        let destination = match self.destination {
            Some(d) if self.powered && self.mode == Mode::Automatic => d,
            _ => return,
        };

        let error = destination - self.current_distance;

        if error.abs() <= self.arrival_tolerance {
            info!(
                "Arrived at {:.1} cm (measured {:.1} cm)",
                destination, self.current_distance
            );
            self.halt();
            return;
        }

        let direction = if error > 0.0 {
            self.relays.down.deactivate();
            self.relays.up.activate();
            Direction::Up
        } else {
            self.relays.up.deactivate();
            self.relays.down.activate();
            Direction::Down
        };

        let speed = if error.abs() > self.fast_threshold {
            self.relays.fast.activate();
            Speed::Fast
        } else {
            self.relays.fast.deactivate();
            Speed::Slow
        };

        self.mark_running(direction, speed);
    }

    /// One ranging probe, converted to centimeters.
    pub fn measure_distance(&mut self) -> Result<f32, RangingError> {
        self.sensor.trigger().map(echo_to_distance_cm)
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::PowerOn => self.power_on(),
            Command::PowerOff => self.power_off(),
            Command::Manual => self.set_manual(),
            Command::Automatic => self.set_automatic(),
            Command::UpSlow => self.move_up_slow(),
            Command::DownSlow => self.move_down_slow(),
            Command::Fast => self.engage_fast(),
            Command::Stop => self.stop(),
            Command::GoTo(target) => self.go_to_destination(target),
        }
    }

    /***************************************/
    /*              Telemetry              */
    /***************************************/
    pub fn state(&self) -> ElevatorState {
        ElevatorState {
            powered: self.powered,
            mode: self.mode,
            current_distance: self.current_distance,
            destination: self.destination,
            motor_state: self.motor_state,
            direction: self.direction,
            speed: self.speed,
            relays: self.relays.outputs(),
        }
    }

    /***************************************/
    /*           Private helpers           */
    /***************************************/
    fn manual_allowed(&self, what: &str) -> bool {
        if !self.powered || self.mode != Mode::Manual {
            debug!("Ignoring {}: needs power and manual mode", what);
            return false;
        }
        true
    }

    fn halt(&mut self) {
        self.relays.release_motion();
        self.destination = None;
        self.mark_stopped();
    }

    fn mark_running(&mut self, direction: Direction, speed: Speed) {
        debug!("Relays: {:?}", self.relays.outputs());
        self.motor_state = MotorState::Running;
        self.direction = direction;
        self.speed = speed;
    }

    fn mark_stopped(&mut self) {
        debug!("Relays: {:?}", self.relays.outputs());
        self.motor_state = MotorState::Stopped;
        self.direction = Direction::None;
        self.speed = Speed::None;
    }
}

/// Field accessors for assertions in the controller and driver tests.
#[cfg(test)]
impl<P: OutputPin, S: RangeSensor> PositionController<P, S> {
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn current_distance(&self) -> f32 {
        self.current_distance
    }

    pub fn destination(&self) -> Option<f32> {
        self.destination
    }

    pub fn motor_state(&self) -> MotorState {
        self.motor_state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn relays(&self) -> &RelayBank<P> {
        &self.relays
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}
