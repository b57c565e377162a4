/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Manual,
    Automatic,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MotorState {
    Stopped,
    Running,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    None,
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speed {
    None,
    Slow,
    Fast,
}

/// Levels of the four relays, `true` meaning energised.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayOutputs {
    pub up: bool,
    pub down: bool,
    pub fast: bool,
    pub power: bool,
}

/// Read-only telemetry snapshot of the position controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElevatorState {
    pub powered: bool,
    pub mode: Mode,
    #[serde(rename = "currentDistance")]
    pub current_distance: f32,
    pub destination: Option<f32>,
    #[serde(rename = "motorState")]
    pub motor_state: MotorState,
    pub direction: Direction,
    pub speed: Speed,
    pub relays: RelayOutputs,
}

/// Operator commands accepted by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    PowerOn,
    PowerOff,
    Manual,
    Automatic,
    UpSlow,
    DownSlow,
    Fast,
    Stop,
    GoTo(f32),
}

impl ElevatorState {
    pub fn new() -> ElevatorState {
        ElevatorState {
            powered: false,
            mode: Mode::Manual,
            current_distance: 0.0,
            destination: None,
            motor_state: MotorState::Stopped,
            direction: Direction::None,
            speed: Speed::None,
            relays: RelayOutputs::default(),
        }
    }
}

impl Default for ElevatorState {
    fn default() -> Self {
        ElevatorState::new()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Manual => write!(f, "manual"),
            Mode::Automatic => write!(f, "automatic"),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::None => write!(f, "-"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::None => write!(f, "-"),
            Speed::Slow => write!(f, "slow"),
            Speed::Fast => write!(f, "fast"),
        }
    }
}

impl fmt::Display for ElevatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let destination = match self.destination {
            Some(d) => format!("{:.1} cm", d),
            None => "-".to_string(),
        };
        write!(
            f,
            "power={} mode={} distance={:.1} cm destination={} motor={:?} direction={} speed={}",
            if self.powered { "on" } else { "off" },
            self.mode,
            self.current_distance,
            destination,
            self.motor_state,
            self.direction,
            self.speed,
        )
    }
}
