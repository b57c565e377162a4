/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, info, warn};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::TelemetryConfig;
use crate::shared::ElevatorState;

/// Latest snapshot, shared with whoever displays it.
pub type SharedState = Arc<Mutex<ElevatorState>>;

pub fn read_latest(latest: &SharedState) -> ElevatorState {
    latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/**
 * Consumes controller snapshots.
 *
 * Logs every change of power, mode, motion or destination and keeps the
 * latest snapshot in `latest`. With `json` enabled each snapshot is also
 * written to `out` as one JSON line, for an external display.
 */
pub struct Telemetry<W: Write> {
    state_rx: cbc::Receiver<ElevatorState>,
    latest: SharedState,
    json: bool,
    out: W,
}

impl<W: Write> Telemetry<W> {
    pub fn new(config: &TelemetryConfig, state_rx: cbc::Receiver<ElevatorState>, out: W) -> Telemetry<W> {
        Telemetry {
            state_rx,
            latest: Arc::new(Mutex::new(ElevatorState::new())),
            json: config.json,
            out,
        }
    }

    pub fn latest(&self) -> SharedState {
        self.latest.clone()
    }

    /// Runs until every state sender is dropped.
    pub fn run(mut self) {
        for state in self.state_rx.iter() {
            let previous = read_latest(&self.latest);
            log_transition(&previous, &state);

            if self.json {
                match serde_json::to_string(&state) {
                    Ok(line) => {
                        if let Err(e) = writeln!(self.out, "{}", line) {
                            warn!("Failed to write telemetry: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to serialize telemetry: {}", e),
                }
            }

            *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = state;
        }
        debug!("Telemetry channel closed");
    }
}

fn log_transition(previous: &ElevatorState, state: &ElevatorState) {
    let changed = previous.powered != state.powered
        || previous.mode != state.mode
        || previous.destination != state.destination
        || previous.motor_state != state.motor_state
        || previous.direction != state.direction
        || previous.speed != state.speed;

    if changed {
        info!("{}", state);
    } else {
        debug!("Distance: {:.1} cm", state.current_distance);
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod telemetry_tests {
    use super::*;
    use crate::shared::{Direction, Mode, MotorState, Speed};
    use crossbeam_channel::unbounded;

    #[test]
    fn test_json_lines_and_latest_snapshot() {
        // Arrange
        let (state_tx, state_rx) = unbounded::<ElevatorState>();
        let mut out = Vec::new();
        let telemetry = Telemetry::new(&TelemetryConfig { json: true }, state_rx, &mut out);
        let latest = telemetry.latest();

        let moving = ElevatorState {
            powered: true,
            mode: Mode::Automatic,
            current_distance: 12.5,
            destination: Some(30.0),
            motor_state: MotorState::Running,
            direction: Direction::Up,
            speed: Speed::Fast,
            ..ElevatorState::new()
        };

        // Act
        state_tx.send(ElevatorState::new()).unwrap();
        state_tx.send(moving.clone()).unwrap();
        drop(state_tx);
        telemetry.run();

        // Assert
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: ElevatorState = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, moving);
        assert!(lines[1].contains("\"currentDistance\":12.5"));
        assert!(lines[1].contains("\"direction\":\"up\""));
        assert_eq!(read_latest(&latest), moving);
    }

    #[test]
    fn test_json_disabled_writes_nothing() {
        let (state_tx, state_rx) = unbounded::<ElevatorState>();
        let mut out = Vec::new();
        let telemetry = Telemetry::new(&TelemetryConfig { json: false }, state_rx, &mut out);
        let latest = telemetry.latest();

        state_tx.send(ElevatorState { powered: true, ..ElevatorState::new() }).unwrap();
        drop(state_tx);
        telemetry.run();

        assert!(out.is_empty());
        assert!(read_latest(&latest).powered);
    }
}
