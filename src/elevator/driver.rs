use crate::config::ControllerConfig;
use crate::elevator::hardware::{OutputPin, RangeSensor};
use crate::elevator::PositionController;
use crate::shared::{Command, ElevatorState};
use crossbeam_channel as cbc;
use log::{debug, info};
use std::time::Duration;

/**
 * # Hoist Driver
 * Runs the position controller on its own thread.
 *
 * The driver is the only owner of the controller, so every command and every
 * control cycle is serialised through its loop. Commands arrive on a channel,
 * `update()` runs on a fixed tick, and a telemetry snapshot is published
 * whenever the state changes.
 *
 * # Fields
 *
 * - `controller`:      The position controller (relays + sensor).
 * - `update_period`:   Interval between control cycles.
 * - `command_rx`:      Receiver for operator commands.
 * - `state_tx`:        Sender for telemetry snapshots.
 * - `terminate_rx`:    Receiver for the shutdown signal.
 * - `last_published`:  Last snapshot sent on `state_tx`.
 */
pub struct HoistDriver<P: OutputPin, S: RangeSensor> {
    controller: PositionController<P, S>,
    update_period: Duration,
    command_rx: cbc::Receiver<Command>,
    state_tx: cbc::Sender<ElevatorState>,
    terminate_rx: cbc::Receiver<()>,
    last_published: Option<ElevatorState>,
}

impl<P: OutputPin, S: RangeSensor> HoistDriver<P, S> {
    pub fn new(
        config: &ControllerConfig,
        controller: PositionController<P, S>,
        command_rx: cbc::Receiver<Command>,
        state_tx: cbc::Sender<ElevatorState>,
        terminate_rx: cbc::Receiver<()>,
    ) -> HoistDriver<P, S> {
        HoistDriver {
            controller,
            update_period: config.update_period(),
            command_rx,
            state_tx,
            terminate_rx,
            last_published: None,
        }
    }

    /// Drives the controller until terminated, then powers it off and hands it back.
    pub fn run(mut self) -> PositionController<P, S> {
        let ticker = cbc::tick(self.update_period);
        self.publish();

        loop {
            cbc::select! {
                recv(self.command_rx) -> command => {
                    match command {
                        Ok(command) => {
                            debug!("Command: {:?}", command);
                            self.controller.apply(command);
                            self.publish();
                        }
                        Err(_) => {
                            info!("Command channel closed");
                            break;
                        }
                    }
                }
                recv(ticker) -> _ => {
                    self.controller.update();
                    self.publish();
                }
                recv(self.terminate_rx) -> _ => {
                    info!("Terminating hoist driver");
                    break;
                }
            }
        }

        self.controller.power_off();
        self.publish();
        self.controller
    }

    fn publish(&mut self) {
        let state = self.controller.state();
        if self.last_published.as_ref() == Some(&state) {
            return;
        }
        let _ = self.state_tx.send(state.clone());
        self.last_published = Some(state);
    }
}
