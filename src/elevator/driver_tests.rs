/*
 * Unit tests for the hoist driver thread
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 * - test_driver_publishes_initial_state
 * - test_driver_applies_commands
 * - test_driver_servoes_to_destination
 * - test_driver_terminate_powers_off
 * - test_driver_stops_when_commands_close
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod driver_tests {
    use crate::config::ControllerConfig;
    use crate::elevator::controller_tests::controller_tests::{setup_controller, TestController};
    use crate::elevator::HoistDriver;
    use crate::shared::{Command, Direction, ElevatorState, Mode, MotorState, Speed};
    use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
    use std::thread::{spawn, JoinHandle};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn setup_driver(
        distances: &[f32],
    ) -> (
        JoinHandle<TestController>,
        Sender<Command>,
        Receiver<ElevatorState>,
        Sender<()>,
    ) {
        // Arrange mock channels
        let (command_tx, command_rx) = unbounded::<Command>();
        let (state_tx, state_rx) = unbounded::<ElevatorState>();
        let (terminate_tx, terminate_rx) = unbounded::<()>();

        let config = ControllerConfig {
            update_period_ms: 5,
            ..ControllerConfig::default()
        };
        let driver = HoistDriver::new(
            &config,
            setup_controller(distances),
            command_rx,
            state_tx,
            terminate_rx,
        );

        (spawn(move || driver.run()), command_tx, state_rx, terminate_tx)
    }

    fn wait_for<F: Fn(&ElevatorState) -> bool>(state_rx: &Receiver<ElevatorState>, check: F) -> ElevatorState {
        loop {
            match state_rx.recv_timeout(TIMEOUT) {
                Ok(state) if check(&state) => return state,
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => panic!("Timed out waiting for state_rx"),
                Err(e) => panic!("Error receiving from state_rx: {:?}", e),
            }
        }
    }

    #[test]
    fn test_driver_publishes_initial_state() {
        // Arrange
        let (driver_thread, _command_tx, state_rx, terminate_tx) = setup_driver(&[]);

        // Act
        let state = wait_for(&state_rx, |_| true);

        // Assert
        assert!(!state.powered);
        assert_eq!(state.mode, Mode::Manual);
        assert_eq!(state.motor_state, MotorState::Stopped);

        // Cleanup
        terminate_tx.send(()).unwrap();
        driver_thread.join().unwrap();
    }

    #[test]
    fn test_driver_applies_commands() {
        // Purpose: Commands sent over the channel reach the controller in order

        // Arrange
        let (driver_thread, command_tx, state_rx, terminate_tx) = setup_driver(&[]);

        // Act
        command_tx.send(Command::PowerOn).unwrap();
        command_tx.send(Command::DownSlow).unwrap();
        command_tx.send(Command::Fast).unwrap();

        // Assert
        let state = wait_for(&state_rx, |s| s.speed == Speed::Fast);
        assert_eq!(state.direction, Direction::Down);
        assert!(state.relays.down && state.relays.fast && state.relays.power);

        // Cleanup
        terminate_tx.send(()).unwrap();
        driver_thread.join().unwrap();
    }

    #[test]
    fn test_driver_servoes_to_destination() {
        // Purpose: The periodic tick drives the automatic approach to arrival

        // Arrange
        let mut distances = vec![40.0; 20];
        distances.extend_from_slice(&[30.0, 24.0, 21.0, 19.9]);
        let (driver_thread, command_tx, state_rx, terminate_tx) = setup_driver(&distances);

        // Act
        command_tx.send(Command::PowerOn).unwrap();
        command_tx.send(Command::Automatic).unwrap();
        command_tx.send(Command::GoTo(20.0)).unwrap();

        // Assert
        let moving = wait_for(&state_rx, |s| s.motor_state == MotorState::Running);
        assert_eq!(moving.direction, Direction::Down);

        let arrived = wait_for(&state_rx, |s| {
            s.motor_state == MotorState::Stopped && s.destination.is_none()
        });
        assert!(arrived.powered);
        assert!((arrived.current_distance - 19.9).abs() < 1e-3);

        // Cleanup
        terminate_tx.send(()).unwrap();
        driver_thread.join().unwrap();
    }

    #[test]
    fn test_driver_terminate_powers_off() {
        // Arrange
        let (driver_thread, command_tx, state_rx, terminate_tx) = setup_driver(&[]);
        command_tx.send(Command::PowerOn).unwrap();
        command_tx.send(Command::UpSlow).unwrap();
        wait_for(&state_rx, |s| s.motor_state == MotorState::Running);

        // Act
        terminate_tx.send(()).unwrap();
        let controller = driver_thread.join().unwrap();

        // Assert
        assert!(!controller.is_powered());
        assert_eq!(controller.motor_state(), MotorState::Stopped);
        let last = wait_for(&state_rx, |s| !s.powered);
        assert_eq!(last.direction, Direction::None);
    }

    #[test]
    fn test_driver_stops_when_commands_close() {
        let (driver_thread, command_tx, _state_rx, _terminate_tx) = setup_driver(&[]);
        command_tx.send(Command::PowerOn).unwrap();

        drop(command_tx);
        let controller = driver_thread.join().unwrap();

        assert!(!controller.is_powered());
    }
}
