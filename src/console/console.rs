/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{info, warn};
use std::io::{self, BufRead, Write};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::console::parser::{parse_line, ConsoleInput, HELP};
use crate::shared::Command;
use crate::telemetry::{read_latest, SharedState};

/**
 * # Console
 * Line-oriented operator console, standing in for the panel buttons.
 *
 * Reads one command per line from `input`, forwards controller commands on
 * `command_tx` and answers on `output`. `quit` or the end of input sends the
 * terminate signal.
 *
 * # Fields
 *
 * - `command_tx`:      Sender for controller commands.
 * - `terminate_tx`:    Sender for the shutdown signal.
 * - `latest`:          Latest telemetry snapshot, printed by `status`.
 */
pub struct Console {
    command_tx: cbc::Sender<Command>,
    terminate_tx: cbc::Sender<()>,
    latest: SharedState,
}

impl Console {
    pub fn new(
        command_tx: cbc::Sender<Command>,
        terminate_tx: cbc::Sender<()>,
        latest: SharedState,
    ) -> Console {
        Console {
            command_tx,
            terminate_tx,
            latest,
        }
    }

    pub fn run<R: BufRead, W: Write>(self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            match parse_line(&line?) {
                Ok(ConsoleInput::Command(command)) => {
                    if self.command_tx.send(command).is_err() {
                        warn!("Controller is gone, dropping {:?}", command);
                        break;
                    }
                }
                Ok(ConsoleInput::Status) => writeln!(output, "{}", read_latest(&self.latest))?,
                Ok(ConsoleInput::Help) => writeln!(output, "{}", HELP)?,
                Ok(ConsoleInput::Quit) => break,
                Ok(ConsoleInput::Empty) => {}
                Err(e) => writeln!(output, "error: {}", e)?,
            }
        }

        info!("Console closed");
        let _ = self.terminate_tx.send(());
        Ok(())
    }
}

/***************************************/
/*             Unit tests              */
/***************************************/
