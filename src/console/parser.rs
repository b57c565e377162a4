/***************************************/
/*        3rd party libraries          */
/***************************************/
use thiserror::Error;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::Command;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleInput {
    Command(Command),
    Status,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs a distance in cm")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a valid distance")]
    InvalidDistance(String),
    #[error("'{command}' takes no argument, got '{argument}'")]
    UnexpectedArgument { command: String, argument: String },
}

pub const HELP: &str = "\
commands:
  on | off          master power
  manual | auto     operating mode
  up | down         manual slow move
  fast              engage fast speed during a manual move
  stop              manual stop
  goto <cm>         automatic move to a distance
  status            print the latest telemetry
  quit              power off and exit";

/***************************************/
/*             Public API              */
/***************************************/
/// Parses one console line. Keywords are case-insensitive.
pub fn parse_line(line: &str) -> Result<ConsoleInput, CommandParseError> {
    let mut words = line.split_whitespace();
    let keyword = match words.next() {
        Some(word) => word.to_ascii_lowercase(),
        None => return Ok(ConsoleInput::Empty),
    };
    let argument = words.next();

    if keyword == "goto" || keyword == "go" {
        let value = argument.ok_or(CommandParseError::MissingArgument("goto"))?;
        let target = value
            .parse::<f32>()
            .ok()
            .filter(|d| d.is_finite())
            .ok_or_else(|| CommandParseError::InvalidDistance(value.to_string()))?;
        return Ok(ConsoleInput::Command(Command::GoTo(target)));
    }

    let input = match keyword.as_str() {
        "on" => ConsoleInput::Command(Command::PowerOn),
        "off" => ConsoleInput::Command(Command::PowerOff),
        "manual" => ConsoleInput::Command(Command::Manual),
        "auto" | "automatic" => ConsoleInput::Command(Command::Automatic),
        "up" => ConsoleInput::Command(Command::UpSlow),
        "down" => ConsoleInput::Command(Command::DownSlow),
        "fast" => ConsoleInput::Command(Command::Fast),
        "stop" => ConsoleInput::Command(Command::Stop),
        "status" => ConsoleInput::Status,
        "help" | "?" => ConsoleInput::Help,
        "quit" | "exit" => ConsoleInput::Quit,
        _ => return Err(CommandParseError::Unknown(keyword)),
    };

    if let Some(argument) = argument {
        return Err(CommandParseError::UnexpectedArgument {
            command: keyword,
            argument: argument.to_string(),
        });
    }
    Ok(input)
}

/***************************************/
/*             Unit tests              */
/***************************************/
