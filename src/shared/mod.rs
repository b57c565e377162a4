#[macro_use]
pub mod macros;
pub mod structs;

pub use structs::Command;
pub use structs::Direction;
pub use structs::ElevatorState;
pub use structs::Mode;
pub use structs::MotorState;
pub use structs::RelayOutputs;
pub use structs::Speed;
