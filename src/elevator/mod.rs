pub mod controller;
pub mod driver;
#[cfg(feature = "gpio")]
pub mod gpio;
pub mod hardware;
pub mod simulator;

mod driver_tests;

pub use controller::PositionController;
pub use driver::HoistDriver;
#[cfg(feature = "gpio")]
pub use gpio::GpioHoist;
pub use simulator::SimulatedHoist;
