pub mod console;
pub mod parser;

pub use console::Console;
