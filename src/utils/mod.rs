pub mod config_loader;
pub mod constants;
pub mod decimal;

pub use config_loader::*;
pub use constants::*;
pub use decimal::{amount_to_decimal, locked_value};
