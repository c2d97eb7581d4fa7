//! Pipeline entry points for the CLI commands.
//!
//! - `run_stations`: List stations from the registry
//! - `run_board`: Print the current arrivals of one or more stations
//! - `run_watch`: Redisplay a board every poll interval
//! - `run_monitor`: Run an arrival alert subscription until interrupted
//! - `run_validate`: Check configuration and registries

pub mod board;
pub mod monitor;
pub mod stations;
pub mod validate;

pub use board::{format_snapshot, run_board, run_watch};
pub use monitor::run_monitor;
pub use stations::run_stations;
pub use validate::run_validate;
