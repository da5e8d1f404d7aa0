//! Process runtime: the control thread and exit handling.

pub mod control;

pub use control::{exit_code, exit_with, ControlThread, EXIT_FATAL, EXIT_OK};
