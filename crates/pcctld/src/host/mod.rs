//! Host-side actions: launching and stopping the managed program.

mod launcher;
mod pid_file;
mod program;

pub use launcher::{ProcessLauncher, StopSignal, SystemLauncher};
pub use pid_file::{PidFile, PidFileError};
pub use program::{ManagedProgram, register_browser_commands};

pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");
