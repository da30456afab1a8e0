use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match pcctld::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(io::stderr(), "pcctld: {error}");
            ExitCode::FAILURE
        }
    }
}
