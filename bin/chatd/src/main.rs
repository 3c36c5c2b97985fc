#![deny(unsafe_code)]

use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = daemon::run(env::args_os(), &mut stdout, &mut stderr);
    ExitCode::from(status as u8)
}
