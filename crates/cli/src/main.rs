use clap::Parser;
use commands::WscApp;
use std::process::ExitCode;

mod commands;
mod utils;

fn main() -> ExitCode {
    match WscApp::parse().execute() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("wsc: {error:#}");
            ExitCode::FAILURE
        }
    }
}
