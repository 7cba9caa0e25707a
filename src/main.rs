//! stackrun - dependency-aware discovery for infrastructure units and stacks

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stackrun::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
