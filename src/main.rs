//! combotcha - announce new commits of watched git repositories on IRC

// Deny all clippy warnings in this crate
#![deny(clippy::all, clippy::pedantic, clippy::nursery, unsafe_code)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

mod cli;
mod commands;

/// Main entry point for the combotcha CLI
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
