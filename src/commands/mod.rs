//! Command implementations

mod check_config;
mod run;
mod status;

pub use check_config::check_config;
pub use run::run;
pub use status::status;
