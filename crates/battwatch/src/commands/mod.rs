//! Command handlers: one module per subcommand.

pub mod check_config;
pub mod run;
pub mod status;
