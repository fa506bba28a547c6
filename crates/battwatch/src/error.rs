//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` variants into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use battwatch_config::ConfigError;
use battwatch_core::CoreError;

/// Exit codes per the CLI contract.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the automation server at {url}")]
    #[diagnostic(
        code(battwatch::connection_failed),
        help(
            "Check that the server is running and accessible.\n\
             URL: {url}\n\
             Try: battwatch status -v"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Server ───────────────────────────────────────────────────────

    #[error("Server answered HTTP {status} for {url}")]
    #[diagnostic(
        code(battwatch::http_error),
        help("The server is reachable but refused the request. Check the base URL path.")
    )]
    Http { status: u16, url: String },

    #[error("Server rejected '{title}' with status '{status}'")]
    #[diagnostic(code(battwatch::api_error))]
    Api { status: String, title: String },

    #[error("Unreadable server response: {message}")]
    #[diagnostic(
        code(battwatch::payload),
        help("Is the base URL pointing at a Domoticz-compatible JSON API?")
    )]
    Payload { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(battwatch::validation),
        help("Run: battwatch check-config to inspect the merged configuration.")
    )]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(battwatch::config),
        help("Check the config file and BATTWATCH_* environment variables.")
    )]
    Config(Box<ConfigError>),

    // ── Engine ───────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(battwatch::engine))]
    Engine(CoreError),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── API / core error mapping ─────────────────────────────────────────

impl From<battwatch_api::Error> for CliError {
    fn from(err: battwatch_api::Error) -> Self {
        match err {
            battwatch_api::Error::Transport(e) => {
                let url = e
                    .url()
                    .map_or_else(|| "(unknown)".to_owned(), ToString::to_string);
                CliError::ConnectionFailed {
                    url,
                    source: Box::new(e),
                }
            }

            battwatch_api::Error::InvalidUrl(e) => CliError::Validation {
                field: "server.url".into(),
                reason: e.to_string(),
            },

            battwatch_api::Error::Http { status, url } => CliError::Http { status, url },

            battwatch_api::Error::Api { status, title } => CliError::Api { status, title },

            battwatch_api::Error::Deserialization { message, .. } => CliError::Payload { message },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(api) => api.into(),
            other => CliError::Engine(other),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_exit_with_the_connection_code() {
        let err = CliError::ConnectionFailed {
            url: "http://127.0.0.1:1".into(),
            source: "connection refused".into(),
        };
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }

    #[test]
    fn config_problems_exit_with_the_usage_code() {
        let err: CliError = ConfigError::Validation {
            field: "server.url".into(),
            reason: "invalid URL".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert!(err.to_string().contains("server.url"));
    }

    #[test]
    fn api_rejections_exit_with_the_general_code() {
        let err: CliError = battwatch_api::Error::Api {
            status: "ERR".into(),
            title: "Devices".into(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn core_errors_pass_their_api_cause_through() {
        let err: CliError = CoreError::SlotPoolExhausted.into();
        assert!(matches!(err, CliError::Engine(_)));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
