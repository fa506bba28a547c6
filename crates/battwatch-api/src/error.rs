use thiserror::Error;

/// Top-level error type for the `battwatch-api` crate.
///
/// Covers transport failures, non-success HTTP statuses, and envelope
/// rejections. `battwatch-core` absorbs every one of these into a log
/// line -- nothing here is fatal to the engine.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Server ──────────────────────────────────────────────────────
    /// Non-2xx HTTP status. `url` is the server-relative request URL.
    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    /// The envelope parsed but its `status` field was not `"OK"`.
    #[error("API status '{status}' answering '{title}'")]
    Api { status: String, title: String },

    // ── Data ────────────────────────────────────────────────────────
    /// The response body was not a valid envelope; raw body kept for
    /// debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}
