use thiserror::Error;

/// Failure talking to one of the remote endpoints.
///
/// Callers never branch on the variant: a failed page fetch, heartbeat or
/// live-status query all mean "no data this round".
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Malformed response body: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unable to find the stream identity after {elapsed_secs} seconds and {attempts} attempts")]
    ResolutionExhausted { elapsed_secs: u64, attempts: u32 },
    #[error("Interrupted before the stream status was known")]
    Interrupted,
}
