//! Checks whether a livestream page is currently broadcasting.
//!
//! A check runs in two stages. The stream page is fetched until its video
//! identifier and API key can be scraped, backing off between attempts. The
//! heartbeat and live-status endpoints are then polled until the stream is
//! online, or once when the caller does not want to wait.

pub mod backoff;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod resolve;
pub mod status;
pub mod worker;

pub use error::{Error, TransportError};
pub use worker::{CheckOptions, Outcome, check_stream, run};
