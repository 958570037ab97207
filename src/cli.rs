use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "livecheck",
    version,
    about = "Check whether a livestream is currently broadcasting"
)]
pub struct Args {
    /// Do not output anything
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print raw heartbeat payloads for debugging
    #[arg(long)]
    pub verbose: bool,

    /// Keep polling until the stream starts, then exit
    #[arg(short, long)]
    pub wait: bool,

    /// How long to keep retrying the stream page, in seconds [default: 300]
    #[arg(long, value_name = "SECONDS", num_args = 0..=1, default_missing_value = "300")]
    pub timeout: Option<u64>,

    /// Upper bound for a single backoff sleep, in seconds (0 for no bound)
    #[arg(long, value_name = "SECONDS")]
    pub timeout_max_sleep: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Stream page URL
    pub url: String,
}

impl Args {
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Off
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}
