use chrono::Utc;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::backoff::{self, AttemptState, GIVE_UP_THRESHOLD, INDETERMINATE_DELAY};
use crate::cli::Args;
use crate::client::{LiveApi, YoutubeClient};
use crate::config::{CheckConfig, Config};
use crate::error::Error;
use crate::resolve::{self, Credentials};
use crate::status::{self, StatusSignal};

/// Caller-controlled knobs for a single check.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Keep polling until online instead of answering after one round.
    pub wait: bool,
    /// Overall ceiling on page resolution.
    pub timeout: Duration,
    /// Ceiling on a single resolution backoff sleep.
    pub max_sleep: Option<Duration>,
}

impl CheckOptions {
    /// Command-line flags take precedence over the configuration file.
    pub fn new(args: &Args, check: &CheckConfig) -> Self {
        let timeout_secs = args.timeout.unwrap_or(check.timeout_secs);
        let max_sleep_secs = args.timeout_max_sleep.unwrap_or(check.max_sleep_secs);
        Self {
            wait: args.wait,
            timeout: Duration::from_secs(timeout_secs),
            max_sleep: (max_sleep_secs > 0).then(|| Duration::from_secs(max_sleep_secs)),
        }
    }
}

/// Terminal result of a run.
#[derive(Debug)]
pub enum Outcome {
    IsOnline(bool),
    Failed(Error),
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::IsOnline(true) => 0,
            Outcome::IsOnline(false) | Outcome::Failed(_) => 2,
        }
    }
}

/// Loads configuration, then checks the stream named on the command line.
pub async fn run(args: Args, token: CancellationToken) -> Outcome {
    debug!("{args:?}");

    let (client, target, options) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => return Outcome::Failed(e),
    };

    check_stream(&client, &target, &options, &token).await
}

fn prepare(args: &Args) -> Result<(YoutubeClient, Url, CheckOptions), Error> {
    let config = Config::load(args.config.as_deref())?;
    let target = Url::parse(&args.url)?;
    let client = YoutubeClient::from_config(&config)?;
    let options = CheckOptions::new(args, &config.check);
    debug!("{options:?}");
    Ok((client, target, options))
}

/// Resolves the stream identity, then polls its status.
pub async fn check_stream<A: LiveApi + ?Sized>(
    api: &A,
    target: &Url,
    options: &CheckOptions,
    token: &CancellationToken,
) -> Outcome {
    let credentials = match resolve_credentials(api, target, options, token).await {
        Ok(credentials) => credentials,
        Err(e) => return Outcome::Failed(e),
    };
    debug!("Video ID: {}", credentials.content_id());
    debug!("Found API key: {}", credentials.access_key());

    info!("Checking for stream status");
    match poll_until_online(api, &credentials, options, token).await {
        Ok(online) => Outcome::IsOnline(online),
        Err(e) => Outcome::Failed(e),
    }
}

async fn resolve_credentials<A: LiveApi + ?Sized>(
    api: &A,
    target: &Url,
    options: &CheckOptions,
    token: &CancellationToken,
) -> Result<Credentials, Error> {
    let mut state = AttemptState::new();

    loop {
        info!("Fetching stream page...");
        if let Some(credentials) = resolve::resolve(api, target).await {
            return Ok(credentials);
        }

        state.attempts += 1;
        let delay =
            backoff::resolve_delay(state.attempts, options.max_sleep, &mut rand::thread_rng());

        if !options.wait || state.elapsed() >= options.timeout {
            return Err(Error::ResolutionExhausted {
                elapsed_secs: state.elapsed().as_secs(),
                attempts: state.attempts,
            });
        }

        warn!(
            "Stream identity not found (attempt {}), retrying in {} seconds",
            state.attempts,
            delay.as_secs()
        );
        pause(delay, token).await?;
        state.wasted += delay;
    }
}

/// Returns whether the stream came online. Giving up is reported as offline.
async fn poll_until_online<A: LiveApi + ?Sized>(
    api: &A,
    credentials: &Credentials,
    options: &CheckOptions,
    token: &CancellationToken,
) -> Result<bool, Error> {
    // `attempts` counts consecutive indeterminate polls here.
    let mut state = AttemptState::new();

    loop {
        let round = status::poll(api, credentials).await;
        if let Some(reason) = &round.reason {
            info!("{reason}");
        }

        let delay = match round.signal {
            StatusSignal::Online => return Ok(true),
            _ if !options.wait => return Ok(false),
            StatusSignal::Indeterminate => {
                state.attempts += 1;
                if state.attempts > GIVE_UP_THRESHOLD {
                    warn!(
                        "Giving up after {} consecutive failed status checks ({} seconds spent waiting)",
                        state.attempts,
                        state.wasted.as_secs()
                    );
                    return Ok(false);
                }
                warn!(
                    "Stream status unknown (attempt {}), retrying in {} seconds",
                    state.attempts,
                    INDETERMINATE_DELAY.as_secs()
                );
                INDETERMINATE_DELAY
            }
            StatusSignal::NotYetOnline(scheduled_start) => {
                state.attempts = 0;
                backoff::offline_delay(scheduled_start, Utc::now())
            }
        };

        pause(delay, token).await?;
        state.wasted += delay;
    }
}

/// Sleeps unless shutdown is requested first.
async fn pause(duration: Duration, token: &CancellationToken) -> Result<(), Error> {
    select! {
        () = sleep(duration) => Ok(()),
        () = token.cancelled() => {
            info!("Shutdown requested during sleep");
            Err(Error::Interrupted)
        }
    }
}
