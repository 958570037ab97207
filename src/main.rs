use clap::Parser;
use livecheck::{Outcome, cli::Args};
use log::{LevelFilter, error};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.log_level());

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let outcome = livecheck::run(args, token).await;
    if let Outcome::Failed(e) = &outcome {
        error!("{e}");
    }
    ExitCode::from(outcome.exit_code())
}

fn init_logging(level: LevelFilter) {
    // Quiet runs install no logger at all.
    if level == LevelFilter::Off {
        return;
    }
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if level > LevelFilter::Info {
        // Only our own debug output, not that of the HTTP stack.
        builder.filter_module("livecheck", level);
    }
    builder
        .target(env_logger::Target::Stdout)
        .format_timestamp(None)
        .init();
}
