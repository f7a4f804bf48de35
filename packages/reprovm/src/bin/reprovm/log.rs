use clap::ValueEnum;
use color_eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt as _, Layer as _};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum WhenColor {
    Always,
    Never,
    Auto,
}

/// Build the subscriber used by the `reprovm` binary: an `ErrorLayer` so
/// `color-eyre` can attach span traces, plus a `fmt` layer gated by
/// `REPROVM_LOG`. The core library never touches any of this (spec §6: "no
/// environment variables are consulted by the core").
pub fn make_logger(color: WhenColor) -> Result<impl tracing::Subscriber> {
    let logger = tracing_subscriber::registry().with(ErrorLayer::default()).with({
        let layer = tracing_subscriber::fmt::layer()
            .with_level(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);
        match color {
            WhenColor::Always => layer.with_ansi(true),
            WhenColor::Never => layer.with_ansi(false),
            WhenColor::Auto => layer,
        }
        .with_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_env_var("REPROVM_LOG")
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
    });
    Ok(logger)
}
