use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const CRATE_TARGET: &str = "xrate";

fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

/// Logs xrate's own events to stderr, leaving stdout to command output.
///
/// Fallbacks and unresolved pairs are warnings and always shown. With
/// `verbose`, cache hits, resolution paths and the duration of each provider
/// fetch and cache refresh are logged too. `RUST_LOG` narrows this further.
pub fn init_logging(verbose: bool) {
    let level = level_for(verbose);
    let crate_filter = Targets::new().with_target(CRATE_TARGET, level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let span_events = if verbose {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_span_events(span_events)
                .with_writer(std::io::stderr),
        )
        .with(crate_filter)
        .with(env_filter)
        .init();
}
