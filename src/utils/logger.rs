use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output shape of the cacher's log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human output for terminals.
    Compact,
    /// One JSON object per event, with the worker thread that finished the load.
    Json,
}

impl LogFormat {
    pub fn from_flags(json_flag: bool, json_in_config: bool) -> Self {
        if json_flag || json_in_config {
            LogFormat::Json
        } else {
            LogFormat::Compact
        }
    }
}

/// `RUST_LOG` wins; otherwise cacher debug output only when verbose.
fn cacher_filter(verbose: bool) -> EnvFilter {
    let default = if verbose {
        "ad_cacher=debug,warn"
    } else {
        "ad_cacher=info,warn"
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let registry = tracing_subscriber::registry().with(cacher_filter(verbose));

    match format {
        LogFormat::Compact => registry
            .with(fmt::layer().with_target(false).compact())
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .json(),
            )
            .init(),
    }
}
