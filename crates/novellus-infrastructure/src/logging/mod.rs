//! Logging setup: tracing subscriber initialization and the bridge that
//! plugs tracing into the domain log facade.

use novellus_domain::infra::logging::set_log_fn;
use novellus_domain::ports::LogLevel;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Forwarder registered into the domain facade: every `novellus_domain`
/// log macro lands here and re-emits through tracing.
fn forward(level: LogLevel, context: &str, message: &str, detail: Option<&dyn std::fmt::Display>) {
    let detail = detail.map(ToString::to_string).unwrap_or_default();
    match level {
        LogLevel::Error => tracing::error!(target: "novellus", context, detail = %detail, "{message}"),
        LogLevel::Warn => tracing::warn!(target: "novellus", context, detail = %detail, "{message}"),
        LogLevel::Info => tracing::info!(target: "novellus", context, detail = %detail, "{message}"),
        LogLevel::Debug => tracing::debug!(target: "novellus", context, detail = %detail, "{message}"),
        LogLevel::Trace => tracing::trace!(target: "novellus", context, detail = %detail, "{message}"),
    }
}

/// Install the tracing subscriber and bridge the domain facade into it.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_logging(settings: &LoggingSettings) {
    let filter = EnvFilter::try_new(&settings.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let init_result = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    // A second init (tests, embedded use) keeps the existing subscriber.
    drop(init_result);

    set_log_fn(forward);
}
