use std::io;

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Logs go to stderr so a RIB stream on stdout stays clean.
pub(crate) fn setup_tracing(level: LevelFilter) {
    let level = level.into_level().unwrap_or(Level::ERROR);
    let filter_layer = tracing_subscriber::filter::filter_fn(move |metadata| {
        let is_yarn = metadata.target().starts_with("yarn");
        let effective_level = if is_yarn { level } else { Level::WARN };
        metadata.level() <= &effective_level
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter_layer))
        .init();
}
