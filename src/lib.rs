use std::path::Path;

use chrono::Local;
use tracing::{level_filters::LevelFilter, Level};
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling,
};
use tracing_subscriber::{
    fmt::format::{DefaultFields, Format},
    FmtSubscriber,
};

pub mod configatron;
pub mod crealion;
pub mod error;
pub mod gatekeeper;
pub mod scopist;
pub mod selectors;
pub mod stylesheet;
pub mod synthesizer;
pub mod utils;

pub use configatron::Configatron;
pub use error::UtilityModulesError;
pub use stylesheet::Stylesheet;
pub use synthesizer::{Synthesizer, TransformReport};

pub type UtilityModulesResult<T> = Result<T, UtilityModulesError>;

/// Name of the log file of the current run, stamped with the local time.
pub fn generate_log_filename() -> String {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();

    format!("css_utility_modules_log_{}.log", timestamp)
}

/// Builds a subscriber writing every event, down to `TRACE`, to a log file in `dir`.
///
/// The returned guard flushes the non-blocking writer when dropped, so the
/// host must keep it alive as long as the subscriber is in use. Installing the
/// subscriber (e.g. with `tracing::subscriber::set_global_default`) is left to
/// the host.
pub fn generate_log_subscriber(
    dir: &Path,
) -> (
    FmtSubscriber<DefaultFields, Format, LevelFilter, NonBlocking>,
    WorkerGuard,
) {
    let file_appender = rolling::never(dir, generate_log_filename());
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_writer(non_blocking)
        .finish();

    (subscriber, guard)
}
