// Logger initialization from the logging settings
use crate::settings::LoggingSettings;
use log::LevelFilter;

/// Effective filter directive for the given settings
///
/// `debug` wins over `level` so that `AUTH_DEBUG` always produces debug output.
#[must_use]
pub fn filter_directive(settings: &LoggingSettings) -> String {
    if settings.debug {
        LevelFilter::Debug.to_string().to_lowercase()
    } else if settings.level.trim().is_empty() {
        LevelFilter::Info.to_string().to_lowercase()
    } else {
        settings.level.clone()
    }
}

/// Initialize `env_logger` once for the process
///
/// # Errors
///
/// Returns an error if a global logger was already installed
pub fn init_logger(settings: &LoggingSettings) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .parse_filters(&filter_directive(settings))
        .try_init()
}
