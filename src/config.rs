use std::env;

use time::Duration;

use crate::error::ConfigError;

const EDIT_WINDOW_ENV: &str = "ATTENDANCE_EDIT_WINDOW_SECS";
const TICK_ENV: &str = "ATTENDANCE_TICK_MILLIS";

/// Longest accepted edit window, one year in seconds.
pub const MAX_EDIT_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;
/// Longest accepted countdown period, one hour in milliseconds.
pub const MAX_TICK_MILLIS: u64 = 60 * 60 * 1000;
/// Shortest countdown period; a zero period would stall the countdown task.
pub const MIN_TICK_INTERVAL: std::time::Duration = std::time::Duration::from_millis(1);

/// Tunables of an [`AttendanceController`](crate::AttendanceController).
///
/// # Examples
///
/// ```
/// use attendance_capture::ControllerConfig;
///
/// let config = ControllerConfig::default()
///     .with_edit_window(time::Duration::minutes(10))
///     .with_tick_interval(std::time::Duration::from_millis(500));
/// assert_eq!(config.edit_window, time::Duration::minutes(10));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How long after a submission corrections stay possible.
    pub edit_window: Duration,
    /// Period of the countdown task.
    pub tick_interval: std::time::Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            edit_window: Duration::minutes(15),
            tick_interval: std::time::Duration::from_secs(1),
        }
    }
}

impl ControllerConfig {
    pub fn with_edit_window(mut self, edit_window: Duration) -> Self {
        self.edit_window = edit_window;
        self
    }

    /// Sets the countdown period. Anything below [`MIN_TICK_INTERVAL`] is raised to it.
    pub fn with_tick_interval(mut self, tick_interval: std::time::Duration) -> Self {
        self.tick_interval = tick_interval.max(MIN_TICK_INTERVAL);
        self
    }

    /// Reads `ATTENDANCE_EDIT_WINDOW_SECS` and `ATTENDANCE_TICK_MILLIS`, loading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::InvalidNumber`] - a value is not a positive integer.
    /// * [`ConfigError::OutOfRange`] - the window exceeds [`MAX_EDIT_WINDOW_SECS`] or the
    ///   tick exceeds [`MAX_TICK_MILLIS`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(env::var(EDIT_WINDOW_ENV).ok(), env::var(TICK_ENV).ok())
    }

    fn from_vars(
        edit_window_secs: Option<String>,
        tick_millis: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = edit_window_secs {
            let secs = parse_positive(EDIT_WINDOW_ENV, &raw, MAX_EDIT_WINDOW_SECS)?;
            config.edit_window = Duration::seconds(secs as i64);
        }
        if let Some(raw) = tick_millis {
            let millis = parse_positive(TICK_ENV, &raw, MAX_TICK_MILLIS)?;
            config.tick_interval = std::time::Duration::from_millis(millis);
        }
        Ok(config)
    }
}

fn parse_positive(name: &'static str, raw: &str, max: u64) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > max => Err(ConfigError::OutOfRange { name, value: n, max }),
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}
