mod mouse_config;

use embassy_time::Duration;
pub use mouse_config::MouseKineticConfig;

/// The config struct for the key processing core.
///
/// Every field has a default taken from the stock firmware timings, so `KeyboardConfig::default()`
/// is a working configuration.
#[derive(Clone, Copy, Debug)]
pub struct KeyboardConfig {
    pub debounce: DebounceConfig,
    pub secondary_role: SecondaryRoleConfig,
    pub double_tap: DoubleTapConfig,
    pub mouse_move: MouseKineticConfig,
    pub mouse_scroll: MouseKineticConfig,
    pub report: ReportConfig,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            secondary_role: SecondaryRoleConfig::default(),
            double_tap: DoubleTapConfig::default(),
            mouse_move: MouseKineticConfig::pointer(),
            mouse_scroll: MouseKineticConfig::scroll(),
            report: ReportConfig::default(),
        }
    }
}

/// Debounce timeouts, separate for press and release edges
#[derive(Clone, Copy, Debug)]
pub struct DebounceConfig {
    pub press_timeout: Duration,
    pub release_timeout: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            press_timeout: Duration::from_millis(5),
            release_timeout: Duration::from_millis(5),
        }
    }
}

/// Timings of the dual-role key resolution
#[derive(Clone, Copy, Debug)]
pub struct SecondaryRoleConfig {
    /// A dual-role key held longer than this commits its secondary role
    pub kick_in_threshold: Duration,
    /// Modifiers merged into a report within this window are merged again into immediately executed keys
    pub modifier_remerge_window: Duration,
}

impl Default for SecondaryRoleConfig {
    fn default() -> Self {
        Self {
            kick_in_threshold: Duration::from_millis(250),
            modifier_remerge_window: Duration::from_millis(100),
        }
    }
}

/// Timings of the double-tap layer toggle
#[derive(Clone, Copy, Debug)]
pub struct DoubleTapConfig {
    /// Max time between two presses to toggle the layer
    pub timeout: Duration,
    /// Holding the toggling key longer than this releases the toggle again
    pub release_timeout: Duration,
}

impl Default for DoubleTapConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(300),
            release_timeout: Duration::from_millis(200),
        }
    }
}

/// Report transmission settings
#[derive(Clone, Copy, Debug)]
pub struct ReportConfig {
    /// Longest time to wait for a sent report to be acknowledged before sending again anyway
    pub semaphore_timeout: Duration,
    /// Interval of the report update loop
    pub poll_interval: Duration,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            semaphore_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(1),
        }
    }
}
