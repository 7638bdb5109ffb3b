use embassy_time::Instant;

use crate::config::DebounceConfig;
use crate::matrix::KeyLevel;

/// Debounce state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DebounceState {
    /// The raw change lasted long enough and is now the stable level
    Debounced,
    /// A raw change is waiting for its timeout
    InProgress,
    /// Raw level equals the stable level
    Ignored,
}

/// Deferred debouncer: a raw change reaches `current` only after it has been stable for the timeout
/// of its edge.
pub struct Debouncer {
    config: DebounceConfig,
}

impl Debouncer {
    pub fn new(config: DebounceConfig) -> Self {
        Self { config }
    }

    pub fn debounce(&self, level: &mut KeyLevel, raw: bool, now: Instant) -> DebounceState {
        // Stable, or a glitch that went back before its timeout
        if level.current == raw {
            level.debouncing = false;
            return DebounceState::Ignored;
        }

        if !level.debouncing {
            level.debouncing = true;
            level.timestamp = now;
        }

        let timeout = if raw {
            self.config.press_timeout
        } else {
            self.config.release_timeout
        };

        if now.saturating_duration_since(level.timestamp) >= timeout {
            level.current = raw;
            level.debouncing = false;
            level.timestamp = now;
            DebounceState::Debounced
        } else {
            DebounceState::InProgress
        }
    }
}
