use embassy_time::{Duration, Instant};
use keyrole_types::action::KeystrokeType;
use keyrole_types::modifier::HidModifiers;

use super::mouse::ActiveMouseStates;
use crate::descriptor::{KeyboardReport, MediaKeyboardReport, MouseReport, SystemKeyboardReport};
use crate::keyboard_macro::MacroReports;

/// Reports assembled in one tick
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActiveReports {
    pub basic: KeyboardReport,
    pub media: MediaKeyboardReport,
    pub system: SystemKeyboardReport,
    pub mouse: MouseReport,
}

impl From<MacroReports> for ActiveReports {
    fn from(reports: MacroReports) -> Self {
        Self {
            basic: reports.basic,
            media: reports.media,
            system: reports.system,
            mouse: reports.mouse,
        }
    }
}

/// Builds the reports of a tick from applied actions.
#[derive(Default)]
pub(crate) struct ReportBuilder {
    pub(crate) reports: ActiveReports,
    pub(crate) mouse_states: ActiveMouseStates,
    basic_len: usize,
    media_len: usize,
    system_len: usize,
    /// Modifier field of the basic report at its last change
    last_updated_modifiers: HidModifiers,
    last_modifier_update: Option<Instant>,
}

impl ReportBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start a new tick with empty reports
    pub(crate) fn reset(&mut self) {
        self.reports = ActiveReports::default();
        self.mouse_states.clear();
        self.basic_len = 0;
        self.media_len = 0;
        self.system_len = 0;
    }

    pub(crate) fn add_modifiers(&mut self, modifiers: HidModifiers, now: Instant) {
        self.reports.basic.modifier |= modifiers.into_bits();
        if !modifiers.is_empty() {
            self.last_updated_modifiers = HidModifiers::from_bits(self.reports.basic.modifier);
            self.last_modifier_update = Some(now);
        }
    }

    /// Merge again the modifiers of a report updated less than `window` ago
    pub(crate) fn remerge_recent_modifiers(&mut self, now: Instant, window: Duration) {
        if self
            .last_modifier_update
            .is_some_and(|t| now.saturating_duration_since(t) < window)
        {
            self.reports.basic.modifier |= self.last_updated_modifiers.into_bits();
        }
    }

    /// Put a scancode at the next free slot of its report. Returns `false` if the report is full.
    pub(crate) fn push_scancode(&mut self, keystroke_type: KeystrokeType, scancode: u16) -> bool {
        match keystroke_type {
            KeystrokeType::Basic => push(&mut self.reports.basic.keycodes, &mut self.basic_len, scancode as u8),
            KeystrokeType::Media => push(&mut self.reports.media.scancodes, &mut self.media_len, scancode),
            KeystrokeType::System => push(&mut self.reports.system.scancodes, &mut self.system_len, scancode as u8),
        }
    }
}

fn push<T, const N: usize>(slots: &mut [T; N], len: &mut usize, value: T) -> bool {
    match slots.get_mut(*len) {
        Some(slot) => {
            *slot = value;
            *len += 1;
            true
        }
        None => false,
    }
}
