use crate::descriptor::{KeyboardReport, MediaKeyboardReport, MouseReport, SystemKeyboardReport};

/// Reports produced by a playing macro. They replace the computed reports while the macro plays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroReports {
    pub mouse: MouseReport,
    pub basic: KeyboardReport,
    pub media: MediaKeyboardReport,
    pub system: SystemKeyboardReport,
}

/// Macro playback, driven once per tick by the keyboard.
pub trait MacroPlayer {
    /// Start playing a macro
    fn start(&mut self, macro_id: u8);

    fn is_playing(&self) -> bool;

    /// Advance the playing macro by one tick and return its reports
    fn advance(&mut self) -> MacroReports;
}

/// Macro player for keyboards without macros
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMacros;

impl MacroPlayer for NoMacros {
    fn start(&mut self, macro_id: u8) {
        warn!("No macro player, macro {} ignored", macro_id);
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn advance(&mut self) -> MacroReports {
        MacroReports::default()
    }
}
