pub mod test_macro;

use embassy_time::{Duration, Instant};
use keyrole::action::KeyAction;
use keyrole::config::{DebounceConfig, KeyboardConfig};
use keyrole::descriptor::{KeyboardReport, MouseReport};
use keyrole::hid::{HidError, HidTransport, Report};
use keyrole::keyboard::{Keyboard, TickOutcome};
use keyrole::keyboard_macro::{MacroPlayer, MacroReports, NoMacros};
use keyrole::keycode::HidKeyCode;
use keyrole::keymap::{KeyMap, KeymapLayers};
use keyrole::matrix::KeySlot;
use keyrole::modifier::HidModifiers;
use keyrole::{a, dr, dt, k, media, mo, ms, sys, tg, wm};

// Init logger for tests
#[ctor::ctor]
fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

pub const SLOT: usize = 2;
pub const KEY: usize = 12;

#[allow(dead_code)]
pub const KC_LSHIFT: u8 = 1 << 1;
#[allow(dead_code)]
pub const KC_LCTRL: u8 = 1 << 0;

pub type TestKeymap = KeyMap<'static, SLOT, KEY>;

/// Keymap 0, base layer, slot 0:
///
/// | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 10 | 11 |
/// |---|---|---|---|---|---|---|---|---|---|----|----|
/// | A/LShift | B | S/LCtrl | Fn (double tap) | C | Mouse (hold) | LShift | Space/Fn | keymap 1 | macro 0 | play/pause | left click |
///
/// Slot 1 holds the plain keys D to N, then a toggle of the Fn layer. Keymap 1 is the same with X in place of B.
///
/// The Fn layer has F1 at slot 0 key 1, sleep at slot 1 key 0 and shifted 1 at slot 1 key 1.
pub fn test_keymaps() -> &'static [KeymapLayers<SLOT, KEY>] {
    let mut base = [[a!(No); KEY]; SLOT];
    base[0] = [
        dr!(A, LeftShift),
        k!(B),
        dr!(S, LeftCtrl),
        dt!(Fn),
        k!(C),
        mo!(Mouse),
        k!(LShift),
        dr!(Space, Fn),
        KeyAction::SwitchKeymap(1),
        KeyAction::PlayMacro(0),
        media!(PlayPause),
        ms!(LeftClick),
    ];
    base[1] = [
        k!(D),
        k!(E),
        k!(F),
        k!(G),
        k!(H),
        k!(I),
        k!(J),
        k!(K),
        k!(L),
        k!(M),
        k!(N),
        tg!(Fn),
    ];

    let empty = [[a!(No); KEY]; SLOT];

    let mut fn_layer = empty;
    fn_layer[0][1] = k!(F1);
    fn_layer[0][3] = dt!(Fn);
    fn_layer[0][7] = dr!(Space, Fn);
    fn_layer[1][0] = sys!(Sleep);
    fn_layer[1][1] = wm!(Kc1, HidModifiers::LEFT_SHIFT);
    fn_layer[1][11] = tg!(Fn);

    let mut mouse_layer = empty;
    mouse_layer[0][1] = ms!(MoveRight);
    mouse_layer[0][4] = ms!(ScrollUp);
    mouse_layer[0][5] = mo!(Mouse);

    let mut second_base = base;
    second_base[0][1] = k!(X);

    Box::leak(Box::new([
        [base, empty, fn_layer, mouse_layer],
        [second_base, empty, fn_layer, mouse_layer],
    ]))
}

/// Config with debouncing off, so that a raw change shows up in the very next tick
pub fn test_config() -> KeyboardConfig {
    KeyboardConfig {
        debounce: DebounceConfig {
            press_timeout: Duration::from_millis(0),
            release_timeout: Duration::from_millis(0),
        },
        ..Default::default()
    }
}

/// Transport keeping every accepted report
#[derive(Default)]
pub struct RecordingTransport {
    pub reports: Vec<Report>,
    pub wake_ups: usize,
    /// Refuse reports while set
    pub busy: bool,
}

impl HidTransport for RecordingTransport {
    fn write_report(&mut self, report: Report) -> Result<(), HidError> {
        if self.busy {
            return Err(HidError::Busy);
        }
        self.reports.push(report);
        Ok(())
    }

    fn wake_up_host(&mut self) {
        self.wake_ups += 1;
    }
}

/// Macro player that plays a macro pressing `Z` for three ticks
#[derive(Default)]
pub struct TestMacros {
    pub started: Vec<u8>,
    remaining: u8,
}

impl MacroPlayer for TestMacros {
    fn start(&mut self, macro_id: u8) {
        self.started.push(macro_id);
        self.remaining = 3;
    }

    fn is_playing(&self) -> bool {
        self.remaining > 0
    }

    fn advance(&mut self) -> MacroReports {
        self.remaining = self.remaining.saturating_sub(1);
        let mut reports = MacroReports::default();
        reports.basic.keycodes[0] = HidKeyCode::Z as u8;
        reports
    }
}

/// Keyboard driven by a simulated clock, one tick per millisecond
pub struct TestKeyboard<M: MacroPlayer = NoMacros> {
    pub keyboard: Keyboard<TestKeymap, M, SLOT, KEY>,
    pub transport: RecordingTransport,
    /// Acknowledge every sent report right after the tick
    pub acknowledge: bool,
    /// Current time in milliseconds
    pub now: u64,
    raw: [[bool; KEY]; SLOT],
}

impl TestKeyboard<NoMacros> {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: KeyboardConfig) -> Self {
        Self::with_macros(NoMacros, config)
    }
}

impl<M: MacroPlayer> TestKeyboard<M> {
    pub fn with_macros(macros: M, config: KeyboardConfig) -> Self {
        Self {
            keyboard: Keyboard::new(KeyMap::new(test_keymaps()), macros, config),
            transport: RecordingTransport::default(),
            acknowledge: true,
            now: 0,
            raw: [[false; KEY]; SLOT],
        }
    }

    pub fn set(&mut self, slot: u8, key: u8, pressed: bool) {
        self.raw[slot as usize][key as usize] = pressed;
    }

    pub fn press(&mut self, slot: u8, key: u8) {
        self.set(slot, key, true);
    }

    pub fn release(&mut self, slot: u8, key: u8) {
        self.set(slot, key, false);
    }

    pub fn tick(&mut self) -> TickOutcome {
        let sent_before = self.transport.reports.len();
        let outcome = self
            .keyboard
            .tick(Instant::from_millis(self.now), &self.raw, &mut self.transport);
        if self.acknowledge {
            for report in &self.transport.reports[sent_before..] {
                self.keyboard.on_report_sent(report.interface());
            }
        }
        self.now += 1;
        outcome
    }

    pub fn run_for(&mut self, ms: u64) {
        for _ in 0..ms {
            self.tick();
        }
    }

    pub fn keyboard_reports(&self) -> Vec<KeyboardReport> {
        self.transport
            .reports
            .iter()
            .filter_map(|r| match r {
                Report::KeyboardReport(report) => Some(*report),
                _ => None,
            })
            .collect()
    }

    #[allow(dead_code)]
    pub fn mouse_reports(&self) -> Vec<MouseReport> {
        self.transport
            .reports
            .iter()
            .filter_map(|r| match r {
                Report::MouseReport(report) => Some(*report),
                _ => None,
            })
            .collect()
    }
}

#[allow(dead_code)]
pub fn key(slot: u8, key: u8) -> KeySlot {
    KeySlot::new(slot, key)
}

pub fn keyboard_report(modifier: u8, keycodes: [u8; 6]) -> KeyboardReport {
    KeyboardReport {
        modifier,
        reserved: 0,
        leds: 0,
        keycodes,
    }
}
