//! The report cycle.
//!
//! Each tick scans the matrix, debounces it, tracks newly pressed keys, resolves dual-role keys, applies the
//! resulting actions to the HID reports and sends the reports that changed.
mod layer;
mod mouse;
mod pending;
mod report;
mod resolver;

use embassy_time::{Duration, Instant, Ticker};
use keyrole_types::action::{KeyAction, LayerId, SecondaryRole};
pub use layer::LayerState;
pub use mouse::{ActiveMouseStates, MouseKineticState};
pub use pending::{
    IMMEDIATE_QUEUE_CAPACITY, ImmediateQueue, PENDING_KEY_CAPACITY, PendingKey, PendingRegistry, PendingSet,
};
pub use report::ActiveReports;
use report::ReportBuilder;
pub use resolver::{KeyView, Resolution, ResolverState, SecondaryRoleResolver};

use crate::config::KeyboardConfig;
use crate::debounce::Debouncer;
use crate::diagnostics::Diagnostics;
use crate::hid::{HidInterface, HidTransport, Report};
use crate::keyboard_macro::MacroPlayer;
use crate::keymap::Keymap;
use crate::matrix::{KeyLevel, KeySlot, KeyStates, MatrixScanner, RawMatrix};

/// What a tick did
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickOutcome {
    /// Reports were recomputed and the changed ones sent
    Updated,
    /// A sent report is still unacknowledged, nothing was done
    Skipped,
}

/// Read-only view over the key levels and the keymap at the layer of this tick
struct TickView<'a, K: Keymap, const SLOT: usize, const KEY: usize> {
    key_states: &'a KeyStates<SLOT, KEY>,
    keymap: &'a K,
    layer: LayerId,
}

impl<K: Keymap, const SLOT: usize, const KEY: usize> KeyView for TickView<'_, K, SLOT, KEY> {
    fn is_pressed(&self, key: KeySlot) -> bool {
        self.key_states.is_pressed(key)
    }

    fn secondary_role(&self, key: KeySlot) -> Option<SecondaryRole> {
        self.keymap.resolve(self.layer, key).secondary_role()
    }

    fn is_plain_keystroke(&self, key: KeySlot) -> bool {
        self.keymap.resolve(self.layer, key).is_plain_keystroke()
    }
}

pub struct Keyboard<K: Keymap, M: MacroPlayer, const SLOT: usize, const KEY: usize> {
    keymap: K,
    macros: M,
    config: KeyboardConfig,
    debouncer: Debouncer,
    key_states: KeyStates<SLOT, KEY>,
    registry: PendingRegistry,
    resolver: SecondaryRoleResolver,
    layers: LayerState,
    /// Layer of the current tick, kept to classify keys pressed in the next one
    active_layer: LayerId,
    builder: ReportBuilder,
    mouse_move: MouseKineticState,
    mouse_scroll: MouseKineticState,
    last_mouse_update: Option<Instant>,
    /// Last reports accepted by the transport
    sent: ActiveReports,
    /// One bit per `HidInterface` with a report in flight
    semaphore: u8,
    last_update_time: Option<Instant>,
    host_sleeping: bool,
    diagnostics: Diagnostics,
}

impl<K: Keymap, M: MacroPlayer, const SLOT: usize, const KEY: usize> Keyboard<K, M, SLOT, KEY> {
    pub fn new(keymap: K, macros: M, config: KeyboardConfig) -> Self {
        Self {
            keymap,
            macros,
            debouncer: Debouncer::new(config.debounce),
            key_states: KeyStates::new(),
            registry: PendingRegistry::new(),
            resolver: SecondaryRoleResolver::new(config.secondary_role.kick_in_threshold),
            layers: LayerState::new(config.double_tap),
            active_layer: LayerId::Base,
            builder: ReportBuilder::new(),
            mouse_move: MouseKineticState::pointer(config.mouse_move),
            mouse_scroll: MouseKineticState::scroll(config.mouse_scroll),
            last_mouse_update: None,
            sent: ActiveReports::default(),
            semaphore: 0,
            last_update_time: None,
            host_sleeping: false,
            diagnostics: Diagnostics::default(),
            config,
        }
    }

    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    pub fn resolver_state(&self) -> ResolverState {
        self.resolver.state()
    }

    pub fn registry(&self) -> &PendingRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Reports built by the last updating tick
    pub fn reports(&self) -> &ActiveReports {
        &self.builder.reports
    }

    pub fn key_level(&self, key: KeySlot) -> Option<&KeyLevel> {
        self.key_states.get(key)
    }

    pub fn keymap(&self) -> &K {
        &self.keymap
    }

    pub fn macros(&self) -> &M {
        &self.macros
    }

    /// While the host sleeps, presses wake it up and sends don't wait for acknowledgement
    pub fn set_host_sleeping(&mut self, sleeping: bool) {
        self.host_sleeping = sleeping;
    }

    /// Make the action loop treat a key as released once, terminating its action
    pub fn suppress(&mut self, key: KeySlot) {
        if let Some(level) = self.key_states.get_mut(key) {
            level.suppressed = true;
        }
    }

    /// Transfer completion from the transport
    pub fn on_report_sent(&mut self, interface: HidInterface) {
        self.semaphore &= !interface.mask();
    }

    /// Scan, update and send the reports every poll interval
    pub async fn run<S: MatrixScanner<SLOT, KEY>, T: HidTransport>(&mut self, scanner: &mut S, transport: &mut T) {
        let mut raw = [[false; KEY]; SLOT];
        let mut ticker = Ticker::every(self.config.report.poll_interval);
        loop {
            scanner.scan(&mut raw);
            self.tick(Instant::now(), &raw, transport);
            ticker.next().await;
        }
    }

    /// Run one report cycle with the raw key levels of this scan
    pub fn tick<T: HidTransport>(&mut self, now: Instant, raw: &RawMatrix<SLOT, KEY>, transport: &mut T) -> TickOutcome {
        if self.semaphore != 0 && !self.host_sleeping {
            if let Some(last) = self.last_update_time {
                if now.saturating_duration_since(last) < self.config.report.semaphore_timeout {
                    return TickOutcome::Skipped;
                }
            }
            warn!("Reports unacknowledged for too long, release semaphore {}", self.semaphore);
            Diagnostics::count(&mut self.diagnostics.forced_semaphore_releases);
            self.semaphore = 0;
        }

        self.last_update_time = Some(now);
        Diagnostics::count(&mut self.diagnostics.update_counter);
        self.builder.reset();
        self.update_active_reports(now, raw, transport);
        self.send_reports(transport);
        TickOutcome::Updated
    }

    fn update_active_reports<T: HidTransport>(&mut self, now: Instant, raw: &RawMatrix<SLOT, KEY>, transport: &mut T) {
        // A playing macro owns the reports
        if self.macros.is_playing() {
            self.builder.reports = self.macros.advance().into();
            return;
        }

        self.registry.begin_tick();
        self.scan(now, raw, transport);

        let held_layer_keys = self
            .key_states
            .iter()
            .filter(|(_, level)| level.current)
            .filter_map(|(key, _)| match self.keymap.resolve(LayerId::Base, key) {
                KeyAction::SwitchLayer(switch) => Some(switch),
                _ => None,
            });
        self.active_layer = self.layers.active_layer(held_layer_keys);

        let view = TickView {
            key_states: &self.key_states,
            keymap: &self.keymap,
            layer: self.active_layer,
        };
        let resolution = self
            .resolver
            .resolve(&mut self.registry, &view, now, &mut self.diagnostics);

        if let Some(layer) = resolution.layer {
            self.active_layer = layer;
        }
        self.builder.add_modifiers(resolution.modifiers, now);
        if resolution.execute_actions {
            self.execute_actions(now);
        }

        self.process_mouse(now);
        self.layers.end_tick(self.active_layer);
    }

    /// Debounce every key and track the pressed ones
    fn scan<T: HidTransport>(&mut self, now: Instant, raw: &RawMatrix<SLOT, KEY>, transport: &mut T) {
        // Keys are classified with the layer the previous tick ended on
        let layer = self.active_layer;
        for (key, level) in self.key_states.iter_mut() {
            level.previous = level.current;
            self.debouncer.debounce(level, raw[key.slot as usize][key.key as usize], now);
            if level.is_releasing() {
                debug!("Key {:?} released", key);
            }
            if !level.current {
                continue;
            }
            if level.is_pressing() {
                debug!("Key {:?} pressed", key);
                if self.host_sleeping {
                    transport.wake_up_host();
                }
            }
            if !self.registry.is_tracked(key) {
                let has_secondary_role = self.keymap.resolve(layer, key).secondary_role().is_some();
                self.registry.track(key, has_secondary_role, now, &mut self.diagnostics);
            }
        }
    }

    fn execute_actions(&mut self, now: Instant) {
        if !self.registry.immediate().is_empty() {
            let scheduled: heapless::Vec<PendingKey, IMMEDIATE_QUEUE_CAPACITY> =
                self.registry.immediate().iter_latest_first().copied().collect();
            for pending in scheduled {
                let was_pressed = self.key_states.get(pending.key).is_some_and(|l| l.previous);
                self.apply_key_action(pending.key, was_pressed, now);
            }
            self.builder
                .remerge_recent_modifiers(now, self.config.secondary_role.modifier_remerge_window);

            // Plain modifier keys still held go along with the immediate keys
            for pending in self.registry.actions().iter() {
                if !self.key_states.is_pressed(pending.key) {
                    continue;
                }
                let action = self.keymap.resolve(self.active_layer, pending.key);
                if !action.is_modifier_keystroke() {
                    continue;
                }
                if let KeyAction::Keystroke(keystroke) = action {
                    self.builder.add_modifiers(keystroke.modifiers, now);
                }
            }
        }

        for i in (0..self.registry.actions().len()).rev() {
            let Some(pending) = self.registry.actions().get(i).copied() else {
                continue;
            };
            let level = self.key_states.get(pending.key).copied().unwrap_or_default();
            if level.current || level.suppressed {
                self.apply_key_action(pending.key, level.previous, now);
            }
            if !level.current || level.suppressed {
                if let Some(level) = self.key_states.get_mut(pending.key) {
                    level.suppressed = false;
                }
                self.registry.untrack_action(i);
            }
        }
    }

    fn apply_key_action(&mut self, key: KeySlot, was_pressed: bool, now: Instant) {
        let action = self.keymap.resolve(self.active_layer, key);
        self.layers.process_action(key, was_pressed, &action, now);

        match action {
            KeyAction::No | KeyAction::SwitchLayer(_) => {}
            KeyAction::Keystroke(keystroke) => {
                self.builder.add_modifiers(keystroke.modifiers, now);
                if keystroke.scancode != 0 && !self.builder.push_scancode(keystroke.keystroke_type, keystroke.scancode)
                {
                    debug!(
                        "No free slot in {:?} report, drop scancode {}",
                        keystroke.keystroke_type, keystroke.scancode
                    );
                    Diagnostics::count(&mut self.diagnostics.report_slot_overflows);
                }
            }
            KeyAction::Mouse(mouse_action) => self.builder.mouse_states.activate(mouse_action),
            KeyAction::SwitchKeymap(keymap_id) => {
                self.keymap.switch_keymap(keymap_id);
            }
            KeyAction::PlayMacro(macro_id) => self.macros.start(macro_id),
        }
    }

    fn process_mouse(&mut self, now: Instant) {
        let elapsed = self
            .last_mouse_update
            .map_or(Duration::from_ticks(0), |t| now.saturating_duration_since(t));
        self.last_mouse_update = Some(now);

        let states = self.builder.mouse_states;
        let mouse = &mut self.builder.reports.mouse;
        mouse.buttons = states.buttons();
        (mouse.x, mouse.y) = self.mouse_move.process(&states, elapsed);
        (mouse.pan, mouse.wheel) = self.mouse_scroll.process(&states, elapsed);
    }

    fn send_reports<T: HidTransport>(&mut self, transport: &mut T) {
        let reports = self.builder.reports;

        if reports.basic != self.sent.basic && self.send(transport, Report::KeyboardReport(reports.basic)) {
            self.sent.basic = reports.basic;
        }
        if reports.media != self.sent.media && self.send(transport, Report::MediaKeyboardReport(reports.media)) {
            self.sent.media = reports.media;
        }
        if reports.system != self.sent.system && self.send(transport, Report::SystemKeyboardReport(reports.system)) {
            self.sent.system = reports.system;
        }
        // Motion is relative, so it's sent even when equal to the previous report
        if (reports.mouse != self.sent.mouse || reports.mouse.has_motion())
            && self.send(transport, Report::MouseReport(reports.mouse))
        {
            self.sent.mouse = reports.mouse;
        }
    }

    fn send<T: HidTransport>(&mut self, transport: &mut T, report: Report) -> bool {
        let interface = report.interface();
        match transport.write_report(report) {
            Ok(()) => {
                self.semaphore |= interface.mask();
                true
            }
            Err(e) => {
                warn!("Failed to send {:?} report: {:?}", interface, e);
                false
            }
        }
    }
}
