use embassy_time::Instant;
use keyrole_types::action::{KeyAction, LayerId, SwitchLayer, SwitchLayerMode};

use crate::config::DoubleTapConfig;
use crate::matrix::KeySlot;

/// Layer toggling state: the persistently toggled layer and the double-tap detector.
pub struct LayerState {
    config: DoubleTapConfig,
    toggled_layer: LayerId,
    /// The toggle was set by a double tap
    double_tap_toggled: bool,
    /// Key of the first tap of a possible double tap
    double_tap_key: Option<KeySlot>,
    double_tap_start: Option<Instant>,
    double_tap_trigger: Option<Instant>,
    /// Active layer at the end of the previous tick
    previous_layer: LayerId,
}

impl LayerState {
    pub fn new(config: DoubleTapConfig) -> Self {
        Self {
            config,
            toggled_layer: LayerId::Base,
            double_tap_toggled: false,
            double_tap_key: None,
            double_tap_start: None,
            double_tap_trigger: None,
            previous_layer: LayerId::Base,
        }
    }

    pub fn toggled_layer(&self) -> LayerId {
        self.toggled_layer
    }

    /// Active layer from the toggle and the held layer keys.
    ///
    /// `held` yields the base layer switches of all pressed keys. The lowest non-base layer wins.
    pub fn active_layer(&self, held: impl Iterator<Item = SwitchLayer>) -> LayerId {
        if self.toggled_layer != LayerId::Base {
            return self.toggled_layer;
        }
        held.filter(|s| s.mode != SwitchLayerMode::Toggle)
            .map(|s| s.layer)
            .filter(|l| *l != LayerId::Base)
            .min()
            .unwrap_or(LayerId::Base)
    }

    /// Remember the layer the tick ended on
    pub fn end_tick(&mut self, active_layer: LayerId) {
        self.previous_layer = active_layer;
    }

    /// Update toggles for an action that's being applied. `was_pressed` is the key's level in the previous tick.
    pub fn process_action(&mut self, key: KeySlot, was_pressed: bool, action: &KeyAction, now: Instant) {
        // Any other key pressed in between breaks a double tap
        if self.double_tap_key.is_some_and(|k| k != key) && !was_pressed {
            self.double_tap_key = None;
        }

        let KeyAction::SwitchLayer(switch) = action else {
            return;
        };

        match switch.mode {
            SwitchLayerMode::Toggle => {
                if !was_pressed {
                    self.toggled_layer = if self.toggled_layer == switch.layer {
                        LayerId::Base
                    } else {
                        switch.layer
                    };
                    info!("Layer {:?} toggled, active toggle: {:?}", switch.layer, self.toggled_layer);
                }
            }
            SwitchLayerMode::Hold => {}
            SwitchLayerMode::HoldAndDoubleTapToggle => self.process_double_tap(key, was_pressed, switch.layer, now),
        }
    }

    fn process_double_tap(&mut self, key: KeySlot, was_pressed: bool, layer: LayerId, now: Instant) {
        // Pressing the key again while toggled releases the toggle
        if !was_pressed && self.double_tap_toggled && self.toggled_layer == layer {
            info!("Layer {:?} untoggled", layer);
            self.toggled_layer = LayerId::Base;
            self.double_tap_toggled = false;
        }

        // Holding the toggling key too long turns it into a plain hold
        if was_pressed
            && self.double_tap_toggled
            && self.double_tap_key == Some(key)
            && self
                .double_tap_trigger
                .is_some_and(|t| now.saturating_duration_since(t) > self.config.release_timeout)
        {
            info!("Layer {:?} held after double tap, untoggled", layer);
            self.toggled_layer = LayerId::Base;
            self.double_tap_toggled = false;
        }

        if !was_pressed && self.previous_layer == LayerId::Base {
            let within_window = self
                .double_tap_start
                .is_some_and(|t| now.saturating_duration_since(t) < self.config.timeout);
            if self.double_tap_key == Some(key) && within_window {
                info!("Layer {:?} toggled by double tap", layer);
                self.toggled_layer = layer;
                self.double_tap_toggled = true;
                self.double_tap_trigger = Some(now);
            } else {
                self.double_tap_key = Some(key);
            }
            self.double_tap_start = Some(now);
        }
    }
}
