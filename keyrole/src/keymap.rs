use keyrole_types::action::{KeyAction, LayerId};
use strum::EnumCount;

use crate::matrix::KeySlot;

/// Number of layers of a keymap
pub const NUM_LAYER: usize = LayerId::COUNT;

/// Keymap lookup used by the processing core.
pub trait Keymap {
    /// Action of a key on a layer. Never fails, unmapped keys are `KeyAction::No`.
    fn resolve(&self, layer: LayerId, key: KeySlot) -> KeyAction;

    /// Make another keymap the active one. Returns `false` if there's no keymap with this id.
    fn switch_keymap(&mut self, keymap_id: u8) -> bool;
}

/// Layers of one keymap, indexed by layer, then slot, then key
pub type KeymapLayers<const SLOT: usize, const KEY: usize> = [[[KeyAction; KEY]; SLOT]; NUM_LAYER];

/// A set of static keymaps, one of them active.
pub struct KeyMap<'a, const SLOT: usize, const KEY: usize> {
    keymaps: &'a [KeymapLayers<SLOT, KEY>],
    current: usize,
}

impl<'a, const SLOT: usize, const KEY: usize> KeyMap<'a, SLOT, KEY> {
    pub fn new(keymaps: &'a [KeymapLayers<SLOT, KEY>]) -> Self {
        Self { keymaps, current: 0 }
    }

    /// Index of the active keymap
    pub fn current(&self) -> usize {
        self.current
    }
}

impl<const SLOT: usize, const KEY: usize> Keymap for KeyMap<'_, SLOT, KEY> {
    fn resolve(&self, layer: LayerId, key: KeySlot) -> KeyAction {
        self.keymaps
            .get(self.current)
            .and_then(|layers| layers.get(layer as usize))
            .and_then(|slots| slots.get(key.slot as usize))
            .and_then(|keys| keys.get(key.key as usize))
            .copied()
            .unwrap_or_default()
    }

    fn switch_keymap(&mut self, keymap_id: u8) -> bool {
        if (keymap_id as usize) < self.keymaps.len() {
            if self.current != keymap_id as usize {
                info!("Switch to keymap {}", keymap_id);
                self.current = keymap_id as usize;
            }
            true
        } else {
            warn!("Keymap {} doesn't exist", keymap_id);
            false
        }
    }
}
