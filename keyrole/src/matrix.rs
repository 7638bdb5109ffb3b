use embassy_time::Instant;

/// Physical modules of the split keyboard. The slot index of a [`KeySlot`] uses these values.
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotId {
    RightKeyboardHalf = 0,
    LeftKeyboardHalf = 1,
    LeftModule = 2,
    RightModule = 3,
}

/// Number of slots of the full split keyboard
pub const SLOT_COUNT: usize = 4;

/// Identity of a physical key: the module it sits on and its index in that module's matrix
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeySlot {
    pub slot: u8,
    pub key: u8,
}

impl KeySlot {
    pub const fn new(slot: u8, key: u8) -> Self {
        Self { slot, key }
    }
}

impl From<(SlotId, u8)> for KeySlot {
    fn from((slot, key): (SlotId, u8)) -> Self {
        Self::new(slot as u8, key)
    }
}

/// Stable logical level of a key, maintained by the debouncer.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyLevel {
    /// Debounced pressed state
    pub current: bool,
    /// `current` of the previous tick
    pub previous: bool,
    /// A raw change is waiting for its debounce timeout
    pub debouncing: bool,
    /// Start of the pending raw change, or time of the last accepted transition
    pub timestamp: Instant,
    /// Treat the key as released once, then clear
    pub suppressed: bool,
}

impl Default for KeyLevel {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyLevel {
    pub const fn new() -> Self {
        Self {
            current: false,
            previous: false,
            debouncing: false,
            timestamp: Instant::from_ticks(0),
            suppressed: false,
        }
    }

    /// Pressed in this tick, released in the previous one
    pub fn is_pressing(&self) -> bool {
        self.current && !self.previous
    }

    /// Released in this tick, pressed in the previous one
    pub fn is_releasing(&self) -> bool {
        !self.current && self.previous
    }
}

/// Raw key levels of one scan, indexed by slot then key
pub type RawMatrix<const SLOT: usize, const KEY: usize> = [[bool; KEY]; SLOT];

/// Source of raw key levels, read once per tick.
pub trait MatrixScanner<const SLOT: usize, const KEY: usize> {
    /// Fill `raw` with the levels of this scan cycle
    fn scan(&mut self, raw: &mut RawMatrix<SLOT, KEY>);
}

/// Levels of every key of the keyboard
pub struct KeyStates<const SLOT: usize, const KEY: usize> {
    levels: [[KeyLevel; KEY]; SLOT],
}

impl<const SLOT: usize, const KEY: usize> Default for KeyStates<SLOT, KEY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOT: usize, const KEY: usize> KeyStates<SLOT, KEY> {
    pub const fn new() -> Self {
        Self {
            levels: [[KeyLevel::new(); KEY]; SLOT],
        }
    }

    pub fn get(&self, key: KeySlot) -> Option<&KeyLevel> {
        self.levels.get(key.slot as usize)?.get(key.key as usize)
    }

    pub fn get_mut(&mut self, key: KeySlot) -> Option<&mut KeyLevel> {
        self.levels.get_mut(key.slot as usize)?.get_mut(key.key as usize)
    }

    /// Debounced pressed state, `false` for keys outside the matrix
    pub fn is_pressed(&self, key: KeySlot) -> bool {
        self.get(key).is_some_and(|level| level.current)
    }

    /// Iterate over all keys with their identity, slot by slot
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (KeySlot, &mut KeyLevel)> {
        self.levels.iter_mut().enumerate().flat_map(|(slot, keys)| {
            keys.iter_mut()
                .enumerate()
                .map(move |(key, level)| (KeySlot::new(slot as u8, key as u8), level))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeySlot, &KeyLevel)> {
        self.levels.iter().enumerate().flat_map(|(slot, keys)| {
            keys.iter()
                .enumerate()
                .map(move |(key, level)| (KeySlot::new(slot as u8, key as u8), level))
        })
    }
}
