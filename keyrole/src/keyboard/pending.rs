use embassy_time::Instant;
use heapless::{Deque, Vec};

use crate::diagnostics::Diagnostics;
use crate::matrix::KeySlot;

/// Max number of keys in each pending set
pub const PENDING_KEY_CAPACITY: usize = 10;
/// Max number of keys resolved out of band in one tick
pub const IMMEDIATE_QUEUE_CAPACITY: usize = 4;

/// A key tracked by the registry while it's held.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingKey {
    pub key: KeySlot,
    /// Time the key was first tracked
    pub enqueue_time: Instant,
    /// The secondary role has been committed for this hold
    pub activated: bool,
}

impl PendingKey {
    pub fn new(key: KeySlot, enqueue_time: Instant) -> Self {
        Self {
            key,
            enqueue_time,
            activated: false,
        }
    }
}

/// Ordered, bounded set of pending keys. Insertion order is kept on removal.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingSet {
    pub(crate) keys: Vec<PendingKey, PENDING_KEY_CAPACITY>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self { keys: Vec::new() }
    }

    /// Append a key at the tail, giving it back if the set is full
    pub fn push(&mut self, key: PendingKey) -> Result<(), PendingKey> {
        self.keys.push(key)
    }

    /// Remove the key at `index`, shifting later keys left.
    ///
    /// An out of range index is a bug in the caller: it asserts in debug builds and does nothing otherwise.
    pub fn remove(&mut self, index: usize) -> Option<PendingKey> {
        debug_assert!(index < self.keys.len(), "untracking a key that isn't pending");
        if index < self.keys.len() {
            Some(self.keys.remove(index))
        } else {
            None
        }
    }

    pub fn position(&self, key: KeySlot) -> Option<usize> {
        self.keys.iter().position(|k| k.key == key)
    }

    pub fn contains(&self, key: KeySlot) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&PendingKey> {
        self.keys.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PendingKey> {
        self.keys.get_mut(index)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PendingKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys whose primary role fires this tick, outside the pending action loop.
///
/// A full queue drops its oldest entry.
#[derive(Debug, Default, Clone)]
pub struct ImmediateQueue {
    keys: Deque<PendingKey, IMMEDIATE_QUEUE_CAPACITY>,
}

impl ImmediateQueue {
    pub fn new() -> Self {
        Self { keys: Deque::new() }
    }

    /// Returns `false` if an older entry was overwritten
    pub fn push(&mut self, key: PendingKey) -> bool {
        let mut kept_all = true;
        if self.keys.is_full() {
            self.keys.pop_front();
            kept_all = false;
        }
        // Cannot fail, there's room after the pop above
        let _ = self.keys.push_back(key);
        kept_all
    }

    /// Queue `key` behind every scheduled entry, so it's applied last.
    ///
    /// Returns `false` if the queue is full, `key` is dropped then.
    pub fn push_oldest(&mut self, key: PendingKey) -> bool {
        self.keys.push_front(key).is_ok()
    }

    /// Most recently scheduled first
    pub fn iter_latest_first(&self) -> impl Iterator<Item = &PendingKey> {
        self.keys.iter().rev()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Keys currently in flight, split into candidate modifiers (keys with a secondary role)
/// and candidate actions.
///
/// A key is in at most one of the two sets.
#[derive(Debug, Default, Clone)]
pub struct PendingRegistry {
    pub(crate) modifiers: PendingSet,
    pub(crate) actions: PendingSet,
    pub(crate) immediate: ImmediateQueue,
    /// Enqueue time of the last key released while a secondary role was undecided
    pub(crate) released_action_key_enqueue_time: Option<Instant>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-tick scratch state
    pub(crate) fn begin_tick(&mut self) {
        self.immediate.clear();
        self.released_action_key_enqueue_time = None;
    }

    pub fn modifiers(&self) -> &PendingSet {
        &self.modifiers
    }

    pub fn actions(&self) -> &PendingSet {
        &self.actions
    }

    pub fn immediate(&self) -> &ImmediateQueue {
        &self.immediate
    }

    pub fn is_tracked(&self, key: KeySlot) -> bool {
        self.modifiers.contains(key) || self.actions.contains(key)
    }

    /// Start tracking a pressed key. Keys with a secondary role go to the modifier set, others to the action set.
    ///
    /// Returns `false` if the key was already tracked or the set is full.
    pub fn track(&mut self, key: KeySlot, has_secondary_role: bool, now: Instant, diagnostics: &mut Diagnostics) -> bool {
        if self.is_tracked(key) {
            return false;
        }
        let set = if has_secondary_role {
            &mut self.modifiers
        } else {
            &mut self.actions
        };
        match set.push(PendingKey::new(key, now)) {
            Ok(()) => true,
            Err(k) => {
                error!("Pending key set overflowed, cannot track: {:?}", k.key);
                Diagnostics::count(&mut diagnostics.pending_key_overflows);
                false
            }
        }
    }

    pub fn untrack_modifier(&mut self, index: usize) -> Option<PendingKey> {
        self.modifiers.remove(index)
    }

    pub fn untrack_action(&mut self, index: usize) -> Option<PendingKey> {
        self.actions.remove(index)
    }

    /// Fire the primary role of `key` in this tick
    pub fn schedule_for_immediate_execution(&mut self, key: PendingKey, diagnostics: &mut Diagnostics) {
        debug!("Schedule {:?} for immediate execution", key.key);
        self.released_action_key_enqueue_time = Some(key.enqueue_time);
        if !self.immediate.push(key) {
            error!("Immediate execution queue overflowed");
            Diagnostics::count(&mut diagnostics.immediate_queue_overflows);
        }
    }

    /// Fire the primary role of every released action key in this tick, after the keys already scheduled.
    /// The keys stay tracked until the action loop sees them released.
    pub(crate) fn schedule_released_actions<F>(&mut self, mut is_pressed: F, diagnostics: &mut Diagnostics)
    where
        F: FnMut(KeySlot) -> bool,
    {
        for k in self.actions.keys.iter() {
            if is_pressed(k.key) {
                continue;
            }
            debug!("Schedule released {:?} for immediate execution", k.key);
            if !self.immediate.push_oldest(*k) {
                error!("Immediate execution queue overflowed");
                Diagnostics::count(&mut diagnostics.immediate_queue_overflows);
            }
        }
    }

    /// Move every pending modifier that is still pressed into the action set, so that its primary role is used.
    /// Released modifiers are dropped.
    pub(crate) fn promote_modifiers<F>(&mut self, mut is_pressed: F, diagnostics: &mut Diagnostics)
    where
        F: FnMut(KeySlot) -> bool,
    {
        for k in self.modifiers.keys.iter() {
            if is_pressed(k.key) && self.actions.push(*k).is_err() {
                error!("Pending key set overflowed, cannot promote: {:?}", k.key);
                Diagnostics::count(&mut diagnostics.pending_key_overflows);
            }
        }
        self.modifiers.keys.clear();
    }

    /// The key held longest among the pending modifiers and the pending actions that send a scancode.
    /// The first one wins on equal enqueue times, modifiers before actions.
    pub fn longest_pressed_key<F>(&self, mut is_plain_keystroke: F) -> Option<PendingKey>
    where
        F: FnMut(KeySlot) -> bool,
    {
        let mut longest: Option<PendingKey> = None;
        let candidates = self
            .modifiers
            .iter()
            .chain(self.actions.iter().filter(|k| is_plain_keystroke(k.key)));
        for k in candidates {
            if longest.is_none_or(|l| k.enqueue_time < l.enqueue_time) {
                longest = Some(*k);
            }
        }
        longest
    }
}
