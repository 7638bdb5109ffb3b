//! Dual-role key resolution.
//!
//! A key with a secondary role is tracked as a pending modifier. The resolver decides, tick by tick, whether it
//! ends up as its primary keystroke or as its secondary role, from its hold duration and from the order in which
//! the keys held together are released.
use embassy_time::{Duration, Instant};
use keyrole_types::action::{LayerId, SecondaryRole};
use keyrole_types::modifier::HidModifiers;

use super::pending::PendingRegistry;
use crate::diagnostics::Diagnostics;
use crate::matrix::KeySlot;

/// What the resolver reads about keys. Implemented over the debounced key levels and the keymap.
pub trait KeyView {
    /// Debounced pressed state
    fn is_pressed(&self, key: KeySlot) -> bool;

    /// Secondary role of the key's action on the active layer
    fn secondary_role(&self, key: KeySlot) -> Option<SecondaryRole>;

    /// Whether the key's action on the active layer sends a scancode
    fn is_plain_keystroke(&self, key: KeySlot) -> bool;
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolverState {
    /// No dual-role key is undecided, keys act as they are pressed
    #[default]
    FreeType,
    /// A dual-role key is held and its role is undecided, other keys are buffered
    AwaitingSecondaryRoleRelease,
    /// At least one secondary role is committed or about to be
    SecondaryRoleActive,
}

/// Effects of one resolver step
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Resolution {
    /// Modifier bits of committed secondary roles
    pub modifiers: HidModifiers,
    /// Layer of a committed secondary role, overrides the active layer for this tick
    pub layer: Option<LayerId>,
    /// The pending actions must be executed this tick
    pub execute_actions: bool,
}

pub struct SecondaryRoleResolver {
    state: ResolverState,
    kick_in_threshold: Duration,
}

impl SecondaryRoleResolver {
    pub fn new(kick_in_threshold: Duration) -> Self {
        Self {
            state: ResolverState::FreeType,
            kick_in_threshold,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    /// Run the state machine for one tick.
    ///
    /// A tick can go forward through several states, `FreeType` -> `AwaitingSecondaryRoleRelease` ->
    /// `SecondaryRoleActive`, so that a key released in the same tick its state is entered is handled
    /// without an extra tick of latency. Pending actions are executed at most once per call.
    pub fn resolve<V: KeyView>(
        &mut self,
        registry: &mut PendingRegistry,
        keys: &V,
        now: Instant,
        diagnostics: &mut Diagnostics,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        if self.state == ResolverState::FreeType {
            self.free_type(registry, keys, diagnostics, &mut resolution);
        }
        if self.state == ResolverState::AwaitingSecondaryRoleRelease {
            self.awaiting_secondary_role_release(registry, keys, now, diagnostics, &mut resolution);
        }
        if self.state == ResolverState::SecondaryRoleActive {
            self.secondary_role_active(registry, keys, now, diagnostics, &mut resolution);
        }

        resolution
    }

    fn set_state(&mut self, state: ResolverState) {
        if self.state != state {
            debug!("Resolver state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    fn timeout_elapsed(&self, enqueue_time: Instant, now: Instant) -> bool {
        now.saturating_duration_since(enqueue_time) > self.kick_in_threshold
    }

    fn free_type<V: KeyView>(
        &mut self,
        registry: &mut PendingRegistry,
        keys: &V,
        diagnostics: &mut Diagnostics,
        resolution: &mut Resolution,
    ) {
        let dual_role_pending = !registry.modifiers.is_empty()
            && registry
                .longest_pressed_key(|k| keys.is_plain_keystroke(k))
                .is_some_and(|k| keys.secondary_role(k.key).is_some());

        if dual_role_pending {
            self.set_state(ResolverState::AwaitingSecondaryRoleRelease);
        } else {
            registry.promote_modifiers(|k| keys.is_pressed(k), diagnostics);
            resolution.execute_actions = true;
        }
    }

    fn awaiting_secondary_role_release<V: KeyView>(
        &mut self,
        registry: &mut PendingRegistry,
        keys: &V,
        now: Instant,
        diagnostics: &mut Diagnostics,
        resolution: &mut Resolution,
    ) {
        let mut consider_activation = false;

        for i in (0..registry.modifiers.len()).rev() {
            let Some(modifier) = registry.modifiers.get(i).copied() else {
                continue;
            };
            if keys.is_pressed(modifier.key) {
                continue;
            }
            if registry.modifiers.len() > 1 {
                registry.released_action_key_enqueue_time = Some(modifier.enqueue_time);
                consider_activation = true;
            } else {
                if !self.timeout_elapsed(modifier.enqueue_time, now) {
                    registry.schedule_for_immediate_execution(modifier, diagnostics);
                }
                registry.untrack_modifier(i);
            }
        }

        if !registry.modifiers.is_empty() && !consider_activation {
            consider_activation = registry.actions.iter().any(|a| !keys.is_pressed(a.key));
        }

        let activate = registry
            .modifiers
            .iter()
            .any(|m| keys.is_pressed(m.key) && (consider_activation || self.timeout_elapsed(m.enqueue_time, now)));

        if activate {
            self.set_state(ResolverState::SecondaryRoleActive);
            return;
        }

        // Every pending modifier went up in this very tick: nothing is left to act as a modifier, so they all
        // fall back to their primary role, in press order.
        if registry.modifiers.iter().all(|m| !keys.is_pressed(m.key)) {
            for i in (0..registry.modifiers.len()).rev() {
                if let Some(modifier) = registry.untrack_modifier(i) {
                    if !self.timeout_elapsed(modifier.enqueue_time, now) {
                        registry.schedule_for_immediate_execution(modifier, diagnostics);
                    }
                }
            }
        }

        if registry.modifiers.is_empty() {
            // Action keys released along with the last modifier are gone before the action loop runs
            registry.schedule_released_actions(|k| keys.is_pressed(k), diagnostics);
            resolution.execute_actions = true;
            self.set_state(ResolverState::FreeType);
        }
    }

    fn secondary_role_active<V: KeyView>(
        &mut self,
        registry: &mut PendingRegistry,
        keys: &V,
        now: Instant,
        diagnostics: &mut Diagnostics,
        resolution: &mut Resolution,
    ) {
        // Released action keys fire their primary role, they stay tracked until the action loop sees them released
        for i in 0..registry.actions.len() {
            if let Some(action) = registry.actions.get(i).copied() {
                if !keys.is_pressed(action.key) {
                    registry.schedule_for_immediate_execution(action, diagnostics);
                }
            }
        }

        let mut active_modifier_detected = false;
        for i in (0..registry.modifiers.len()).rev() {
            let released_enqueue_time = registry.released_action_key_enqueue_time;
            let timeout_elapsed = match registry.modifiers.get(i) {
                Some(m) => self.timeout_elapsed(m.enqueue_time, now),
                None => continue,
            };
            let Some(modifier) = registry.modifiers.get_mut(i) else {
                continue;
            };
            if !keys.is_pressed(modifier.key) {
                continue;
            }
            let held_across_release = released_enqueue_time.is_some_and(|t| modifier.enqueue_time < t);
            if modifier.activated || timeout_elapsed || held_across_release {
                if !modifier.activated {
                    debug!("Secondary role of {:?} committed", modifier.key);
                }
                match keys.secondary_role(modifier.key) {
                    Some(role) => {
                        if let Some(layer) = role.layer() {
                            resolution.layer = Some(layer);
                        }
                        if let Some(modifiers) = role.modifiers() {
                            resolution.modifiers |= modifiers;
                        }
                    }
                    None => warn!("Pending modifier {:?} has no secondary role", modifier.key),
                }
                modifier.activated = true;
                active_modifier_detected = true;
            }
        }

        for i in (0..registry.modifiers.len()).rev() {
            let Some(modifier) = registry.modifiers.get(i).copied() else {
                continue;
            };
            if keys.is_pressed(modifier.key) {
                continue;
            }
            if !self.timeout_elapsed(modifier.enqueue_time, now) && !modifier.activated {
                registry.schedule_for_immediate_execution(modifier, diagnostics);
            }
            registry.untrack_modifier(i);
        }

        if !active_modifier_detected {
            if registry.actions.is_empty() {
                self.set_state(ResolverState::FreeType);
            } else {
                self.set_state(ResolverState::AwaitingSecondaryRoleRelease);
            }
        }

        resolution.execute_actions = true;
    }
}
