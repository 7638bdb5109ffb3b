//! # keyrole
//!
//! Key processing core of a split keyboard. Every poll tick it debounces the raw key matrix, resolves dual-role
//! keys (a keystroke when tapped, a modifier or layer when held), applies the resolved actions to the HID
//! reports and hands the changed reports to the transport.
//!
//! The core is driven by [`Keyboard::tick`](keyboard::Keyboard::tick), or by the
//! [`Keyboard::run`](keyboard::Keyboard::run) loop.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod debounce;
pub mod descriptor;
pub mod diagnostics;
pub mod hid;
pub mod keyboard;
pub mod keyboard_macro;
pub mod keymap;
pub mod layout_macro;
pub mod matrix;

pub use keyboard::Keyboard;
pub use keyrole_types::{action, keycode, modifier};
