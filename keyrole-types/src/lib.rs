//! # keyrole types
//!
//! Plain data types shared between the keyrole processing core and its collaborators
//! (keymap storage, macro player, host tooling).
//!
//! ## Modules
//!
//! - [`action`] - Key actions resolved from the keymap, including dual-role keystrokes and layer switches
//! - [`keycode`] - HID keycodes, consumer (media) and system control codes
//! - [`modifier`] - HID modifier bits as they appear in the keyboard report

#![no_std]

pub mod action;
pub mod keycode;
pub mod modifier;
