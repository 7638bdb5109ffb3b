//! HID modifier bits.
//!
//! The layout matches the first byte of the boot keyboard report.
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use bitfield_struct::bitfield;
use serde::{Deserialize, Serialize};

#[bitfield(u8, order = Lsb, defmt = cfg(feature = "defmt"))]
#[derive(Serialize, Deserialize, Eq, PartialEq)]
pub struct HidModifiers {
    #[bits(1)]
    pub left_ctrl: bool,
    #[bits(1)]
    pub left_shift: bool,
    #[bits(1)]
    pub left_alt: bool,
    #[bits(1)]
    pub left_gui: bool,
    #[bits(1)]
    pub right_ctrl: bool,
    #[bits(1)]
    pub right_shift: bool,
    #[bits(1)]
    pub right_alt: bool,
    #[bits(1)]
    pub right_gui: bool,
}

impl BitOr for HidModifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() | rhs.into_bits())
    }
}
impl BitAnd for HidModifiers {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::from_bits(self.into_bits() & rhs.into_bits())
    }
}
impl Not for HidModifiers {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::from_bits(!self.into_bits())
    }
}
impl BitAndAssign for HidModifiers {
    fn bitand_assign(&mut self, rhs: Self) {
        *self = *self & rhs;
    }
}
impl BitOrAssign for HidModifiers {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

impl HidModifiers {
    pub const LEFT_CTRL: Self = Self::new().with_left_ctrl(true);
    pub const LEFT_SHIFT: Self = Self::new().with_left_shift(true);
    pub const LEFT_ALT: Self = Self::new().with_left_alt(true);
    pub const LEFT_GUI: Self = Self::new().with_left_gui(true);
    pub const RIGHT_CTRL: Self = Self::new().with_right_ctrl(true);
    pub const RIGHT_SHIFT: Self = Self::new().with_right_shift(true);
    pub const RIGHT_ALT: Self = Self::new().with_right_alt(true);
    pub const RIGHT_GUI: Self = Self::new().with_right_gui(true);

    /// True if no modifier bit is set
    pub const fn is_empty(self) -> bool {
        self.into_bits() == 0
    }
}
