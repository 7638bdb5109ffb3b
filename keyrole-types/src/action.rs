//! Key actions.
//!
//! A [`KeyAction`] is what the keymap returns for a key on a given layer.
//! Keystrokes may carry a [`SecondaryRole`], which turns them into dual-role keys:
//! tapped they send their scancode, held they act as a modifier or a layer switch.
use serde::{Deserialize, Serialize};
use strum::{EnumCount, FromRepr};

use crate::keycode::{ConsumerKey, HidKeyCode, SystemControlKey};
use crate::modifier::HidModifiers;

/// Layers of a keymap
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, FromRepr, EnumCount)]
pub enum LayerId {
    #[default]
    Base = 0,
    Mod = 1,
    Fn = 2,
    Mouse = 3,
}

/// How a switch layer key activates its layer
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchLayerMode {
    /// Layer is active while the key is held
    Hold,
    /// Layer is active while held, two taps in a row toggle it
    HoldAndDoubleTapToggle,
    /// Each press flips the layer on or off
    Toggle,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchLayer {
    pub layer: LayerId,
    pub mode: SwitchLayerMode,
}

impl SwitchLayer {
    pub const fn new(layer: LayerId, mode: SwitchLayerMode) -> Self {
        Self { layer, mode }
    }
}

/// Which HID report a keystroke's scancode goes to
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeystrokeType {
    Basic,
    Media,
    System,
}

/// The role a dual-role key takes when held.
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromRepr)]
pub enum SecondaryRole {
    LeftCtrl = 1,
    LeftShift,
    LeftAlt,
    LeftSuper,
    RightCtrl,
    RightShift,
    RightAlt,
    RightSuper,
    Mod,
    Fn,
    Mouse,
}

impl SecondaryRole {
    /// The report bits this role adds when it commits, if it is a modifier role
    pub const fn modifiers(self) -> Option<HidModifiers> {
        match self {
            SecondaryRole::LeftCtrl => Some(HidModifiers::LEFT_CTRL),
            SecondaryRole::LeftShift => Some(HidModifiers::LEFT_SHIFT),
            SecondaryRole::LeftAlt => Some(HidModifiers::LEFT_ALT),
            SecondaryRole::LeftSuper => Some(HidModifiers::LEFT_GUI),
            SecondaryRole::RightCtrl => Some(HidModifiers::RIGHT_CTRL),
            SecondaryRole::RightShift => Some(HidModifiers::RIGHT_SHIFT),
            SecondaryRole::RightAlt => Some(HidModifiers::RIGHT_ALT),
            SecondaryRole::RightSuper => Some(HidModifiers::RIGHT_GUI),
            _ => None,
        }
    }

    /// The layer this role activates when it commits, if it is a layer role
    pub const fn layer(self) -> Option<LayerId> {
        match self {
            SecondaryRole::Mod => Some(LayerId::Mod),
            SecondaryRole::Fn => Some(LayerId::Fn),
            SecondaryRole::Mouse => Some(LayerId::Mouse),
            _ => None,
        }
    }
}

/// A scancode plus the modifiers sent with it.
///
/// A keystroke with scancode 0 and non-empty modifiers is a plain modifier key.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keystroke {
    pub keystroke_type: KeystrokeType,
    pub scancode: u16,
    pub modifiers: HidModifiers,
    pub secondary_role: Option<SecondaryRole>,
}

impl Keystroke {
    pub const fn new(keystroke_type: KeystrokeType, scancode: u16, modifiers: HidModifiers) -> Self {
        Self {
            keystroke_type,
            scancode,
            modifiers,
            secondary_role: None,
        }
    }

    /// Keystroke on the basic keyboard report. Modifier keycodes become modifier bits.
    pub const fn from_hid(keycode: HidKeyCode) -> Self {
        if keycode.is_modifier() {
            Self::new(KeystrokeType::Basic, 0, keycode.to_hid_modifiers())
        } else {
            Self::new(KeystrokeType::Basic, keycode as u16, HidModifiers::new())
        }
    }

    pub const fn media(key: ConsumerKey) -> Self {
        Self::new(KeystrokeType::Media, key as u16, HidModifiers::new())
    }

    pub const fn system(key: SystemControlKey) -> Self {
        Self::new(KeystrokeType::System, key as u16, HidModifiers::new())
    }

    pub const fn with_modifiers(mut self, modifiers: HidModifiers) -> Self {
        self.modifiers = HidModifiers::from_bits(self.modifiers.into_bits() | modifiers.into_bits());
        self
    }

    pub const fn with_secondary_role(mut self, role: SecondaryRole) -> Self {
        self.secondary_role = Some(role);
        self
    }
}

/// Mouse key actions
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromRepr, EnumCount)]
pub enum MouseAction {
    LeftClick = 0,
    MiddleClick,
    RightClick,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    Accelerate,
    Decelerate,
}

/// The action at a key position, stored in the keymap.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyAction {
    /// No action
    #[default]
    No,
    /// Send a keystroke, optionally acting as a secondary role when held
    Keystroke(Keystroke),
    /// Drive the mouse
    Mouse(MouseAction),
    /// Activate a layer
    SwitchLayer(SwitchLayer),
    /// Switch to another keymap, by id
    SwitchKeymap(u8),
    /// Start a macro, by id
    PlayMacro(u8),
}

impl KeyAction {
    pub const fn secondary_role(&self) -> Option<SecondaryRole> {
        match self {
            KeyAction::Keystroke(keystroke) => keystroke.secondary_role,
            _ => None,
        }
    }

    /// A keystroke that sends a scancode
    pub const fn is_plain_keystroke(&self) -> bool {
        matches!(self, KeyAction::Keystroke(keystroke) if keystroke.scancode != 0)
    }

    /// A keystroke that only carries modifiers
    pub const fn is_modifier_keystroke(&self) -> bool {
        matches!(self, KeyAction::Keystroke(keystroke) if keystroke.scancode == 0)
    }
}
