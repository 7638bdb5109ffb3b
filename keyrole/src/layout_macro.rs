/// Create a layer in keymap, as rows of slots
#[macro_export]
macro_rules! layer {
    ([$([$($x: expr), +]), +]) => {
        [$([$($x), +]),+]
    };
}

/// Create a normal key. For example, `k!(A)` sends `A`, `k!(LShift)` is a plain left shift.
#[macro_export]
macro_rules! k {
    ($k: ident) => {
        $crate::action::KeyAction::Keystroke($crate::action::Keystroke::from_hid($crate::keycode::HidKeyCode::$k))
    };
}

/// Create a normal key sent with modifiers
#[macro_export]
macro_rules! wm {
    ($k: ident, $m: expr) => {
        $crate::action::KeyAction::Keystroke(
            $crate::action::Keystroke::from_hid($crate::keycode::HidKeyCode::$k).with_modifiers($m),
        )
    };
}

/// Create a normal action: `KeyAction`
#[macro_export]
macro_rules! a {
    ($a: ident) => {
        $crate::action::KeyAction::$a
    };
}

/// Create a dual-role key: tapped it sends `$k`, held it acts as the secondary role `$r`.
/// For example, `dr!(A, LeftShift)` or `dr!(Space, Fn)`.
#[macro_export]
macro_rules! dr {
    ($k: ident, $r: ident) => {
        $crate::action::KeyAction::Keystroke(
            $crate::action::Keystroke::from_hid($crate::keycode::HidKeyCode::$k)
                .with_secondary_role($crate::action::SecondaryRole::$r),
        )
    };
}

/// Create a layer activate action. For example, `mo!(Fn)` activates the Fn layer while held.
#[macro_export]
macro_rules! mo {
    ($x: ident) => {
        $crate::action::KeyAction::SwitchLayer($crate::action::SwitchLayer::new(
            $crate::action::LayerId::$x,
            $crate::action::SwitchLayerMode::Hold,
        ))
    };
}

/// Create a layer key that activates its layer while held, and toggles it on a double tap
#[macro_export]
macro_rules! dt {
    ($x: ident) => {
        $crate::action::KeyAction::SwitchLayer($crate::action::SwitchLayer::new(
            $crate::action::LayerId::$x,
            $crate::action::SwitchLayerMode::HoldAndDoubleTapToggle,
        ))
    };
}

/// Create a layer toggle action
#[macro_export]
macro_rules! tg {
    ($x: ident) => {
        $crate::action::KeyAction::SwitchLayer($crate::action::SwitchLayer::new(
            $crate::action::LayerId::$x,
            $crate::action::SwitchLayerMode::Toggle,
        ))
    };
}

/// Create a mouse key. For example, `ms!(MoveUp)`.
#[macro_export]
macro_rules! ms {
    ($x: ident) => {
        $crate::action::KeyAction::Mouse($crate::action::MouseAction::$x)
    };
}

/// Create a media key. For example, `media!(PlayPause)`.
#[macro_export]
macro_rules! media {
    ($x: ident) => {
        $crate::action::KeyAction::Keystroke($crate::action::Keystroke::media($crate::keycode::ConsumerKey::$x))
    };
}

/// Create a system control key. For example, `sys!(Sleep)`.
#[macro_export]
macro_rules! sys {
    ($x: ident) => {
        $crate::action::KeyAction::Keystroke($crate::action::Keystroke::system(
            $crate::keycode::SystemControlKey::$x,
        ))
    };
}
