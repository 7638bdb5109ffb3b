/// Run a key sequence on a test keyboard and compare the keyboard reports it sent.
///
/// Each step is `[slot, key, pressed, delay]`: the keyboard runs for `delay` ticks, then the key changes.
/// After the last step the keyboard runs for another 50 ticks.
#[macro_export]
macro_rules! key_sequence_test {
    (keyboard: $keyboard:expr, sequence: [$([$slot:expr, $key:expr, $pressed:expr, $delay:expr]),* $(,)?], expected_reports: [$([$modifier:expr, $keys:expr]),* $(,)?]) => {{
        let mut keyboard = $keyboard;
        $(
            keyboard.run_for($delay);
            keyboard.set($slot, $key, $pressed);
        )*
        keyboard.run_for(50);

        let expected: Vec<keyrole::descriptor::KeyboardReport> = vec![
            $(
                $crate::common::keyboard_report($modifier, $keys),
            )*
        ];
        assert_eq!(keyboard.keyboard_reports(), expected);
        keyboard
    }};
}

// Map a keycode name to its report byte
#[macro_export]
macro_rules! kc8 {
    ($key: ident) => {
        keyrole::keycode::HidKeyCode::$key as u8
    };
}
