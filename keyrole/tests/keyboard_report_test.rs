pub mod common;

use common::{TestKeyboard, TestMacros, key, keyboard_report, test_config};
use embassy_futures::block_on;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};
use keyrole::config::KeyboardConfig;
use keyrole::hid::{ChannelTransport, HidInterface, Report};
use keyrole::keyboard::{PENDING_KEY_CAPACITY, TickOutcome};
use keyrole::keycode::ConsumerKey;
use keyrole::matrix::{MatrixScanner, RawMatrix};

#[test]
fn test_unchanged_report_is_not_resent() {
    let mut keyboard = TestKeyboard::new();
    keyboard.press(0, 1);
    keyboard.run_for(20);
    assert_eq!(keyboard.keyboard_reports(), vec![keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0])]);
    assert_eq!(keyboard.keyboard.diagnostics().update_counter, 20);
}

#[test]
fn test_keycodes_overflow_drops_earliest_keys() {
    let mut keyboard = TestKeyboard::new();
    for k in 0..8 {
        keyboard.press(1, k);
    }
    keyboard.tick();
    // Later tracked keys are applied first and fill the report
    assert_eq!(
        keyboard.keyboard_reports(),
        vec![keyboard_report(
            0,
            [kc8!(K), kc8!(J), kc8!(I), kc8!(H), kc8!(G), kc8!(F)]
        )]
    );
    assert_eq!(keyboard.keyboard.diagnostics().report_slot_overflows, 2);
}

#[test]
fn test_pending_key_overflow_is_counted() {
    let mut keyboard = TestKeyboard::new();
    for k in 0..11 {
        keyboard.press(1, k);
    }
    keyboard.tick();
    assert_eq!(keyboard.keyboard.diagnostics().pending_key_overflows, 1);
    assert_eq!(keyboard.keyboard.registry().actions().len(), PENDING_KEY_CAPACITY);
}

#[test]
fn test_plain_modifier_key() {
    key_sequence_test! {
        keyboard: TestKeyboard::new(),
        sequence: [
            [0, 6, true, 0],   // Press LShift
            [0, 1, true, 20],  // Press B
            [0, 1, false, 20], // Release B
            [0, 6, false, 20], // Release LShift
        ],
        expected_reports: [
            [common::KC_LSHIFT, [0; 6]],
            [common::KC_LSHIFT, [kc8!(B), 0, 0, 0, 0, 0]],
            [common::KC_LSHIFT, [0; 6]],
            [0, [0; 6]],
        ]
    };
}

#[test]
fn test_media_key() {
    let mut keyboard = TestKeyboard::new();
    keyboard.press(0, 10);
    keyboard.run_for(10);
    keyboard.release(0, 10);
    keyboard.run_for(10);

    let media: Vec<[u16; 3]> = keyboard
        .transport
        .reports
        .iter()
        .filter_map(|r| match r {
            Report::MediaKeyboardReport(report) => Some(report.scancodes),
            _ => None,
        })
        .collect();
    assert_eq!(media, vec![[ConsumerKey::PlayPause as u16, 0, 0], [0, 0, 0]]);
    assert!(keyboard.keyboard_reports().is_empty());
}

#[test]
fn test_unacknowledged_report_blocks_updates() {
    let mut keyboard = TestKeyboard::new();
    keyboard.acknowledge = false;
    keyboard.press(0, 1);
    assert_eq!(keyboard.tick(), TickOutcome::Updated);
    keyboard.release(0, 1);

    // Skipped until the semaphore times out
    for _ in 1..100 {
        assert_eq!(keyboard.tick(), TickOutcome::Skipped);
    }
    assert_eq!(keyboard.keyboard.diagnostics().forced_semaphore_releases, 0);
    assert_eq!(keyboard.tick(), TickOutcome::Updated);
    assert_eq!(keyboard.keyboard.diagnostics().forced_semaphore_releases, 1);
    assert_eq!(
        keyboard.keyboard_reports(),
        vec![keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0]), keyboard_report(0, [0; 6])]
    );
}

#[test]
fn test_acknowledged_report_unblocks_updates() {
    let mut keyboard = TestKeyboard::new();
    keyboard.acknowledge = false;
    keyboard.press(0, 1);
    keyboard.tick();
    assert_eq!(keyboard.tick(), TickOutcome::Skipped);

    keyboard.keyboard.on_report_sent(HidInterface::BasicKeyboard);
    assert_eq!(keyboard.tick(), TickOutcome::Updated);
}

#[test]
fn test_sleeping_host_is_woken_up() {
    let mut keyboard = TestKeyboard::new();
    keyboard.acknowledge = false;
    keyboard.keyboard.set_host_sleeping(true);
    keyboard.press(0, 1);
    keyboard.tick();
    // Still pressed, no more wake ups
    keyboard.tick();
    assert_eq!(keyboard.transport.wake_ups, 1);
    // Sends don't wait for acknowledgement while the host sleeps
    keyboard.release(0, 1);
    assert_eq!(keyboard.tick(), TickOutcome::Updated);
    assert_eq!(keyboard.keyboard_reports().len(), 2);
}

#[test]
fn test_failed_send_is_retried() {
    let mut keyboard = TestKeyboard::new();
    keyboard.transport.busy = true;
    keyboard.press(0, 1);
    keyboard.tick();
    assert!(keyboard.transport.reports.is_empty());

    keyboard.transport.busy = false;
    keyboard.tick();
    assert_eq!(keyboard.keyboard_reports(), vec![keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0])]);
}

#[test]
fn test_macro_overrides_reports() {
    let mut keyboard = TestKeyboard::with_macros(TestMacros::default(), test_config());
    keyboard.press(0, 9);
    keyboard.tick();
    keyboard.release(0, 9);
    keyboard.run_for(10);

    assert_eq!(keyboard.keyboard.macros().started, vec![0]);
    assert_eq!(
        keyboard.keyboard_reports(),
        vec![keyboard_report(0, [kc8!(Z), 0, 0, 0, 0, 0]), keyboard_report(0, [0; 6])]
    );
}

#[test]
fn test_switch_keymap() {
    let mut keyboard = TestKeyboard::new();
    keyboard.press(0, 8);
    keyboard.run_for(10);
    keyboard.release(0, 8);
    keyboard.run_for(10);
    assert_eq!(keyboard.keyboard.keymap().current(), 1);

    key_sequence_test! {
        keyboard: keyboard,
        sequence: [
            [0, 1, true, 0],
            [0, 1, false, 20],
        ],
        expected_reports: [
            [0, [kc8!(X), 0, 0, 0, 0, 0]],
            [0, [0; 6]],
        ]
    };
}

#[test]
fn test_suppressed_key_is_untracked() {
    let mut keyboard = TestKeyboard::new();
    keyboard.press(0, 1);
    keyboard.tick();
    assert!(keyboard.keyboard.registry().is_tracked(key(0, 1)));

    keyboard.keyboard.suppress(key(0, 1));
    keyboard.tick();
    assert!(!keyboard.keyboard.registry().is_tracked(key(0, 1)));
    assert!(keyboard.keyboard.key_level(key(0, 1)).is_some_and(|l| !l.suppressed));
}

#[test]
fn test_debounced_press() {
    let mut keyboard = TestKeyboard::with_config(KeyboardConfig::default());
    // Bouncing contact
    keyboard.press(0, 1);
    keyboard.run_for(2);
    keyboard.release(0, 1);
    keyboard.run_for(1);
    keyboard.press(0, 1);
    keyboard.run_for(5);
    assert!(keyboard.keyboard_reports().is_empty());

    // Stable for 5 ms since the last bounce
    keyboard.tick();
    assert_eq!(keyboard.keyboard_reports(), vec![keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0])]);
}

#[test]
fn test_channel_transport() {
    let channel: Channel<NoopRawMutex, Report, 1> = Channel::new();
    let mut transport = ChannelTransport::new(&channel);
    let mut keyboard = TestKeyboard::new();
    let mut raw = [[false; common::KEY]; common::SLOT];

    raw[0][1] = true;
    keyboard.keyboard.tick(Instant::from_millis(0), &raw, &mut transport);
    keyboard.keyboard.on_report_sent(HidInterface::BasicKeyboard);

    // Channel is full, the release is kept until there's room
    raw[0][1] = false;
    keyboard.keyboard.tick(Instant::from_millis(1), &raw, &mut transport);
    assert_eq!(
        block_on(channel.receive()),
        Report::KeyboardReport(keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0]))
    );
    assert!(channel.try_receive().is_err());

    keyboard.keyboard.tick(Instant::from_millis(2), &raw, &mut transport);
    assert_eq!(
        channel.try_receive(),
        Ok(Report::KeyboardReport(keyboard_report(0, [0; 6])))
    );
}

struct HeldKeyScanner;

impl MatrixScanner<{ common::SLOT }, { common::KEY }> for HeldKeyScanner {
    fn scan(&mut self, raw: &mut RawMatrix<{ common::SLOT }, { common::KEY }>) {
        raw[0][1] = true;
    }
}

#[test]
fn test_run_loop() {
    let mut keyboard = TestKeyboard::new();
    let mut transport = common::RecordingTransport::default();
    let mut scanner = HeldKeyScanner;

    block_on(select(keyboard.keyboard.run(&mut scanner, &mut transport), async {
        for _ in 0..10 {
            embassy_time::MockDriver::get().advance(Duration::from_millis(1));
            embassy_futures::yield_now().await;
        }
    }));

    assert_eq!(
        transport.reports.first(),
        Some(&Report::KeyboardReport(keyboard_report(0, [kc8!(B), 0, 0, 0, 0, 0])))
    );
}
