//! Report types handed to the transport, and the transport traits.
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;
use serde::Serialize;
use usbd_hid::descriptor::AsInputReport;

use crate::descriptor::{KeyboardReport, MediaKeyboardReport, MouseReport, SystemKeyboardReport};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Report {
    /// Normal keyboard hid report
    KeyboardReport(KeyboardReport),
    /// Media keyboard report
    MediaKeyboardReport(MediaKeyboardReport),
    /// System control report
    SystemKeyboardReport(SystemKeyboardReport),
    /// Mouse hid report
    MouseReport(MouseReport),
}

impl AsInputReport for Report {}

impl Report {
    pub fn interface(&self) -> HidInterface {
        match self {
            Report::KeyboardReport(_) => HidInterface::BasicKeyboard,
            Report::MediaKeyboardReport(_) => HidInterface::MediaKeyboard,
            Report::SystemKeyboardReport(_) => HidInterface::SystemKeyboard,
            Report::MouseReport(_) => HidInterface::Mouse,
        }
    }
}

/// HID interfaces of the keyboard, one send semaphore bit each
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidInterface {
    BasicKeyboard = 0,
    MediaKeyboard = 1,
    SystemKeyboard = 2,
    Mouse = 3,
}

impl HidInterface {
    pub(crate) const fn mask(self) -> u8 {
        1 << self as u8
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidError {
    /// The transport can't take a report right now
    Busy,
    /// No host is connected
    Disconnected,
    BufferOverflow,
}

/// HidTransport carries finished reports to the host, via USB, the bridge to the other half, etc.
///
/// `write_report` must not block. On `Ok` the report is in flight, and the transport calls
/// [`Keyboard::on_report_sent`](crate::keyboard::Keyboard::on_report_sent) once it's delivered.
pub trait HidTransport {
    /// Queue a report for sending
    fn write_report(&mut self, report: Report) -> Result<(), HidError>;

    /// Ask a sleeping host to wake up
    fn wake_up_host(&mut self) {}
}

/// Transport pushing reports into a channel, for a writer task that owns the USB endpoints.
pub struct ChannelTransport<'a, M: RawMutex, const N: usize> {
    channel: &'a Channel<M, Report, N>,
}

impl<'a, M: RawMutex, const N: usize> ChannelTransport<'a, M, N> {
    pub fn new(channel: &'a Channel<M, Report, N>) -> Self {
        Self { channel }
    }
}

impl<M: RawMutex, const N: usize> HidTransport for ChannelTransport<'_, M, N> {
    fn write_report(&mut self, report: Report) -> Result<(), HidError> {
        self.channel.try_send(report).map_err(|_| HidError::Busy)
    }
}
