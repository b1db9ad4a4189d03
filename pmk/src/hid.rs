//! HID report types and the transport seam of the output path.

use embassy_usb::driver::EndpointError;
pub use usbd_hid::descriptor::{KeyboardReport, MediaKeyboardReport};

/// A report to be sent to the host.
pub enum Report {
    /// Boot keyboard report: modifier byte plus up to six keycodes.
    Keyboard(KeyboardReport),
    /// Consumer control report: one 16-bit usage id.
    Consumer(MediaKeyboardReport),
}

#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidError {
    UsbEndpointError(EndpointError),
}

/// Writer side of the HID transport.
///
/// Two hardware variants exist: the composite device with keyboard and
/// consumer endpoints, and a keyboard-only device that has nowhere to send
/// consumer reports. Both implement this trait (see [`crate::usb`]); tests
/// substitute recording doubles.
pub trait ReportWriter {
    /// Whether the transport can accept a report right now. A `false` here
    /// is advisory: callers log it and attempt the send anyway.
    fn is_ready(&self) -> bool;

    async fn write_report(&mut self, report: Report) -> Result<(), HidError>;
}

/// An all-zero keyboard report, releasing every key and modifier.
pub fn release_all() -> KeyboardReport {
    KeyboardReport {
        modifier: 0,
        reserved: 0,
        leds: 0,
        keycodes: [0; 6],
    }
}

/// A keyboard report pressing a single key combination.
pub fn key_press(modifier: u8, key_code: u8) -> KeyboardReport {
    KeyboardReport {
        modifier,
        reserved: 0,
        leds: 0,
        keycodes: [key_code, 0, 0, 0, 0, 0],
    }
}
