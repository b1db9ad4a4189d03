//! Configuration structs for the keypad firmware.

use embassy_time::Duration;

/// USB identity of the device.
#[derive(Clone, Copy, Debug)]
pub struct UsbConfig<'a> {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: &'a str,
    pub product_name: &'a str,
    pub serial_number: &'a str,
}

impl Default for UsbConfig<'_> {
    fn default() -> Self {
        Self {
            vid: 0x2E8A,
            pid: 0x107C,
            manufacturer: "pmk",
            product_name: "pmk macro keypad",
            serial_number: "pmk00001",
        }
    }
}

/// Flash region used for the persisted configuration document.
///
/// `start_addr` is an offset into the flash device; the region spans
/// `num_sectors` erase sectors from there.
#[derive(Clone, Copy, Debug)]
pub struct StorageConfig {
    pub start_addr: u32,
    pub num_sectors: u8,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            start_addr: 0,
            num_sectors: 2,
        }
    }
}

/// Timing of the control loop and the HID output path.
#[derive(Clone, Copy, Debug)]
pub struct KeypadConfig {
    /// Poll period of the button/LED/control tick.
    pub tick_interval: Duration,
    /// How long a key or consumer usage is held between the press and the
    /// release report. Host OSes debounce HID input; releasing immediately
    /// makes some of them drop the event.
    pub key_hold_delay: Duration,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            key_hold_delay: Duration::from_millis(50),
        }
    }
}

/// LED color when a key is held down.
pub const COLOR_PRESSED: u32 = 0xFFFFFF;
/// Accent color of the idle blink indicator on the last key.
pub const COLOR_BEAT: u32 = 0xFF0000;

/// Per-channel brightness numerators, denominator 255.
pub const BRIGHTNESS_PRESSED: u8 = 255;
pub const BRIGHTNESS_IDLE: u8 = 26;
