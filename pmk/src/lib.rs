//! pmk - firmware core for a 16-key RGB macro keypad.
//!
//! The crate is hardware-generic: buttons, LEDs, the HID transport and the
//! flash backend are all consumed through traits, so the whole profile
//! engine runs in host tests. Board crates (see `boards/`) provide the
//! RP2040 plumbing and the control loop entry point.

#![no_std]

#[macro_use]
mod fmt;

pub mod actuator;
pub mod channel;
pub mod config;
pub mod hid;
pub mod keycode;
pub mod keypad;
pub mod light;
pub mod profile;
pub mod protocol;
pub mod storage;
pub mod usb;

use core::sync::atomic::AtomicBool;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

// Used by the usb writer macros.
#[doc(hidden)]
pub use paste;

/// Number of keys on the pad. The profile table always holds exactly this
/// many slots.
pub const KEY_COUNT: usize = 16;

/// Longest accepted control line in bytes. Longer partial lines are
/// silently discarded to bound buffer growth.
pub const LINE_CAP: usize = 512;

/// Capacity for a serialized response line; `get_config` is the largest.
pub const RESPONSE_CAP: usize = 2048;

/// Raw mutex used by all static channels.
pub type RawMutex = CriticalSectionRawMutex;

/// True once the USB device has been configured by the host.
pub static CONNECTION_STATE: AtomicBool = AtomicBool::new(false);
