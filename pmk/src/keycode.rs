//! HID usage codes used by the default profile and the control protocol.
//!
//! Slots carry raw wire values (keyboard usage page 0x07, consumer page
//! 0x0C), so these are plain constants rather than an enum: the table is
//! reconfigured at runtime with arbitrary host-supplied codes and never
//! needs an exhaustive mapping.

/// Modifier bitmask, HID boot keyboard byte 0 layout (left-hand modifiers).
pub const MOD_NONE: u8 = 0x00;
pub const MOD_CTRL: u8 = 0x01;
pub const MOD_SHIFT: u8 = 0x02;
pub const MOD_ALT: u8 = 0x04;
pub const MOD_GUI: u8 = 0x08;

/// Keyboard usage codes (usage page 0x07).
pub const KEY_NONE: u8 = 0x00;
pub const KEY_C: u8 = 0x06;
pub const KEY_L: u8 = 0x0F;
pub const KEY_S: u8 = 0x16;
pub const KEY_V: u8 = 0x19;
pub const KEY_Z: u8 = 0x1D;
pub const KEY_ENTER: u8 = 0x28;
pub const KEY_ESCAPE: u8 = 0x29;
pub const KEY_BACKSPACE: u8 = 0x2A;
pub const KEY_TAB: u8 = 0x2B;
pub const KEY_DELETE: u8 = 0x4C;
pub const KEY_HOME: u8 = 0x4A;
pub const KEY_END: u8 = 0x4D;

/// Consumer control usage ids (usage page 0x0C).
pub const CONSUMER_NONE: u16 = 0x0000;
pub const CONSUMER_PLAY_PAUSE: u16 = 0x00CD;
pub const CONSUMER_SCAN_NEXT: u16 = 0x00B5;
pub const CONSUMER_SCAN_PREVIOUS: u16 = 0x00B6;
pub const CONSUMER_MUTE: u16 = 0x00E2;
pub const CONSUMER_VOLUME_UP: u16 = 0x00E9;
pub const CONSUMER_VOLUME_DOWN: u16 = 0x00EA;
