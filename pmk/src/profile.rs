//! The macro profile: sixteen slots mapping physical keys to HID actions.
//!
//! `MacroTable` is the single source of truth for what each key does. It is
//! owned by the control loop and shared with the protocol handler through a
//! `RefCell`; nothing else mutates it.

use serde::{Deserialize, Serialize};

use crate::KEY_COUNT;
use crate::keycode::*;

/// Configuration of one key.
///
/// A slot may carry both a keyboard code and a consumer usage; when fired,
/// a non-zero `consumer_code` takes priority and the keyboard fields are
/// ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroSlot {
    /// Keyboard usage code, 0 = none.
    pub key_code: u8,
    /// Modifier bitmask (CTRL/SHIFT/ALT/GUI).
    pub modifier: u8,
    /// Consumer control usage id, 0 = none.
    pub consumer_code: u16,
    /// Label shown to configuration tools. Compiled in, never persisted.
    pub description: &'static str,
    /// Idle LED color, 0xRRGGBB.
    pub color: u32,
}

impl MacroSlot {
    pub const fn new(
        key_code: u8,
        modifier: u8,
        consumer_code: u16,
        description: &'static str,
        color: u32,
    ) -> Self {
        Self {
            key_code,
            modifier,
            consumer_code,
            description,
            color,
        }
    }
}

/// Compiled-in profile: initial state and the per-field fallback for
/// partially specified configuration documents.
#[rustfmt::skip]
pub const DEFAULT_PROFILE: [MacroSlot; KEY_COUNT] = [
    // Row 1
    MacroSlot::new(KEY_C,         MOD_GUI,             CONSUMER_NONE,          "Copy",           0x00FF00),
    MacroSlot::new(KEY_V,         MOD_GUI,             CONSUMER_NONE,          "Paste",          0x0000FF),
    MacroSlot::new(KEY_Z,         MOD_GUI,             CONSUMER_NONE,          "Undo",           0xFF0000),
    MacroSlot::new(KEY_S,         MOD_GUI,             CONSUMER_NONE,          "Save",           0xFFFF00),
    // Row 2
    MacroSlot::new(KEY_TAB,       MOD_GUI,             CONSUMER_NONE,          "App Switcher",   0xFF00FF),
    MacroSlot::new(KEY_L,         MOD_GUI,             CONSUMER_NONE,          "Lock Screen",    0x00FFFF),
    MacroSlot::new(KEY_Z,         MOD_GUI | MOD_SHIFT, CONSUMER_NONE,          "Redo",           0x80FF00),
    MacroSlot::new(KEY_ESCAPE,    MOD_NONE,            CONSUMER_NONE,          "Escape",         0xFF8000),
    // Row 3
    MacroSlot::new(KEY_NONE,      MOD_NONE,            CONSUMER_PLAY_PAUSE,    "Play/Pause",     0x8000FF),
    MacroSlot::new(KEY_NONE,      MOD_NONE,            CONSUMER_SCAN_PREVIOUS, "Previous Track", 0x0080FF),
    MacroSlot::new(KEY_NONE,      MOD_NONE,            CONSUMER_SCAN_NEXT,     "Next Track",     0xFF0080),
    MacroSlot::new(KEY_DELETE,    MOD_NONE,            CONSUMER_NONE,          "Delete",         0x800000),
    // Row 4
    MacroSlot::new(KEY_ENTER,     MOD_NONE,            CONSUMER_NONE,          "Enter",          0x008000),
    MacroSlot::new(KEY_BACKSPACE, MOD_NONE,            CONSUMER_NONE,          "Backspace",      0x000080),
    MacroSlot::new(KEY_HOME,      MOD_NONE,            CONSUMER_NONE,          "Home",           0x808000),
    MacroSlot::new(KEY_END,       MOD_NONE,            CONSUMER_NONE,          "End",            0x800080),
];

/// Upper bound on slot entries accepted from one configuration document.
/// Entries past [`KEY_COUNT`] are ignored, but parsing stays bounded.
pub const PATCH_LIST_CAP: usize = 2 * KEY_COUNT;

/// One slot as it appears in configuration documents, wire and flash alike.
/// Every field is optional; an absent field means "leave the target value
/// alone" (the current slot for `set_config`, the default profile when
/// loading from flash). Unknown fields, `description` included, are
/// ignored.
#[derive(Deserialize, Clone, Copy, Debug, Default)]
pub struct SlotPatch {
    pub key_code: Option<u8>,
    pub modifier: Option<u8>,
    pub consumer_code: Option<u16>,
    pub color: Option<u32>,
}

/// The persisted form of one slot. `description` is intentionally absent:
/// labels always come from the compiled-in table.
#[derive(Serialize, Clone, Copy, Debug)]
pub struct SlotRecord {
    pub key_code: u8,
    pub modifier: u8,
    pub consumer_code: u16,
    pub color: u32,
}

impl From<&MacroSlot> for SlotRecord {
    fn from(slot: &MacroSlot) -> Self {
        Self {
            key_code: slot.key_code,
            modifier: slot.modifier,
            consumer_code: slot.consumer_code,
            color: slot.color,
        }
    }
}

/// The sixteen-slot table. Created once at startup, never resized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacroTable {
    slots: [MacroSlot; KEY_COUNT],
}

impl Default for MacroTable {
    fn default() -> Self {
        Self {
            slots: DEFAULT_PROFILE,
        }
    }
}

impl MacroTable {
    /// All slots, index = physical key position.
    pub fn slots(&self) -> &[MacroSlot; KEY_COUNT] {
        &self.slots
    }

    /// Reset every slot to the compiled-in profile.
    pub fn load_defaults(&mut self) {
        self.slots = DEFAULT_PROFILE;
    }

    /// Apply one patch to one slot: each present field overwrites, each
    /// absent field keeps the current value. `description` is untouchable.
    pub fn apply(&mut self, index: usize, patch: &SlotPatch) {
        let slot = &mut self.slots[index];
        if let Some(key_code) = patch.key_code {
            slot.key_code = key_code;
        }
        if let Some(modifier) = patch.modifier {
            slot.modifier = modifier;
        }
        if let Some(consumer_code) = patch.consumer_code {
            slot.consumer_code = consumer_code;
        }
        if let Some(color) = patch.color {
            slot.color = color;
        }
    }

    /// Build a table from a stored document: patch fields override the
    /// default profile per field, absent fields keep the default. Returns
    /// `None` when the document has fewer than [`KEY_COUNT`] entries;
    /// surplus entries are ignored.
    pub fn from_stored(patches: &[SlotPatch]) -> Option<Self> {
        if patches.len() < KEY_COUNT {
            return None;
        }
        let mut table = Self::default();
        for (index, patch) in patches.iter().take(KEY_COUNT).enumerate() {
            table.apply(index, patch);
        }
        Some(table)
    }

    /// The persisted form of the table.
    pub fn records(&self) -> [SlotRecord; KEY_COUNT] {
        core::array::from_fn(|i| SlotRecord::from(&self.slots[i]))
    }
}
