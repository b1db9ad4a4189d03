//! Per-key RGB feedback.
//!
//! The frame is a pure function of the button mask, the profile table and
//! the wall clock; [`LightService`] pushes it through the LED driver every
//! control-loop tick.

use crate::config::{BRIGHTNESS_IDLE, BRIGHTNESS_PRESSED, COLOR_BEAT, COLOR_PRESSED};
use crate::profile::MacroTable;
use crate::KEY_COUNT;

/// Index of the key carrying the idle blink indicator.
pub const BEAT_KEY: usize = KEY_COUNT - 1;

/// Driver seam for the LED chain.
pub trait LedDriver {
    type Error;

    fn illuminate(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), Self::Error>;

    /// Push the staged colors out to the hardware.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

fn channels(color: u32) -> (u8, u8, u8) {
    ((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

fn scaled(color: u32, brightness: u8) -> (u8, u8, u8) {
    let (r, g, b) = channels(color);
    let scale = |c: u8| ((c as u16 * brightness as u16) / 255) as u8;
    (scale(r), scale(g), scale(b))
}

/// Compute one LED frame.
///
/// Held keys light up white at full brightness; everything else shows its
/// slot color dimmed to the idle level. While no key is held, the beat key
/// blinks the accent color at 0.5 Hz, keyed off one-second buckets of the
/// wall clock.
pub fn frame(buttons: u16, table: &MacroTable, now_millis: u64) -> [(u8, u8, u8); KEY_COUNT] {
    let mut out = [(0, 0, 0); KEY_COUNT];
    for (index, led) in out.iter_mut().enumerate() {
        *led = if buttons & (1 << index) != 0 {
            scaled(COLOR_PRESSED, BRIGHTNESS_PRESSED)
        } else {
            scaled(table.slots()[index].color, BRIGHTNESS_IDLE)
        };
    }
    if buttons == 0 && (now_millis / 1000) % 2 == 0 {
        out[BEAT_KEY] = scaled(COLOR_BEAT, BRIGHTNESS_IDLE);
    }
    out
}

pub struct LightService<D: LedDriver> {
    driver: D,
}

impl<D: LedDriver> LightService<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn render(
        &mut self,
        buttons: u16,
        table: &MacroTable,
        now_millis: u64,
    ) -> Result<(), D::Error> {
        for (index, (r, g, b)) in frame(buttons, table, now_millis).iter().enumerate() {
            self.driver.illuminate(index, *r, *g, *b)?;
        }
        self.driver.flush()
    }
}
