//! Driver for the Pico RGB Keypad base: a TCA9555 I/O expander reads the
//! sixteen buttons over I2C, an APA102 chain behind SPI lights them.

use embassy_rp::gpio::Output;
use embassy_rp::i2c::{self, Blocking as I2cBlocking, I2c};
use embassy_rp::peripherals::{I2C0, SPI0};
use embassy_rp::spi::{self, Spi};
use pmk::keypad::ButtonReader;
use pmk::light::LedDriver;
use pmk::KEY_COUNT;

/// TCA9555 bus address on the keypad base.
const EXPANDER_ADDR: u8 = 0x20;
/// First input port register; both ports are read in one transaction.
const INPUT_PORT_REG: u8 = 0x00;

/// APA102 frame layout: 4-byte start frame, one 4-byte frame per LED
/// (brightness, blue, green, red), 4-byte end frame.
const LED_FRAME_LEN: usize = 4 + KEY_COUNT * 4 + 4;

/// APA102 global brightness: top three bits set, 5-bit level at half
/// scale. Per-state dimming happens in the renderer, per channel.
const GLOBAL_BRIGHTNESS: u8 = 0xE0 | 15;

pub struct KeypadButtons<'d> {
    i2c: I2c<'d, I2C0, I2cBlocking>,
    last: u16,
}

impl<'d> KeypadButtons<'d> {
    pub fn new(i2c: I2c<'d, I2C0, I2cBlocking>) -> Self {
        Self { i2c, last: 0 }
    }
}

impl ButtonReader for KeypadButtons<'_> {
    fn read_buttons(&mut self) -> u16 {
        let mut ports = [0u8; 2];
        match self
            .i2c
            .blocking_write_read(EXPANDER_ADDR, &[INPUT_PORT_REG], &mut ports)
        {
            Ok(()) => {
                // Inputs are pulled up; a pressed button reads low.
                self.last = !(ports[0] as u16 | (ports[1] as u16) << 8);
                self.last
            }
            Err(err) => {
                defmt::warn!("button read failed: {:?}, keeping last state", err);
                self.last
            }
        }
    }
}

pub struct KeypadLeds<'d> {
    spi: Spi<'d, SPI0, spi::Blocking>,
    cs: Output<'d>,
    frame: [u8; LED_FRAME_LEN],
}

impl<'d> KeypadLeds<'d> {
    pub fn new(spi: Spi<'d, SPI0, spi::Blocking>, cs: Output<'d>) -> Self {
        let mut frame = [0u8; LED_FRAME_LEN];
        for led in frame[4..4 + KEY_COUNT * 4].chunks_exact_mut(4) {
            led[0] = GLOBAL_BRIGHTNESS;
        }
        for byte in frame[4 + KEY_COUNT * 4..].iter_mut() {
            *byte = 0xFF;
        }
        Self { spi, cs, frame }
    }
}

impl LedDriver for KeypadLeds<'_> {
    type Error = spi::Error;

    fn illuminate(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), Self::Error> {
        if index < KEY_COUNT {
            let offset = 4 + index * 4;
            self.frame[offset + 1] = b;
            self.frame[offset + 2] = g;
            self.frame[offset + 3] = r;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.cs.set_low();
        let result = self.spi.blocking_write(&self.frame);
        self.cs.set_high();
        result
    }
}

/// I2C configuration matching the expander (standard 400 kHz fast mode).
pub fn i2c_config() -> i2c::Config {
    let mut config = i2c::Config::default();
    config.frequency = 400_000;
    config
}

/// SPI configuration for the APA102 chain.
pub fn spi_config() -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = 4_000_000;
    config
}
