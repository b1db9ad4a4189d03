//! Shared test doubles: recording HID writer, scripted buttons, recording
//! LED driver, and an in-memory NOR flash.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use embedded_storage_async::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use pmk::hid::{HidError, Report, ReportWriter};
use pmk::keypad::ButtonReader;
use pmk::light::LedDriver;
use pmk::KEY_COUNT;

// Init logger for tests
#[ctor::ctor]
pub fn init_log() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// What a report looked like when it hit the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentReport {
    Keyboard { modifier: u8, keycodes: [u8; 6] },
    Consumer { usage_id: u16 },
}

#[derive(Clone, Default)]
pub struct ReportLog(Rc<RefCell<Vec<SentReport>>>);

impl ReportLog {
    pub fn all(&self) -> Vec<SentReport> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// `ReportWriter` double that records instead of sending.
pub struct RecordingWriter {
    pub log: ReportLog,
    pub ready: bool,
}

impl RecordingWriter {
    pub fn new(log: ReportLog) -> Self {
        Self { log, ready: true }
    }
}

impl ReportWriter for RecordingWriter {
    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn write_report(&mut self, report: Report) -> Result<(), HidError> {
        let entry = match report {
            Report::Keyboard(r) => SentReport::Keyboard {
                modifier: r.modifier,
                keycodes: r.keycodes,
            },
            Report::Consumer(r) => SentReport::Consumer {
                usage_id: r.usage_id,
            },
        };
        self.log.0.borrow_mut().push(entry);
        Ok(())
    }
}

/// Replays a fixed sequence of button masks, repeating the last one.
pub struct ScriptedButtons {
    samples: Vec<u16>,
    pos: usize,
}

impl ScriptedButtons {
    pub fn new(samples: &[u16]) -> Self {
        Self {
            samples: samples.to_vec(),
            pos: 0,
        }
    }
}

impl ButtonReader for ScriptedButtons {
    fn read_buttons(&mut self) -> u16 {
        let sample = self
            .samples
            .get(self.pos)
            .or(self.samples.last())
            .copied()
            .unwrap_or(0);
        self.pos += 1;
        sample
    }
}

pub type Frame = [(u8, u8, u8); KEY_COUNT];

#[derive(Clone, Default)]
pub struct FrameLog(Rc<RefCell<Vec<Frame>>>);

impl FrameLog {
    pub fn all(&self) -> Vec<Frame> {
        self.0.borrow().clone()
    }

    pub fn last(&self) -> Option<Frame> {
        self.0.borrow().last().copied()
    }
}

/// `LedDriver` double: stages per-key colors, logs a frame on flush.
pub struct RecordingLeds {
    pub log: FrameLog,
    staged: Frame,
}

impl RecordingLeds {
    pub fn new(log: FrameLog) -> Self {
        Self {
            log,
            staged: [(0, 0, 0); KEY_COUNT],
        }
    }
}

impl LedDriver for RecordingLeds {
    type Error = core::convert::Infallible;

    fn illuminate(&mut self, index: usize, r: u8, g: u8, b: u8) -> Result<(), Self::Error> {
        self.staged[index] = (r, g, b);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.log.0.borrow_mut().push(self.staged);
        Ok(())
    }
}

pub const MEM_FLASH_SIZE: usize = 8192;

/// RAM-backed NOR flash with standard erased-to-0xFF semantics.
pub struct MemFlash {
    pub data: [u8; MEM_FLASH_SIZE],
    pub fail_writes: bool,
}

impl Default for MemFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl MemFlash {
    pub fn new() -> Self {
        Self {
            data: [0xFF; MEM_FLASH_SIZE],
            fail_writes: false,
        }
    }
}

#[derive(Debug)]
pub struct MemFlashError;

impl NorFlashError for MemFlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for MemFlash {
    type Error = MemFlashError;
}

impl ReadNorFlash for MemFlash {
    const READ_SIZE: usize = 1;

    async fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = offset as usize;
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    async fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemFlashError);
        }
        self.data[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    async fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(MemFlashError);
        }
        let offset = offset as usize;
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }
}
