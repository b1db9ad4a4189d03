//! The serial control protocol: newline-delimited JSON commands.
//!
//! Each line is parsed and dispatched independently; there is no session
//! state. Malformed input is answered with a diagnostic line and dropped -
//! it never mutates the table and never takes the loop down.

use core::cell::RefCell;
use core::fmt::Write;

use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::actuator::Actuator;
use crate::hid::ReportWriter;
use crate::profile::{MacroTable, SlotPatch, DEFAULT_PROFILE, PATCH_LIST_CAP};
use crate::storage::Storage;
use crate::{KEY_COUNT, LINE_CAP, RESPONSE_CAP};

/// One complete inbound line.
pub type ControlLine = String<LINE_CAP>;

/// One outbound response line, JSON or diagnostic text.
pub type ResponseLine = String<RESPONSE_CAP>;

#[derive(Deserialize)]
struct CommandFrame<'a> {
    cmd: &'a str,
    macros: Option<Vec<SlotPatch, PATCH_LIST_CAP>>,
    index: Option<i32>,
}

#[derive(Serialize)]
struct SlotReport<'a> {
    key_code: u8,
    modifier: u8,
    consumer_code: u16,
    color: u32,
    description: &'a str,
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    macros: [SlotReport<'a>; KEY_COUNT],
    cmd: &'a str,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    status: &'a str,
    cmd: &'a str,
}

#[derive(Serialize)]
struct ErrorReport<'a> {
    status: &'a str,
    reason: &'a str,
}

fn json_response<T: Serialize>(value: &T) -> ResponseLine {
    let mut buffer = [0u8; RESPONSE_CAP];
    let mut out = ResponseLine::new();
    match serde_json_core::ser::to_slice(value, &mut buffer) {
        Ok(len) => {
            // Serialized output of our own report types is valid UTF-8.
            if let Ok(text) = core::str::from_utf8(&buffer[..len]) {
                let _ = out.push_str(text);
            }
        }
        Err(_) => {
            error!("response does not fit the line buffer");
        }
    }
    out
}

fn ok_response(cmd: &str) -> ResponseLine {
    json_response(&StatusReport { status: "ok", cmd })
}

fn error_response(reason: &str) -> ResponseLine {
    json_response(&ErrorReport {
        status: "error",
        reason,
    })
}

/// Assembles raw serial bytes into complete lines.
///
/// CR is ignored, LF terminates a line. A partial line outgrowing
/// [`LINE_CAP`] is discarded up to the next LF; no error goes back to the
/// peer.
pub struct LineBuffer {
    buf: Vec<u8, LINE_CAP>,
    overflowed: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte; returns a line when this byte completed one.
    pub fn push(&mut self, byte: u8) -> Option<ControlLine> {
        match byte {
            b'\n' => {
                let line = if self.overflowed {
                    debug!("oversized control line discarded");
                    None
                } else {
                    core::str::from_utf8(&self.buf)
                        .ok()
                        .filter(|s| !s.is_empty())
                        .and_then(|s| ControlLine::try_from(s).ok())
                };
                self.buf.clear();
                self.overflowed = false;
                line
            }
            b'\r' => None,
            _ => {
                if !self.overflowed && self.buf.push(byte).is_err() {
                    self.overflowed = true;
                    self.buf.clear();
                }
                None
            }
        }
    }
}

/// Parses control lines and applies them to the profile table.
pub struct ControlService<'a> {
    table: &'a RefCell<MacroTable>,
}

impl<'a> ControlService<'a> {
    pub fn new(table: &'a RefCell<MacroTable>) -> Self {
        Self { table }
    }

    /// Handle one complete line, returning the response line to send back.
    pub async fn handle_line<W: ReportWriter, F: AsyncNorFlash>(
        &self,
        line: &str,
        storage: &mut Storage<F>,
        actuator: &mut Actuator<W>,
    ) -> ResponseLine {
        let frame = match serde_json_core::de::from_slice::<CommandFrame>(line.as_bytes()) {
            Ok((frame, _)) => frame,
            Err(_) => {
                warn!("dropping malformed control line");
                let mut out = ResponseLine::new();
                let _ = out.push_str("parse error: expected a JSON command object");
                return out;
            }
        };

        match frame.cmd {
            "get_config" => self.config_report(),
            "set_config" => self.set_config(frame.macros, storage).await,
            "test_macro" => self.test_macro(frame.index, actuator).await,
            other => {
                warn!("unknown cmd: {}", other);
                let mut out = ResponseLine::new();
                let _ = write!(out, "unknown cmd: {}", other);
                out
            }
        }
    }

    fn config_report(&self) -> ResponseLine {
        let table = self.table.borrow();
        let slots = table.slots();
        let macros: [SlotReport; KEY_COUNT] = core::array::from_fn(|i| SlotReport {
            key_code: slots[i].key_code,
            modifier: slots[i].modifier,
            consumer_code: slots[i].consumer_code,
            color: slots[i].color,
            description: DEFAULT_PROFILE[i].description,
        });
        json_response(&ConfigReport {
            macros,
            cmd: "config",
        })
    }

    async fn set_config<F: AsyncNorFlash>(
        &self,
        patches: Option<Vec<SlotPatch, PATCH_LIST_CAP>>,
        storage: &mut Storage<F>,
    ) -> ResponseLine {
        let Some(patches) = patches.filter(|p| p.len() >= KEY_COUNT) else {
            return error_response("missing macros");
        };

        {
            let mut table = self.table.borrow_mut();
            for (index, patch) in patches.iter().take(KEY_COUNT).enumerate() {
                table.apply(index, patch);
            }
        }

        // Snapshot so no borrow is held across the flash write.
        let snapshot = *self.table.borrow();
        if let Err(err) = storage.save(&snapshot).await {
            error!("failed to persist configuration: {:?}", err);
        }
        ok_response("set_config")
    }

    async fn test_macro<W: ReportWriter>(
        &self,
        index: Option<i32>,
        actuator: &mut Actuator<W>,
    ) -> ResponseLine {
        let index = index.unwrap_or(-1);
        if !(0..KEY_COUNT as i32).contains(&index) {
            return error_response("bad index");
        }

        let slot = self.table.borrow().slots()[index as usize];
        if let Err(err) = actuator.fire(&slot).await {
            error!("test fire failed: {:?}", err);
        }
        ok_response("test_macro")
    }
}
