mod common;

use core::cell::RefCell;

use common::*;
use embassy_futures::block_on;
use embassy_time::Duration;
use pmk::actuator::Actuator;
use pmk::config::StorageConfig;
use pmk::keycode::*;
use pmk::profile::{MacroTable, DEFAULT_PROFILE};
use pmk::protocol::{ControlService, LineBuffer, ResponseLine};
use pmk::storage::Storage;
use pmk::KEY_COUNT;
use serde::Deserialize;

#[derive(Deserialize)]
struct SlotOut<'a> {
    key_code: u8,
    modifier: u8,
    consumer_code: u16,
    color: u32,
    #[serde(borrow)]
    description: &'a str,
}

#[derive(Deserialize)]
struct ConfigOut<'a> {
    #[serde(borrow)]
    macros: heapless::Vec<SlotOut<'a>, 32>,
    cmd: &'a str,
}

#[derive(Deserialize)]
struct StatusOut<'a> {
    status: &'a str,
    #[serde(borrow)]
    cmd: Option<&'a str>,
    #[serde(borrow)]
    reason: Option<&'a str>,
}

struct Harness {
    table: RefCell<MacroTable>,
    storage: Storage<MemFlash>,
    actuator: Actuator<RecordingWriter>,
    log: ReportLog,
}

impl Harness {
    fn new() -> Self {
        Self::with_flash(MemFlash::new())
    }

    fn with_flash(flash: MemFlash) -> Self {
        let log = ReportLog::default();
        Self {
            table: RefCell::new(MacroTable::default()),
            storage: Storage::new(flash, &StorageConfig::default()),
            actuator: Actuator::new(RecordingWriter::new(log.clone()), Duration::from_ticks(0)),
            log,
        }
    }

    fn run(&mut self, line: &str) -> ResponseLine {
        let service = ControlService::new(&self.table);
        block_on(service.handle_line(line, &mut self.storage, &mut self.actuator))
    }
}

fn status(response: &ResponseLine) -> (String, Option<String>, Option<String>) {
    let (out, _) = serde_json_core::de::from_str::<StatusOut>(response.as_str()).unwrap();
    (
        out.status.to_string(),
        out.cmd.map(str::to_string),
        out.reason.map(str::to_string),
    )
}

#[test]
fn get_config_reports_all_sixteen_slots() {
    let mut harness = Harness::new();
    let response = harness.run("{\"cmd\":\"get_config\"}");

    let (config, _) = serde_json_core::de::from_str::<ConfigOut>(response.as_str()).unwrap();
    assert_eq!(config.cmd, "config");
    assert_eq!(config.macros.len(), KEY_COUNT);
    for (slot, expected) in config.macros.iter().zip(DEFAULT_PROFILE.iter()) {
        assert_eq!(slot.key_code, expected.key_code);
        assert_eq!(slot.modifier, expected.modifier);
        assert_eq!(slot.consumer_code, expected.consumer_code);
        assert_eq!(slot.color, expected.color);
        assert_eq!(slot.description, expected.description);
    }
}

#[test]
fn set_config_updates_and_persists() {
    let mut harness = Harness::new();
    let entries: Vec<String> = (0..KEY_COUNT)
        .map(|i| {
            format!(
                "{{\"key_code\":{},\"modifier\":1,\"consumer_code\":0,\"color\":{}}}",
                i + 1,
                i * 16
            )
        })
        .collect();
    let line = format!("{{\"cmd\":\"set_config\",\"macros\":[{}]}}", entries.join(","));

    let response = harness.run(&line);
    assert_eq!(
        status(&response),
        ("ok".to_string(), Some("set_config".to_string()), None)
    );
    for (i, slot) in harness.table.borrow().slots().iter().enumerate() {
        assert_eq!(slot.key_code, (i + 1) as u8);
        assert_eq!(slot.modifier, MOD_CTRL);
        assert_eq!(slot.color, (i * 16) as u32);
        // Descriptions are not part of the protocol surface.
        assert_eq!(slot.description, DEFAULT_PROFILE[i].description);
    }

    // A later get_config observes the same state.
    let reloaded = block_on(harness.storage.load()).unwrap();
    assert_eq!(&reloaded, &*harness.table.borrow());
}

#[test]
fn set_config_with_partial_slot_keeps_other_fields() {
    let mut harness = Harness::new();
    let mut entries = vec!["{}".to_string(); KEY_COUNT];
    entries[2] = "{\"color\":1193046}".to_string();
    let line = format!("{{\"cmd\":\"set_config\",\"macros\":[{}]}}", entries.join(","));

    let response = harness.run(&line);
    assert_eq!(status(&response).0, "ok");

    let table = harness.table.borrow();
    let slot = table.slots()[2];
    assert_eq!(slot.color, 1193046);
    assert_eq!(slot.key_code, DEFAULT_PROFILE[2].key_code);
    assert_eq!(slot.modifier, DEFAULT_PROFILE[2].modifier);
    assert_eq!(slot.consumer_code, DEFAULT_PROFILE[2].consumer_code);
    for (i, slot) in table.slots().iter().enumerate() {
        if i != 2 {
            assert_eq!(slot, &DEFAULT_PROFILE[i]);
        }
    }
}

#[test]
fn set_config_rejects_undersized_macro_list() {
    let mut harness = Harness::new();
    let entries = vec!["{}".to_string(); KEY_COUNT - 1];
    let line = format!("{{\"cmd\":\"set_config\",\"macros\":[{}]}}", entries.join(","));

    let response = harness.run(&line);
    assert_eq!(
        status(&response),
        (
            "error".to_string(),
            None,
            Some("missing macros".to_string())
        )
    );
    assert_eq!(harness.table.borrow().slots(), &DEFAULT_PROFILE);
    // Nothing was persisted either.
    assert!(block_on(harness.storage.load()).is_err());
}

#[test]
fn set_config_rejects_missing_macro_list() {
    let mut harness = Harness::new();
    let response = harness.run("{\"cmd\":\"set_config\"}");
    assert_eq!(status(&response).2, Some("missing macros".to_string()));
    assert_eq!(harness.table.borrow().slots(), &DEFAULT_PROFILE);
}

#[test]
fn set_config_ignores_entries_past_sixteen() {
    let mut harness = Harness::new();
    let mut entries = vec!["{}".to_string(); KEY_COUNT + 2];
    entries[KEY_COUNT] = "{\"key_code\":102}".to_string();
    let line = format!("{{\"cmd\":\"set_config\",\"macros\":[{}]}}", entries.join(","));

    let response = harness.run(&line);
    assert_eq!(status(&response).0, "ok");
    assert_eq!(harness.table.borrow().slots(), &DEFAULT_PROFILE);
}

#[test]
fn set_config_answers_ok_when_persisting_fails() {
    let mut flash = MemFlash::new();
    flash.fail_writes = true;
    let mut harness = Harness::with_flash(flash);
    let entries = vec!["{\"modifier\":2}".to_string(); KEY_COUNT];
    let line = format!("{{\"cmd\":\"set_config\",\"macros\":[{}]}}", entries.join(","));

    // The merge already happened; the save failure is only logged.
    let response = harness.run(&line);
    assert_eq!(status(&response).0, "ok");
    assert_eq!(harness.table.borrow().slots()[0].modifier, MOD_SHIFT);
}

#[test]
fn test_macro_fires_the_selected_slot() {
    let mut harness = Harness::new();
    let response = harness.run("{\"cmd\":\"test_macro\",\"index\":3}");
    assert_eq!(
        status(&response),
        ("ok".to_string(), Some("test_macro".to_string()), None)
    );
    assert_eq!(
        harness.log.all(),
        vec![
            SentReport::Keyboard {
                modifier: MOD_GUI,
                keycodes: [KEY_S, 0, 0, 0, 0, 0],
            },
            SentReport::Keyboard {
                modifier: 0,
                keycodes: [0; 6],
            },
        ]
    );
}

#[test]
fn test_macro_rejects_out_of_range_indices() {
    let mut harness = Harness::new();
    for line in [
        "{\"cmd\":\"test_macro\",\"index\":16}",
        "{\"cmd\":\"test_macro\",\"index\":-1}",
        "{\"cmd\":\"test_macro\"}",
    ] {
        let response = harness.run(line);
        assert_eq!(status(&response).2, Some("bad index".to_string()));
    }
    assert_eq!(harness.log.len(), 0);
}

#[test]
fn unknown_commands_get_a_diagnostic() {
    let mut harness = Harness::new();
    let response = harness.run("{\"cmd\":\"reboot\"}");
    assert_eq!(response.as_str(), "unknown cmd: reboot");
    assert_eq!(harness.table.borrow().slots(), &DEFAULT_PROFILE);
}

#[test]
fn malformed_lines_get_a_diagnostic_and_change_nothing() {
    let mut harness = Harness::new();
    for line in ["not json at all", "{\"macros\":[]}", "{\"cmd\":3}"] {
        let response = harness.run(line);
        assert!(response.as_str().starts_with("parse error"), "{}", line);
    }
    assert_eq!(harness.table.borrow().slots(), &DEFAULT_PROFILE);
    assert_eq!(harness.log.len(), 0);
}

#[test]
fn line_buffer_frames_on_lf_and_drops_cr() {
    let mut buffer = LineBuffer::new();
    let mut lines = Vec::new();
    for byte in b"{\"cmd\":\"get_config\"}\r\n\n{\"a\":1}\n" {
        if let Some(line) = buffer.push(*byte) {
            lines.push(line.as_str().to_string());
        }
    }
    assert_eq!(lines, vec!["{\"cmd\":\"get_config\"}", "{\"a\":1}"]);
}

#[test]
fn line_buffer_silently_discards_oversized_lines() {
    let mut buffer = LineBuffer::new();
    for _ in 0..600 {
        assert!(buffer.push(b'a').is_none());
    }
    // The oversized line is dropped at the terminator without a report.
    assert!(buffer.push(b'\n').is_none());
    // The buffer recovers for the next line.
    let mut line = None;
    for byte in b"{\"cmd\":\"x\"}\n" {
        line = buffer.push(*byte).or(line);
    }
    assert_eq!(line.unwrap().as_str(), "{\"cmd\":\"x\"}");
}
