//! Turns a macro slot into HID traffic: press, hold, release.

use embassy_time::{Duration, Timer};
use usbd_hid::descriptor::MediaKeyboardReport;

use crate::hid::{key_press, release_all, HidError, Report, ReportWriter};
use crate::profile::MacroSlot;

pub struct Actuator<W: ReportWriter> {
    writer: W,
    hold: Duration,
}

impl<W: ReportWriter> Actuator<W> {
    pub fn new(writer: W, hold: Duration) -> Self {
        Self { writer, hold }
    }

    /// Fire a slot. A non-zero consumer usage wins over the keyboard
    /// fields; otherwise the keyboard combination is sent. The transport
    /// being not ready only downgrades to a warning - the send is attempted
    /// regardless, and never retried.
    pub async fn fire(&mut self, slot: &MacroSlot) -> Result<(), HidError> {
        if !self.writer.is_ready() {
            warn!("HID transport not ready, sending anyway");
        }

        if slot.consumer_code != 0 {
            self.writer
                .write_report(Report::Consumer(MediaKeyboardReport {
                    usage_id: slot.consumer_code,
                }))
                .await?;
            Timer::after(self.hold).await;
            self.writer
                .write_report(Report::Consumer(MediaKeyboardReport { usage_id: 0 }))
                .await?;
            info!("consumer usage sent: {:#x}", slot.consumer_code);
            return Ok(());
        }

        self.writer
            .write_report(Report::Keyboard(key_press(slot.modifier, slot.key_code)))
            .await?;
        Timer::after(self.hold).await;
        self.writer
            .write_report(Report::Keyboard(release_all()))
            .await?;
        info!("macro sent: {}", slot.description);
        Ok(())
    }
}
