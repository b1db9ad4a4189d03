//! The control loop: button polling, edge dispatch, LED refresh, and the
//! control-channel drain, all on one task.

use core::cell::RefCell;

use embassy_time::{Duration, Instant, Timer};
use embedded_storage_async::nor_flash::NorFlash as AsyncNorFlash;

use crate::actuator::Actuator;
use crate::channel::{CONTROL_LINE_CHANNEL, CONTROL_RESPONSE_CHANNEL};
use crate::config::KeypadConfig;
use crate::hid::ReportWriter;
use crate::light::{LedDriver, LightService};
use crate::profile::MacroTable;
use crate::protocol::ControlService;
use crate::storage::Storage;
use crate::KEY_COUNT;

/// Button input seam: one bit per key, bit set = held down. The driver is
/// expected to deliver stable readings; no extra debouncing happens here.
pub trait ButtonReader {
    fn read_buttons(&mut self) -> u16;
}

pub struct MacroPad<'a, B, W, D, F>
where
    B: ButtonReader,
    W: ReportWriter,
    D: LedDriver,
    F: AsyncNorFlash,
{
    table: &'a RefCell<MacroTable>,
    buttons: B,
    actuator: Actuator<W>,
    light: LightService<D>,
    control: ControlService<'a>,
    storage: Storage<F>,
    previous: u16,
    tick_interval: Duration,
}

impl<'a, B, W, D, F> MacroPad<'a, B, W, D, F>
where
    B: ButtonReader,
    W: ReportWriter,
    D: LedDriver,
    F: AsyncNorFlash,
{
    pub fn new(
        table: &'a RefCell<MacroTable>,
        buttons: B,
        actuator: Actuator<W>,
        light: LightService<D>,
        storage: Storage<F>,
        config: &KeypadConfig,
    ) -> Self {
        Self {
            table,
            buttons,
            actuator,
            light,
            control: ControlService::new(table),
            storage,
            previous: 0,
            tick_interval: config.tick_interval,
        }
    }

    pub async fn run(&mut self) -> ! {
        info!("keypad loop started");
        loop {
            Timer::after(self.tick_interval).await;
            self.tick(Instant::now().as_millis()).await;
        }
    }

    /// One loop iteration. Split out from [`run`](Self::run) so the host
    /// tests can drive the loop with explicit button samples and clocks.
    pub async fn tick(&mut self, now_millis: u64) {
        let current = self.buttons.read_buttons();

        // Rising edges only: a held button fires exactly once.
        let pressed = current & !self.previous;
        for index in 0..KEY_COUNT {
            if pressed & (1 << index) != 0 {
                debug!("key {} pressed", index);
                let slot = self.table.borrow().slots()[index];
                if let Err(err) = self.actuator.fire(&slot).await {
                    error!("failed to send macro for key {}: {:?}", index, err);
                }
            }
        }
        self.previous = current;

        // LEDs every tick: they depend on level and on the idle blink, not
        // just on edges.
        {
            let table = self.table.borrow();
            if self.light.render(current, &table, now_millis).is_err() {
                error!("led update failed");
            }
        }

        while let Ok(line) = CONTROL_LINE_CHANNEL.try_receive() {
            let response = self
                .control
                .handle_line(&line, &mut self.storage, &mut self.actuator)
                .await;
            CONTROL_RESPONSE_CHANNEL.send(response).await;
        }
    }
}
