//! pmk on the Raspberry Pi Pico with the Pimoroni RGB Keypad base.
//!
//! Task layout: the USB device and the two CDC tasks run on their own
//! embassy tasks; everything stateful (buttons, profile table, storage,
//! HID output, LEDs) lives on the single control-loop task.

#![no_std]
#![no_main]

mod keypad_driver;

use core::cell::RefCell;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Async, Flash};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::I2c;
use embassy_rp::peripherals::USB;
use embassy_rp::spi::Spi;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::UsbDevice;
use panic_probe as _;
use pmk::actuator::Actuator;
use pmk::channel::{CONTROL_LINE_CHANNEL, CONTROL_RESPONSE_CHANNEL};
use pmk::config::{KeypadConfig, StorageConfig, UsbConfig};
use pmk::hid::KeyboardReport;
#[cfg(not(feature = "keyboard-only"))]
use pmk::hid::MediaKeyboardReport;
use pmk::keypad::MacroPad;
use pmk::light::LightService;
use pmk::profile::MacroTable;
use pmk::protocol::LineBuffer;
use pmk::storage::{Storage, StorageError};
use pmk::usb::new_usb_builder;
#[cfg(not(feature = "keyboard-only"))]
use pmk::usb::UsbCompositeWriter;
#[cfg(feature = "keyboard-only")]
use pmk::usb::UsbKeyboardWriter;
use pmk::{add_control_port, add_usb_writer};
use static_cell::StaticCell;

use crate::keypad_driver::{i2c_config, spi_config, KeypadButtons, KeypadLeds};

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

const FLASH_SIZE: usize = 2 * 1024 * 1024;
const STORAGE_SECTORS: u8 = 2;

type UsbDriver = Driver<'static, USB>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("pmk keypad starting");
    let p = embassy_rp::init(Default::default());

    // USB composite device: keyboard HID, consumer HID, CDC control port.
    let mut builder = new_usb_builder(Driver::new(p.USB, Irqs), UsbConfig::default());
    let keyboard_writer = add_usb_writer!(&mut builder, KeyboardReport, 8);
    #[cfg(not(feature = "keyboard-only"))]
    let report_writer = {
        let consumer_writer = add_usb_writer!(&mut builder, MediaKeyboardReport, 8);
        UsbCompositeWriter::new(keyboard_writer, consumer_writer)
    };
    #[cfg(feature = "keyboard-only")]
    let report_writer = UsbKeyboardWriter::new(keyboard_writer);
    let control_port = add_control_port!(&mut builder);
    let usb = builder.build();
    unwrap!(spawner.spawn(usb_task(usb)));

    let (control_tx, control_rx) = control_port.split();
    unwrap!(spawner.spawn(control_reader_task(control_rx)));
    unwrap!(spawner.spawn(control_writer_task(control_tx)));

    // Persisted configuration sits in the last flash sectors, after the
    // program image (see memory.x).
    let flash = Flash::<_, Async, FLASH_SIZE>::new(p.FLASH, p.DMA_CH0);
    let storage_config = StorageConfig {
        start_addr: (FLASH_SIZE - STORAGE_SECTORS as usize * embassy_rp::flash::ERASE_SIZE) as u32,
        num_sectors: STORAGE_SECTORS,
    };
    let mut storage = Storage::new(flash, &storage_config);
    let table = match storage.load().await {
        Ok(table) => table,
        Err(err) => {
            warn!("no usable stored configuration ({:?}), using defaults", err);
            if err == StorageError::Corrupted {
                let _ = storage.erase().await;
            }
            MacroTable::default()
        }
    };
    log_profile(&table);

    static TABLE: StaticCell<RefCell<MacroTable>> = StaticCell::new();
    let table = TABLE.init(RefCell::new(table));

    // Keypad base: TCA9555 buttons on I2C0, APA102 chain on SPI0.
    let i2c = I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config());
    let spi = Spi::new_blocking_txonly(p.SPI0, p.PIN_18, p.PIN_19, spi_config());
    let buttons = KeypadButtons::new(i2c);
    let leds = KeypadLeds::new(spi, Output::new(p.PIN_17, Level::High));

    let config = KeypadConfig::default();
    let actuator = Actuator::new(report_writer, config.key_hold_delay);
    let mut pad = MacroPad::new(
        table,
        buttons,
        actuator,
        LightService::new(leds),
        storage,
        &config,
    );

    info!("macro keypad ready");
    pad.run().await
}

#[embassy_executor::task]
async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

/// Assembles CDC packets into complete lines for the control loop.
#[embassy_executor::task]
async fn control_reader_task(mut port: Receiver<'static, UsbDriver>) -> ! {
    let mut line_buffer = LineBuffer::new();
    let mut packet = [0u8; 64];
    loop {
        port.wait_connection().await;
        info!("control channel connected");
        while let Ok(len) = port.read_packet(&mut packet).await {
            for &byte in &packet[..len] {
                if let Some(line) = line_buffer.push(byte) {
                    CONTROL_LINE_CHANNEL.send(line).await;
                }
            }
        }
        info!("control channel disconnected");
    }
}

/// Sends response lines back out, newline-terminated.
#[embassy_executor::task]
async fn control_writer_task(mut port: Sender<'static, UsbDriver>) -> ! {
    loop {
        let response = CONTROL_RESPONSE_CHANNEL.receive().await;
        port.wait_connection().await;
        let mut failed = false;
        for chunk in response.as_bytes().chunks(64) {
            if port.write_packet(chunk).await.is_err() {
                failed = true;
                break;
            }
        }
        if !failed {
            let _ = port.write_packet(b"\n").await;
        }
    }
}

fn log_profile(table: &MacroTable) {
    info!("=== macro configuration ===");
    for (index, slot) in table.slots().iter().enumerate() {
        info!(
            "key {}: {} (key {:#x}, mod {:#x}, consumer {:#x}, color {:#x})",
            index, slot.description, slot.key_code, slot.modifier, slot.consumer_code, slot.color
        );
    }
}
