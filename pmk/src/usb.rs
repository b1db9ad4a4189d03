//! USB composition: device builder, HID writers for the two hardware
//! variants, and the device state handler.

use core::sync::atomic::Ordering;

use embassy_usb::class::hid::{HidWriter, ReportId, RequestHandler};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Handler};
use static_cell::StaticCell;

use crate::config::UsbConfig;
use crate::hid::{HidError, Report, ReportWriter};
use crate::CONNECTION_STATE;

// Re-exported for the writer macros, so board crates need no direct
// usbd-hid dependency.
pub use usbd_hid::descriptor::SerializedDescriptor;

/// Create the embassy-usb device builder for the keypad.
///
/// Call once; the descriptor buffers live in statics.
pub fn new_usb_builder<'d, D: Driver<'d>>(driver: D, config: UsbConfig<'d>) -> Builder<'d, D> {
    let mut usb_config = embassy_usb::Config::new(config.vid, config.pid);
    usb_config.manufacturer = Some(config.manufacturer);
    usb_config.product = Some(config.product_name);
    usb_config.serial_number = Some(config.serial_number);
    usb_config.max_power = 500;

    // Composite device (HID + CDC); the IAD settings are required for
    // Windows compatibility.
    usb_config.max_packet_size_0 = 64;
    usb_config.device_class = 0xEF;
    usb_config.device_sub_class = 0x02;
    usb_config.device_protocol = 0x01;
    usb_config.composite_with_iads = true;

    static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 32]> = StaticCell::new();
    static MSOS_DESC: StaticCell<[u8; 32]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 128]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        usb_config,
        &mut CONFIG_DESC.init([0; 256])[..],
        &mut BOS_DESC.init([0; 32])[..],
        &mut MSOS_DESC.init([0; 32])[..],
        &mut CONTROL_BUF.init([0; 128])[..],
    );

    static DEVICE_HANDLER: StaticCell<UsbDeviceHandler> = StaticCell::new();
    builder.handler(DEVICE_HANDLER.init(UsbDeviceHandler::new()));

    builder
}

/// Add a HID IN endpoint for the given report descriptor type.
#[macro_export]
macro_rules! add_usb_writer {
    ($usb_builder:expr, $descriptor:ty, $n:expr) => {{
        $crate::paste::paste! {
            static [<$descriptor:snake:upper _STATE>]: ::static_cell::StaticCell<::embassy_usb::class::hid::State> = ::static_cell::StaticCell::new();
            static [<$descriptor:snake:upper _HANDLER>]: ::static_cell::StaticCell<$crate::usb::UsbRequestHandler> = ::static_cell::StaticCell::new();
        }

        let state = $crate::paste::paste! { [<$descriptor:snake:upper _STATE>].init(::embassy_usb::class::hid::State::new()) };
        let request_handler = $crate::paste::paste! { [<$descriptor:snake:upper _HANDLER>].init($crate::usb::UsbRequestHandler {}) };

        let hid_config = ::embassy_usb::class::hid::Config {
            report_descriptor: <$descriptor as $crate::usb::SerializedDescriptor>::desc(),
            request_handler: Some(request_handler),
            poll_ms: 1,
            max_packet_size: 64,
        };

        let writer: ::embassy_usb::class::hid::HidWriter<_, $n> =
            ::embassy_usb::class::hid::HidWriter::new($usb_builder, state, hid_config);
        writer
    }};
}

/// Add the CDC-ACM interface carrying the control channel.
#[macro_export]
macro_rules! add_control_port {
    ($usb_builder:expr) => {{
        use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
        use static_cell::StaticCell;

        static CONTROL_PORT_STATE: StaticCell<State> = StaticCell::new();
        let state = CONTROL_PORT_STATE.init(State::new());
        CdcAcmClass::new($usb_builder, state, 64)
    }};
}

pub struct UsbRequestHandler {}

impl RequestHandler for UsbRequestHandler {
    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        info!("Set report for {:?}: {:?}", id, data);
        OutResponse::Accepted
    }
}

/// Composite variant: keyboard and consumer-control endpoints.
pub struct UsbCompositeWriter<'d, D: Driver<'d>> {
    keyboard: HidWriter<'d, D, 8>,
    consumer: HidWriter<'d, D, 8>,
}

impl<'d, D: Driver<'d>> UsbCompositeWriter<'d, D> {
    pub fn new(keyboard: HidWriter<'d, D, 8>, consumer: HidWriter<'d, D, 8>) -> Self {
        Self { keyboard, consumer }
    }
}

impl<'d, D: Driver<'d>> ReportWriter for UsbCompositeWriter<'d, D> {
    fn is_ready(&self) -> bool {
        CONNECTION_STATE.load(Ordering::Acquire)
    }

    async fn write_report(&mut self, report: Report) -> Result<(), HidError> {
        match report {
            Report::Keyboard(report) => self
                .keyboard
                .write_serialize(&report)
                .await
                .map_err(HidError::UsbEndpointError),
            Report::Consumer(report) => self
                .consumer
                .write_serialize(&report)
                .await
                .map_err(HidError::UsbEndpointError),
        }
    }
}

/// Keyboard-only variant: boards enumerating without the consumer-control
/// endpoint. Consumer reports have nowhere to go and are dropped with a
/// warning.
pub struct UsbKeyboardWriter<'d, D: Driver<'d>> {
    keyboard: HidWriter<'d, D, 8>,
}

impl<'d, D: Driver<'d>> UsbKeyboardWriter<'d, D> {
    pub fn new(keyboard: HidWriter<'d, D, 8>) -> Self {
        Self { keyboard }
    }
}

impl<'d, D: Driver<'d>> ReportWriter for UsbKeyboardWriter<'d, D> {
    fn is_ready(&self) -> bool {
        CONNECTION_STATE.load(Ordering::Acquire)
    }

    async fn write_report(&mut self, report: Report) -> Result<(), HidError> {
        match report {
            Report::Keyboard(report) => self
                .keyboard
                .write_serialize(&report)
                .await
                .map_err(HidError::UsbEndpointError),
            Report::Consumer(_) => {
                warn!("keyboard-only device, dropping consumer report");
                Ok(())
            }
        }
    }
}

pub struct UsbDeviceHandler {}

impl UsbDeviceHandler {
    fn new() -> Self {
        UsbDeviceHandler {}
    }
}

impl Handler for UsbDeviceHandler {
    fn enabled(&mut self, enabled: bool) {
        if enabled {
            info!("Device enabled");
        } else {
            info!("Device disabled");
            CONNECTION_STATE.store(false, Ordering::Release);
        }
    }

    fn reset(&mut self) {
        info!("Bus reset, the Vbus current limit is 100mA");
        CONNECTION_STATE.store(false, Ordering::Release);
    }

    fn addressed(&mut self, addr: u8) {
        info!("USB address set to: {}", addr);
    }

    fn configured(&mut self, configured: bool) {
        CONNECTION_STATE.store(configured, Ordering::Release);
        if configured {
            info!("Device configured, it may now draw up to the configured current from Vbus.")
        } else {
            info!("Device is no longer configured, the Vbus current limit is 100mA.");
        }
    }

    fn suspended(&mut self, suspended: bool) {
        if suspended {
            info!("Device suspended, the Vbus current limit is 500µA.");
        } else {
            info!("Device resumed.");
        }
    }
}
