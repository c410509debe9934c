use esp_hal::gpio::AnyPin;
use esp_hal::peripherals::RMT;
use esp_hal::rmt::{PulseCode, Rmt};
use esp_hal::time::Rate;
use esp_hal::xtensa_lx::interrupt;
use esp_hal_smartled::{SmartLedsAdapter, buffer_size, smart_led_buffer};
use log::{info, warn};
use smart_leds::SmartLedsWrite;
use static_cell::make_static;

use artnet_strip_core::{LedDriver, Rgb, Settings, StripFactory, StripError};

/// Largest strip the static RMT buffer can transmit (four full universes).
pub(crate) const MAX_PIXEL_COUNT: usize = 680;

/// GPIOs that can drive a strip. Flash pins, UART0 and input-only pins are excluded.
const OUTPUT_PINS: [u8; 20] = [
    0, 2, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

type RmtBuffer = [PulseCode; buffer_size(MAX_PIXEL_COUNT)];

/// ESP-specific LED driver using RMT peripheral
///
/// This driver uses the ESP32's RMT (Remote Control) peripheral
/// to generate the precise timing signals required by WS2812B LEDs.
pub(crate) struct EspLedDriver {
    adapter: SmartLedsAdapter<'static, { buffer_size(MAX_PIXEL_COUNT) }>,
    pin: u8,
}

impl EspLedDriver {
    pub(crate) fn pin(&self) -> u8 {
        self.pin
    }
}

impl LedDriver for EspLedDriver {
    fn write(&mut self, colors: &[Rgb]) {
        let result = interrupt::free(|| self.adapter.write(colors.iter().copied()));
        if let Err(e) = result {
            warn!("led: transmission failed: {:?}", e);
        }
    }
}

/// Builds RMT drivers on the pin chosen in the settings.
///
/// Every driver transmits from the same static buffer, so at most one driver
/// may exist at a time. The orchestrator releases the old driver before it
/// builds the next one.
pub(crate) struct EspStripFactory {
    _rmt: RMT<'static>,
    buffer: *mut RmtBuffer,
}

// Safety: the factory lives inside the runtime mutex, which serializes every
// access to the buffer pointer.
unsafe impl Send for EspStripFactory {}

impl EspStripFactory {
    pub(crate) fn new(rmt: RMT<'static>) -> Self {
        let buffer: &'static mut RmtBuffer = make_static!(smart_led_buffer!(MAX_PIXEL_COUNT));
        Self {
            _rmt: rmt,
            buffer: buffer as *mut RmtBuffer,
        }
    }
}

impl StripFactory for EspStripFactory {
    type Driver = EspLedDriver;

    fn check(&self, settings: &Settings) -> Result<(), StripError> {
        if !OUTPUT_PINS.contains(&settings.output_pin) {
            return Err(StripError::InvalidPin(settings.output_pin));
        }
        if usize::from(settings.pixel_count) > MAX_PIXEL_COUNT {
            #[allow(clippy::cast_possible_truncation)]
            return Err(StripError::TooManyPixels {
                requested: settings.pixel_count,
                max: MAX_PIXEL_COUNT as u16,
            });
        }
        Ok(())
    }

    fn build(&mut self, settings: &Settings) -> Result<EspLedDriver, StripError> {
        self.check(settings)?;

        // Safety: the factory owns RMT and hands out one driver at a time.
        let rmt = unsafe { RMT::steal() };
        let rmt = Rmt::new(rmt, Rate::from_mhz(80)).map_err(|_| StripError::Peripheral)?;
        // Safety: the pin was checked above and no other code drives it.
        let pin = unsafe { AnyPin::steal(settings.output_pin) };
        // Safety: the previous adapter using the buffer has been released.
        let buffer = unsafe { &mut *self.buffer };

        let adapter = SmartLedsAdapter::new(rmt.channel0, pin, buffer);
        info!(
            "led: driver ready on GPIO{} for {} pixels",
            settings.output_pin, settings.pixel_count
        );
        Ok(EspLedDriver {
            adapter,
            pin: settings.output_pin,
        })
    }

    fn release(&mut self, driver: EspLedDriver) {
        info!("led: releasing GPIO{}", driver.pin());
        drop(driver);
    }
}
