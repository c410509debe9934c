//! Test doubles shared by the integration tests.

#![allow(dead_code, unreachable_pub)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use artnet_strip_core::kv::KV_BLOCK_SIZE;
use artnet_strip_core::{
    LedDriver, PixelSink, Rgb, Settings, StorageDriver, StorageError, StripError, StripFactory,
};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

// -----------------------------------------------------------------------------
// Storage
// -----------------------------------------------------------------------------

/// Block storage backed by a shared byte vector, starting erased.
#[derive(Clone)]
pub struct MemoryDriver {
    pub block: Rc<RefCell<Vec<u8>>>,
    pub fail_writes: Rc<Cell<bool>>,
    pub writes: Rc<Cell<usize>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self {
            block: Rc::new(RefCell::new(vec![0xFF; KV_BLOCK_SIZE])),
            fail_writes: Rc::new(Cell::new(false)),
            writes: Rc::new(Cell::new(0)),
        }
    }
}

impl StorageDriver<KV_BLOCK_SIZE> for MemoryDriver {
    fn read(&self, buffer: &mut [u8]) -> Result<(), StorageError> {
        let block = self.block.borrow();
        buffer.copy_from_slice(&block[..buffer.len()]);
        Ok(())
    }

    fn write(&self, buffer: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::DriverError);
        }
        self.block.borrow_mut()[..buffer.len()].copy_from_slice(buffer);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// LEDs
// -----------------------------------------------------------------------------

/// Records every set and flush.
#[derive(Default)]
pub struct RecordingSink {
    pub pixels: Vec<Rgb>,
    pub writes: Vec<usize>,
    pub shows: usize,
}

impl RecordingSink {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            pixels: vec![Rgb::default(); pixel_count],
            writes: Vec::new(),
            shows: 0,
        }
    }
}

impl PixelSink for RecordingSink {
    fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        assert!(index < self.pixels.len(), "write past the end: {index}");
        self.pixels[index] = color;
        self.writes.push(index);
    }

    fn show(&mut self) {
        self.shows += 1;
    }
}

/// Driver that keeps every transmitted buffer.
pub struct RecordingDriver {
    pub pin: u8,
    pub transmitted: Rc<RefCell<Vec<Vec<Rgb>>>>,
}

impl LedDriver for RecordingDriver {
    fn write(&mut self, colors: &[Rgb]) {
        self.transmitted.borrow_mut().push(colors.to_vec());
    }
}

/// Factory accepting a fixed set of pins, with scriptable build failures.
pub struct ScriptedFactory {
    pub valid_pins: Vec<u8>,
    pub max_pixels: u16,
    /// Number of upcoming `build` calls that fail
    pub failing_builds: Cell<usize>,
    pub built_pins: Vec<u8>,
    pub released: usize,
    pub transmitted: Rc<RefCell<Vec<Vec<Rgb>>>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self {
            valid_pins: vec![2, 4, 5, 13],
            max_pixels: 1024,
            failing_builds: Cell::new(0),
            built_pins: Vec::new(),
            released: 0,
            transmitted: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn last_transmitted(&self) -> Option<Vec<Rgb>> {
        self.transmitted.borrow().last().cloned()
    }
}

impl StripFactory for ScriptedFactory {
    type Driver = RecordingDriver;

    fn check(&self, settings: &Settings) -> Result<(), StripError> {
        if !self.valid_pins.contains(&settings.output_pin) {
            return Err(StripError::InvalidPin(settings.output_pin));
        }
        if settings.pixel_count > self.max_pixels {
            return Err(StripError::TooManyPixels {
                requested: settings.pixel_count,
                max: self.max_pixels,
            });
        }
        Ok(())
    }

    fn build(&mut self, settings: &Settings) -> Result<RecordingDriver, StripError> {
        let failing = self.failing_builds.get();
        if failing > 0 {
            self.failing_builds.set(failing - 1);
            return Err(StripError::Peripheral);
        }
        self.built_pins.push(settings.output_pin);
        Ok(RecordingDriver {
            pin: settings.output_pin,
            transmitted: Rc::clone(&self.transmitted),
        })
    }

    fn release(&mut self, _driver: RecordingDriver) {
        self.released += 1;
    }
}

// -----------------------------------------------------------------------------
// Flash
// -----------------------------------------------------------------------------

#[derive(Debug)]
pub struct FlashFault;

impl NorFlashError for FlashFault {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

/// Erased NOR flash that enforces word-aligned writes.
pub struct MemoryFlash {
    pub data: Vec<u8>,
    pub write_calls: usize,
}

impl MemoryFlash {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0xFF; size],
            write_calls: 0,
        }
    }
}

impl ErrorType for MemoryFlash {
    type Error = FlashFault;
}

impl ReadNorFlash for MemoryFlash {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), FlashFault> {
        let start = offset as usize;
        bytes.copy_from_slice(&self.data[start..start + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }
}

impl NorFlash for MemoryFlash {
    const WRITE_SIZE: usize = 4;
    const ERASE_SIZE: usize = 4096;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), FlashFault> {
        self.data[from as usize..to as usize].fill(0xFF);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), FlashFault> {
        if offset % 4 != 0 || bytes.len() % 4 != 0 {
            return Err(FlashFault);
        }
        let start = offset as usize;
        let Some(target) = self.data.get_mut(start..start + bytes.len()) else {
            return Err(FlashFault);
        };
        target.copy_from_slice(bytes);
        self.write_calls += 1;
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

pub fn settings(pixel_count: u16, group_factor: u16, output_pin: u8) -> Settings {
    Settings {
        pixel_count,
        group_factor,
        output_pin,
        configured: true,
        ..Settings::default()
    }
}

/// A full universe of 510 channels where channel `i` holds `i % 256`.
pub fn ramp_channels() -> Vec<u8> {
    (0..510).map(|i| (i % 256) as u8).collect()
}
