//! Pixel buffer and LED driver abstraction
//!
//! The buffer length is fixed when the strip is built. Resizing means
//! building a new strip, which only the orchestrator does.

use alloc::vec;
use alloc::vec::Vec;

use crate::Rgb;

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// `write` performs the blocking, timing-sensitive transmission of the whole buffer.
pub trait LedDriver {
    fn write(&mut self, colors: &[Rgb]);
}

/// Something pixels can be painted into and flushed.
pub trait PixelSink {
    fn pixel_count(&self) -> usize;
    /// Sets one pixel. Indices past the end are ignored.
    fn set_pixel(&mut self, index: usize, color: Rgb);
    /// Transmits the buffer to the hardware.
    fn show(&mut self);
}

/// Pixel buffer bound to a driver.
pub struct PixelStrip<D: LedDriver> {
    driver: D,
    pixels: Vec<Rgb>,
}

impl<D: LedDriver> PixelStrip<D> {
    /// Creates a dark strip of `pixel_count` pixels.
    pub fn new(driver: D, pixel_count: usize) -> Self {
        Self {
            driver,
            pixels: vec![Rgb::default(); pixel_count],
        }
    }

    /// Rebinds an existing buffer to a driver.
    pub fn from_parts(driver: D, pixels: Vec<Rgb>) -> Self {
        Self { driver, pixels }
    }

    pub fn into_parts(self) -> (D, Vec<Rgb>) {
        (self.driver, self.pixels)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: LedDriver> PixelSink for PixelStrip<D> {
    fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn show(&mut self) {
        self.driver.write(&self.pixels);
    }
}
