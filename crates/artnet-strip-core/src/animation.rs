//! Boot and status patterns painted outside of frame rendering

use crate::Rgb;
use crate::strip::PixelSink;

/// Link is up
pub const CONNECTED: Rgb = Rgb { r: 0, g: 255, b: 0 };
/// A firmware image is being written
pub const UPDATING: Rgb = Rgb { r: 255, g: 255, b: 0 };
/// The firmware image did not fit its partition
pub const UPDATE_FAILED: Rgb = Rgb { r: 255, g: 0, b: 0 };

/// Highest level of the connecting pulse before it wraps to zero.
pub const PULSE_MAX: u8 = 250;

/// Grey of the given level.
pub const fn gray(level: u8) -> Rgb {
    Rgb {
        r: level,
        g: level,
        b: level,
    }
}

/// Paints every pixel with `color` and flushes.
pub fn fill<S: PixelSink>(sink: &mut S, color: Rgb) {
    for index in 0..sink.pixel_count() {
        sink.set_pixel(index, color);
    }
    sink.show();
}

/// Lights random pixels with random grey levels below `max_level`.
///
/// Each pixel lights up with a probability of `1 / frequency`; other pixels
/// keep their color. `random(n)` must return a value in `0..n`.
pub fn sparkle<S: PixelSink>(
    sink: &mut S,
    max_level: u8,
    frequency: u32,
    mut random: impl FnMut(u32) -> u32,
) {
    if frequency > 0 {
        for index in 0..sink.pixel_count() {
            if random(frequency) == 0 {
                let level = random(u32::from(max_level));
                sink.set_pixel(index, gray(u8::try_from(level).unwrap_or(max_level)));
            }
        }
    }
    sink.show();
}

/// Grey ramp shown while the link comes up.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectingPulse {
    level: u8,
}

impl ConnectingPulse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the color of the current step and advances the ramp.
    pub fn step(&mut self) -> Rgb {
        let color = gray(self.level);
        self.level = if self.level >= PULSE_MAX {
            0
        } else {
            self.level + 1
        };
        color
    }

    /// Paints the current step into `sink`.
    pub fn paint<S: PixelSink>(&mut self, sink: &mut S) {
        let color = self.step();
        fill(sink, color);
    }
}
