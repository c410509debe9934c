//! Universe to pixel address mapping
//!
//! A universe carries 512 channels. Only 510 of them are used, since three
//! channels make one pixel, so every universe addresses 170 pixels. Frames
//! for universe `u` paint the window starting at `u * 170` (times the group
//! factor when grouping). Universes may arrive in any order and only ever
//! touch their own window.

use crate::Rgb;
use crate::settings::Settings;
use crate::strip::PixelSink;

/// Channels in a DMX universe
pub const UNIVERSE_CHANNELS: usize = 512;
/// Channels usable for whole RGB triples
pub const USABLE_CHANNELS: usize = 510;
pub const CHANNELS_PER_PIXEL: usize = 3;
pub const PIXELS_PER_UNIVERSE: usize = USABLE_CHANNELS / CHANNELS_PER_PIXEL;

/// One received DMX frame. Borrowed from the frame source for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub universe: u16,
    pub channels: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(universe: u16, channels: &'a [u8]) -> Self {
        Self { universe, channels }
    }

    /// Channels holding whole triples, capped at [`USABLE_CHANNELS`].
    fn triples(&self) -> core::slice::ChunksExact<'a, u8> {
        let usable = self.channels.len().min(USABLE_CHANNELS);
        self.channels[..usable].chunks_exact(CHANNELS_PER_PIXEL)
    }
}

/// Render engine variant, selected once per settings snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelMapper {
    /// One pixel per channel triple
    Direct,
    /// Each channel triple paints `factor` consecutive pixels
    Grouped { factor: u16 },
}

impl PixelMapper {
    pub fn for_group_factor(group_factor: u16) -> Self {
        if group_factor <= 1 {
            PixelMapper::Direct
        } else {
            PixelMapper::Grouped {
                factor: group_factor,
            }
        }
    }

    pub fn for_settings(settings: &Settings) -> Self {
        Self::for_group_factor(settings.group_factor)
    }

    /// Pixels painted by one triple.
    pub fn group_factor(self) -> usize {
        match self {
            PixelMapper::Direct => 1,
            PixelMapper::Grouped { factor } => usize::from(factor),
        }
    }

    /// First pixel index addressed by `universe`, `None` when it is not addressable.
    pub fn base_pixel(self, universe: u16) -> Option<usize> {
        usize::from(universe)
            .checked_mul(PIXELS_PER_UNIVERSE)?
            .checked_mul(self.group_factor())
    }

    /// Paints `frame` into `sink` and flushes it once.
    ///
    /// Returns the number of pixels written. The sink is flushed for every
    /// frame, including one whose window starts past the end of the buffer.
    pub fn map_frame<S: PixelSink>(self, frame: &Frame<'_>, sink: &mut S) -> usize {
        let written = match self.base_pixel(frame.universe) {
            Some(base) if base < sink.pixel_count() => match self {
                PixelMapper::Direct => map_direct(frame, base, sink),
                PixelMapper::Grouped { factor } => {
                    map_grouped(frame, base, usize::from(factor), sink)
                }
            },
            _ => 0,
        };
        sink.show();
        written
    }
}

fn map_direct<S: PixelSink>(frame: &Frame<'_>, base: usize, sink: &mut S) -> usize {
    let pixel_count = sink.pixel_count();
    let mut index = base;
    for rgb in frame.triples() {
        if index >= pixel_count {
            break;
        }
        sink.set_pixel(index, Rgb::new(rgb[0], rgb[1], rgb[2]));
        index += 1;
    }
    index - base
}

fn map_grouped<S: PixelSink>(frame: &Frame<'_>, base: usize, factor: usize, sink: &mut S) -> usize {
    let pixel_count = sink.pixel_count();
    let mut index = base;
    'triples: for rgb in frame.triples() {
        let color = Rgb::new(rgb[0], rgb[1], rgb[2]);
        for _ in 0..factor {
            if index >= pixel_count {
                break 'triples;
            }
            sink.set_pixel(index, color);
            index += 1;
        }
    }
    index - base
}
