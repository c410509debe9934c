//! Frame counters

use serde::Serialize;

use crate::lifecycle::FrameOutcome;

const FPS_WINDOW_MS: u64 = 1000;

/// Counts frame outcomes and measures the render rate.
///
/// Timestamps are supplied by the caller in milliseconds.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    rendered: u32,
    dropped: u32,
    skipped: u32,
    window_start_ms: Option<u64>,
    window_frames: u32,
    fps: u32,
}

/// Serializable view of [`FrameStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameStatsSnapshot {
    pub rendered: u32,
    pub dropped: u32,
    pub skipped: u32,
    pub fps: u32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: FrameOutcome, now_ms: u64) {
        match outcome {
            FrameOutcome::Rendered { .. } => {
                self.rendered = self.rendered.wrapping_add(1);
                self.tick(now_ms);
            }
            FrameOutcome::Skipped => self.skipped = self.skipped.wrapping_add(1),
            FrameOutcome::Dropped(_) => self.dropped = self.dropped.wrapping_add(1),
        }
    }

    fn tick(&mut self, now_ms: u64) {
        let start = *self.window_start_ms.get_or_insert(now_ms);
        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= FPS_WINDOW_MS {
            #[allow(clippy::cast_possible_truncation)]
            {
                self.fps = (u64::from(self.window_frames) * 1000 / elapsed) as u32;
            }
            self.window_start_ms = Some(now_ms);
            self.window_frames = 0;
        }
        self.window_frames += 1;
    }

    pub fn rendered(&self) -> u32 {
        self.rendered
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Rendered frames per second over the last full window.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn snapshot(&self) -> FrameStatsSnapshot {
        FrameStatsSnapshot {
            rendered: self.rendered,
            dropped: self.dropped,
            skipped: self.skipped,
            fps: self.fps,
        }
    }
}
