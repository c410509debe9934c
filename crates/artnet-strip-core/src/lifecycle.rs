//! Strip lifecycle state machine
//!
//! ```text
//! Uninitialized -> Running -> Reconfiguring -> Running -> ...
//!        \                          \
//!         `-> Degraded <-------------'
//! ```
//!
//! The orchestrator owns the active [`Settings`], the strip slot and the
//! registered mapper. A shape change always unregisters the mapper, tears the
//! old strip down and builds a new one. When building fails the previous
//! strip is rebuilt with its old buffer and keeps rendering.

use log::{info, warn};

use crate::mapper::{Frame, PixelMapper};
use crate::settings::{Settings, SettingsError};
use crate::strip::{LedDriver, PixelSink, PixelStrip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripError {
    /// The pin cannot drive a strip
    InvalidPin(u8),
    /// More pixels than the driver can transmit
    TooManyPixels { requested: u16, max: u16 },
    /// The output peripheral could not be configured
    Peripheral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    Settings(SettingsError),
    Strip(StripError),
    /// Another reconfiguration has not completed yet
    ReconfigurationInProgress,
    NotStarted,
    AlreadyStarted,
    NotReconfiguring,
}

impl StripError {
    pub fn as_str(self) -> &'static str {
        match self {
            StripError::InvalidPin(_) => "invalidPin",
            StripError::TooManyPixels { .. } => "tooManyPixels",
            StripError::Peripheral => "peripheral",
        }
    }
}

impl LifecycleError {
    /// Short error code reported by the configuration API.
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleError::Settings(e) => e.as_str(),
            LifecycleError::Strip(e) => e.as_str(),
            LifecycleError::ReconfigurationInProgress => "reconfigurationInProgress",
            LifecycleError::NotStarted => "notStarted",
            LifecycleError::AlreadyStarted => "alreadyStarted",
            LifecycleError::NotReconfiguring => "notReconfiguring",
        }
    }
}

impl From<SettingsError> for LifecycleError {
    fn from(error: SettingsError) -> Self {
        LifecycleError::Settings(error)
    }
}

impl From<StripError> for LifecycleError {
    fn from(error: StripError) -> Self {
        LifecycleError::Strip(error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Running,
    Reconfiguring,
    /// The last build failed. The previous strip keeps running if there was one.
    Degraded,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Running => "running",
            LifecycleState::Reconfiguring => "reconfiguring",
            LifecycleState::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No strip is registered
    NotRunning,
    Reconfiguring,
    /// Rendering is paused, e.g. during a firmware update
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered { pixels: usize },
    /// The frame addressed no pixel of the strip
    Skipped,
    Dropped(DropReason),
}

/// How a settings change was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Only non-shape fields changed
    InPlace,
    /// The strip was rebuilt
    Rebuilt,
}

/// Builds and releases strip drivers.
pub trait StripFactory {
    type Driver: LedDriver;

    /// Checks that a driver can be built for `settings` without touching the current one.
    fn check(&self, settings: &Settings) -> Result<(), StripError>;

    fn build(&mut self, settings: &Settings) -> Result<Self::Driver, StripError>;

    /// Releases the device resources held by `driver`.
    fn release(&mut self, driver: Self::Driver);
}

pub struct Orchestrator<F: StripFactory> {
    factory: F,
    state: LifecycleState,
    settings: Settings,
    strip: Option<PixelStrip<F::Driver>>,
    mapper: Option<PixelMapper>,
    suspended: bool,
    last_error: Option<LifecycleError>,
}

impl<F: StripFactory> Orchestrator<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            state: LifecycleState::Uninitialized,
            settings: Settings::default(),
            strip: None,
            mapper: None,
            suspended: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Settings the current strip was built from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_error(&self) -> Option<LifecycleError> {
        self.last_error
    }

    pub fn mapper(&self) -> Option<PixelMapper> {
        self.mapper
    }

    pub fn strip(&self) -> Option<&PixelStrip<F::Driver>> {
        self.strip.as_ref()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Builds the first strip and registers its mapper.
    pub fn start(&mut self, settings: Settings) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(LifecycleError::AlreadyStarted);
        }

        let result = self.install(&settings);
        self.settings = settings;
        match result {
            Ok(()) => {
                info!(
                    "lifecycle: started {} pixels on pin {}, group {}",
                    self.settings.pixel_count, self.settings.output_pin, self.settings.group_factor
                );
                self.state = LifecycleState::Running;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("lifecycle: failed to start strip: {:?}", e);
                self.state = LifecycleState::Degraded;
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    /// Checks `settings` without touching the running strip.
    pub fn check(&self, settings: &Settings) -> Result<(), LifecycleError> {
        settings.validate()?;
        self.factory.check(settings)?;
        Ok(())
    }

    /// Unregisters the mapper. Frames are dropped until the reconfiguration completes.
    pub fn begin_reconfiguration(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Uninitialized => Err(LifecycleError::NotStarted),
            LifecycleState::Reconfiguring => {
                warn!("lifecycle: reconfiguration rejected, another one is in progress");
                Err(LifecycleError::ReconfigurationInProgress)
            }
            LifecycleState::Running | LifecycleState::Degraded => {
                self.mapper = None;
                self.state = LifecycleState::Reconfiguring;
                Ok(())
            }
        }
    }

    /// Rebuilds the strip for `next` and registers the matching mapper.
    ///
    /// On failure the previous strip is restored, the state becomes
    /// [`LifecycleState::Degraded`] and the error is returned.
    pub fn complete_reconfiguration(&mut self, next: Settings) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Reconfiguring {
            return Err(LifecycleError::NotReconfiguring);
        }

        match self.rebuild(&next) {
            Ok(()) => {
                info!(
                    "lifecycle: reconfigured to {} pixels on pin {}, group {}",
                    next.pixel_count, next.output_pin, next.group_factor
                );
                self.settings = next;
                self.state = LifecycleState::Running;
                self.last_error = None;
            }
            Err(e) => {
                warn!("lifecycle: reconfiguration failed: {:?}", e);
                self.state = LifecycleState::Degraded;
                self.last_error = Some(e);
            }
        }

        if self.strip.is_some() {
            self.mapper = Some(PixelMapper::for_settings(&self.settings));
        }
        self.last_error.map_or(Ok(()), Err)
    }

    pub fn reconfigure(&mut self, next: Settings) -> Result<(), LifecycleError> {
        self.begin_reconfiguration()?;
        self.complete_reconfiguration(next)
    }

    /// Adopts `next`, rebuilding the strip only when its shape or pin changed.
    ///
    /// An in-place change while degraded returns to `Running`, since the
    /// restored strip is serving the adopted settings.
    pub fn apply_settings(&mut self, next: Settings) -> Result<Applied, LifecycleError> {
        match self.state {
            LifecycleState::Uninitialized => return Err(LifecycleError::NotStarted),
            LifecycleState::Reconfiguring => return Err(LifecycleError::ReconfigurationInProgress),
            LifecycleState::Running | LifecycleState::Degraded => {}
        }

        if self.strip.is_none() || self.settings.requires_rebuild(&next) {
            self.reconfigure(next)?;
            return Ok(Applied::Rebuilt);
        }
        self.settings = next;
        if self.state == LifecycleState::Degraded {
            info!("lifecycle: recovered, strip running with current settings");
            self.state = LifecycleState::Running;
            self.last_error = None;
        }
        Ok(Applied::InPlace)
    }

    /// Maps one frame into the strip. Never fails.
    pub fn on_frame(&mut self, frame: &Frame<'_>) -> FrameOutcome {
        if self.suspended {
            return FrameOutcome::Dropped(DropReason::Suspended);
        }
        let (Some(mapper), Some(strip)) = (self.mapper, self.strip.as_mut()) else {
            let reason = if self.state == LifecycleState::Reconfiguring {
                DropReason::Reconfiguring
            } else {
                DropReason::NotRunning
            };
            return FrameOutcome::Dropped(reason);
        };

        match mapper.map_frame(frame, strip) {
            0 => FrameOutcome::Skipped,
            pixels => FrameOutcome::Rendered { pixels },
        }
    }

    /// Pauses frame rendering.
    pub fn suspend(&mut self) {
        if !self.suspended {
            info!("lifecycle: rendering suspended");
            self.suspended = true;
        }
    }

    pub fn resume(&mut self) {
        if self.suspended {
            info!("lifecycle: rendering resumed");
            self.suspended = false;
        }
    }

    /// Runs `op` on the strip, unless a reconfiguration holds the slot.
    pub fn with_strip<R>(&mut self, op: impl FnOnce(&mut PixelStrip<F::Driver>) -> R) -> Option<R> {
        if self.state == LifecycleState::Reconfiguring {
            return None;
        }
        self.strip.as_mut().map(op)
    }

    fn install(&mut self, settings: &Settings) -> Result<(), LifecycleError> {
        self.check(settings)?;
        let driver = self.factory.build(settings)?;
        self.strip = Some(PixelStrip::new(driver, usize::from(settings.pixel_count)));
        self.mapper = Some(PixelMapper::for_settings(settings));
        Ok(())
    }

    fn rebuild(&mut self, next: &Settings) -> Result<(), LifecycleError> {
        self.check(next)?;

        let previous = self.strip.take().map(|strip| {
            let (driver, pixels) = strip.into_parts();
            self.factory.release(driver);
            pixels
        });

        match self.factory.build(next) {
            Ok(driver) => {
                self.strip = Some(PixelStrip::new(driver, usize::from(next.pixel_count)));
                Ok(())
            }
            Err(e) => {
                if let Some(pixels) = previous {
                    self.restore(pixels);
                }
                Err(e.into())
            }
        }
    }

    fn restore(&mut self, pixels: alloc::vec::Vec<crate::Rgb>) {
        match self.factory.build(&self.settings) {
            Ok(driver) => {
                let mut strip = PixelStrip::from_parts(driver, pixels);
                strip.show();
                self.strip = Some(strip);
                info!("lifecycle: previous strip restored");
            }
            Err(e) => warn!("lifecycle: failed to restore previous strip: {:?}", e),
        }
    }
}
