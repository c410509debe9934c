#![cfg_attr(not(test), no_std)]

//! ArtNet node core - render engine and strip lifecycle
//!
//! Architecture layers:
//! - `settings` - Configuration record, defaults and validation
//! - `storage` - Magic-header record storage over a raw [`StorageDriver`]
//! - `kv` - Flat key/value namespace persisted as one record
//! - `settings_store` - Durable load/save of [`Settings`] with first-run defaulting
//! - `strip` - Pixel buffer owning a hardware [`LedDriver`]
//! - `mapper` - Universe to pixel address mapping ([`PixelMapper`])
//! - `lifecycle` - Boot and reconfiguration state machine ([`Orchestrator`])
//! - `configuration` - Settings API use case (patch, save, reconfigure)
//! - `artnet` - Minimal ArtDmx / ArtPoll codec
//! - `ota` - Firmware pull helpers (URLs, version check, response heads)
//! - `animation` - Boot and status patterns
//! - `stats` - Frame counters and FPS
//! - `link` - Network transport capability
//!
//! Everything here is hardware-agnostic. The firmware provides the drivers.

extern crate alloc;

pub mod animation;
pub mod api;
pub mod artnet;
pub mod configuration;
pub mod kv;
pub mod lifecycle;
pub mod link;
pub mod mapper;
pub mod ota;
pub mod settings;
pub mod settings_store;
pub mod stats;
pub mod storage;
pub mod strip;

pub use smart_leds::RGB8 as Rgb;

// Settings exports
pub use settings::{Addressing, NetworkIdentity, Settings, SettingsError, WifiSettings};
pub use settings_store::SettingsStore;

// Storage exports
pub use kv::{KeyValueStore, RecordKvStore};
pub use storage::{Encodable, PersistentStorage, StorageDriver, StorageError};

// Render exports
pub use mapper::{Frame, PixelMapper};
pub use strip::{LedDriver, PixelSink, PixelStrip};

// Lifecycle exports
pub use configuration::{ConfigurationError, ConfigurationService};
pub use lifecycle::{
    Applied, DropReason, FrameOutcome, LifecycleError, LifecycleState, Orchestrator, StripError,
    StripFactory,
};
pub use stats::FrameStats;
