//! Durable load/save of [`Settings`]
//!
//! The store never range-checks values. It only falls back to defaults for
//! keys that are absent, of the wrong type, or not representable in the
//! field's type.

use log::{debug, info, warn};

use crate::kv::{KeyValueStore, KvError};
use crate::settings::{Addressing, NetworkIdentity, Settings, WifiSettings, truncated};

/// Persistence keys of the `device-config` namespace.
pub mod keys {
    pub const CONFIGURED: &str = "configured";
    pub const NUM_PIXELS: &str = "num-pixels";
    pub const DATA_PIN: &str = "data-pin";
    pub const GROUP_LED: &str = "group-led";
    pub const START_UNIVERSE: &str = "start-universe";
    pub const HOSTNAME: &str = "hostname";
    pub const SHORT_NAME: &str = "short-name";
    pub const LONG_NAME: &str = "long-name";
    pub const NODE_REPORT: &str = "node-report";
    pub const WIFI_SSID: &str = "wifi-ssid";
    pub const WIFI_PASSWORD: &str = "wifi-pwd";
    pub const WIFI_IP: &str = "wifi-ip";
    pub const WIFI_GATEWAY: &str = "wifi-gateway";
    pub const WIFI_SUBNET: &str = "wifi-subnet";
}

pub struct SettingsStore<S: KeyValueStore> {
    kv: S,
    defaults: Settings,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(kv: S) -> Self {
        Self::with_defaults(kv, Settings::default())
    }

    /// Creates a store whose first-run and fallback values come from `defaults`.
    pub fn with_defaults(kv: S, defaults: Settings) -> Self {
        Self { kv, defaults }
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    /// Loads the settings record.
    ///
    /// On first run the defaults are persisted immediately, so the storage
    /// ends up in the same state as after any later boot.
    pub fn load(&mut self) -> Settings {
        if !self.kv.get_bool(keys::CONFIGURED).unwrap_or(false) {
            info!("settings: first run, using default settings");
            let mut settings = self.defaults.clone();
            settings.configured = self.save(&settings).is_ok();
            return settings;
        }

        info!("settings: loading saved settings");
        let defaults = &self.defaults;
        let kv = &self.kv;

        let identity = {
            let d = &defaults.identity;
            NetworkIdentity {
                hostname: read_str(kv, keys::HOSTNAME, &d.hostname),
                short_name: read_str(kv, keys::SHORT_NAME, &d.short_name),
                long_name: read_str(kv, keys::LONG_NAME, &d.long_name),
                node_report: read_str(kv, keys::NODE_REPORT, &d.node_report),
            }
        };

        let (ip, gateway, subnet) = defaults.wifi.addressing.to_words();
        let wifi = WifiSettings {
            ssid: read_str(kv, keys::WIFI_SSID, &defaults.wifi.ssid),
            password: read_str(kv, keys::WIFI_PASSWORD, &defaults.wifi.password),
            addressing: Addressing::from_words(
                read_u32(kv, keys::WIFI_IP, ip),
                read_u32(kv, keys::WIFI_GATEWAY, gateway),
                read_u32(kv, keys::WIFI_SUBNET, subnet),
            ),
        };

        Settings {
            pixel_count: read_int(kv, keys::NUM_PIXELS, defaults.pixel_count),
            group_factor: read_int(kv, keys::GROUP_LED, defaults.group_factor),
            start_universe: read_int(kv, keys::START_UNIVERSE, defaults.start_universe),
            output_pin: read_int(kv, keys::DATA_PIN, defaults.output_pin),
            configured: true,
            identity,
            wifi,
        }
    }

    /// Writes every field, then marks the namespace as configured.
    ///
    /// Failures are logged and returned; callers treat them as non-fatal.
    /// A failed save leaves the namespace as it was before the call.
    pub fn save(&mut self, settings: &Settings) -> Result<(), KvError> {
        let result = self.write_all(settings);
        match result {
            Ok(()) => info!("settings: saved"),
            Err(e) => {
                warn!("settings: failed to save settings: {:?}", e);
                self.kv.rollback();
            }
        }
        result
    }

    fn write_all(&mut self, s: &Settings) -> Result<(), KvError> {
        let kv = &mut self.kv;
        kv.put_i32(keys::NUM_PIXELS, i32::from(s.pixel_count))?;
        kv.put_i32(keys::DATA_PIN, i32::from(s.output_pin))?;
        kv.put_i32(keys::GROUP_LED, i32::from(s.group_factor))?;
        kv.put_i32(keys::START_UNIVERSE, i32::from(s.start_universe))?;

        kv.put_str(keys::HOSTNAME, &s.identity.hostname)?;
        kv.put_str(keys::SHORT_NAME, &s.identity.short_name)?;
        kv.put_str(keys::LONG_NAME, &s.identity.long_name)?;
        kv.put_str(keys::NODE_REPORT, &s.identity.node_report)?;

        let (ip, gateway, subnet) = s.wifi.addressing.to_words();
        kv.put_str(keys::WIFI_SSID, &s.wifi.ssid)?;
        kv.put_str(keys::WIFI_PASSWORD, &s.wifi.password)?;
        kv.put_u32(keys::WIFI_IP, ip)?;
        kv.put_u32(keys::WIFI_GATEWAY, gateway)?;
        kv.put_u32(keys::WIFI_SUBNET, subnet)?;

        kv.put_bool(keys::CONFIGURED, true)?;
        kv.commit()
    }
}

fn read_int<T>(kv: &impl KeyValueStore, key: &str, default: T) -> T
where
    T: TryFrom<i32> + Copy,
{
    let Some(raw) = kv.get_i32(key) else {
        debug!("settings: {} missing, using default", key);
        return default;
    };
    match T::try_from(raw) {
        Ok(value) => value,
        Err(_) => {
            warn!("settings: {} has invalid value {}, using default", key, raw);
            default
        }
    }
}

fn read_u32(kv: &impl KeyValueStore, key: &str, default: u32) -> u32 {
    kv.get_u32(key).unwrap_or_else(|| {
        debug!("settings: {} missing, using default", key);
        default
    })
}

fn read_str<const N: usize>(
    kv: &impl KeyValueStore,
    key: &str,
    default: &heapless::String<N>,
) -> heapless::String<N> {
    match kv.get_str(key) {
        Some(value) if value.len() <= N => truncated(value),
        Some(_) => {
            warn!("settings: {} is too long, using default", key);
            default.clone()
        }
        None => {
            debug!("settings: {} missing, using default", key);
            default.clone()
        }
    }
}
