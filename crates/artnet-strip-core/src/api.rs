//! JSON shapes of the configuration API
//!
//! `GET /settings` returns a [`SettingsView`]. `POST /settings` accepts a
//! [`SettingsPatch`] in which only the present fields are applied.

use core::fmt::Write as _;
use core::net::Ipv4Addr;

use heapless::String;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{LifecycleError, LifecycleState};
use crate::settings::{
    Addressing, Hostname, LongName, NodeReport, Settings, SettingsError, ShortName, Ssid, bounded,
};
use crate::stats::FrameStatsSnapshot;

/// Dotted-quad text, e.g. `192.168.1.201`.
pub type AddressText = String<15>;
pub type PatchText = String<64>;

/// Flat settings object. The WiFi password is never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub pixel_count: u16,
    pub group_factor: u16,
    pub start_universe: u16,
    pub output_pin: u8,
    pub configured: bool,
    pub hostname: Hostname,
    pub short_name: ShortName,
    pub long_name: LongName,
    pub node_report: NodeReport,
    pub wifi_ssid: Ssid,
    /// `None` when the address is obtained by DHCP
    pub wifi_ip: Option<AddressText>,
    pub wifi_gateway: Option<AddressText>,
    pub wifi_subnet: Option<AddressText>,
}

impl From<&Settings> for SettingsView {
    fn from(settings: &Settings) -> Self {
        let (wifi_ip, wifi_gateway, wifi_subnet) = match settings.wifi.addressing {
            Addressing::Dhcp => (None, None, None),
            Addressing::Static {
                ip,
                gateway,
                subnet,
            } => (
                Some(address_text(ip)),
                Some(address_text(gateway)),
                Some(address_text(subnet)),
            ),
        };
        Self {
            pixel_count: settings.pixel_count,
            group_factor: settings.group_factor,
            start_universe: settings.start_universe,
            output_pin: settings.output_pin,
            configured: settings.configured,
            hostname: settings.identity.hostname.clone(),
            short_name: settings.identity.short_name.clone(),
            long_name: settings.identity.long_name.clone(),
            node_report: settings.identity.node_report.clone(),
            wifi_ssid: settings.wifi.ssid.clone(),
            wifi_ip,
            wifi_gateway,
            wifi_subnet,
        }
    }
}

fn address_text(address: Ipv4Addr) -> AddressText {
    let mut text = AddressText::new();
    if write!(text, "{}", address).is_err() {
        warn!("api: address {} does not fit its field", address);
        text.clear();
    }
    text
}

/// Partial settings update. Absent fields keep their current value.
///
/// An empty `wifiIp` switches the station back to DHCP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub pixel_count: Option<u16>,
    pub group_factor: Option<u16>,
    pub start_universe: Option<u16>,
    pub output_pin: Option<u8>,
    pub hostname: Option<PatchText>,
    pub short_name: Option<PatchText>,
    pub long_name: Option<PatchText>,
    pub node_report: Option<PatchText>,
    pub wifi_ssid: Option<PatchText>,
    pub wifi_password: Option<PatchText>,
    pub wifi_ip: Option<AddressText>,
    pub wifi_gateway: Option<AddressText>,
    pub wifi_subnet: Option<AddressText>,
}

impl SettingsPatch {
    /// Returns `base` with the present fields replaced.
    pub fn apply_to(&self, base: &Settings) -> Result<Settings, SettingsError> {
        let mut next = base.clone();

        if let Some(v) = self.pixel_count {
            next.pixel_count = v;
        }
        if let Some(v) = self.group_factor {
            next.group_factor = v;
        }
        if let Some(v) = self.start_universe {
            next.start_universe = v;
        }
        if let Some(v) = self.output_pin {
            next.output_pin = v;
        }

        if let Some(v) = &self.hostname {
            next.identity.hostname = bounded(v)?;
        }
        if let Some(v) = &self.short_name {
            next.identity.short_name = bounded(v)?;
        }
        if let Some(v) = &self.long_name {
            next.identity.long_name = bounded(v)?;
        }
        if let Some(v) = &self.node_report {
            next.identity.node_report = bounded(v)?;
        }
        if let Some(v) = &self.wifi_ssid {
            next.wifi.ssid = bounded(v)?;
        }
        if let Some(v) = &self.wifi_password {
            next.wifi.password = bounded(v)?;
        }

        if self.wifi_ip.is_some() || self.wifi_gateway.is_some() || self.wifi_subnet.is_some() {
            next.wifi.addressing = self.patch_addressing(next.wifi.addressing)?;
        }

        Ok(next)
    }

    /// Merges the address fields into `current`.
    ///
    /// A static address needs all three parts. Gateway or subnet without an
    /// IP is rejected rather than dropped.
    fn patch_addressing(&self, current: Addressing) -> Result<Addressing, SettingsError> {
        let (ip, gateway, subnet) = current.to_words();
        let ip = patch_word(self.wifi_ip.as_deref(), ip)?;
        let gateway = patch_word(self.wifi_gateway.as_deref(), gateway)?;
        let subnet = patch_word(self.wifi_subnet.as_deref(), subnet)?;

        if ip == 0 {
            let routed = (self.wifi_gateway.is_some() && gateway != 0)
                || (self.wifi_subnet.is_some() && subnet != 0);
            if routed {
                return Err(SettingsError::InvalidAddress);
            }
            return Ok(Addressing::Dhcp);
        }
        if gateway == 0 || subnet == 0 {
            return Err(SettingsError::InvalidAddress);
        }
        Ok(Addressing::from_words(ip, gateway, subnet))
    }
}

fn patch_word(value: Option<&str>, current: u32) -> Result<u32, SettingsError> {
    match value.map(str::trim) {
        None => Ok(current),
        Some("") => Ok(0),
        Some(text) => text
            .parse::<Ipv4Addr>()
            .map(u32::from)
            .map_err(|_| SettingsError::InvalidAddress),
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView<'a> {
    pub state: &'static str,
    pub suspended: bool,
    pub last_error: Option<&'static str>,
    pub version: &'a str,
    pub frames: FrameStatsSnapshot,
}

impl<'a> StatusView<'a> {
    pub fn new(
        state: LifecycleState,
        suspended: bool,
        last_error: Option<LifecycleError>,
        version: &'a str,
        frames: FrameStatsSnapshot,
    ) -> Self {
        Self {
            state: state.as_str(),
            suspended,
            last_error: last_error.map(LifecycleError::as_str),
            version,
            frames,
        }
    }
}
