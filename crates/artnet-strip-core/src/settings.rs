//! Node configuration record
//!
//! [`Settings`] is the single configuration value of the node. It is owned by
//! the [`Orchestrator`](crate::Orchestrator) and only replaced through a
//! reconfiguration, never mutated behind the mapper's back.

use core::net::Ipv4Addr;

use heapless::String;

pub const DEFAULT_PIXEL_COUNT: u16 = 626;
pub const DEFAULT_GROUP_FACTOR: u16 = 1;
pub const DEFAULT_START_UNIVERSE: u16 = 0;
pub const DEFAULT_OUTPUT_PIN: u8 = 2;

pub const DEFAULT_HOSTNAME: &str = "ESP_ArtNet";
pub const DEFAULT_SHORT_NAME: &str = "ESP_ArtNet";
pub const DEFAULT_LONG_NAME: &str = "ESP_ArtNet2NeoPixel";
pub const DEFAULT_NODE_REPORT: &str = "ESP_ArtNet";

pub const HOSTNAME_LEN: usize = 32;
/// ArtNet short name field is 18 bytes including the terminator.
pub const SHORT_NAME_LEN: usize = 17;
/// ArtNet long name and node report fields are 64 bytes including the terminator.
pub const LONG_NAME_LEN: usize = 63;
pub const NODE_REPORT_LEN: usize = 63;
pub const SSID_LEN: usize = 32;
pub const PASSWORD_LEN: usize = 64;

pub type Hostname = String<HOSTNAME_LEN>;
pub type ShortName = String<SHORT_NAME_LEN>;
pub type LongName = String<LONG_NAME_LEN>;
pub type NodeReport = String<NODE_REPORT_LEN>;
pub type Ssid = String<SSID_LEN>;
pub type Password = String<PASSWORD_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsError {
    /// `pixel_count` must be greater than zero
    ZeroPixelCount,
    /// `group_factor` must be at least one
    ZeroGroupFactor,
    /// A string does not fit its field
    ValueTooLong,
    /// An IPv4 address could not be parsed
    InvalidAddress,
}

impl SettingsError {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingsError::ZeroPixelCount => "zeroPixelCount",
            SettingsError::ZeroGroupFactor => "zeroGroupFactor",
            SettingsError::ValueTooLong => "valueTooLong",
            SettingsError::InvalidAddress => "invalidAddress",
        }
    }
}

/// How the node's transport obtains its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Addressing {
    #[default]
    Dhcp,
    Static {
        ip: Ipv4Addr,
        gateway: Ipv4Addr,
        subnet: Ipv4Addr,
    },
}

impl Addressing {
    /// Builds addressing from the three persisted words. An unset (zero) IP means DHCP.
    pub fn from_words(ip: u32, gateway: u32, subnet: u32) -> Self {
        if ip == 0 {
            return Self::Dhcp;
        }
        Self::Static {
            ip: Ipv4Addr::from(ip),
            gateway: Ipv4Addr::from(gateway),
            subnet: Ipv4Addr::from(subnet),
        }
    }

    /// Returns `(ip, gateway, subnet)` as persisted words, all zero for DHCP.
    pub fn to_words(&self) -> (u32, u32, u32) {
        match self {
            Self::Dhcp => (0, 0, 0),
            Self::Static {
                ip,
                gateway,
                subnet,
            } => (u32::from(*ip), u32::from(*gateway), u32::from(*subnet)),
        }
    }

    /// Number of leading one bits of the subnet mask.
    pub fn prefix_len(subnet: Ipv4Addr) -> u8 {
        #[allow(clippy::cast_possible_truncation)]
        {
            u32::from(subnet).leading_ones() as u8
        }
    }
}

/// Names the node announces on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkIdentity {
    pub hostname: Hostname,
    pub short_name: ShortName,
    pub long_name: LongName,
    pub node_report: NodeReport,
}

impl Default for NetworkIdentity {
    fn default() -> Self {
        Self {
            hostname: truncated(DEFAULT_HOSTNAME),
            short_name: truncated(DEFAULT_SHORT_NAME),
            long_name: truncated(DEFAULT_LONG_NAME),
            node_report: truncated(DEFAULT_NODE_REPORT),
        }
    }
}

/// Station credentials and addressing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WifiSettings {
    pub ssid: Ssid,
    pub password: Password,
    pub addressing: Addressing,
}

/// Node configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Capacity of the pixel buffer
    pub pixel_count: u16,
    /// Consecutive pixels painted with one channel triple
    pub group_factor: u16,
    /// Persisted for future multi-region mapping. Does not affect the mapping.
    pub start_universe: u16,
    /// GPIO bound to the strip driver at construction time
    pub output_pin: u8,
    /// False until the record was saved once
    pub configured: bool,
    pub identity: NetworkIdentity,
    pub wifi: WifiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pixel_count: DEFAULT_PIXEL_COUNT,
            group_factor: DEFAULT_GROUP_FACTOR,
            start_universe: DEFAULT_START_UNIVERSE,
            output_pin: DEFAULT_OUTPUT_PIN,
            configured: false,
            identity: NetworkIdentity::default(),
            wifi: WifiSettings::default(),
        }
    }
}

impl Settings {
    /// Checks the ranges the strip and mapper rely on.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.pixel_count == 0 {
            return Err(SettingsError::ZeroPixelCount);
        }
        if self.group_factor == 0 {
            return Err(SettingsError::ZeroGroupFactor);
        }
        Ok(())
    }

    /// Whether switching to `other` changes the buffer shape or the driver binding.
    pub fn requires_rebuild(&self, other: &Settings) -> bool {
        self.pixel_count != other.pixel_count
            || self.group_factor != other.group_factor
            || self.output_pin != other.output_pin
    }
}

/// Copies `value` into a bounded string, cutting at a char boundary when it does not fit.
pub fn truncated<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for ch in value.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// Copies `value` into a bounded string, failing when it does not fit.
pub fn bounded<const N: usize>(value: &str) -> Result<String<N>, SettingsError> {
    let mut out = String::new();
    out.push_str(value)
        .map_err(|()| SettingsError::ValueTooLong)?;
    Ok(out)
}
