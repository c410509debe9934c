//! Network transport capability
//!
//! The node only needs to bring a link up, know whether it is usable and
//! learn its own address. The variant is picked from the persisted
//! [`Addressing`] at startup.

use core::net::Ipv4Addr;

use crate::settings::{Addressing, WifiSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The radio or PHY could not be started
    Device,
    /// Credentials or addressing are unusable
    Configuration,
}

/// How the transport obtains its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    WifiDhcp,
    WifiStatic,
}

impl LinkKind {
    pub fn for_settings(wifi: &WifiSettings) -> Self {
        match wifi.addressing {
            Addressing::Dhcp => LinkKind::WifiDhcp,
            Addressing::Static { .. } => LinkKind::WifiStatic,
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    fn kind(&self) -> LinkKind;
    /// Starts bringing the link up. Returns once the attempt is underway.
    async fn begin(&mut self) -> Result<(), LinkError>;
    fn is_connected(&self) -> bool;
    fn local_address(&self) -> Option<Ipv4Addr>;
}
