use embassy_executor::Spawner;
use embassy_net::{
    DhcpConfig, IpAddress, Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4,
    dns::DnsQueryType,
};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::Controller;
use esp_radio::wifi::{Config as WifiConfig, WifiController, WifiDevice};
use log::info;
use static_cell::StaticCell;

use artnet_strip_core::link::{LinkError, LinkKind, NetworkLink};
use artnet_strip_core::settings::{Password, Ssid};
use artnet_strip_core::{Addressing, Settings};

use crate::infrastructure::tasks::{network_runner_task, wifi_connection_task};

const MAX_CONNECTIONS: usize = 6;

static RADIO: StaticCell<Controller<'static>> = StaticCell::new();
static RESOURCES: StaticCell<StackResources<MAX_CONNECTIONS>> = StaticCell::new();

/// WiFi station link.
///
/// The stack exists from construction on. [`NetworkLink::begin`] hands the
/// controller and the runner to their background tasks.
pub(crate) struct WifiLink {
    spawner: Spawner,
    kind: LinkKind,
    stack: Stack<'static>,
    ssid: Ssid,
    password: Password,
    pending: Option<(WifiController<'static>, Runner<'static, WifiDevice<'static>>)>,
}

impl WifiLink {
    pub(crate) fn new(
        spawner: Spawner,
        wifi_device: WIFI<'static>,
        settings: &Settings,
    ) -> Result<Self, LinkError> {
        let radio = esp_radio::init().map_err(|_| LinkError::Device)?;
        let radio = &*RADIO.init(radio);
        let (controller, interfaces) = esp_radio::wifi::new(radio, wifi_device, WifiConfig::default())
            .map_err(|_| LinkError::Device)?;

        let kind = LinkKind::for_settings(&settings.wifi);
        let net_config = match settings.wifi.addressing {
            Addressing::Dhcp => {
                let mut dhcp_config = DhcpConfig::default();
                dhcp_config.hostname = Some(settings.identity.hostname.clone());
                embassy_net::Config::dhcpv4(dhcp_config)
            }
            Addressing::Static {
                ip,
                gateway,
                subnet,
            } => embassy_net::Config::ipv4_static(StaticConfigV4 {
                address: Ipv4Cidr::new(ip, Addressing::prefix_len(subnet)),
                gateway: Some(gateway),
                dns_servers: heapless::Vec::from_slice(&[gateway]).unwrap_or_default(),
            }),
        };

        let resources = RESOURCES.init(StackResources::new());
        let (stack, runner) = embassy_net::new(interfaces.sta, net_config, resources, get_seed());

        Ok(Self {
            spawner,
            kind,
            stack,
            ssid: settings.wifi.ssid.clone(),
            password: settings.wifi.password.clone(),
            pending: Some((controller, runner)),
        })
    }

    pub(crate) fn stack(&self) -> Stack<'static> {
        self.stack
    }
}

impl NetworkLink for WifiLink {
    fn kind(&self) -> LinkKind {
        self.kind
    }

    async fn begin(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            return Err(LinkError::Configuration);
        }
        let Some((controller, runner)) = self.pending.take() else {
            return Ok(());
        };

        info!("network: joining {} ({:?})", self.ssid.as_str(), self.kind);
        self.spawner
            .spawn(wifi_connection_task(
                controller,
                self.ssid.clone(),
                self.password.clone(),
            ))
            .map_err(|_| LinkError::Device)?;
        self.spawner
            .spawn(network_runner_task(runner))
            .map_err(|_| LinkError::Device)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stack.is_link_up() && self.stack.config_v4().is_some()
    }

    fn local_address(&self) -> Option<core::net::Ipv4Addr> {
        self.stack.config_v4().map(|config| config.address.address())
    }
}

fn get_seed() -> u64 {
    let rng = Rng::new();
    u64::from(rng.random()) << 32 | u64::from(rng.random())
}

/// Resolves a hostname to an IP address
pub(crate) async fn resolve_host(stack: Stack<'static>, host: &str) -> Result<IpAddress, ()> {
    if let Ok(ip) = host.parse::<embassy_net::Ipv4Address>() {
        return Ok(IpAddress::Ipv4(ip));
    }

    let Ok(addresses) = stack.dns_query(host, DnsQueryType::A).await else {
        return Err(());
    };

    addresses.first().copied().ok_or(())
}
