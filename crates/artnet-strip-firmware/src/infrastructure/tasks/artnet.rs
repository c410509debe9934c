use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{HardwareAddress, Stack};
use embassy_time::Instant;
use log::{debug, info, warn};

use artnet_strip_core::artnet::{ArtPacket, POLL_REPLY_LEN, PollReply, parse_packet};
use artnet_strip_core::{Addressing, NetworkIdentity};

use crate::app::with_runtime;
use crate::config;

const RX_META_COUNT: usize = 16;
const RX_BUFFER_SIZE: usize = 4096;
const TX_META_COUNT: usize = 4;
const TX_BUFFER_SIZE: usize = 1024;
/// Header plus a full universe
const PACKET_SIZE: usize = 530;

/// Receives ArtNet packets and feeds DMX frames to the orchestrator.
#[embassy_executor::task]
pub(crate) async fn artnet_task(stack: Stack<'static>) {
    let mut rx_meta = [PacketMetadata::EMPTY; RX_META_COUNT];
    let mut rx_buffer = [0u8; RX_BUFFER_SIZE];
    let mut tx_meta = [PacketMetadata::EMPTY; TX_META_COUNT];
    let mut tx_buffer = [0u8; TX_BUFFER_SIZE];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if let Err(e) = socket.bind(config::NETWORK.artnet_port) {
        warn!("artnet: failed to bind port {}: {:?}", config::NETWORK.artnet_port, e);
        return;
    }
    info!("artnet: listening on port {}", config::NETWORK.artnet_port);

    let mut packet = [0u8; PACKET_SIZE];
    loop {
        let (n, meta) = match socket.recv_from(&mut packet).await {
            Ok(received) => received,
            Err(e) => {
                debug!("artnet: receive error: {:?}", e);
                continue;
            }
        };

        match parse_packet(&packet[..n]) {
            Ok(ArtPacket::Dmx(frame)) => {
                with_runtime(|runtime| {
                    let outcome = runtime.orchestrator.on_frame(&frame);
                    runtime.stats.record(outcome, Instant::now().as_millis());
                })
                .await;
            }
            Ok(ArtPacket::Poll) => {
                let Some((identity, dhcp)) = with_runtime(|runtime| {
                    let settings = runtime.orchestrator.settings();
                    (
                        settings.identity.clone(),
                        settings.wifi.addressing == Addressing::Dhcp,
                    )
                })
                .await
                else {
                    continue;
                };
                let reply = encode_poll_reply(stack, &identity, dhcp);
                let target = (meta.endpoint.addr, config::NETWORK.artnet_port);
                if let Err(e) = socket.send_to(&reply, target).await {
                    debug!("artnet: poll reply failed: {:?}", e);
                }
            }
            Ok(ArtPacket::Other(opcode)) => debug!("artnet: ignoring opcode {:#06x}", opcode),
            Err(e) => debug!("artnet: dropped packet: {:?}", e),
        }
    }
}

fn encode_poll_reply(
    stack: Stack<'_>,
    identity: &NetworkIdentity,
    dhcp: bool,
) -> [u8; POLL_REPLY_LEN] {
    let ip = stack
        .config_v4()
        .map_or([0; 4], |config| config.address.address().octets());
    #[allow(unreachable_patterns)]
    let mac = match stack.hardware_address() {
        HardwareAddress::Ethernet(address) => address.0,
        _ => [0; 6],
    };

    let mut buffer = [0u8; POLL_REPLY_LEN];
    PollReply {
        ip,
        mac,
        identity,
        dhcp,
    }
    .encode(&mut buffer);
    buffer
}
