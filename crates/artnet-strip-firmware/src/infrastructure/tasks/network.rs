use embassy_net::Runner;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{
    AuthMethod, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiStaState,
};
use log::{info, warn};

use artnet_strip_core::settings::{Password, Ssid};

/// Background task for connecting to the `WiFi` network
///
/// It connects to the `WiFi` network and waits for the connection to be established.
/// If the connection is lost, it tries to reconnect.
#[embassy_executor::task]
pub(crate) async fn wifi_connection_task(
    mut controller: WifiController<'static>,
    ssid: Ssid,
    password: Password,
) {
    loop {
        // Wait until we're no longer connected
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            warn!("network: disconnected");
            Timer::after(Duration::from_millis(2000)).await;
        }
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = if password.is_empty() {
                ClientConfig::default()
                    .with_ssid(ssid.as_str().into())
                    .with_auth_method(AuthMethod::None)
            } else {
                ClientConfig::default()
                    .with_ssid(ssid.as_str().into())
                    .with_password(password.as_str().into())
            };
            let mode_config = ModeConfig::Client(client_config);
            if let Err(e) = controller.set_config(&mode_config) {
                warn!("network: rejected client config: {:?}", e);
                Timer::after(Duration::from_millis(5000)).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                warn!("network: radio failed to start: {:?}", e);
                Timer::after(Duration::from_millis(5000)).await;
                continue;
            }
        }

        info!("network: connecting");
        if let Err(e) = controller.connect_async().await {
            warn!("network: error connecting: {:?}", e);
            Timer::after(Duration::from_millis(5000)).await;
        }
    }
}

/// Background task for running the network stack
#[embassy_executor::task]
pub(crate) async fn network_runner_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}
