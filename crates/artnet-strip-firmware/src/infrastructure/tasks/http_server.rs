use embassy_net::Stack;
use log::info;

use crate::config;
use crate::controllers::SettingsHttpController;
use crate::net::http::HttpServer;

const RX_BUFFER_SIZE: usize = 2048;
const TX_BUFFER_SIZE: usize = 2048;

/// Serves the configuration API.
#[embassy_executor::task]
pub(crate) async fn http_server_task(stack: Stack<'static>) {
    info!("http: listening on port {}", config::NETWORK.http_port);
    let handler = SettingsHttpController;
    HttpServer::<_, TX_BUFFER_SIZE, RX_BUFFER_SIZE>::new(&handler)
        .listen_and_serve(stack, config::NETWORK.http_port)
        .await
}
