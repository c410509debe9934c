use embassy_net::{Stack, tcp::TcpSocket};
use embassy_time::Duration;
use log::debug;

use super::{HttpResult, connection::HttpConnection};

pub(crate) trait HttpHandler {
    async fn handle_request(&self, conn: HttpConnection<'_>) -> HttpResult;
}

pub(crate) struct HttpServer<'a, T: HttpHandler, const TX_SIZE: usize, const RX_SIZE: usize> {
    handler: &'a T,
}

impl<'a, T: HttpHandler, const TX_SIZE: usize, const RX_SIZE: usize>
    HttpServer<'a, T, TX_SIZE, RX_SIZE>
{
    pub(crate) fn new(handler: &'a T) -> Self {
        Self { handler }
    }

    /// Accepts connections on `port` forever, one at a time.
    pub(crate) async fn listen_and_serve(&self, stack: Stack<'static>, port: u16) -> ! {
        let mut rx_buffer = [0u8; RX_SIZE];
        let mut tx_buffer = [0u8; TX_SIZE];
        loop {
            let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
            socket.set_timeout(Some(Duration::from_secs(30)));

            if socket.accept(port).await.is_err() {
                continue;
            }

            let conn = match HttpConnection::from_socket(socket).await {
                Ok(connection) => connection,
                Err(e) => {
                    debug!("http: connection startup error: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = self.handler.handle_request(conn).await {
                debug!("http: connection error: {:?}", e);
            }
        }
    }
}
