mod artnet;
mod http_server;
mod network;

pub(crate) use artnet::artnet_task;
pub(crate) use http_server::http_server_task;
pub(crate) use network::{network_runner_task, wifi_connection_task};
