use crate::config::SharedConfig;
use crate::dns::handlers::Handler;
use crate::store::Store;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use trust_dns_server::ServerFuture;

const TCP_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn new(
    config: SharedConfig,
    store: Store,
) -> anyhow::Result<ServerFuture<Handler>> {
    let udp_addr = config.dns_udp_listen;
    let tcp_addr = config.dns_tcp_listen;
    let dns_handler = Handler::new(store);
    let mut dns_server = ServerFuture::new(dns_handler);
    dns_server.register_socket(UdpSocket::bind(udp_addr).await?);
    dns_server.register_listener(TcpListener::bind(tcp_addr).await?, TCP_QUERY_TIMEOUT);
    Ok(dns_server)
}
