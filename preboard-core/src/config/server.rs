use std::net::SocketAddr;
use url::Url;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address and port to listen on.
    pub listen: SocketAddr,
    /// Externally reachable base URL; gateway return and callback URLs hang off it.
    pub public_base_url: Url,
}
