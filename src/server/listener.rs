// Listener module
// Resolves the listen string and creates the TCP listener

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::error::{Error, Result};

/// Pending-connection queue length; connections beyond the concurrency cap wait here
const BACKLOG: i32 = 1024;

/// Resolve `listen` and bind a listener on the first resulting address
pub async fn bind_listener(listen: &str) -> Result<TcpListener> {
    let addr = resolve(listen).await?;
    Ok(create_listener(addr)?)
}

/// Resolve `host:port`, `[v6]:port` or `:port` (all IPv4 interfaces)
pub async fn resolve(listen: &str) -> Result<SocketAddr> {
    let target = if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    };

    let mut addrs = tokio::net::lookup_host(target)
        .await
        .map_err(|_| Error::Resolve(listen.to_string()))?;
    addrs.next().ok_or_else(|| Error::Resolve(listen.to_string()))
}

/// Create a `TcpListener` with `SO_REUSEADDR` enabled.
///
/// # Arguments
///
/// * `addr` - The socket address to bind to
///
/// # Returns
///
/// * `Ok(TcpListener)` - Successfully created and bound listener
/// * `Err(std::io::Error)` - Failed to create or bind socket
pub fn create_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    // Create socket with appropriate domain (IPv4 or IPv6)
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Enable SO_REUSEADDR: allows binding to a port in TIME_WAIT state
    socket.set_reuse_address(true)?;

    // Set non-blocking mode for async compatibility
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    // Convert socket2::Socket to std::net::TcpListener, then to tokio::net::TcpListener
    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_forms() {
        assert_eq!(
            resolve("127.0.0.1:8080").await.unwrap(),
            "127.0.0.1:8080".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve(":9000").await.unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            resolve("[::1]:443").await.unwrap(),
            "[::1]:443".parse::<SocketAddr>().unwrap()
        );
        assert!(resolve("not an address").await.is_err());
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let listener = bind_listener("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        // A second bind on the same port fails while the first is listening
        assert!(bind_listener(&addr.to_string()).await.is_err());
    }
}
