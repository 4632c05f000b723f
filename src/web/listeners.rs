use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

/// Bind the HTTP listener and report the address actually bound.
///
/// `host == "*"` binds every interface: an IPv6 dual-stack socket when the system allows
/// one, otherwise IPv4 only. Anything else goes through regular name resolution.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(SocketAddr, TcpListener)> {
    let listener = if host == "*" {
        bind_wildcard(port)?
    } else {
        tracing::info!("Attempting to bind server to {}:{}...", host, port);
        TcpListener::bind((host, port)).await?
    };

    let local_addr = listener.local_addr()?;
    Ok((local_addr, listener))
}

fn bind_wildcard(port: u16) -> std::io::Result<TcpListener> {
    let ipv6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    tracing::info!(
        "Attempting to bind server to {}... (IPv6 + IPv4 dual-stack)",
        ipv6
    );
    match bind_socket(ipv6) {
        Ok(listener) => return Ok(listener),
        Err(e) => tracing::warn!("Failed to bind IPv6 listener: {}. Falling back to IPv4.", e),
    }

    let ipv4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    tracing::info!("Attempting to bind server to {}... (IPv4)", ipv4);
    bind_socket(ipv4)
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    if addr.is_ipv6() {
        // Dual-stack is best effort; some systems only allow v6-only sockets
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!("Failed to enable dual-stack mode: {}. Continuing anyway.", e);
        }
    }

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;

    TcpListener::from_std(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_loopback_ephemeral_port() {
        let (addr, _listener) = create_listener("127.0.0.1", 0).await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_wildcard() {
        let (addr, _listener) = create_listener("*", 0).await.unwrap();
        assert!(addr.ip().is_unspecified());
        assert_ne!(addr.port(), 0);
    }
}
