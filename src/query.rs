use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::config::QueryConfig;
use crate::error::{is_timeout_kind, MasterQueryError};
use crate::packet::{decode_server_list, RequestPacket, ServerEntry};

/// Capacity of the buffer a master server response is received into.
pub const RECV_BUFFER_SIZE: usize = 8196;

/// Ask the master server described by `config` for its list of game servers.
///
/// Exactly one request is sent and one datagram read back. Each step is bounded
/// by its own timeout from `config`.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> Result<(), idtech4query::error::MasterQueryError> {
/// use idtech4query::config::QueryConfig;
/// use idtech4query::packet::ProtocolVariant;
/// use idtech4query::query::query;
///
/// let config = QueryConfig::new(None, ProtocolVariant::Dhewm3);
/// for server in query(&config).await? {
///     println!("{server}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn query(config: &QueryConfig) -> Result<Vec<ServerEntry>, MasterQueryError> {
    let addr: SocketAddr = resolve(&config.master, config.port).await?;
    debug!("resolved {} to {}", config.master, addr);

    let req_packet: RequestPacket = RequestPacket::new(config.protocol, &config.mod_filter);

    // socket is dropped, and so closed, on every return below
    let sock: UdpSocket = connect(addr, config.connect_timeout).await?;

    let payload: Vec<u8> = req_packet.pack();
    debug!(
        "sending {} byte getServers request ({}, mod {:?})",
        payload.len(),
        req_packet.protocol(),
        req_packet.mod_filter()
    );
    send(&sock, &payload, config.write_timeout).await?;

    let mut resp_buf: Vec<u8> = vec![0u8; RECV_BUFFER_SIZE];
    let size: usize = recv(&sock, &mut resp_buf, config.read_timeout).await?;
    debug!("received {} bytes from {}", size, addr);
    if size == 0 {
        return Err(MasterQueryError::EmptyResponse);
    }

    let list = decode_server_list(&resp_buf[..size])?;
    debug!("master server listed {} servers", list.len());
    Ok(list)
}

/// Resolve `host` and take the first address it yields.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, MasterQueryError> {
    let mut addrs = lookup_host((host, port))
        .await
        .map_err(|e| MasterQueryError::Resolution(host.to_owned(), Some(e)))?;

    addrs
        .next()
        .ok_or_else(|| MasterQueryError::Resolution(host.to_owned(), None))
}

async fn connect(addr: SocketAddr, timeout_dur: Duration) -> Result<UdpSocket, MasterQueryError> {
    // just arbitrarily bind any port of the matching family
    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let associate = async {
        let sock = UdpSocket::bind(local).await?;
        sock.connect(addr).await?;
        Ok::<_, std::io::Error>(sock)
    };

    match timeout(timeout_dur, associate).await {
        Err(_) => Err(MasterQueryError::ConnectTimeout),
        Ok(Err(e)) if is_timeout_kind(&e) => Err(MasterQueryError::ConnectTimeout),
        Ok(Err(e)) => Err(MasterQueryError::Transport(e)),
        Ok(Ok(sock)) => Ok(sock),
    }
}

async fn send(sock: &UdpSocket, payload: &[u8], timeout_dur: Duration) -> Result<(), MasterQueryError> {
    match timeout(timeout_dur, sock.send(payload)).await {
        Err(_) => Err(MasterQueryError::WriteTimeout),
        Ok(Err(e)) if is_timeout_kind(&e) => Err(MasterQueryError::WriteTimeout),
        Ok(Err(e)) => Err(MasterQueryError::Write(e)),
        Ok(Ok(_)) => Ok(()),
    }
}

async fn recv(sock: &UdpSocket, buf: &mut [u8], timeout_dur: Duration) -> Result<usize, MasterQueryError> {
    match timeout(timeout_dur, sock.recv(buf)).await {
        Err(_) => Err(MasterQueryError::ReadTimeout),
        Ok(Err(e)) if is_timeout_kind(&e) => Err(MasterQueryError::ReadTimeout),
        Ok(Err(e)) => Err(MasterQueryError::Read(e)),
        Ok(Ok(size)) => Ok(size),
    }
}
