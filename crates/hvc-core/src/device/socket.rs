//! Socket plumbing shared by discovery and sessions.
//!
//! Sockets are always non-blocking. Synchronous sends and drains go straight
//! to the OS through `socket2`, so they work even when the runtime has not
//! polled the socket yet; waits use tokio readiness.

use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::protocol::{codec, Document};

/// Create a non-blocking UDP socket on an ephemeral port, in the address
/// family of `peer`.
pub fn create_socket(peer: SocketAddr) -> Result<std::net::UdpSocket, io::Error> {
    let socket = Socket::new(Domain::for_address(peer), Type::DGRAM, Some(Protocol::UDP))?;

    let any: IpAddr = match peer {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    socket.bind(&SocketAddr::new(any, 0).into())?;

    socket.set_nonblocking(true)?;

    Ok(socket.into())
}

/// [`create_socket`] registered with the tokio runtime.
pub fn bind_socket(peer: SocketAddr) -> Result<UdpSocket, io::Error> {
    UdpSocket::from_std(create_socket(peer)?)
}

/// Send on a connected socket without waiting for readiness.
pub(crate) fn send_now(socket: &UdpSocket, datagram: &[u8]) -> io::Result<usize> {
    SockRef::from(socket).send(datagram)
}

/// Read one datagram from a connected socket, `WouldBlock` when none is queued.
fn recv_now(socket: &UdpSocket, buf: &mut [u8]) -> io::Result<usize> {
    let sock = SockRef::from(socket);
    let mut reader: &Socket = &sock;
    reader.read(buf)
}

/// Decode a datagram and keep it only if it belongs to `unique_id`
/// (any device when `None`).
pub(crate) fn accept(data: &[u8], unique_id: Option<&str>) -> Option<Document> {
    match codec::decode(data) {
        Ok(document) if unique_id.map_or(true, |id| document.unique_id() == id) => Some(document),
        Ok(document) => {
            debug!(
                foreign_id = document.unique_id(),
                expected_id = unique_id,
                "Dropping document for another device"
            );
            None
        }
        Err(e) => {
            debug!(error = %e, len = data.len(), "Dropping non-protocol datagram");
            None
        }
    }
}

/// Next queued document for `unique_id`, or `None` once the queue is empty.
pub(crate) fn try_recv_matching(
    socket: &UdpSocket,
    buf: &mut [u8],
    unique_id: &str,
) -> io::Result<Option<Document>> {
    loop {
        match recv_now(socket, buf) {
            Ok(len) => {
                if let Some(document) = accept(&buf[..len], Some(unique_id)) {
                    return Ok(Some(document));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Wait for the next matching document and its sender address.
///
/// Not cancellation-sensitive: dropping the future loses nothing but the
/// datagram currently being inspected.
pub(crate) async fn recv_matching(
    socket: &UdpSocket,
    buf: &mut [u8],
    unique_id: Option<&str>,
) -> io::Result<(Document, SocketAddr)> {
    loop {
        let (len, from) = socket.recv_from(buf).await?;
        if let Some(document) = accept(&buf[..len], unique_id) {
            return Ok((document, from));
        }
    }
}
