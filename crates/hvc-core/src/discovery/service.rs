//! Query/collect discovery of appliances.
//!
//! A directed discovery asks one known address for one known device. A
//! broadcast discovery asks a whole segment and gathers every distinct
//! device that answers within a short grace period.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::device::socket::{accept, bind_socket, recv_matching};
use crate::device::{DeviceSession, SessionTimings, REQUEST_TIMEOUT};
use crate::error::{CoreError, DeviceTimeoutError, Result};
use crate::protocol::{codec, Commands, Document, MAX_DATAGRAM_SIZE};
use crate::registry::SessionRegistry;

/// Default UDP port of the appliance
pub const DEFAULT_PORT: u16 = 38866;

/// Extra time to collect replies after the first one in broadcast mode
pub const DISCOVERY_GRACE: Duration = Duration::from_secs(1);

/// Discovery options
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Wait for the first (or the matching) reply
    pub timeout: Duration,
    /// Collection window after the first reply; a tunable, not a deadline
    pub grace: Duration,
    /// Enable SO_BROADCAST for the query and take each peer from its reply
    pub broadcast: bool,
    /// Wait only for this device, failing with a timeout if it stays silent
    pub unique_id: Option<String>,
    /// Timings handed to the resulting sessions
    pub timings: SessionTimings,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
            grace: DISCOVERY_GRACE,
            broadcast: false,
            unique_id: None,
            timings: SessionTimings::default(),
        }
    }
}

impl DiscoveryOptions {
    /// Options for a broadcast query answered by any number of devices.
    pub fn broadcast() -> Self {
        Self {
            broadcast: true,
            ..Self::default()
        }
    }

    /// Options for reaching one known device at a known address.
    pub fn directed(unique_id: impl Into<String>) -> Self {
        Self {
            unique_id: Some(unique_id.into()),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

/// Query `address` and open a session per distinct device that answers.
///
/// With `unique_id` set, only that device is accepted and silence is a
/// [`DeviceTimeoutError`]; the resulting session gets a fresh socket. Without
/// it, silence yields an empty map, and the discovery socket is handed to the
/// first device found while later devices get sockets of their own.
pub async fn discover(
    address: SocketAddr,
    options: &DiscoveryOptions,
) -> Result<HashMap<String, DeviceSession>> {
    let socket = bind_socket(address)
        .map_err(|e| CoreError::communication(format!("Cannot connect to {}", address), e))?;

    if options.broadcast {
        set_broadcast(&socket, true, address)?;
    }

    let query = codec::encode(&Commands::keepalive(), None);
    socket
        .send_to(&query, address)
        .await
        .map_err(|e| CoreError::communication(format!("Cannot connect to {}", address), e))?;
    debug!(%address, broadcast = options.broadcast, "Sent discovery query");

    if options.broadcast {
        set_broadcast(&socket, false, address)?;
    }

    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let wanted = options.unique_id.as_deref();
    let first = match timeout(options.timeout, recv_matching(&socket, &mut buf, wanted)).await {
        Ok(Ok(reply)) => reply,
        Ok(Err(e)) => {
            return Err(CoreError::communication("Error with socket communication", e));
        }
        Err(_) => match wanted {
            Some(unique_id) => {
                return Err(DeviceTimeoutError {
                    unique_id: unique_id.to_string(),
                    timeout: options.timeout,
                }
                .into());
            }
            None => {
                debug!(%address, "No device answered discovery");
                return Ok(HashMap::new());
            }
        },
    };

    let mut replies = vec![first];
    if wanted.is_none() {
        sleep(options.grace).await;
        drain_replies(&socket, &mut buf, &mut replies)
            .map_err(|e| CoreError::communication("Error with socket communication", e))?;
    }

    let mut spare = if wanted.is_some() {
        drop(socket);
        None
    } else {
        Some(socket)
    };

    let mut discovered = HashMap::new();
    for (document, from) in replies {
        let peer = if options.broadcast { from } else { address };
        if discovered.contains_key(document.unique_id()) {
            debug!(unique_id = document.unique_id(), %peer, "Duplicate discovery reply");
            continue;
        }

        let unique_id = document.unique_id().to_string();
        let session = match spare.take() {
            Some(socket) => DeviceSession::adopt(document, peer, socket, options.timings).await?,
            None => DeviceSession::connect(document, peer, options.timings).await?,
        };
        info!(%unique_id, name = session.name(), %peer, "Discovered device");
        discovered.insert(unique_id, session);
    }

    Ok(discovered)
}

/// Broadcast discovery on several segments at once, merged into `registry`.
///
/// Each address gets its own socket. Failing addresses are logged and
/// skipped; only when every address fails is the first error returned.
/// Returns the ids newly added to the registry.
pub async fn discover_all(
    addresses: &[SocketAddr],
    options: &DiscoveryOptions,
    registry: &mut SessionRegistry,
) -> Result<Vec<String>> {
    let options = DiscoveryOptions {
        broadcast: true,
        unique_id: None,
        ..options.clone()
    };

    let results = join_all(addresses.iter().map(|address| discover(*address, &options))).await;

    let mut added = Vec::new();
    let mut first_error = None;
    let mut any_ok = false;
    for (address, result) in addresses.iter().zip(results) {
        match result {
            Ok(found) => {
                any_ok = true;
                added.extend(registry.merge(found));
            }
            Err(e) => {
                warn!(%address, error = %e, "Discovery failed");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) if !any_ok => Err(e),
        _ => {
            added.sort();
            added.dedup();
            Ok(added)
        }
    }
}

fn set_broadcast(socket: &tokio::net::UdpSocket, on: bool, address: SocketAddr) -> Result<()> {
    socket
        .set_broadcast(on)
        .map_err(|e| CoreError::communication(format!("Cannot broadcast to {}", address), e))
}

/// Collect every reply already queued, from any device.
fn drain_replies(
    socket: &tokio::net::UdpSocket,
    buf: &mut [u8],
    replies: &mut Vec<(Document, SocketAddr)>,
) -> io::Result<()> {
    loop {
        match socket.try_recv_from(buf) {
            Ok((len, from)) => {
                if let Some(document) = accept(&buf[..len], None) {
                    replies.push((document, from));
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;
    use tokio::net::UdpSocket;

    fn reply(id: &str) -> Vec<u8> {
        let command = json!({"unique_id": id, "conf": {"name": format!("{} name", id)}});
        codec::encode(command.as_object().unwrap(), None).to_vec()
    }

    async fn loopback() -> UdpSocket {
        UdpSocket::bind("127.0.0.1:0").await.unwrap()
    }

    fn quick() -> DiscoveryOptions {
        DiscoveryOptions::default()
            .with_timeout(Duration::from_millis(500))
            .with_grace(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_broadcast_collects_distinct_devices() {
        let listener = loopback().await;
        let address = listener.local_addr().unwrap();
        let responders = [loopback().await, loopback().await, loopback().await];
        let responder_addrs: Vec<_> = responders.iter().map(|r| r.local_addr().unwrap()).collect();

        let appliance = tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            let (len, querier) = listener.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], br#"{"HomeVentilationControl":{}}"#);
            for (n, responder) in responders.iter().enumerate() {
                let datagram = reply(&format!("hvc-{}", n));
                responder.send_to(&datagram, querier).await.unwrap();
                responder.send_to(&datagram, querier).await.unwrap();
            }
            (responders, querier)
        });

        let options = DiscoveryOptions {
            broadcast: true,
            ..quick()
        };
        let found = discover(address, &options).await.unwrap();
        let (_responders, querier) = appliance.await.unwrap();

        assert_eq!(found.len(), 3);
        for n in 0..3 {
            let session = &found[&format!("hvc-{}", n)];
            assert_eq!(session.peer(), responder_addrs[n]);
            assert_eq!(session.name(), format!("hvc-{} name", n));
        }

        // Exactly one session took over the socket the query went out on.
        let on_query_socket = found
            .values()
            .filter(|session| session.local_addr().unwrap().port() == querier.port())
            .count();
        assert_eq!(on_query_socket, 1);
    }

    #[tokio::test]
    async fn test_directed_discovery_filters_by_id() {
        let listener = loopback().await;
        let address = listener.local_addr().unwrap();

        let appliance = tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            let (_, querier) = listener.recv_from(&mut buf).await.unwrap();
            listener.send_to(b"garbage", querier).await.unwrap();
            listener.send_to(&reply("someone-else"), querier).await.unwrap();
            listener.send_to(&reply("hvc-7"), querier).await.unwrap();
            listener
        });

        let options = DiscoveryOptions {
            unique_id: Some("hvc-7".to_string()),
            ..quick()
        };
        let found = discover(address, &options).await.unwrap();
        let listener = appliance.await.unwrap();

        assert_eq!(found.len(), 1);
        let session = &found["hvc-7"];
        assert_eq!(session.peer(), address);

        // The session's own socket is connected to the appliance.
        let mut session = found.into_values().next().unwrap();
        session.force_update().unwrap();
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (len, from) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(from, session.local_addr().unwrap());
        assert_eq!(codec::decode(&buf[..len]).unwrap().unique_id(), "hvc-7");
    }

    #[tokio::test]
    async fn test_directed_discovery_times_out() {
        let silent = loopback().await;
        let options = DiscoveryOptions {
            unique_id: Some("hvc-7".to_string()),
            ..quick()
        };

        let started = Instant::now();
        let err = discover(silent.local_addr().unwrap(), &options)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_directed_timeout_releases_socket() {
        let silent = loopback().await;
        let options = DiscoveryOptions {
            unique_id: Some("hvc-7".to_string()),
            ..DiscoveryOptions::default().with_timeout(Duration::from_millis(50))
        };
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];

        for _ in 0..3 {
            let err = discover(silent.local_addr().unwrap(), &options)
                .await
                .unwrap_err();
            assert!(err.is_timeout());

            // The query's source port is free again once discover returns.
            let (_, querier) = silent.recv_from(&mut buf).await.unwrap();
            let rebound = std::net::UdpSocket::bind(("0.0.0.0", querier.port()));
            assert!(rebound.is_ok(), "port {} still in use", querier.port());
        }
    }

    #[tokio::test]
    async fn test_unfiltered_silence_is_empty() {
        let silent = loopback().await;
        let found = discover(silent.local_addr().unwrap(), &quick()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_discover_all_merges_segments() {
        let first = loopback().await;
        let second = loopback().await;
        let addresses = [first.local_addr().unwrap(), second.local_addr().unwrap()];

        let answer = |socket: UdpSocket, ids: &'static [&'static str]| {
            tokio::spawn(async move {
                let mut buf = [0u8; MAX_DATAGRAM_SIZE];
                let (_, querier) = socket.recv_from(&mut buf).await.unwrap();
                for id in ids {
                    socket.send_to(&reply(id), querier).await.unwrap();
                }
                socket
            })
        };
        let first = answer(first, &["hvc-a", "hvc-shared"]);
        let second = answer(second, &["hvc-b", "hvc-shared"]);

        let mut registry = SessionRegistry::new();
        let added = discover_all(&addresses, &quick(), &mut registry).await.unwrap();
        let _sockets = (first.await.unwrap(), second.await.unwrap());

        assert_eq!(added, vec!["hvc-a", "hvc-b", "hvc-shared"]);
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_discover_all_without_addresses() {
        let mut registry = SessionRegistry::new();
        let added = discover_all(&[], &quick(), &mut registry).await.unwrap();
        assert!(added.is_empty());
    }
}
