//! Stateful session with one appliance.

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use super::socket::{bind_socket, recv_matching, send_now, try_recv_matching};
use crate::error::{CoreError, DeviceTimeoutError, Result};
use crate::protocol::{codec, Command, Commands, Document, MAX_DATAGRAM_SIZE};

/// Default wait for a reply
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum gap between keepalives
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(303);

/// Silence after which a device counts as unavailable
pub const UPDATE_TIMEOUT: Duration = Duration::from_secs(910);

/// Keepalive and staleness thresholds of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    pub keepalive_interval: Duration,
    pub update_timeout: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            keepalive_interval: KEEPALIVE_INTERVAL,
            update_timeout: UPDATE_TIMEOUT,
        }
    }
}

/// Outcome of one scheduler tick on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionHealth {
    Online,
    TimedOut,
    Failed(String),
}

impl SessionHealth {
    pub fn is_available(&self) -> bool {
        matches!(self, SessionHealth::Online)
    }
}

/// Live session with a single appliance.
///
/// The session owns its socket, which is connected to the appliance so the
/// kernel drops datagrams from anyone else. Nothing runs in the background:
/// the caller drives receiving through [`receive_nonblocking`] and
/// [`receive_blocking`], and must not drive one session from two tasks.
///
/// [`receive_nonblocking`]: DeviceSession::receive_nonblocking
/// [`receive_blocking`]: DeviceSession::receive_blocking
#[derive(Debug)]
pub struct DeviceSession {
    unique_id: String,
    peer: SocketAddr,
    socket: Option<UdpSocket>,
    document: Document,
    last_update: Instant,
    last_keepalive: Option<Instant>,
    timings: SessionTimings,
    recv_buf: Vec<u8>,
}

impl DeviceSession {
    /// Open a session on a fresh socket connected to `peer`.
    pub async fn connect(document: Document, peer: SocketAddr, timings: SessionTimings) -> Result<Self> {
        let socket = bind_socket(peer)
            .map_err(|e| CoreError::communication(format!("Cannot create socket for {}", peer), e))?;
        Self::adopt(document, peer, socket, timings).await
    }

    /// Open a session on an existing socket, typically the one discovery used.
    pub async fn adopt(
        document: Document,
        peer: SocketAddr,
        socket: UdpSocket,
        timings: SessionTimings,
    ) -> Result<Self> {
        socket
            .connect(peer)
            .await
            .map_err(|e| CoreError::communication(format!("Cannot connect to {}", peer), e))?;

        Ok(Self {
            unique_id: document.unique_id().to_string(),
            peer,
            socket: Some(socket),
            document,
            last_update: Instant::now(),
            last_keepalive: None,
            timings,
            recv_buf: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Configured name of the appliance, falling back to its unique id.
    pub fn name(&self) -> &str {
        self.document
            .get_str("conf.name")
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.unique_id)
    }

    /// Last fully received document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Look up a dotted path in the last received document.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.document.get(path)
    }

    pub fn last_update(&self) -> Instant {
        self.last_update
    }

    pub fn last_keepalive(&self) -> Option<Instant> {
        self.last_keepalive
    }

    pub fn timings(&self) -> SessionTimings {
        self.timings
    }

    pub fn is_closed(&self) -> bool {
        self.socket.is_none()
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket()?
            .local_addr()
            .map_err(|e| CoreError::communication("Cannot read local address", e))
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket
            .as_ref()
            .ok_or_else(|| CoreError::closed(&self.unique_id))
    }

    /// Send `command` tagged with this device's id. Does not wait for a reply.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        let socket = self.socket()?;
        let datagram = codec::encode(command, Some(&self.unique_id));
        let sent = send_now(socket, &datagram);
        self.last_keepalive = Some(Instant::now());

        match sent {
            Ok(_) => {
                debug!(unique_id = %self.unique_id, peer = %self.peer, len = datagram.len(), "Sent command");
                Ok(())
            }
            Err(e) => {
                warn!(unique_id = %self.unique_id, peer = %self.peer, error = %e, "Send failed");
                Err(CoreError::communication(format!("Cannot send to {}", self.peer), e))
            }
        }
    }

    /// Ask the appliance to push its document now.
    pub fn force_update(&mut self) -> Result<()> {
        self.send(&Commands::force_update())
    }

    /// Send a keepalive unless something was sent within the keepalive interval.
    pub fn keep_alive(&mut self) -> Result<()> {
        let due = self
            .last_keepalive
            .map_or(true, |sent| sent.elapsed() > self.timings.keepalive_interval);

        if due {
            self.send(&Commands::keepalive())
        } else {
            trace!(unique_id = %self.unique_id, "Keepalive not due");
            Ok(())
        }
    }

    /// Apply every queued document for this device, without blocking.
    ///
    /// Noise and documents for other devices are dropped. A closed session
    /// has nothing to drain.
    pub fn receive_nonblocking(&mut self) -> Result<()> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(());
        };

        loop {
            match try_recv_matching(socket, &mut self.recv_buf, &self.unique_id) {
                Ok(Some(document)) => {
                    self.document = document;
                    self.last_update = Instant::now();
                    trace!(unique_id = %self.unique_id, "Document updated");
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    warn!(unique_id = %self.unique_id, error = %e, "Receive failed");
                    return Err(CoreError::communication("Error with socket communication", e));
                }
            }
        }
    }

    /// Wait until a document for this device arrives or `wait` elapses.
    pub async fn receive_blocking(&mut self, wait: Duration) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| CoreError::closed(&self.unique_id))?;
        let buf = &mut self.recv_buf;
        let unique_id = self.unique_id.as_str();

        let document = match timeout(wait, recv_matching(socket, buf, Some(unique_id))).await {
            Ok(Ok((document, _))) => document,
            Ok(Err(e)) => {
                return Err(CoreError::communication("Error with socket communication", e));
            }
            Err(_) => {
                return Err(DeviceTimeoutError {
                    unique_id: unique_id.to_string(),
                    timeout: wait,
                }
                .into());
            }
        };

        self.document = document;
        self.last_update = Instant::now();
        Ok(())
    }

    /// True once no document arrived for longer than the update timeout.
    pub fn is_timed_out(&self) -> bool {
        self.last_update.elapsed() > self.timings.update_timeout
    }

    /// One scheduler tick: drain, keepalive, staleness check.
    ///
    /// The drain and the keepalive both run even when the other one fails.
    pub fn tick(&mut self) -> SessionHealth {
        let drained = self.receive_nonblocking();
        let sent = self.keep_alive();
        if let Err(e) = drained.and(sent) {
            return SessionHealth::Failed(e.to_string());
        }
        if self.is_timed_out() {
            SessionHealth::TimedOut
        } else {
            SessionHealth::Online
        }
    }

    /// Release the socket. Safe to call more than once.
    pub fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!(unique_id = %self.unique_id, "Session closed");
        }
    }
}
