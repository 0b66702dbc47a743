//! Registry of live sessions keyed by unique id.
//!
//! The registry is owned by the host application. The core only touches it
//! when handed a reference, e.g. to merge a discovery fan-out.

use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::device::{DeviceSession, SessionHealth};

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, DeviceSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session unless its id is already present.
    ///
    /// Returns false and closes `session` when the id was taken.
    pub fn insert(&mut self, mut session: DeviceSession) -> bool {
        match self.sessions.entry(session.unique_id().to_string()) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(session);
                true
            }
            btree_map::Entry::Occupied(_) => {
                debug!(unique_id = session.unique_id(), "Already registered, closing duplicate");
                session.close();
                false
            }
        }
    }

    /// Add a session, closing and returning any previous one with the same id.
    pub fn replace(&mut self, session: DeviceSession) -> Option<DeviceSession> {
        let mut previous = self
            .sessions
            .insert(session.unique_id().to_string(), session)?;
        previous.close();
        Some(previous)
    }

    /// Insert every session from a discovery result. Returns the ids added.
    pub fn merge(&mut self, discovered: HashMap<String, DeviceSession>) -> Vec<String> {
        let mut added = Vec::new();
        for (unique_id, session) in discovered {
            if self.insert(session) {
                added.push(unique_id);
            }
        }
        added.sort();
        added
    }

    pub fn get(&self, unique_id: &str) -> Option<&DeviceSession> {
        self.sessions.get(unique_id)
    }

    pub fn get_mut(&mut self, unique_id: &str) -> Option<&mut DeviceSession> {
        self.sessions.get_mut(unique_id)
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.sessions.contains_key(unique_id)
    }

    /// Remove a session and release its socket.
    pub fn remove(&mut self, unique_id: &str) -> Option<DeviceSession> {
        let mut session = self.sessions.remove(unique_id)?;
        session.close();
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sessions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceSession> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceSession> {
        self.sessions.values_mut()
    }

    /// Tick every session and report its health. Sessions are never dropped
    /// here; an unavailable device may come back.
    pub fn tick(&mut self) -> BTreeMap<String, SessionHealth> {
        self.sessions
            .iter_mut()
            .map(|(unique_id, session)| {
                let health = session.tick();
                if let SessionHealth::Failed(reason) = &health {
                    warn!(%unique_id, %reason, "Session tick failed");
                }
                (unique_id.clone(), health)
            })
            .collect()
    }

    /// Hand every session over to the caller, sockets still open.
    pub fn into_sessions(self) -> impl Iterator<Item = DeviceSession> {
        self.sessions.into_values()
    }

    pub fn close_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.close();
        }
        self.sessions.clear();
    }
}
