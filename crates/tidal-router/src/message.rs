//! Messages as seen by the relay engine.
//!
//! The host owns message storage. The engine reads addressing fields and
//! the generic property store, and writes only the replica count (plus the
//! TTL when a message is created).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tidal_contact::NodeAddr;

/// Unique message identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value in a message's property store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// A message carried by a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from: NodeAddr,
    pub to: NodeAddr,
    /// Size in bytes.
    pub size: u64,
    /// Simulation time of creation.
    pub created_at: u64,
    /// Simulation time this copy arrived at its current holder.
    pub received_at: u64,
    /// Time to live in simulation time units, if limited.
    pub ttl: Option<u64>,
    properties: BTreeMap<String, PropertyValue>,
}

impl Message {
    /// Create a message at simulation time `now`.
    pub fn new(id: MessageId, from: NodeAddr, to: NodeAddr, size: u64, now: u64) -> Self {
        Self {
            id,
            from,
            to,
            size,
            created_at: now,
            received_at: now,
            ttl: None,
            properties: BTreeMap::new(),
        }
    }

    /// Read a property.
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Insert or replace a property.
    pub fn update_property(&mut self, key: impl Into<String>, value: PropertyValue) {
        self.properties.insert(key.into(), value);
    }

    /// Remove a property.
    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    /// Whether the message has outlived its TTL at time `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_sub(self.created_at) >= ttl)
    }
}
