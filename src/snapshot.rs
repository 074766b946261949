//! Flat metric snapshot and the normalizer that builds it
//!
//! A [`Snapshot`] is produced fresh on every successful refresh and never
//! edited afterwards. Keys whose upstream field was absent are simply not
//! present; readers must treat a missing key as "unavailable", not zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::{ServerInfoPayload, UtilizationPayload};

/// Process state reported for a running server
pub const RUNNING_STATE: &str = "running";

/// Snapshot keys
pub mod keys {
    pub const IS_RUNNING: &str = "is_running";
    pub const CURRENT_STATE: &str = "current_state";
    pub const MEMORY: &str = "memory";
    pub const CPU: &str = "cpu";
    pub const DISK: &str = "disk";
    pub const NETWORK_TX: &str = "network_tx";
    pub const NETWORK_RX: &str = "network_rx";
    pub const UPTIME: &str = "uptime";
    pub const NODE: &str = "node";
    pub const IS_NODE_UNDER_MAINTENANCE: &str = "is_node_under_maintenance";

    /// Every key a complete snapshot carries
    pub const ALL: [&str; 10] = [
        IS_RUNNING,
        CURRENT_STATE,
        MEMORY,
        CPU,
        DISK,
        NETWORK_TX,
        NETWORK_RX,
        UPTIME,
        NODE,
        IS_NODE_UNDER_MAINTENANCE,
    ];
}

// ============================================================================
// Metric values
// ============================================================================

/// One value in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl MetricValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value, integers included
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for MetricValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetricValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetricValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Normalized metrics for one server at one point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    values: BTreeMap<String, MetricValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.insert(key, value);
        self
    }

    fn insert(&mut self, key: impl Into<String>, value: impl Into<MetricValue>) {
        self.values.insert(key.into(), value.into());
    }

    fn insert_opt<V: Into<MetricValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetricValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(MetricValue::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(MetricValue::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(MetricValue::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(MetricValue::as_str)
    }

    /// Whether the server process is running
    pub fn is_running(&self) -> Option<bool> {
        self.get_bool(keys::IS_RUNNING)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// ============================================================================
// Normalizer
// ============================================================================

/// Merge the utilization and info payloads into one flat snapshot
///
/// Pure mapping: no unit conversion, rounding or formatting.
pub fn normalize(utilization: &UtilizationPayload, info: &ServerInfoPayload) -> Snapshot {
    let mut snapshot = Snapshot::new();

    if let Some(state) = &utilization.current_state {
        snapshot.insert(keys::IS_RUNNING, state == RUNNING_STATE);
        snapshot.insert(keys::CURRENT_STATE, state.as_str());
    }

    if let Some(resources) = &utilization.resources {
        snapshot.insert_opt(keys::MEMORY, resources.memory_bytes);
        snapshot.insert_opt(keys::CPU, resources.cpu_absolute);
        snapshot.insert_opt(keys::DISK, resources.disk_bytes);
        snapshot.insert_opt(keys::NETWORK_TX, resources.network_tx_bytes);
        snapshot.insert_opt(keys::NETWORK_RX, resources.network_rx_bytes);
        snapshot.insert_opt(keys::UPTIME, resources.uptime);
    }

    snapshot.insert_opt(keys::NODE, info.node.clone());
    snapshot.insert_opt(keys::IS_NODE_UNDER_MAINTENANCE, info.is_node_under_maintenance);

    snapshot
}
