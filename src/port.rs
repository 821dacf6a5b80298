//! Ports and value bags.
//!
//! Models exchange values through named, directed ports. During a cycle
//! each producing component fills a [`Bag`], a map from port name to the
//! list of values posted on it, which the coordinator routes through the
//! coupling graph.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The value type carried on ports.
///
/// JSON values keep the kernel agnostic about model payloads while
/// staying serializable for stats export and observers.
pub type Value = serde_json::Value;

/// Direction of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMode {
    /// Values flow into the owning model.
    Input,
    /// Values flow out of the owning model.
    Output,
}

/// A named, directed port on a model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique per direction within its model.
    pub name: String,
    /// Direction.
    pub mode: PortMode,
}

impl Port {
    /// Creates an input port.
    pub fn input(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            mode: PortMode::Input,
        }
    }

    /// Creates an output port.
    pub fn output(name: impl Into<String>) -> Self {
        Port {
            name: name.into(),
            mode: PortMode::Output,
        }
    }
}

/// A map from port name to the values posted on it during one cycle.
///
/// Bags are reused across cycles: [`Bag::clear`] empties every value list
/// but keeps the allocated entries, so steady-state simulation does not
/// reallocate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Bag {
    entries: HashMap<String, Vec<Value>>,
}

impl Bag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Bag::default()
    }

    /// Posts a value on a port.
    pub fn post(&mut self, port: impl Into<String>, value: Value) {
        self.entries.entry(port.into()).or_default().push(value);
    }

    /// Appends several values on a port.
    pub fn extend(&mut self, port: impl Into<String>, values: impl IntoIterator<Item = Value>) {
        self.entries.entry(port.into()).or_default().extend(values);
    }

    /// The values posted on a port this cycle.
    pub fn values(&self, port: &str) -> &[Value] {
        self.entries.get(port).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates over ports that carry at least one value.
    pub fn ports(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.entries
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(port, values)| (port.as_str(), values.as_slice()))
    }

    /// Whether no port carries a value.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Total number of posted values.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Empties every value list, retaining capacity.
    pub fn clear(&mut self) {
        for values in self.entries.values_mut() {
            values.clear();
        }
    }
}
