// ── Core identity types ──
//
// Slot, DeviceIdx and HardwareKey keep the three id spaces the engine
// juggles from being mixed up: local unit slots, server-side device
// ids, and the composite physical-hardware identity.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Slot ────────────────────────────────────────────────────────────

/// Local unit slot a mirrored device occupies.
///
/// Allocated from the 1..=254 pool, lowest free number first. Never
/// reused while its mirror lives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Slot(pub u8);

impl Slot {
    /// Lowest allocatable slot.
    pub const MIN: u8 = 1;
    /// Highest allocatable slot.
    pub const MAX: u8 = 254;
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for Slot {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

// ── DeviceIdx ───────────────────────────────────────────────────────

/// Server-side device id (the `idx` the automation server assigned
/// when the mirror was registered).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DeviceIdx(pub u32);

impl fmt::Display for DeviceIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for DeviceIdx {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// ── HardwareKey ─────────────────────────────────────────────────────

/// Composite identity grouping every reading that originates from one
/// physical battery source: a 2-digit hardware family code, a 2-digit
/// hardware instance code and a 4-character device id tail.
///
/// Stable across renames, which is the whole point -- see
/// [`crate::identity::derive_key`] for the derivation rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HardwareKey(pub String);

impl HardwareKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HardwareKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for HardwareKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HardwareKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}
