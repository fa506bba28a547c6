// ── Device-facing model types ──
//
// What flows between the poll boundary, the registry and the mirror
// host. Wire types from battwatch-api never cross this line.

use chrono::NaiveDateTime;

use super::{DeviceIdx, HardwareKey, Slot};

/// One battery reading extracted from a device-poll entry.
///
/// Several observations may resolve to the same hardware key when a
/// physical device exposes multiple endpoints; the registry merges
/// them into one [`HardwareRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub key: HardwareKey,
    /// Brand label, the first word of the hardware family name.
    pub brand: String,
    /// Raw device name as reported, without the brand prefix.
    pub name: String,
    /// Percentage in (0, 100]; out-of-domain readings never get here.
    pub battery_level: f64,
    pub last_update: NaiveDateTime,
    /// Hardware family code, kept for the rarely-reporting exemption.
    pub kind: i64,
}

/// Last known state of one physical battery source.
///
/// Overwritten in place on every observation, never deleted -- a key
/// that stops appearing in polls means "down", not "gone", and the
/// staleness check takes over from there.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareRecord {
    pub level: f64,
    pub name: String,
    pub last_seen: NaiveDateTime,
    pub kind: i64,
}

/// Payload for registering a new mirror with the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorSpec {
    pub slot: Slot,
    pub hardware_key: HardwareKey,
    pub name: String,
    /// Mark the device as used/visible right away.
    pub active: bool,
}

/// A pre-existing host device handed back by the host at startup, so
/// the registry can re-adopt mirrors across restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorSeed {
    pub slot: Slot,
    pub device_idx: DeviceIdx,
    pub hardware_key: HardwareKey,
    pub name: String,
    /// Last value string the host was showing, empty if never set.
    pub value: String,
    /// `None` means the host does not remember; treated as "just now".
    pub last_update: Option<NaiveDateTime>,
}

/// One row of the ordered view the plan coordinator sorts against.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedEntry {
    pub device_idx: DeviceIdx,
    pub name: String,
    pub level: f64,
}
