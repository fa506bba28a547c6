// Domoticz JSON response types
//
// Every endpoint answers with the same envelope: a `status` string, a
// `title` discriminator naming the operation, and an optional `result`
// array. Fields use `#[serde(default)]` liberally because the server
// omits anything it has no value for.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

// ── Response envelope ────────────────────────────────────────────────

/// Envelope shared by every `/json.htm` response.
///
/// ```json
/// { "status": "OK", "title": "Devices", "result": [...] }
/// ```
///
/// The `title` routes the payload to the right handler; `result` is
/// absent on command acknowledgments and empty listings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub result: Vec<serde_json::Value>,
}

impl ApiEnvelope {
    /// Decode the `result` entries into `T`, skipping entries that fail.
    ///
    /// The device listing mixes every device family the server knows
    /// about; one entry with an unexpected shape must not poison the
    /// rest of the poll.
    pub fn decode_result<T: DeserializeOwned>(&self) -> Vec<T> {
        self.result
            .iter()
            .filter_map(|value| match serde_json::from_value(value.clone()) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(title = %self.title, error = %e, "skipping malformed result entry");
                    None
                }
            })
            .collect()
    }
}

// ── Devices listing ──────────────────────────────────────────────────

/// One entry from the `type=devices` listing.
///
/// Only the fields the battery engine consumes are modeled; Domoticz
/// returns dozens more per device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    /// Numeric hardware family code.
    #[serde(rename = "HardwareTypeVal", default)]
    pub hardware_type_val: i64,

    /// Hardware instance id (which gateway/bridge owns the device).
    #[serde(rename = "HardwareID", default)]
    pub hardware_id: i64,

    /// Hardware family label; the first word serves as a brand prefix.
    #[serde(rename = "HardwareType", default)]
    pub hardware_type: String,

    /// Raw device id, hex or decimal depending on the family.
    #[serde(rename = "ID", default)]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: String,

    /// Percentage in (0, 100]; 255 means "no battery reported".
    #[serde(rename = "BatteryLevel", default = "no_battery")]
    pub battery_level: f64,

    /// `%Y-%m-%d %H:%M:%S`, server-local wall clock.
    #[serde(rename = "LastUpdate", default)]
    pub last_update: String,
}

fn no_battery() -> f64 {
    255.0
}

// ── Plans ────────────────────────────────────────────────────────────

/// One entry from the `type=plans` listing. `idx` arrives as a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanEntry {
    #[serde(default)]
    pub idx: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

/// One entry from a `getplandevices` listing.
///
/// `idx` is the membership row id (what the reorder command addresses);
/// `devidx` is the device the row points at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlanMember {
    #[serde(default)]
    pub idx: String,
    #[serde(default)]
    pub devidx: String,
    #[serde(rename = "Name", default)]
    pub name: String,
}

// ── Tests ────────────────────────────────────────────────────────────
