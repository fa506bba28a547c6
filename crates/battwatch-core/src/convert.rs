// ── Wire-to-domain conversion ──
//
// One function per direction of interest; today that is only inbound.
// Everything that decides whether a poll entry is battery-relevant
// lives here, so the registry only ever sees valid observations.

use battwatch_api::DeviceEntry;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::identity;
use crate::model::Observation;

/// Hardware family whose entries never carry battery data.
const NO_BATTERY_FAMILY: i64 = 23;

/// Timestamp layout the server uses, local wall clock.
pub const LAST_UPDATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Extract a battery observation from one device-poll entry.
///
/// Returns `None` for entries the engine must ignore: the battery-less
/// hardware family, the 255 "no battery" sentinel, and levels outside
/// (0, 100]. A level of exactly 0 is a sensor-side error and logged
/// before being dropped.
pub fn observation_from_entry(entry: &DeviceEntry, now: NaiveDateTime) -> Option<Observation> {
    if entry.hardware_type_val == NO_BATTERY_FAMILY {
        return None;
    }
    let battery_level = entry.battery_level;
    if battery_level <= 0.0 || battery_level > 100.0 {
        if battery_level.abs() < f64::EPSILON {
            debug!(name = %entry.name, "battery level 0 reported, dropping observation");
        }
        return None;
    }
    let brand = entry
        .hardware_type
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_owned();
    Some(Observation {
        key: identity::derive_key(entry.hardware_type_val, entry.hardware_id, &entry.id),
        brand,
        name: entry.name.clone(),
        battery_level,
        last_update: parse_last_update(&entry.last_update, now, &entry.name),
        kind: entry.hardware_type_val,
    })
}

/// Parse the server's `LastUpdate` stamp, substituting `now` when it
/// does not parse.
fn parse_last_update(raw: &str, now: NaiveDateTime, name: &str) -> NaiveDateTime {
    match NaiveDateTime::parse_from_str(raw, LAST_UPDATE_FORMAT) {
        Ok(stamp) => stamp,
        Err(error) => {
            warn!(
                name = %name,
                value = %raw,
                error = %error,
                "unparseable LastUpdate, substituting current time"
            );
            now
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn entry(value: serde_json::Value) -> DeviceEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn valid_entry_becomes_an_observation() {
        let entry = entry(json!({
            "HardwareTypeVal": 15,
            "HardwareID": 2,
            "HardwareType": "Zigbee bridge",
            "ID": "00124b0021c5a1b2",
            "Name": "Door sensor",
            "BatteryLevel": 42,
            "LastUpdate": "2021-03-01 10:00:00",
            "Type": "Temp"
        }));
        let obs = observation_from_entry(&entry, now()).unwrap();
        assert_eq!(obs.key.as_str(), "1502a1b2");
        assert_eq!(obs.brand, "Zigbee");
        assert_eq!(obs.name, "Door sensor");
        assert_eq!(obs.battery_level, 42.0);
        assert_eq!(obs.kind, 15);
        assert_eq!(
            obs.last_update,
            NaiveDate::from_ymd_opt(2021, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn battery_less_family_is_skipped() {
        let entry = entry(json!({
            "HardwareTypeVal": 23,
            "HardwareID": 1,
            "HardwareType": "Energy meter",
            "ID": "b001",
            "Name": "Utility meter",
            "BatteryLevel": 88,
            "LastUpdate": "2021-03-01 10:00:00"
        }));
        assert!(observation_from_entry(&entry, now()).is_none());
    }

    #[test]
    fn no_battery_sentinel_is_skipped() {
        let entry = entry(json!({
            "HardwareTypeVal": 15,
            "HardwareID": 2,
            "HardwareType": "Zigbee bridge",
            "ID": "f00d",
            "Name": "Wall plug",
            "BatteryLevel": 255,
            "LastUpdate": "2021-03-01 10:00:00"
        }));
        assert!(observation_from_entry(&entry, now()).is_none());
    }

    #[test]
    fn zero_level_is_dropped() {
        let entry = entry(json!({
            "HardwareTypeVal": 15,
            "HardwareID": 2,
            "HardwareType": "Zigbee bridge",
            "ID": "f00d",
            "Name": "Motion sensor",
            "BatteryLevel": 0,
            "LastUpdate": "2021-03-01 10:00:00"
        }));
        assert!(observation_from_entry(&entry, now()).is_none());
    }

    #[test]
    fn malformed_timestamp_substitutes_now() {
        let entry = entry(json!({
            "HardwareTypeVal": 15,
            "HardwareID": 2,
            "HardwareType": "Zigbee bridge",
            "ID": "f00d",
            "Name": "Door sensor",
            "BatteryLevel": 60,
            "LastUpdate": "yesterday-ish"
        }));
        let obs = observation_from_entry(&entry, now()).unwrap();
        assert_eq!(obs.last_update, now());
    }
}
