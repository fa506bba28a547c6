// ── Hardware identity ──
//
// Pure functions that turn raw device-poll fields into a stable
// composite key and reconcile display names when a key repeats.
// Multi-endpoint sensors show up as several server devices; the key
// collapses them onto the one physical battery they share.

use std::collections::HashSet;

use crate::model::HardwareKey;

/// Z-Wave hardware family codes whose device ids carry a per-endpoint
/// suffix.
const ZWAVE_FAMILIES: [i64; 2] = [21, 94];

/// Derive the composite hardware key for one observation.
///
/// Layout: 2-digit hardware family code, 2-digit hardware instance
/// code, 4-character device id tail.
pub fn derive_key(type_val: i64, hardware_id: i64, raw_id: &str) -> HardwareKey {
    HardwareKey(format!(
        "{}{}{}",
        code(type_val),
        code(hardware_id),
        id_tail(type_val, raw_id)
    ))
}

/// Display name for a first-time observation: `"<brand>: <name>"`.
pub fn compose_name(brand: &str, name: &str) -> String {
    format!("{brand}: {name}")
}

/// Reconcile a repeated key's display name with the previous one.
///
/// Keeps only whitespace-delimited tokens common to both names,
/// preserving the previous name's token order. When nothing beyond
/// the brand prefix survives, the key itself becomes the name.
pub fn merge_names(previous: &str, candidate: &str, brand: &str, key: &HardwareKey) -> String {
    let candidate_tokens: HashSet<&str> = candidate.split_whitespace().collect();
    let kept: Vec<&str> = previous
        .split_whitespace()
        .filter(|token| candidate_tokens.contains(token))
        .collect();
    let joined = kept.join(" ");
    let merged = joined.trim_end_matches([' ', '-']);
    if merged.is_empty() || merged == format!("{brand}:") {
        return format!("{brand}: {key}");
    }
    merged.to_owned()
}

/// Left-pad the decimal value with `'0'` and keep the last two
/// characters.
fn code(value: i64) -> String {
    chars_tail(&format!("0{value}"), 2)
}

/// 4-character device id tail.
///
/// Z-Wave ids are first normalised by dropping the trailing endpoint
/// suffix, so every endpoint of one node lands on the same key.
fn id_tail(type_val: i64, raw_id: &str) -> String {
    if ZWAVE_FAMILIES.contains(&type_val) {
        let node = chars_range_from_end(raw_id, 4, 2);
        chars_tail(&format!("00{node}"), 4)
    } else {
        chars_tail(raw_id, 4)
    }
}

/// Last `n` characters of `s`, the whole string when shorter.
fn chars_tail(s: &str, n: usize) -> String {
    let skip = s.chars().count().saturating_sub(n);
    s.chars().skip(skip).collect()
}

/// Characters in `[len - from_end, len - to_end)`, clamped at the
/// string boundaries.
fn chars_range_from_end(s: &str, from_end: usize, to_end: usize) -> String {
    let len = s.chars().count();
    let start = len.saturating_sub(from_end);
    let end = len.saturating_sub(to_end).max(start);
    s.chars().skip(start).take(end - start).collect()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_concatenates_padded_codes_and_id_tail() {
        let key = derive_key(15, 2, "00124b0021c5a1b2");
        assert_eq!(key.as_str(), "1502a1b2");
    }

    #[test]
    fn key_keeps_only_the_last_two_code_digits() {
        let key = derive_key(108, 3, "8f1");
        assert_eq!(key.as_str(), "08038f1");
    }

    #[test]
    fn key_derivation_is_idempotent() {
        let a = derive_key(15, 2, "c5a1b2");
        let b = derive_key(15, 2, "c5a1b2");
        assert_eq!(a, b);
    }

    #[test]
    fn zwave_endpoints_share_one_key() {
        // Same node id 0C, endpoints 01 and 02.
        let a = derive_key(21, 3, "0A0B0C01");
        let b = derive_key(21, 3, "0A0B0C02");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "2103000C");
    }

    #[test]
    fn zwave_short_ids_are_padded() {
        let key = derive_key(94, 1, "701");
        assert_eq!(key.as_str(), "9401007");
    }

    #[test]
    fn merging_a_name_with_itself_is_identity() {
        let key = HardwareKey::from("1502a1b2");
        let name = compose_name("Zigbee", "Door sensor");
        assert_eq!(merge_names(&name, &name, "Zigbee", &key), name);
    }

    #[test]
    fn merge_keeps_common_tokens_in_previous_order() {
        let key = HardwareKey::from("1502a1b2");
        let previous = "Zigbee: Door sensor kitchen";
        let candidate = compose_name("Zigbee", "kitchen Door");
        assert_eq!(
            merge_names(previous, &candidate, "Zigbee", &key),
            "Zigbee: Door kitchen"
        );
    }

    #[test]
    fn merge_trims_trailing_separators() {
        let key = HardwareKey::from("2103000C");
        let previous = "Aeotec: Multi - 1";
        let candidate = compose_name("Aeotec", "Multi - 2");
        assert_eq!(
            merge_names(previous, &candidate, "Aeotec", &key),
            "Aeotec: Multi"
        );
    }

    #[test]
    fn bare_brand_falls_back_to_the_key() {
        let key = HardwareKey::from("1502a1b2");
        let previous = "Zigbee: Hallway";
        let candidate = compose_name("Zigbee", "Bedroom");
        assert_eq!(
            merge_names(previous, &candidate, "Zigbee", &key),
            "Zigbee: 1502a1b2"
        );
    }
}
