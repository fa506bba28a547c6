// ── Mirror registry ──
//
// Owns the hardware records and the mirrored devices, and runs the
// reconcile cycle: create mirrors for unmapped hardware, refresh every
// mirror through its filter, detect dead batteries, and push the
// result to the host as an update or a touch.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, error, info};

use crate::error::CoreError;
use crate::filter::{FilterMode, ValueFilter};
use crate::host::MirrorHost;
use crate::identity;
use crate::model::{
    DeviceIdx, HardwareKey, HardwareRecord, MirrorSeed, MirrorSpec, Observation, OrderedEntry,
    PresentationCategory, Slot,
};
use crate::settings::{Settings, SortDirection};

/// Hardware family that legitimately reports rarely; exempt from the
/// staleness check.
const RARELY_REPORTING_FAMILY: i64 = 1;

/// A battery that has not reported for this long is presumed dead.
const STALE_AFTER_MINUTES: i64 = 30;

/// Explicit update request for one mirror; `None` fields stay as they
/// are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorUpdate {
    pub raw_level: Option<f64>,
    pub last_update: Option<NaiveDateTime>,
    pub name: Option<String>,
    pub kind: Option<i64>,
}

/// A mirror created this cycle, reported back so the engine can enroll
/// its low-battery notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMirror {
    pub device_idx: DeviceIdx,
    pub name: String,
}

/// Point-in-time view of one mirror, for status output.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorStatus {
    pub slot: Slot,
    pub name: String,
    pub level: f64,
    pub raw_level: f64,
    pub category: PresentationCategory,
    pub last_update: NaiveDateTime,
}

/// One mirrored device and the filter it owns.
#[derive(Debug)]
pub struct MirroredDevice {
    pub slot: Slot,
    pub device_idx: DeviceIdx,
    pub name: String,
    pub kind: i64,
    pub last_update: NaiveDateTime,
    pub category: PresentationCategory,
    filter: ValueFilter,
    /// Value string the host currently shows, `None` until pushed.
    mirrored_value: Option<String>,
}

impl MirroredDevice {
    fn new(
        slot: Slot,
        device_idx: DeviceIdx,
        name: String,
        kind: i64,
        last_update: NaiveDateTime,
        empty_level: f64,
    ) -> Self {
        Self {
            slot,
            device_idx,
            name,
            kind,
            last_update,
            category: PresentationCategory::Healthy,
            filter: ValueFilter::new(FilterMode::Systematic, empty_level),
            mirrored_value: None,
        }
    }

    /// Smoothed battery level.
    pub fn level(&self) -> f64 {
        self.filter.output()
    }

    /// Most recent raw sample fed into the filter.
    pub fn raw_level(&self) -> f64 {
        self.filter.last_input()
    }
}

/// Registry of hardware records and the mirrors tracking them.
///
/// Records are never deleted here: a key absent from recent polls
/// stops refreshing its `last_seen` stamp and the staleness check
/// takes it down. Mirrors go away only through [`Self::remove`].
pub struct MirrorRegistry {
    settings: Settings,
    records: BTreeMap<HardwareKey, HardwareRecord>,
    mirrors: BTreeMap<HardwareKey, MirroredDevice>,
}

impl MirrorRegistry {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            records: BTreeMap::new(),
            mirrors: BTreeMap::new(),
        }
    }

    /// Re-adopt mirrors the host still holds from a previous run.
    pub fn seed(&mut self, seeds: Vec<MirrorSeed>, now: NaiveDateTime) {
        for seed in seeds {
            let mut mirror = MirroredDevice::new(
                seed.slot,
                seed.device_idx,
                seed.name,
                0,
                seed.last_update.unwrap_or(now),
                self.settings.empty_level,
            );
            if let Ok(value) = seed.value.parse::<f64>() {
                mirror.filter.update(value);
            }
            mirror.category = PresentationCategory::for_level(
                mirror.level(),
                self.settings.empty_level,
                self.settings.level_delta(),
            );
            mirror.mirrored_value = Some(seed.value);
            debug!(slot = %mirror.slot, key = %seed.hardware_key, "mirror re-adopted");
            self.mirrors.insert(seed.hardware_key, mirror);
        }
    }

    /// Fold one observation into the hardware records.
    pub fn observe(&mut self, observation: Observation) {
        match self.records.get_mut(&observation.key) {
            None => {
                let name = identity::compose_name(&observation.brand, &observation.name);
                debug!(
                    key = %observation.key,
                    name = %name,
                    level = observation.battery_level,
                    "hardware discovered"
                );
                self.records.insert(
                    observation.key,
                    HardwareRecord {
                        level: observation.battery_level,
                        name,
                        last_seen: observation.last_update,
                        kind: observation.kind,
                    },
                );
            }
            Some(record) => {
                let candidate = identity::compose_name(&observation.brand, &observation.name);
                record.name = identity::merge_names(
                    &record.name,
                    &candidate,
                    &observation.brand,
                    &observation.key,
                );
                record.level = observation.battery_level;
                record.kind = observation.kind;
                // Endpoints report at different times; keep the freshest.
                if observation.last_update > record.last_seen {
                    record.last_seen = observation.last_update;
                }
            }
        }
    }

    /// Run one reconcile cycle against the host.
    ///
    /// Returns the mirrors created this cycle.
    pub fn reconcile(&mut self, now: NaiveDateTime, host: &mut dyn MirrorHost) -> Vec<NewMirror> {
        let created = self.create_missing(host);
        self.refresh_all(now, host);
        created
    }

    /// Drop the mirror occupying `slot`.
    ///
    /// The hardware record stays; if the hardware keeps reporting, the
    /// next cycle recreates a mirror for it.
    pub fn remove(&mut self, slot: Slot) -> Result<String, CoreError> {
        let Some(key) = self
            .mirrors
            .iter()
            .find(|(_, mirror)| mirror.slot == slot)
            .map(|(key, _)| key.clone())
        else {
            return Err(CoreError::UnknownSlot { slot });
        };
        let name = self
            .mirrors
            .remove(&key)
            .map(|mirror| mirror.name)
            .unwrap_or_default();
        Ok(name)
    }

    /// Mirrors sorted by (smoothed level, name).
    pub fn ordered_entries(&self, direction: SortDirection) -> Vec<OrderedEntry> {
        let mut entries: Vec<OrderedEntry> = self
            .mirrors
            .values()
            .map(|mirror| OrderedEntry {
                device_idx: mirror.device_idx,
                name: mirror.name.clone(),
                level: mirror.level(),
            })
            .collect();
        entries.sort_by(|a, b| a.level.total_cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
        if direction == SortDirection::Descending {
            entries.reverse();
        }
        entries
    }

    /// Rows for the status snapshot, slot order.
    pub fn status(&self) -> Vec<MirrorStatus> {
        let mut rows: Vec<MirrorStatus> = self
            .mirrors
            .values()
            .map(|mirror| MirrorStatus {
                slot: mirror.slot,
                name: mirror.name.clone(),
                level: mirror.level(),
                raw_level: mirror.raw_level(),
                category: mirror.category,
                last_update: mirror.last_update,
            })
            .collect();
        rows.sort_by_key(|row| row.slot);
        rows
    }

    /// Current record for a hardware key.
    pub fn record(&self, key: &HardwareKey) -> Option<&HardwareRecord> {
        self.records.get(key)
    }

    fn allocate_slot(&self) -> Result<Slot, CoreError> {
        let used: BTreeSet<u8> = self.mirrors.values().map(|mirror| mirror.slot.0).collect();
        (Slot::MIN..=Slot::MAX)
            .find(|candidate| !used.contains(candidate))
            .map(Slot)
            .ok_or(CoreError::SlotPoolExhausted)
    }

    fn create_missing(&mut self, host: &mut dyn MirrorHost) -> Vec<NewMirror> {
        let mut created = Vec::new();
        let missing: Vec<HardwareKey> = self
            .records
            .keys()
            .filter(|key| !self.mirrors.contains_key(*key))
            .cloned()
            .collect();
        for key in missing {
            let Some(record) = self.records.get(&key) else {
                continue;
            };
            let slot = match self.allocate_slot() {
                Ok(slot) => slot,
                Err(error) => {
                    error!(error = %error, name = %record.name, "mirror not created");
                    continue;
                }
            };
            let spec = MirrorSpec {
                slot,
                hardware_key: key.clone(),
                name: record.name.clone(),
                active: self.settings.auto_use,
            };
            let device_idx = host.create(&spec);
            info!(slot = %slot, device_idx = %device_idx, name = %record.name, "mirror created");
            created.push(NewMirror {
                device_idx,
                name: record.name.clone(),
            });
            let mirror = MirroredDevice::new(
                slot,
                device_idx,
                record.name.clone(),
                record.kind,
                record.last_seen,
                self.settings.empty_level,
            );
            self.mirrors.insert(key, mirror);
        }
        created
    }

    fn refresh_all(&mut self, now: NaiveDateTime, host: &mut dyn MirrorHost) {
        let empty_level = self.settings.empty_level;
        let delta = self.settings.level_delta();
        for (key, mirror) in &mut self.mirrors {
            let update = match self.records.get(key) {
                Some(record) => MirrorUpdate {
                    raw_level: Some(record.level),
                    last_update: Some(record.last_seen),
                    name: Some(record.name.clone()),
                    kind: Some(record.kind),
                },
                // Never observed this run: treat as down.
                None => MirrorUpdate {
                    raw_level: Some(0.0),
                    ..MirrorUpdate::default()
                },
            };
            Self::refresh_one(mirror, &update, now, empty_level, delta, host);
        }
    }

    fn refresh_one(
        mirror: &mut MirroredDevice,
        update: &MirrorUpdate,
        now: NaiveDateTime,
        empty_level: f64,
        delta: f64,
        host: &mut dyn MirrorHost,
    ) {
        if let Some(raw) = update.raw_level {
            mirror.filter.update(raw);
        }
        if let Some(last_update) = update.last_update {
            mirror.last_update = last_update;
        }
        if let Some(ref name) = update.name {
            name.clone_into(&mut mirror.name);
        }
        if let Some(kind) = update.kind {
            mirror.kind = kind;
        }

        // Batteries that stop reporting are presumed dead after the
        // stale window, except the rarely-reporting family.
        if mirror.kind != RARELY_REPORTING_FAMILY
            && mirror.last_update + Duration::minutes(STALE_AFTER_MINUTES) < now
        {
            error!(
                name = %mirror.name,
                slot = %mirror.slot,
                last_update = %mirror.last_update,
                "no recent report, battery presumed dead"
            );
            mirror.filter.update(0.0);
        }

        mirror.category = PresentationCategory::for_level(mirror.level(), empty_level, delta);

        let value = format!("{:.1}", mirror.level());
        if mirror.mirrored_value.as_deref() == Some(value.as_str()) {
            host.touch(mirror.slot);
        } else {
            host.update(mirror.slot, &value, mirror.category.icon());
            mirror.mirrored_value = Some(value);
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use chrono::NaiveDate;
    use url::Url;

    use super::*;

    #[derive(Default)]
    struct FakeHost {
        next_idx: u32,
        created: Vec<MirrorSpec>,
        updates: Vec<(Slot, String, &'static str)>,
        touches: Vec<Slot>,
    }

    impl MirrorHost for FakeHost {
        fn create(&mut self, spec: &MirrorSpec) -> DeviceIdx {
            self.created.push(spec.clone());
            self.next_idx += 1;
            DeviceIdx(self.next_idx)
        }

        fn update(&mut self, slot: Slot, value: &str, icon: &'static str) {
            self.updates.push((slot, value.to_owned(), icon));
        }

        fn touch(&mut self, slot: Slot) {
            self.touches.push(slot);
        }
    }

    fn settings() -> Settings {
        Settings::new(Url::parse("http://127.0.0.1:8080").unwrap())
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn observation(key: &str, name: &str, level: f64, last_update: NaiveDateTime) -> Observation {
        Observation {
            key: HardwareKey::from(key),
            brand: "Zigbee".into(),
            name: name.into(),
            battery_level: level,
            last_update,
            kind: 15,
        }
    }

    #[test]
    fn creates_mirrors_on_the_lowest_free_slots() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door", 80.0, at(10, 0)));
        registry.observe(observation("bb02", "Window", 70.0, at(10, 0)));

        let created = registry.reconcile(at(10, 0), &mut host);

        assert_eq!(created.len(), 2);
        assert_eq!(host.created.len(), 2);
        assert_eq!(host.created[0].slot, Slot(1));
        assert_eq!(host.created[0].name, "Zigbee: Door");
        assert!(host.created[0].active);
        assert_eq!(host.created[1].slot, Slot(2));
    }

    #[test]
    fn freed_slots_are_reallocated_lowest_first() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door", 80.0, at(10, 0)));
        registry.observe(observation("bb02", "Window", 70.0, at(10, 0)));
        registry.reconcile(at(10, 0), &mut host);

        registry.remove(Slot(1)).unwrap();
        registry.observe(observation("cc03", "Motion", 60.0, at(10, 5)));
        registry.reconcile(at(10, 5), &mut host);

        let latest = host.created.last().unwrap();
        assert_eq!(latest.slot, Slot(1));
        assert_eq!(latest.name, "Zigbee: Motion");
    }

    #[test]
    fn pool_exhaustion_skips_the_device_and_continues() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        for i in 0..255 {
            registry.observe(observation(
                &format!("k{i:03}"),
                &format!("Sensor {i:03}"),
                50.0,
                at(10, 0),
            ));
        }

        let created = registry.reconcile(at(10, 0), &mut host);

        assert_eq!(created.len(), 254);
        assert_eq!(registry.status().len(), 254);

        // Freeing one slot lets the skipped device in next cycle.
        registry.remove(Slot(17)).unwrap();
        let created = registry.reconcile(at(10, 5), &mut host);
        assert_eq!(created.len(), 1);
        assert_eq!(host.created.last().unwrap().slot, Slot(17));
    }

    #[test]
    fn unchanged_value_touches_instead_of_updating() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door", 80.0, at(10, 0)));
        registry.reconcile(at(10, 0), &mut host);
        assert_eq!(host.updates, vec![(Slot(1), "80.0".to_owned(), "battwatch")]);

        registry.observe(observation("aa01", "Door", 80.0, at(10, 5)));
        registry.reconcile(at(10, 5), &mut host);

        assert_eq!(host.updates.len(), 1);
        assert_eq!(host.touches, vec![Slot(1)]);
    }

    #[test]
    fn smoothed_value_never_rises_on_flapping_input() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door", 60.0, at(10, 0)));
        registry.reconcile(at(10, 0), &mut host);
        registry.observe(observation("aa01", "Door", 90.0, at(10, 5)));
        registry.reconcile(at(10, 5), &mut host);

        let status = registry.status();
        assert_eq!(status[0].level, 60.0);
        assert_eq!(status[0].raw_level, 90.0);
    }

    #[test]
    fn stale_mirror_is_forced_dead() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door", 45.0, at(10, 0)));
        registry.reconcile(at(10, 0), &mut host);

        // 40 minutes with no fresh observation.
        registry.reconcile(at(10, 40), &mut host);

        let status = registry.status();
        assert_eq!(status[0].level, 0.0);
        assert_eq!(status[0].category, PresentationCategory::Dead);
        let (_, value, icon) = host.updates.last().unwrap();
        assert_eq!(value, "0.0");
        assert_eq!(*icon, "battwatch_ko");
    }

    #[test]
    fn rarely_reporting_family_is_exempt_from_staleness() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        let mut obs = observation("aa01", "Meter", 45.0, at(10, 0));
        obs.kind = RARELY_REPORTING_FAMILY;
        registry.observe(obs);
        registry.reconcile(at(10, 0), &mut host);

        registry.reconcile(at(10, 40), &mut host);

        assert_eq!(registry.status()[0].level, 45.0);
    }

    #[test]
    fn seeded_mirror_without_hardware_goes_down() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.seed(
            vec![MirrorSeed {
                slot: Slot(9),
                device_idx: DeviceIdx(42),
                hardware_key: HardwareKey::from("gone"),
                name: "Zigbee: Lost sensor".into(),
                value: "77.0".into(),
                last_update: None,
            }],
            at(10, 0),
        );

        registry.reconcile(at(10, 0), &mut host);

        let status = registry.status();
        assert_eq!(status[0].slot, Slot(9));
        assert_eq!(status[0].level, 0.0);
        assert_eq!(status[0].category, PresentationCategory::Dead);
    }

    #[test]
    fn seeded_mirror_with_matching_value_is_touched() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.seed(
            vec![MirrorSeed {
                slot: Slot(3),
                device_idx: DeviceIdx(7),
                hardware_key: HardwareKey::from("aa01"),
                name: "Zigbee: Door".into(),
                value: "60.0".into(),
                last_update: Some(at(9, 58)),
            }],
            at(10, 0),
        );
        registry.observe(observation("aa01", "Door", 60.0, at(10, 0)));

        registry.reconcile(at(10, 0), &mut host);

        assert!(host.created.is_empty());
        assert!(host.updates.is_empty());
        assert_eq!(host.touches, vec![Slot(3)]);
    }

    #[test]
    fn repeated_keys_merge_their_names() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Door sensor kitchen", 80.0, at(10, 0)));
        registry.observe(observation("aa01", "kitchen Door", 78.0, at(10, 1)));
        registry.reconcile(at(10, 1), &mut host);

        let record = registry.record(&HardwareKey::from("aa01")).unwrap();
        assert_eq!(record.name, "Zigbee: Door kitchen");
        assert_eq!(record.level, 78.0);
        assert_eq!(record.last_seen, at(10, 1));
        assert_eq!(registry.status()[0].name, "Zigbee: Door kitchen");
    }

    #[test]
    fn record_last_seen_never_runs_backwards() {
        let mut registry = MirrorRegistry::new(settings());
        registry.observe(observation("aa01", "Door", 80.0, at(10, 5)));
        registry.observe(observation("aa01", "Door", 80.0, at(10, 1)));

        let record = registry.record(&HardwareKey::from("aa01")).unwrap();
        assert_eq!(record.last_seen, at(10, 5));
    }

    #[test]
    fn ordered_entries_sort_by_level_then_name() {
        let mut registry = MirrorRegistry::new(settings());
        let mut host = FakeHost::default();
        registry.observe(observation("aa01", "Bravo", 50.0, at(10, 0)));
        registry.observe(observation("bb02", "Alpha", 50.0, at(10, 0)));
        registry.observe(observation("cc03", "Charlie", 30.0, at(10, 0)));
        registry.reconcile(at(10, 0), &mut host);

        let ascending = registry.ordered_entries(SortDirection::Ascending);
        let names: Vec<&str> = ascending.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Zigbee: Charlie", "Zigbee: Alpha", "Zigbee: Bravo"]
        );

        let descending = registry.ordered_entries(SortDirection::Descending);
        let names: Vec<&str> = descending.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Zigbee: Bravo", "Zigbee: Alpha", "Zigbee: Charlie"]
        );
    }

    #[test]
    fn removing_an_unknown_slot_is_an_error() {
        let mut registry = MirrorRegistry::new(settings());
        let result = registry.remove(Slot(200));
        assert!(matches!(
            result,
            Err(CoreError::UnknownSlot { slot: Slot(200) })
        ));
    }
}
