// ── Host integration seams ──
//
// The engine never talks to the outside world on its own: mirrored
// devices materialise through a MirrorHost, and the resolved plan id
// survives restarts through a PlanStore. Production wires in real
// implementations; tests substitute recording fakes.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::model::{DeviceIdx, HardwareKey, MirrorSeed, MirrorSpec, Slot};

/// Where mirrored battery devices live.
pub trait MirrorHost: Send {
    /// Register a new device and return the idx the host assigned.
    fn create(&mut self, spec: &MirrorSpec) -> DeviceIdx;

    /// Push a new value and icon to the device on `slot`.
    fn update(&mut self, slot: Slot, value: &str, icon: &'static str);

    /// Refresh the device's liveness without changing its value.
    fn touch(&mut self, slot: Slot);

    /// Devices the host already holds from a previous run.
    fn snapshot(&self) -> Vec<MirrorSeed> {
        Vec::new()
    }
}

/// Persistence for the resolved plan id.
pub trait PlanStore: Send {
    fn load(&self) -> Result<Option<u32>, CoreError>;
    fn save(&mut self, plan_id: u32) -> Result<(), CoreError>;
}

// ── In-process implementations ──────────────────────────────────────

/// One device row held by [`MemoryHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryDevice {
    pub device_idx: DeviceIdx,
    pub hardware_key: HardwareKey,
    pub name: String,
    pub value: String,
    pub icon: &'static str,
    pub active: bool,
}

/// Mirror host backed by an in-process table.
///
/// `battwatch run` uses this when no external device registry is wired
/// in; the rows stay observable through the engine snapshot.
#[derive(Debug, Default)]
pub struct MemoryHost {
    next_idx: u32,
    rows: BTreeMap<Slot, MemoryDevice>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &BTreeMap<Slot, MemoryDevice> {
        &self.rows
    }
}

impl MirrorHost for MemoryHost {
    fn create(&mut self, spec: &MirrorSpec) -> DeviceIdx {
        self.next_idx += 1;
        let device_idx = DeviceIdx(self.next_idx);
        self.rows.insert(
            spec.slot,
            MemoryDevice {
                device_idx,
                hardware_key: spec.hardware_key.clone(),
                name: spec.name.clone(),
                value: String::new(),
                icon: "battwatch",
                active: spec.active,
            },
        );
        device_idx
    }

    fn update(&mut self, slot: Slot, value: &str, icon: &'static str) {
        if let Some(row) = self.rows.get_mut(&slot) {
            value.clone_into(&mut row.value);
            row.icon = icon;
        }
    }

    fn touch(&mut self, _slot: Slot) {}

    fn snapshot(&self) -> Vec<MirrorSeed> {
        self.rows
            .iter()
            .map(|(slot, row)| MirrorSeed {
                slot: *slot,
                device_idx: row.device_idx,
                hardware_key: row.hardware_key.clone(),
                name: row.name.clone(),
                value: row.value.clone(),
                last_update: None,
            })
            .collect()
    }
}

/// Plan store that forgets everything on restart.
#[derive(Debug, Default)]
pub struct MemoryPlanStore {
    plan_id: Option<u32>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preset(plan_id: u32) -> Self {
        Self {
            plan_id: Some(plan_id),
        }
    }
}

impl PlanStore for MemoryPlanStore {
    fn load(&self) -> Result<Option<u32>, CoreError> {
        Ok(self.plan_id)
    }

    fn save(&mut self, plan_id: u32) -> Result<(), CoreError> {
        self.plan_id = Some(plan_id);
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
