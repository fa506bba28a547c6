// ── Domain model ──
//
// Canonical types the engine operates on. Wire entries from
// battwatch-api are converted into these once, at the poll boundary
// (see crate::convert); everything downstream is wire-format free.

pub mod category;
pub mod device;
pub mod ids;

// ── Re-exports ──────────────────────────────────────────────────────

pub use category::PresentationCategory;
pub use device::{HardwareRecord, MirrorSeed, MirrorSpec, Observation, OrderedEntry};
pub use ids::{DeviceIdx, HardwareKey, Slot};
