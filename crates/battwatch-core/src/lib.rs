// battwatch-core: battery level monitoring engine
//
// Polls a Domoticz-style home automation server, derives one stable
// hardware record per battery, and maintains a mirrored device per
// record through a pluggable host. Optionally keeps a server-side
// plan populated and sorted by battery level.

pub mod convert;
pub mod engine;
pub mod error;
pub mod filter;
pub mod host;
pub mod identity;
pub mod model;
pub mod plan;
pub mod queue;
pub mod registry;
pub mod settings;

pub use engine::{Engine, EngineHandle, EngineNotice, EngineSnapshot};
pub use error::CoreError;
pub use filter::{FilterMode, ValueFilter};
pub use host::{MemoryDevice, MemoryHost, MemoryPlanStore, MirrorHost, PlanStore};
pub use model::{
    DeviceIdx, HardwareKey, HardwareRecord, MirrorSeed, MirrorSpec, Observation, OrderedEntry,
    PresentationCategory, Slot,
};
pub use plan::{Cadence, PlanCoordinator, PlanEffect, PlanEvent, PlanSnapshot};
pub use queue::RequestQueue;
pub use registry::{MirrorRegistry, MirrorStatus, MirrorUpdate, MirroredDevice, NewMirror};
pub use settings::{DEFAULT_EMPTY_LEVEL, Settings, SortDirection};
