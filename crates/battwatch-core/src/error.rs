// ── Core errors ──
//
// Nothing in the engine loop is fatal. These exist so call sites can
// say precisely what went wrong before the condition is absorbed into
// a log line.

use thiserror::Error;

use crate::model::Slot;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Controller API failure, bubbled up from the client.
    #[error(transparent)]
    Api(#[from] battwatch_api::Error),

    /// Every unit slot between 1 and 254 is occupied.
    #[error("unit slot pool exhausted")]
    SlotPoolExhausted,

    /// A removal referenced a slot that carries no mirror.
    #[error("no mirror on unit slot {slot}")]
    UnknownSlot { slot: Slot },

    /// The plan id store failed to read or write.
    #[error("plan store: {message}")]
    PlanStore { message: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_slot() {
        let error = CoreError::UnknownSlot { slot: Slot(42) };
        assert_eq!(error.to_string(), "no mirror on unit slot 42");
    }
}
