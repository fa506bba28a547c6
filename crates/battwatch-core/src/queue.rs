// ── Outbound request queue ──
//
// Strict FIFO with single-flight discipline: the engine dequeues one
// request per tick and never has more than one in flight. No
// priorities, no de-duplication -- the plan coordinator's state
// machine is what keeps callers from double-enqueueing.

use std::collections::VecDeque;

use battwatch_api::ApiRequest;
use tracing::debug;

/// FIFO of outbound API calls.
#[derive(Debug, Default)]
pub struct RequestQueue {
    items: VecDeque<ApiRequest>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request; insertion order is dispatch order.
    pub fn push(&mut self, request: ApiRequest) {
        debug!(request = %request, depth = self.items.len() + 1, "request queued");
        self.items.push_back(request);
    }

    /// Take the oldest queued request, if any.
    pub fn pop(&mut self) -> Option<ApiRequest> {
        let request = self.items.pop_front();
        if let Some(ref request) = request {
            debug!(request = %request, depth = self.items.len(), "request dispatched");
        }
        request
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
