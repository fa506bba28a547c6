// ── Plan coordinator ──
//
// Keeps one server-side plan in step with the mirrored devices: the
// plan is looked up by name (created if absent), every mirror is
// attached to it, and when sorting is enabled the member rows are
// reordered by battery level, one move per round trip.
//
// The coordinator is a pure state machine. It consumes events and
// emits effects; the engine owns the queue, the store and the clock.

use std::collections::HashSet;

use battwatch_api::{ApiRequest, MoveWay, PlanEntry, PlanMember};
use tracing::{debug, info, warn};

use crate::model::OrderedEntry;

// ── States, events, effects ─────────────────────────────────────────

/// Where we stand on knowing the plan's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanPhase {
    /// Nothing known yet; waiting for the engine to start us.
    Unresolved,
    /// A plan listing is in flight. `created` is set once we have
    /// asked the server to create the plan, so we only ever ask once.
    ListingPlans { created: bool },
    /// The plan id is known.
    Resolved { plan_id: u32 },
}

/// What the membership side of the coordinator is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Idle,
    /// A member listing is in flight.
    AwaitingMembers,
    /// Reordering members; the goal order is frozen until convergence.
    Sorting,
}

/// Engine tick cadence requested by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Normal,
    /// Used while a reorder pass is running, one move per round trip.
    Fast,
}

/// Inputs the engine feeds into the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanEvent {
    /// The engine loop is up.
    Started,
    /// A poll interval elapsed.
    PollDue,
    /// A plan listing response arrived.
    PlansListed { plans: Vec<PlanEntry> },
    /// The server acknowledged the plan creation command.
    PlanCreated,
    /// A member listing arrived, paired with the goal order computed
    /// from the registry at that moment.
    MembersListed {
        members: Vec<PlanMember>,
        ordered: Vec<OrderedEntry>,
    },
}

/// Outputs for the engine to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanEffect {
    Enqueue(ApiRequest),
    PersistPlanId(u32),
    SetCadence(Cadence),
}

/// Point-in-time view for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSnapshot {
    pub plan_id: Option<u32>,
    pub sorting: bool,
}

// ── Coordinator ─────────────────────────────────────────────────────

pub struct PlanCoordinator {
    phase: PlanPhase,
    sync: SyncState,
    plan_name: String,
    sort_enabled: bool,
    /// Goal order adopted when a reorder pass starts.
    desired: Vec<OrderedEntry>,
}

impl PlanCoordinator {
    pub fn new(plan_name: String, sort_enabled: bool, persisted: Option<u32>) -> Self {
        let phase = match persisted {
            Some(plan_id) => {
                info!(plan_id, plan = %plan_name, "plan id restored");
                PlanPhase::Resolved { plan_id }
            }
            None => PlanPhase::Unresolved,
        };
        Self {
            phase,
            sync: SyncState::Idle,
            plan_name,
            sort_enabled,
            desired: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        PlanSnapshot {
            plan_id: match self.phase {
                PlanPhase::Resolved { plan_id } => Some(plan_id),
                _ => None,
            },
            sorting: self.sync == SyncState::Sorting,
        }
    }

    /// Advance the state machine by one event.
    pub fn step(&mut self, event: PlanEvent) -> Vec<PlanEffect> {
        let phase = self.phase;
        match (phase, event) {
            (PlanPhase::Unresolved, PlanEvent::Started) => {
                self.phase = PlanPhase::ListingPlans { created: false };
                vec![PlanEffect::Enqueue(ApiRequest::plans())]
            }
            (PlanPhase::Resolved { plan_id }, PlanEvent::Started) => {
                self.sync = SyncState::AwaitingMembers;
                vec![PlanEffect::Enqueue(ApiRequest::plan_devices(plan_id))]
            }
            (PlanPhase::Resolved { plan_id }, PlanEvent::PollDue)
                if self.sync == SyncState::Idle =>
            {
                self.sync = SyncState::AwaitingMembers;
                vec![PlanEffect::Enqueue(ApiRequest::plan_devices(plan_id))]
            }
            (PlanPhase::ListingPlans { created }, PlanEvent::PlansListed { plans }) => {
                self.on_plans_listed(created, &plans)
            }
            (PlanPhase::ListingPlans { created: true }, PlanEvent::PlanCreated) => {
                info!(plan = %self.plan_name, "plan created, listing again");
                vec![PlanEffect::Enqueue(ApiRequest::plans())]
            }
            (PlanPhase::Resolved { plan_id }, PlanEvent::MembersListed { members, ordered }) => {
                self.on_members_listed(plan_id, &members, ordered)
            }
            (phase, event) => {
                debug!(?phase, ?event, "plan event ignored");
                Vec::new()
            }
        }
    }

    fn on_plans_listed(&mut self, created: bool, plans: &[PlanEntry]) -> Vec<PlanEffect> {
        match Self::find_plan(&self.plan_name, plans) {
            Some(plan_id) => {
                self.phase = PlanPhase::Resolved { plan_id };
                self.sync = SyncState::AwaitingMembers;
                info!(plan_id, plan = %self.plan_name, "plan id acquired");
                vec![
                    PlanEffect::PersistPlanId(plan_id),
                    PlanEffect::Enqueue(ApiRequest::plan_devices(plan_id)),
                ]
            }
            None if !created => {
                self.phase = PlanPhase::ListingPlans { created: true };
                info!(plan = %self.plan_name, "plan not found, creating it");
                vec![PlanEffect::Enqueue(ApiRequest::add_plan(&self.plan_name))]
            }
            None => {
                warn!(plan = %self.plan_name, "plan creation did not take effect");
                Vec::new()
            }
        }
    }

    fn on_members_listed(
        &mut self,
        plan_id: u32,
        members: &[PlanMember],
        ordered: Vec<OrderedEntry>,
    ) -> Vec<PlanEffect> {
        let mut effects = Vec::new();

        // Membership is rebuilt from scratch every listing; carrying a
        // set across polls would hide server-side removals.
        let membership: HashSet<u32> = members
            .iter()
            .filter_map(|member| match member.devidx.parse::<u32>() {
                Ok(devidx) => Some(devidx),
                Err(_) => {
                    warn!(devidx = %member.devidx, name = %member.name, "unparseable plan member");
                    None
                }
            })
            .collect();

        let missing: Vec<&OrderedEntry> = ordered
            .iter()
            .filter(|entry| !membership.contains(&entry.device_idx.0))
            .collect();
        if !missing.is_empty() {
            for entry in missing {
                info!(device_idx = %entry.device_idx, name = %entry.name, "attaching device to plan");
                effects.push(PlanEffect::Enqueue(ApiRequest::add_plan_device(
                    entry.device_idx.0,
                    plan_id,
                )));
            }
            // Re-list so the next round sees the complete membership;
            // sorting waits until then.
            effects.push(PlanEffect::Enqueue(ApiRequest::plan_devices(plan_id)));
            self.sync = SyncState::AwaitingMembers;
            return effects;
        }

        if !self.sort_enabled {
            self.sync = SyncState::Idle;
            return effects;
        }

        if self.sync != SyncState::Sorting {
            // Freeze the goal order for the whole pass; levels keep
            // moving underneath while we reorder.
            self.desired = ordered;
        }

        match Self::first_mismatch(&self.desired, members) {
            Some((member_idx, way)) => {
                if self.sync != SyncState::Sorting {
                    self.sync = SyncState::Sorting;
                    info!(plan_id, "plan reorder started");
                    effects.push(PlanEffect::SetCadence(Cadence::Fast));
                }
                effects.push(PlanEffect::Enqueue(ApiRequest::move_plan_device(
                    member_idx, plan_id, way,
                )));
                effects.push(PlanEffect::Enqueue(ApiRequest::plan_devices(plan_id)));
            }
            None => {
                if self.sync == SyncState::Sorting {
                    info!(plan_id, "plan reorder finished");
                    effects.push(PlanEffect::SetCadence(Cadence::Normal));
                }
                self.sync = SyncState::Idle;
            }
        }
        effects
    }

    fn find_plan(name: &str, plans: &[PlanEntry]) -> Option<u32> {
        let entry = plans.iter().find(|plan| plan.name == name)?;
        match entry.idx.parse::<u32>() {
            Ok(plan_id) => Some(plan_id),
            Err(_) => {
                warn!(idx = %entry.idx, "unparseable plan idx");
                None
            }
        }
    }

    /// First member row out of place, as (row id, direction).
    ///
    /// One move per call: the server renumbers rows on every reorder,
    /// so anything beyond the first mismatch would address stale rows.
    fn first_mismatch(desired: &[OrderedEntry], members: &[PlanMember]) -> Option<(u32, MoveWay)> {
        for (want_pos, want) in desired.iter().enumerate() {
            let found = members.iter().enumerate().find(|(_, have)| {
                have.devidx
                    .parse::<u32>()
                    .is_ok_and(|devidx| devidx == want.device_idx.0)
            });
            let Some((have_pos, have)) = found else {
                continue;
            };
            if have_pos == want_pos {
                continue;
            }
            let way = if want_pos > have_pos {
                MoveWay::Down
            } else {
                MoveWay::Up
            };
            match have.idx.parse::<u32>() {
                Ok(member_idx) => return Some((member_idx, way)),
                Err(_) => {
                    warn!(idx = %have.idx, "unparseable plan row idx");
                    return None;
                }
            }
        }
        None
    }
}

// ── Tests ───────────────────────────────────────────────────────────
