// ── Engine ──
//
// The poll and dispatch loop. A ticker drains the outbound queue, one
// request per tick; each response is routed by its title to the mirror
// registry or the plan coordinator. Removal notices and cancellation
// interleave with the ticks through a biased select.

use std::time::Duration;

use battwatch_api::{
    ApiEnvelope, ApiRequest, DeviceEntry, DomoClient, PlanEntry, PlanMember, TransportConfig,
};
use chrono::{Local, NaiveDateTime};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::convert;
use crate::error::CoreError;
use crate::host::{MirrorHost, PlanStore};
use crate::model::Slot;
use crate::plan::{Cadence, PlanCoordinator, PlanEffect, PlanEvent, PlanSnapshot};
use crate::queue::RequestQueue;
use crate::registry::{MirrorRegistry, MirrorStatus};
use crate::settings::{Settings, SortDirection};

const NOTICE_CHANNEL_SIZE: usize = 16;

// Response titles the server uses as payload discriminators.
const TITLE_DEVICES: &str = "Devices";
const TITLE_ADD_NOTIFICATION: &str = "AddNotification";
const TITLE_PLANS: &str = "Plans";
const TITLE_PLAN_DEVICES: &str = "GetPlanDevices";
const TITLE_ADD_PLAN_DEVICE: &str = "AddPlanActiveDevice";
const TITLE_ADD_PLAN: &str = "AddPlan";

// ── Handle types ────────────────────────────────────────────────────

/// Out-of-band inputs for the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineNotice {
    /// The host dropped the mirrored device on this slot.
    DeviceRemoved { slot: Slot },
}

/// Observable engine state, published after every loop turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub mirrors: Vec<MirrorStatus>,
    pub plan: PlanSnapshot,
    pub queue_depth: usize,
    pub last_poll: Option<NaiveDateTime>,
}

/// Cheaply cloneable handle to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    notice_tx: mpsc::Sender<EngineNotice>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
    cancel: CancellationToken,
}

impl EngineHandle {
    /// Tell the engine a mirrored device was deleted host-side.
    pub async fn device_removed(&self, slot: Slot) {
        let notice = EngineNotice::DeviceRemoved { slot };
        if self.notice_tx.send(notice).await.is_err() {
            warn!(slot = %slot, "engine gone, removal notice dropped");
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Watch snapshots as they are published.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Ask the engine loop to stop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// The reconciliation engine. Built once, then consumed by
/// [`run`](Self::run).
pub struct Engine {
    client: DomoClient,
    settings: Settings,
    registry: MirrorRegistry,
    queue: RequestQueue,
    plan: PlanCoordinator,
    host: Box<dyn MirrorHost>,
    store: Box<dyn PlanStore>,
    cadence: Cadence,
    last_poll: Option<NaiveDateTime>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
    notice_rx: mpsc::Receiver<EngineNotice>,
    cancel: CancellationToken,
}

impl Engine {
    /// Build an engine and the handle for talking to it.
    ///
    /// Mirrors the host already holds are re-adopted, and a persisted
    /// plan id short-circuits the plan lookup.
    pub fn new(
        settings: Settings,
        host: Box<dyn MirrorHost>,
        store: Box<dyn PlanStore>,
    ) -> Result<(Self, EngineHandle), CoreError> {
        let transport = TransportConfig {
            timeout: settings.http_timeout,
        };
        let client = DomoClient::new(settings.server_url.clone(), &transport)?;

        let mut registry = MirrorRegistry::new(settings.clone());
        let seeds = host.snapshot();
        if !seeds.is_empty() {
            info!(count = seeds.len(), "re-adopting mirrors from the host");
            registry.seed(seeds, Local::now().naive_local());
        }

        let persisted = if settings.plan_enabled() {
            match store.load() {
                Ok(plan_id) => plan_id,
                Err(e) => {
                    warn!(error = %e, "plan store unreadable, resolving from scratch");
                    None
                }
            }
        } else {
            None
        };
        let sort_enabled = settings.plan_enabled() && settings.sort.is_some();
        let plan = PlanCoordinator::new(settings.plan_name.clone(), sort_enabled, persisted);

        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let (notice_tx, notice_rx) = mpsc::channel(NOTICE_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let handle = EngineHandle {
            notice_tx,
            snapshot_rx,
            cancel: cancel.clone(),
        };
        let engine = Self {
            client,
            settings,
            registry,
            queue: RequestQueue::new(),
            plan,
            host,
            store,
            cadence: Cadence::Normal,
            last_poll: None,
            snapshot_tx,
            notice_rx,
            cancel,
        };
        Ok((engine, handle))
    }

    /// Drive the loop until the handle cancels it.
    pub async fn run(mut self) {
        info!(server = %self.client.base_url(), "battery watch started");

        if self.settings.plan_enabled() {
            let effects = self.plan.step(PlanEvent::Started);
            self.apply_plan_effects(effects);
        }

        // Polls run on an absolute schedule so a slow round trip does
        // not push every later poll back.
        let mut next_poll = Instant::now();
        let mut ticker = interval(self.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("battery watch stopping");
                    break;
                }
                notice = self.notice_rx.recv() => {
                    let Some(notice) = notice else {
                        debug!("all engine handles dropped, stopping");
                        break;
                    };
                    self.on_notice(notice);
                }
                _ = ticker.tick() => {
                    if Instant::now() >= next_poll {
                        next_poll += self.settings.poll_interval;
                        self.on_poll_due();
                    }
                    self.on_tick().await;
                }
            }

            self.publish();
            if ticker.period() != self.tick_period() {
                ticker = interval(self.tick_period());
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
        }
    }

    // ── Loop steps ───────────────────────────────────────────────────

    fn on_poll_due(&mut self) {
        debug!("poll due");
        self.queue.push(ApiRequest::devices());
        self.last_poll = Some(Local::now().naive_local());
        if self.settings.plan_enabled() {
            let effects = self.plan.step(PlanEvent::PollDue);
            self.apply_plan_effects(effects);
        }
    }

    /// Dispatch at most one queued request.
    async fn on_tick(&mut self) {
        let Some(request) = self.queue.pop() else {
            return;
        };
        match self.client.execute(&request).await {
            Ok(envelope) => self.dispatch(&envelope),
            Err(e) => warn!(request = %request, error = %e, "request failed"),
        }
    }

    fn on_notice(&mut self, notice: EngineNotice) {
        match notice {
            EngineNotice::DeviceRemoved { slot } => {
                match self.registry.remove(slot) {
                    Ok(name) => info!(slot = %slot, name = %name, "mirror dropped on host request"),
                    Err(e) => error!(error = %e, "removal notice ignored"),
                }
                // Re-list soon: if the hardware still reports, the
                // mirror comes back on a fresh slot.
                self.queue.push(ApiRequest::devices());
            }
        }
    }

    // ── Response routing ─────────────────────────────────────────────

    fn dispatch(&mut self, envelope: &ApiEnvelope) {
        match envelope.title.as_str() {
            TITLE_DEVICES => self.on_devices(envelope),
            TITLE_ADD_NOTIFICATION => info!("low battery notification registered"),
            title if self.settings.plan_enabled() => self.dispatch_plan(title, envelope),
            title => debug!(title, "response ignored"),
        }
    }

    fn on_devices(&mut self, envelope: &ApiEnvelope) {
        let now = Local::now().naive_local();
        let entries: Vec<DeviceEntry> = envelope.decode_result();
        debug!(count = entries.len(), "device listing received");
        for entry in entries {
            if let Some(observation) = convert::observation_from_entry(&entry, now) {
                self.registry.observe(observation);
            }
        }

        let created = self.registry.reconcile(now, self.host.as_mut());
        if self.settings.notify_all {
            for mirror in created {
                self.queue.push(ApiRequest::add_notification(
                    mirror.device_idx.0,
                    &format!("{} battery empty!", mirror.name),
                    self.settings.empty_level,
                ));
            }
        }
    }

    fn dispatch_plan(&mut self, title: &str, envelope: &ApiEnvelope) {
        let effects = match title {
            TITLE_PLANS => {
                let plans: Vec<PlanEntry> = envelope.decode_result();
                self.plan.step(PlanEvent::PlansListed { plans })
            }
            TITLE_PLAN_DEVICES => {
                let members: Vec<PlanMember> = envelope.decode_result();
                let direction = self.settings.sort.unwrap_or(SortDirection::Ascending);
                let ordered = self.registry.ordered_entries(direction);
                self.plan.step(PlanEvent::MembersListed { members, ordered })
            }
            TITLE_ADD_PLAN_DEVICE => {
                info!("device attached to plan");
                return;
            }
            TITLE_ADD_PLAN => self.plan.step(PlanEvent::PlanCreated),
            _ => {
                debug!(title, "response ignored");
                return;
            }
        };
        self.apply_plan_effects(effects);
    }

    fn apply_plan_effects(&mut self, effects: Vec<PlanEffect>) {
        for effect in effects {
            match effect {
                PlanEffect::Enqueue(request) => self.queue.push(request),
                PlanEffect::PersistPlanId(plan_id) => {
                    if let Err(e) = self.store.save(plan_id) {
                        warn!(error = %e, plan_id, "plan id not persisted");
                    }
                }
                PlanEffect::SetCadence(cadence) => self.cadence = cadence,
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn tick_period(&self) -> Duration {
        match self.cadence {
            Cadence::Normal => self.settings.tick_normal,
            Cadence::Fast => self.settings.tick_fast,
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(EngineSnapshot {
            mirrors: self.registry.status(),
            plan: self.plan.snapshot(),
            queue_depth: self.queue.len(),
            last_poll: self.last_poll,
        });
    }
}
