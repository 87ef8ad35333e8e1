use crate::api::{PollMode, SharedSessionState};
use crate::client::BookingApi;
use crate::config::PollerConfig;
use crate::reconcile::marker::{OrderMarker, PageState};
use crate::reconcile::notifier::Notifier;
use crate::reconcile::outcome::{Notification, Outcome};
use crate::reconcile::status::{BookingStatus, VerificationStatus};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Active,
    /// Outcome claimed, cleanup and notification in progress
    Resolving,
    Resolved,
    Cancelled,
}

impl Phase {
    fn is_finished(self) -> bool {
        matches!(self, Phase::Resolved | Phase::Cancelled)
    }
}

/// Starts reconciliation sessions for bookings coming back from payment checkout
pub struct ReconciliationPoller {
    api: Arc<dyn BookingApi>,
    notifier: Arc<dyn Notifier>,
    page: Arc<dyn PageState>,
    config: PollerConfig,
    snapshot: Option<SharedSessionState>,
}

impl ReconciliationPoller {
    pub fn new(
        api: Arc<dyn BookingApi>,
        notifier: Arc<dyn Notifier>,
        page: Arc<dyn PageState>,
        config: PollerConfig,
    ) -> Self {
        ReconciliationPoller {
            api,
            notifier,
            page,
            config,
            snapshot: None,
        }
    }

    /// Mirror session progress into a shared snapshot
    pub fn with_snapshot(mut self, snapshot: SharedSessionState) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    /// Start a session for the marker currently held by the page
    pub fn start_from_page(&self) -> Option<PollHandle> {
        let marker = self.page.order_marker();
        self.start(marker.as_deref())
    }

    /// Start a session for `marker`.
    ///
    /// Returns `None` without touching the network when the marker is absent
    /// or malformed. Must be called from within a tokio runtime.
    pub fn start(&self, marker: Option<&str>) -> Option<PollHandle> {
        let Some(raw) = marker else {
            debug!("No order marker, reconciliation not started");
            return None;
        };
        let Some(marker) = OrderMarker::parse(raw) else {
            debug!(marker = %raw, "Malformed order marker, reconciliation not started");
            return None;
        };

        let (phase_tx, phase_rx) = watch::channel(Phase::Active);
        let session = Arc::new(PollSession {
            session_id: Uuid::new_v4(),
            booking_id: marker.booking_id(),
            escalate_after: self.config.escalate_after,
            attempts: AtomicU32::new(0),
            resolved: AtomicBool::new(false),
            phase: phase_tx,
            outcome: Mutex::new(None),
            api: Arc::clone(&self.api),
            notifier: Arc::clone(&self.notifier),
            page: Arc::clone(&self.page),
            snapshot: self.snapshot.clone(),
        });

        let span = info_span!(
            "reconcile",
            session_id = %session.session_id,
            booking_id = session.booking_id
        );

        info!(
            parent: &span,
            interval_ms = self.config.interval().as_millis() as u64,
            escalate_after = self.config.escalate_after,
            "Payment reconciliation started"
        );

        let driver = tokio::spawn(
            drive(
                Arc::clone(&session),
                self.config.interval(),
                self.config.max_session(),
            )
            .instrument(span),
        );

        Some(PollHandle {
            session,
            phase: phase_rx,
            driver,
        })
    }
}

/// Owns a running session. Dropping the handle tears the session down.
pub struct PollHandle {
    session: Arc<PollSession>,
    phase: watch::Receiver<Phase>,
    driver: JoinHandle<()>,
}

impl PollHandle {
    pub fn booking_id(&self) -> u64 {
        self.session.booking_id
    }

    pub fn session_id(&self) -> Uuid {
        self.session.session_id
    }

    /// Cycles started so far
    pub fn attempts(&self) -> u32 {
        self.session.attempts.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.phase.borrow().is_finished()
    }

    /// Wait until the session resolves or is cancelled. `None` means cancelled.
    pub async fn wait(&self) -> Option<Outcome> {
        let mut phase = self.phase.clone();
        // The sender lives in the session this handle keeps alive
        let _ = phase.wait_for(|p| p.is_finished()).await;
        self.session.outcome()
    }

    /// Stop the session without emitting any notification. No-op once resolved.
    pub fn cancel(&self) {
        if self.session.cancel() {
            self.driver.abort();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PollSession {
    session_id: Uuid,
    booking_id: u64,
    escalate_after: u32,
    attempts: AtomicU32,
    resolved: AtomicBool,
    phase: watch::Sender<Phase>,
    outcome: Mutex<Option<Outcome>>,
    api: Arc<dyn BookingApi>,
    notifier: Arc<dyn Notifier>,
    page: Arc<dyn PageState>,
    snapshot: Option<SharedSessionState>,
}

/// Timer loop: one cycle per tick, the first immediately. Cycles run as their
/// own tasks so a slow response never delays the next tick. The session is
/// torn down once the page no longer carries its marker.
async fn drive(session: Arc<PollSession>, interval: Duration, max_session: Option<Duration>) {
    if let Some(snapshot) = &session.snapshot {
        snapshot.write().await.begin(session.session_id, session.booking_id);
    }

    let mut phase = session.phase.subscribe();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let deadline = async move {
        match max_session {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            changed = phase.changed() => {
                if changed.is_err() || *phase.borrow() != Phase::Active {
                    break;
                }
            }
            _ = &mut deadline => {
                warn!("Reconciliation session hit its time limit");
                session
                    .resolve(Outcome::PollingError {
                        reason: "timed out waiting for a final booking status".to_string(),
                    })
                    .await;
                break;
            }
            _ = ticker.tick() => {
                if session.is_resolved() {
                    break;
                }
                if !session.marker_matches() {
                    session.cancel();
                    break;
                }
                while cycles.try_join_next().is_some() {}
                cycles.spawn(Arc::clone(&session).run_cycle().in_current_span());
            }
        }
    }

    if *session.phase.borrow() == Phase::Cancelled {
        cycles.abort_all();
    } else {
        // The cycle that resolved the session may still be notifying, and late
        // cycles only need to observe the resolved flag.
        cycles.detach_all();
    }
    debug!("Reconciliation timer stopped");
}

impl PollSession {
    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::SeqCst)
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether the page still carries the marker this session was started for
    fn marker_matches(&self) -> bool {
        self.page
            .order_marker()
            .as_deref()
            .and_then(OrderMarker::parse)
            .is_some_and(|marker| marker.booking_id() == self.booking_id)
    }

    async fn run_cycle(self: Arc<Self>) {
        if self.is_resolved() {
            return;
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let mode = if attempt > self.escalate_after {
            PollMode::Verifying
        } else {
            PollMode::Polling
        };

        if let Some(snapshot) = &self.snapshot {
            snapshot.write().await.record_attempt(attempt, mode);
        }

        let verdict = match mode {
            PollMode::Polling => self.check_booking(attempt).await,
            PollMode::Verifying => self.verify_payment(attempt).await,
        };

        if let Some(outcome) = verdict {
            self.resolve(outcome).await;
        }
    }

    async fn check_booking(&self, attempt: u32) -> Option<Outcome> {
        let detail = match self.api.get_booking(self.booking_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(attempt, error = %e, "Booking status check failed");
                return Some(Outcome::PollingError {
                    reason: e.to_string(),
                });
            }
        };

        if self.is_resolved() {
            debug!(attempt, "Late booking status ignored, session already settled");
            return None;
        }

        let Some(raw) = detail.status else {
            warn!(attempt, "Booking response has no status, retrying next cycle");
            return None;
        };

        match BookingStatus::parse(&raw) {
            Some(status) => {
                debug!(attempt, status = status.as_str(), "Booking status received");
                status.terminal_outcome()
            }
            None => {
                debug!(attempt, status = %raw, "Unrecognized booking status, still waiting");
                None
            }
        }
    }

    async fn verify_payment(&self, attempt: u32) -> Option<Outcome> {
        let result = match self.api.verify_payment(self.booking_id).await {
            Ok(result) => result,
            Err(e) => {
                warn!(attempt, error = %e, "Payment verification failed");
                return Some(Outcome::PollingError {
                    reason: e.to_string(),
                });
            }
        };

        if self.is_resolved() {
            debug!(attempt, "Late verification result ignored, session already settled");
            return None;
        }

        let status = VerificationStatus::parse(result.status.as_deref().unwrap_or_default());
        debug!(attempt, status = ?status, "Payment verification result");
        status.terminal_outcome()
    }

    /// Settle the session. Only the first caller wins, every later call is a no-op.
    async fn resolve(&self, outcome: Outcome) -> bool {
        if self.is_resolved() {
            debug!(outcome = outcome.as_str(), "Session already settled, outcome dropped");
            return false;
        }

        if !self.marker_matches() {
            debug!(outcome = outcome.as_str(), "Order marker left the page, tearing down");
            self.cancel();
            return false;
        }

        if self
            .resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(outcome = outcome.as_str(), "Session already settled, outcome dropped");
            return false;
        }

        // Stop the timer before anything observable happens
        self.phase.send_replace(Phase::Resolving);
        self.page.clear_order_marker();
        *self.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(outcome.clone());

        if let Some(snapshot) = &self.snapshot {
            snapshot.write().await.resolve(outcome.clone());
        }

        info!(
            outcome = outcome.as_str(),
            attempts = self.attempts.load(Ordering::SeqCst),
            "Payment reconciliation resolved"
        );

        let notification = Notification::for_outcome(self.booking_id, &outcome);
        self.notifier.notify(&notification).await;
        if notification.refresh_bookings {
            self.notifier.refresh_bookings().await;
        }

        self.phase.send_replace(Phase::Resolved);
        true
    }

    /// Returns false when the session had already settled
    fn cancel(&self) -> bool {
        if self
            .resolved
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.phase.send_replace(Phase::Cancelled);

        if let Some(snapshot) = &self.snapshot {
            // Teardown must not block, the snapshot catches up on its own task
            match snapshot.try_write() {
                Ok(mut snapshot) => snapshot.cancel(),
                Err(_) => {
                    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                        let snapshot = Arc::clone(snapshot);
                        runtime.spawn(async move {
                            snapshot.write().await.cancel();
                        });
                    } else {
                        warn!("No runtime to record the teardown in the session snapshot");
                    }
                }
            }
        }

        debug!(
            session_id = %self.session_id,
            booking_id = self.booking_id,
            "Reconciliation session torn down"
        );
        true
    }
}
