use crate::intercept::error::InterceptError;
use crate::intercept::subscription::InterceptSubscription;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use htlcgate_service_api::intercept::{
    HtlcDecision, HtlcOutcome, HtlcResolver, InterceptedHtlc, SubscriptionId, SubscriptionScope,
};
use htlcgate_service_api::node::{CircuitKey, NodeHtlcAction, NodeHtlcResolution, RawHtlc};
use htlcgate_service_api::payment::PaymentHash;
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HtlcRegistryConfig {
    /// How long an HTLC may wait for a decision before it is expired.
    ///
    /// Wall clock only: the HTLC's `expiry` height is not consulted, so this
    /// must stay well below the time the node's CLTV margin leaves before the
    /// incoming HTLC has to be resolved on chain.
    pub hold_timeout: Duration,
    pub sweep_interval: Duration,
    pub subscription_buffer: usize,
    /// How long terminal payment hashes are remembered.
    pub resolved_retention: Duration,
}

impl Default for HtlcRegistryConfig {
    fn default() -> Self {
        Self {
            hold_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            subscription_buffer: 64,
            resolved_retention: Duration::from_secs(600),
        }
    }
}

/// One interception connection to the node, as seen by the registry.
#[derive(Clone, Debug)]
pub struct NodeConnection {
    id: u64,
    resolutions: mpsc::UnboundedSender<NodeHtlcResolution>,
}

impl NodeConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    fn send(&self, circuit: CircuitKey, action: NodeHtlcAction) {
        if self
            .resolutions
            .send(NodeHtlcResolution { circuit, action })
            .is_err()
        {
            debug!(
                "node connection {} gone, dropping resolution for {circuit:?}",
                self.id
            );
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HtlcArrival {
    Intercepted(SubscriptionId),
    Failed(ArrivalFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrivalFailure {
    MalformedPaymentHash,
    DuplicatePaymentHash,
    NoSubscription,
    SubscriberUnavailable,
    RegistryUnavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HtlcState {
    Pending,
    Terminal(HtlcOutcome),
}

struct PendingHtlc {
    htlc: InterceptedHtlc,
    circuit: CircuitKey,
    connection: NodeConnection,
    deadline: Instant,
    state: HtlcState,
}

struct ResolvedHtlc {
    outcome: HtlcOutcome,
    at: Instant,
}

pub(crate) struct SubscriptionSlot {
    id: SubscriptionId,
    scope: SubscriptionScope,
    tx: mpsc::Sender<InterceptedHtlc>,
    termination: Arc<OnceLock<InterceptError>>,
}

struct RegistryInner {
    config: HtlcRegistryConfig,
    next_subscription_id: AtomicU64,
    next_connection_id: AtomicU64,
    subscriptions: RwLock<Vec<SubscriptionSlot>>,
    pending: DashMap<PaymentHash, PendingHtlc>,
    resolved: DashMap<PaymentHash, ResolvedHtlc>,
}

/// Tracks every intercepted HTLC from arrival to its single terminal decision.
///
/// HTLCs are keyed by payment hash. Each one is routed to exactly one
/// subscription: the first registered subscription scoped to its channel,
/// else the first unscoped subscription, else it is failed on the spot.
/// Decisions for one payment hash are serialized on its map entry; decisions
/// for different hashes do not contend.
#[derive(Clone)]
pub struct HtlcInterceptRegistry {
    inner: Arc<RegistryInner>,
}

impl HtlcInterceptRegistry {
    pub fn new(config: HtlcRegistryConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                next_subscription_id: AtomicU64::new(1),
                next_connection_id: AtomicU64::new(1),
                subscriptions: RwLock::new(Vec::new()),
                pending: DashMap::new(),
                resolved: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> &HtlcRegistryConfig {
        &self.inner.config
    }

    pub fn subscribe(
        &self,
        scope: SubscriptionScope,
    ) -> Result<InterceptSubscription, InterceptError> {
        let id = SubscriptionId(
            self.inner
                .next_subscription_id
                .fetch_add(1, Ordering::Relaxed),
        );
        let (tx, rx) = mpsc::channel(self.inner.config.subscription_buffer.max(1));
        let termination = Arc::new(OnceLock::new());

        let mut subscriptions = self.inner.subscriptions.write().map_err(|e| {
            InterceptError::from_memory_error(
                e.to_string(),
                format!("registering subscription for {scope}"),
            )
        })?;
        subscriptions.push(SubscriptionSlot {
            id,
            scope,
            tx,
            termination: termination.clone(),
        });
        drop(subscriptions);

        info!("subscription {id} opened for {scope}");

        Ok(InterceptSubscription::new(
            id,
            scope,
            rx,
            termination,
            self.clone(),
        ))
    }

    /// Registers a fresh node interception connection.
    pub fn connect(&self, resolutions: mpsc::UnboundedSender<NodeHtlcResolution>) -> NodeConnection {
        NodeConnection {
            id: self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed),
            resolutions,
        }
    }

    pub fn on_htlc_arrived(&self, connection: &NodeConnection, raw: RawHtlc) -> HtlcArrival {
        let circuit = raw.incoming_circuit;

        let payment_hash = match PaymentHash::from_slice(&raw.payment_hash) {
            Ok(payment_hash) => payment_hash,
            Err(e) => {
                warn!("failing htlc {circuit:?}: malformed payment hash: {e}");
                connection.send(circuit, NodeHtlcAction::Fail);
                return HtlcArrival::Failed(ArrivalFailure::MalformedPaymentHash);
            }
        };

        debug!(
            "htlc {payment_hash} arrived on {circuit:?} for channel {}, {} msat",
            raw.short_channel_id, raw.outgoing_amount_msat
        );

        // held across insert so a closing subscription cannot miss this htlc
        let subscriptions = match self.inner.subscriptions.read() {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                error!("failing htlc {payment_hash}: subscriptions unavailable: {e}");
                connection.send(circuit, NodeHtlcAction::Fail);
                return HtlcArrival::Failed(ArrivalFailure::RegistryUnavailable);
            }
        };

        let slot = match route(&subscriptions, raw.short_channel_id) {
            Some(slot) => slot,
            None => {
                warn!(
                    "failing htlc {payment_hash}: no subscription for channel {}",
                    raw.short_channel_id
                );
                self.fail_unrouted(connection, circuit, payment_hash);
                return HtlcArrival::Failed(ArrivalFailure::NoSubscription);
            }
        };

        match self.inner.pending.entry(payment_hash) {
            Entry::Occupied(_) => {
                warn!("failing htlc {payment_hash} on {circuit:?}: payment hash already pending");
                connection.send(circuit, NodeHtlcAction::Fail);
                HtlcArrival::Failed(ArrivalFailure::DuplicatePaymentHash)
            }
            Entry::Vacant(vacant) => {
                let htlc = InterceptedHtlc {
                    payment_hash,
                    amount_msat: raw.outgoing_amount_msat,
                    short_channel_id: raw.short_channel_id,
                    expiry: u64::from(raw.incoming_expiry),
                    subscription_id: slot.id,
                    incoming_chan_id: circuit.chan_id,
                    htlc_id: circuit.htlc_id,
                };

                if let Err(e) = slot.tx.try_send(htlc.clone()) {
                    drop(vacant);
                    warn!(
                        "failing htlc {payment_hash}: subscription {} cannot take it: {e}",
                        slot.id
                    );
                    self.fail_unrouted(connection, circuit, payment_hash);
                    return HtlcArrival::Failed(ArrivalFailure::SubscriberUnavailable);
                }

                vacant.insert(PendingHtlc {
                    htlc,
                    circuit,
                    connection: connection.clone(),
                    deadline: Instant::now() + self.inner.config.hold_timeout,
                    state: HtlcState::Pending,
                });
                self.inner.resolved.remove(&payment_hash);

                debug!("htlc {payment_hash} routed to subscription {}", slot.id);
                HtlcArrival::Intercepted(slot.id)
            }
        }
    }

    pub fn resolve(
        &self,
        payment_hash: &PaymentHash,
        decision: HtlcDecision,
    ) -> Result<HtlcOutcome, InterceptError> {
        let (outcome, action) = match &decision {
            HtlcDecision::Settle { preimage } => {
                (HtlcOutcome::Settled, NodeHtlcAction::Settle(*preimage))
            }
            HtlcDecision::Fail { reason } => {
                debug!("failing htlc {payment_hash}: {reason}");
                (HtlcOutcome::Failed, NodeHtlcAction::Fail)
            }
        };

        let outcome = self.terminate(payment_hash, outcome, action)?;
        info!("htlc {payment_hash} {outcome}");
        Ok(outcome)
    }

    /// Expires every pending HTLC past its hold deadline and forgets terminal
    /// hashes past their retention.
    pub fn expire_overdue(&self) -> Vec<PaymentHash> {
        let now = Instant::now();
        let overdue: Vec<PaymentHash> = self
            .inner
            .pending
            .iter()
            .filter(|e| e.state == HtlcState::Pending && e.deadline <= now)
            .map(|e| *e.key())
            .collect();

        let expired: Vec<PaymentHash> = overdue
            .into_iter()
            .filter(|payment_hash| {
                self.terminate(payment_hash, HtlcOutcome::Expired, NodeHtlcAction::Fail)
                    .is_ok()
            })
            .collect();

        for payment_hash in &expired {
            warn!("htlc {payment_hash} expired without a decision");
        }

        let retention = self.inner.config.resolved_retention;
        self.inner
            .resolved
            .retain(|_, resolved| now.saturating_duration_since(resolved.at) < retention);

        expired
    }

    /// Runs the expiry sweep until shutdown, then fails everything still held.
    pub async fn start(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.inner.config.sweep_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.expire_overdue();
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown();
    }

    /// Closes every subscription and fails every pending HTLC.
    pub fn shutdown(&self) {
        let closed = self.close_subscriptions(|id| {
            InterceptError::subscription_closed(id, "shutting down htlc registry")
        });
        let failed = self.fail_pending(|_| true);
        info!(
            "htlc registry shut down: closed {} subscriptions, failed {failed} pending htlcs",
            closed.len()
        );
    }

    /// Fails the HTLCs of a subscription whose consumer went away.
    pub fn unsubscribe(&self, id: SubscriptionId) -> usize {
        {
            let mut subscriptions = self
                .inner
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscriptions.retain(|slot| slot.id != id);
        }

        let failed = self.fail_pending(|p| p.htlc.subscription_id == id);
        info!("subscription {id} closed, failed {failed} pending htlcs");
        failed
    }

    /// The node interception stream ended: fail its HTLCs and make every
    /// subscriber resubscribe.
    pub fn on_connection_lost(&self, connection: &NodeConnection) -> usize {
        let closed = self.close_subscriptions(|id| {
            InterceptError::connection_lost(format!("streaming htlcs to subscription {id}"))
        });
        let failed = self.fail_pending(|p| {
            p.connection.id == connection.id || closed.contains(&p.htlc.subscription_id)
        });
        warn!(
            "node connection {} lost: closed {} subscriptions, failed {failed} pending htlcs",
            connection.id,
            closed.len()
        );
        failed
    }

    pub fn is_pending(&self, payment_hash: &PaymentHash) -> bool {
        self.inner
            .pending
            .get(payment_hash)
            .map(|p| p.state == HtlcState::Pending)
            .unwrap_or(false)
    }

    pub fn get(&self, payment_hash: &PaymentHash) -> Option<InterceptedHtlc> {
        self.inner
            .pending
            .get(payment_hash)
            .filter(|p| p.state == HtlcState::Pending)
            .map(|p| p.htlc.clone())
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner
            .subscriptions
            .read()
            .map(|s| s.len())
            .unwrap_or_default()
    }

    fn terminate(
        &self,
        payment_hash: &PaymentHash,
        outcome: HtlcOutcome,
        action: NodeHtlcAction,
    ) -> Result<HtlcOutcome, InterceptError> {
        let context = || format!("recording {outcome} for htlc {payment_hash}");

        let (circuit, connection) = {
            let mut entry = match self.inner.pending.get_mut(payment_hash) {
                Some(entry) => entry,
                None => {
                    return Err(match self.inner.resolved.get(payment_hash) {
                        Some(resolved) => {
                            warn!("htlc {payment_hash} already {}", resolved.outcome);
                            InterceptError::already_resolved(
                                *payment_hash,
                                resolved.outcome,
                                context(),
                            )
                        }
                        None => InterceptError::unknown_htlc(*payment_hash, context()),
                    })
                }
            };

            if let HtlcState::Terminal(previous) = entry.state {
                warn!("htlc {payment_hash} already {previous}");
                return Err(InterceptError::already_resolved(
                    *payment_hash,
                    previous,
                    context(),
                ));
            }

            if let NodeHtlcAction::Settle(preimage) = action {
                if preimage.payment_hash() != *payment_hash {
                    return Err(InterceptError::preimage_mismatch(*payment_hash, context()));
                }
            }

            entry.state = HtlcState::Terminal(outcome);
            self.inner.resolved.insert(
                *payment_hash,
                ResolvedHtlc {
                    outcome,
                    at: Instant::now(),
                },
            );
            (entry.circuit, entry.connection.clone())
        };

        self.inner
            .pending
            .remove_if(payment_hash, |_, p| p.state != HtlcState::Pending);
        connection.send(circuit, action);

        Ok(outcome)
    }

    fn fail_unrouted(&self, connection: &NodeConnection, circuit: CircuitKey, payment_hash: PaymentHash) {
        connection.send(circuit, NodeHtlcAction::Fail);
        if !self.inner.pending.contains_key(&payment_hash) {
            self.inner.resolved.insert(
                payment_hash,
                ResolvedHtlc {
                    outcome: HtlcOutcome::Failed,
                    at: Instant::now(),
                },
            );
        }
    }

    fn fail_pending<F>(&self, predicate: F) -> usize
    where
        F: Fn(&PendingHtlc) -> bool,
    {
        let doomed: Vec<PaymentHash> = self
            .inner
            .pending
            .iter()
            .filter(|e| e.state == HtlcState::Pending && predicate(e.value()))
            .map(|e| *e.key())
            .collect();

        doomed
            .iter()
            .filter(|payment_hash| {
                self.terminate(payment_hash, HtlcOutcome::Failed, NodeHtlcAction::Fail)
                    .is_ok()
            })
            .count()
    }

    fn close_subscriptions<F>(&self, reason: F) -> HashSet<SubscriptionId>
    where
        F: Fn(SubscriptionId) -> InterceptError,
    {
        let mut subscriptions = self
            .inner
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        subscriptions
            .drain(..)
            .map(|slot| {
                let _ = slot.termination.set(reason(slot.id));
                slot.id
            })
            .collect()
    }
}

impl HtlcResolver for HtlcInterceptRegistry {
    type Error = InterceptError;

    fn resolve(
        &self,
        payment_hash: &PaymentHash,
        decision: HtlcDecision,
    ) -> Result<HtlcOutcome, Self::Error> {
        HtlcInterceptRegistry::resolve(self, payment_hash, decision)
    }
}

/// Exact channel match in registration order, else the first unscoped one.
fn route(subscriptions: &[SubscriptionSlot], short_channel_id: u64) -> Option<&SubscriptionSlot> {
    let open = || subscriptions.iter().filter(|slot| !slot.tx.is_closed());
    open()
        .find(|slot| slot.scope.matches_exactly(short_channel_id))
        .or_else(|| open().find(|slot| slot.scope == SubscriptionScope::All))
}
