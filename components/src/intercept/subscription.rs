use crate::intercept::error::InterceptError;
use crate::intercept::registry::HtlcInterceptRegistry;
use futures_util::Stream;
use htlcgate_service_api::intercept::{InterceptedHtlc, SubscriptionId, SubscriptionScope};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Stream of HTLCs routed to one subscriber.
///
/// When the registry closes the subscription the stream yields the closing
/// error once and then ends. Dropping it unsubscribes and fails every HTLC
/// still waiting on a decision from this subscriber.
pub struct InterceptSubscription {
    id: SubscriptionId,
    scope: SubscriptionScope,
    rx: mpsc::Receiver<InterceptedHtlc>,
    termination: Arc<OnceLock<InterceptError>>,
    terminated: bool,
    registry: HtlcInterceptRegistry,
}

impl InterceptSubscription {
    pub(crate) fn new(
        id: SubscriptionId,
        scope: SubscriptionScope,
        rx: mpsc::Receiver<InterceptedHtlc>,
        termination: Arc<OnceLock<InterceptError>>,
        registry: HtlcInterceptRegistry,
    ) -> Self {
        Self {
            id,
            scope,
            rx,
            termination,
            terminated: false,
            registry,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn scope(&self) -> SubscriptionScope {
        self.scope
    }
}

impl Stream for InterceptSubscription {
    type Item = Result<InterceptedHtlc, InterceptError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(htlc)) => Poll::Ready(Some(Ok(htlc))),
            Poll::Ready(None) => {
                self.terminated = true;
                Poll::Ready(self.termination.get().cloned().map(Err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for InterceptSubscription {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.id);
    }
}

impl std::fmt::Debug for InterceptSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptSubscription")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("terminated", &self.terminated)
            .finish()
    }
}
