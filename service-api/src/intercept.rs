use crate::payment::{PaymentHash, Preimage};
use crate::service::HasAdapterErrorKind;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which HTLCs a subscription wants to see.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionScope {
    Channel(u64),
    All,
}

impl SubscriptionScope {
    /// Wire form: `0` is not a valid short channel id and means every channel.
    pub fn from_short_channel_id(short_channel_id: u64) -> Self {
        match short_channel_id {
            0 => SubscriptionScope::All,
            scid => SubscriptionScope::Channel(scid),
        }
    }

    pub fn matches_exactly(&self, short_channel_id: u64) -> bool {
        matches!(self, SubscriptionScope::Channel(scid) if *scid == short_channel_id)
    }
}

impl fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionScope::Channel(scid) => write!(f, "channel {scid}"),
            SubscriptionScope::All => write!(f, "all channels"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterceptedHtlc {
    pub payment_hash: PaymentHash,
    /// Amount the payer wants forwarded, in millisatoshi.
    pub amount_msat: u64,
    pub short_channel_id: u64,
    /// Absolute block height at which the incoming HTLC times out.
    pub expiry: u64,
    pub subscription_id: SubscriptionId,
    pub incoming_chan_id: u64,
    pub htlc_id: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HtlcDecision {
    Settle { preimage: Preimage },
    Fail { reason: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HtlcOutcome {
    Settled,
    Failed,
    Expired,
}

impl fmt::Display for HtlcOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtlcOutcome::Settled => write!(f, "settled"),
            HtlcOutcome::Failed => write!(f, "failed"),
            HtlcOutcome::Expired => write!(f, "expired"),
        }
    }
}

/// The gateway's side of the interception conversation.
pub trait HtlcResolver {
    type Error: std::error::Error + HasAdapterErrorKind + Send + Sync + 'static;

    /// Records the one terminal decision for an intercepted HTLC.
    fn resolve(
        &self,
        payment_hash: &PaymentHash,
        decision: HtlcDecision,
    ) -> Result<HtlcOutcome, Self::Error>;
}
