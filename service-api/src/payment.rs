use secp256k1::PublicKey;
use sha2::Digest;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashParseError {
    InvalidLength(usize),
    InvalidHex,
}

impl fmt::Display for HashParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashParseError::InvalidLength(len) => {
                write!(f, "expected 32 bytes, got {len}")
            }
            HashParseError::InvalidHex => write!(f, "invalid hex encoding"),
        }
    }
}

impl Error for HashParseError {}

fn parse_32(bytes: &[u8]) -> Result<[u8; 32], HashParseError> {
    bytes
        .try_into()
        .map_err(|_| HashParseError::InvalidLength(bytes.len()))
}

fn parse_32_hex(s: &str) -> Result<[u8; 32], HashParseError> {
    let bytes = hex::decode(s).map_err(|_| HashParseError::InvalidHex)?;
    parse_32(&bytes)
}

/// The sha256 hash identifying a payment and every HTLC that pays it.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaymentHash(pub [u8; 32]);

impl PaymentHash {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashParseError> {
        Ok(Self(parse_32(bytes)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PaymentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentHash({self})")
    }
}

impl FromStr for PaymentHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_32_hex(s)?))
    }
}

/// The secret whose sha256 is the payment hash.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Preimage(pub [u8; 32]);

impl Preimage {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashParseError> {
        Ok(Self(parse_32(bytes)?))
    }

    pub fn payment_hash(&self) -> PaymentHash {
        PaymentHash(sha2::Sha256::digest(self.0).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Preimage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preimage(..)")
    }
}

impl FromStr for Preimage {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_32_hex(s)?))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeIdentity(pub PublicKey);

impl NodeIdentity {
    /// Compressed 33 byte encoding, as sent on the wire.
    pub fn to_bytes(&self) -> [u8; 33] {
        self.0.serialize()
    }
}

impl From<PublicKey> for NodeIdentity {
    fn from(value: PublicKey) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeIdentity {
    type Err = secp256k1::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PublicKey::from_str(s)?))
    }
}

/// An outbound payment as asked for by the gateway.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentRequest {
    pub invoice: String,
    /// Upper bound on the route's total timelock delta, in blocks.
    pub max_delay: u64,
    /// Fee ceiling as a fraction of the invoice amount; `0.01` is one percent.
    pub max_fee_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub preimage: Preimage,
    pub fee_msat: u64,
}
