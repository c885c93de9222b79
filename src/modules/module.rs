use crate::state::{PoolFamily, PoolState};
use crate::token::{ChainId, Token};
use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Normalized (lowercase) identifier a module is registered under.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProtocolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        ProtocolId::new(id)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// A supplied token is not a constituent of the pool (or the pair is
    /// not two distinct constituents).
    #[error("token {0} is not a pool constituent")]
    InvalidToken(Address),
    /// The snapshot is missing a required field, carries a structurally
    /// impossible value, or belongs to a family the module does not model.
    #[error("invalid pool state: {0}")]
    InvalidState(String),
    /// The pool cannot supply the requested output under its invariant.
    #[error("insufficient liquidity")]
    InsufficientLiquidity,
    /// No well-defined answer exists for this pool type.
    #[error("unavailable for this pool type")]
    Unavailable,
    /// The caller violated the request contract itself.
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

/// A quoted amount plus the fee charged for it, both in base units.
/// The fee is denominated in the input token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub amount: U256,
    pub fee: U256,
}

impl Quote {
    pub const ZERO: Quote = Quote { amount: U256::ZERO, fee: U256::ZERO };

    pub fn new(amount: U256, fee: U256) -> Self {
        Self { amount, fee }
    }
}

/// A directional quote request. Exactly one of the two amounts must be
/// set; [`QuoteRequest::direction`] enforces that contract.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: Option<U256>,
    pub amount_out: Option<U256>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteDirection {
    ExactIn(U256),
    ExactOut(U256),
}

impl QuoteRequest {
    pub fn exact_in(token_in: Token, token_out: Token, amount_in: U256) -> Self {
        Self { token_in, token_out, amount_in: Some(amount_in), amount_out: None }
    }

    pub fn exact_out(token_in: Token, token_out: Token, amount_out: U256) -> Self {
        Self { token_in, token_out, amount_in: None, amount_out: Some(amount_out) }
    }

    pub fn direction(&self) -> Result<QuoteDirection, QuoteError> {
        match (self.amount_in, self.amount_out) {
            (Some(amount_in), None) => Ok(QuoteDirection::ExactIn(amount_in)),
            (None, Some(amount_out)) => Ok(QuoteDirection::ExactOut(amount_out)),
            (Some(_), Some(_)) => {
                Err(QuoteError::InvalidRequest("amount_in and amount_out are both set"))
            }
            (None, None) => Err(QuoteError::InvalidRequest("neither amount_in nor amount_out is set")),
        }
    }
}

/// The snapshot fields a module needs, by name, so the external state
/// collaborator knows what to fetch each block (dynamic) and what it may
/// fetch once (static).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateRequirements {
    pub dynamic_fields: &'static [&'static str],
    pub static_fields: &'static [&'static str],
}

/// One liquidity-source integration.
///
/// A module is constructed once per protocol deployment per chain, holds
/// only immutable configuration, and answers every operation as a pure
/// function of `(snapshot, inputs)`: no I/O, no retained state, no
/// mutation of the caller's snapshot. That makes any module safe to share
/// across threads.
///
/// Rounding is part of the contract, not an implementation detail:
/// quoted outputs round down and quoted inputs round up (plus one base
/// unit), so `quote_out_amount(quote_in_amount(y)) >= y` always holds and
/// a chained caller can never extract value from rounding.
#[typetag::serde(tag = "type")]
pub trait LiquidityModule: Sync + Send {
    fn protocol(&self) -> ProtocolId;

    fn family(&self) -> PoolFamily {
        PoolFamily::Unknown
    }

    fn chain_id(&self) -> ChainId;

    /// Maximum `token_out` obtainable for `amount_in` of `token_in`,
    /// with the fee charged on the input. Zero in, zero out.
    fn quote_out_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
    ) -> Result<Quote, QuoteError>;

    /// Input sufficient to obtain at least `amount_out` of `token_out`.
    /// Requesting the pool's whole output reserve (or more) fails with
    /// [`QuoteError::InsufficientLiquidity`]. Zero out, zero in.
    fn quote_in_amount(
        &self,
        state: &PoolState,
        token_in: &Token,
        token_out: &Token,
        amount_out: U256,
    ) -> Result<Quote, QuoteError>;

    /// Annualized yield as a ratio (0.05 = 5%), or
    /// [`QuoteError::Unavailable`] when the pool type has no well-defined
    /// yield, never a silent zero.
    fn apy(&self, state: &PoolState) -> Result<Decimal, QuoteError>;

    /// Value locked in native-token units: the whole pool for `None`, a
    /// single constituent otherwise.
    fn tvl(&self, state: &PoolState, token: Option<&Token>) -> Result<Decimal, QuoteError>;

    fn state_requirements(&self) -> StateRequirements {
        StateRequirements::default()
    }

    /// Request-shaped entry point: enforces the exactly-one-amount
    /// contract and dispatches to the directional operation.
    fn quote(&self, state: &PoolState, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        match request.direction()? {
            QuoteDirection::ExactIn(amount_in) => {
                self.quote_out_amount(state, &request.token_in, &request.token_out, amount_in)
            }
            QuoteDirection::ExactOut(amount_out) => {
                self.quote_in_amount(state, &request.token_in, &request.token_out, amount_out)
            }
        }
    }
}

pub struct ModuleWrapper {
    pub module: Arc<dyn LiquidityModule>,
}

impl ModuleWrapper {
    pub fn new(module: Arc<dyn LiquidityModule>) -> Self {
        ModuleWrapper { module }
    }
}

impl PartialOrd for ModuleWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for ModuleWrapper {}

impl Ord for ModuleWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.protocol(), self.chain_id()).cmp(&(other.protocol(), other.chain_id()))
    }
}

impl Display for ModuleWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})@{}", self.protocol(), self.family(), self.chain_id())
    }
}

impl Debug for ModuleWrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})@{}", self.protocol(), self.family(), self.chain_id())
    }
}

impl Hash for ModuleWrapper {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.protocol().hash(state);
        self.chain_id().hash(state);
    }
}

impl PartialEq for ModuleWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.protocol() == other.protocol() && self.chain_id() == other.chain_id()
    }
}

impl Clone for ModuleWrapper {
    fn clone(&self) -> Self {
        Self { module: self.module.clone() }
    }
}

impl Deref for ModuleWrapper {
    type Target = dyn LiquidityModule;

    fn deref(&self) -> &Self::Target {
        self.module.deref()
    }
}

impl<T: 'static + LiquidityModule + Clone> From<T> for ModuleWrapper {
    fn from(module: T) -> Self {
        Self { module: Arc::new(module) }
    }
}
