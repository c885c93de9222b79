// Contract Layer: token/amount model and pool state snapshots
pub mod state;
pub mod token;

// Module Layer: the four-operation capability contract and the reference
// implementations, one per AMM family
pub mod modules;

// Boundary Layer: protocol registry/discovery and the conformance harness
pub mod conformance;
pub mod registry;

// Common utilities and types
pub mod utils;

// Re-export key components from each layer
pub use conformance::{
    ConformanceHarness, ConformanceReport, HarnessConfig, ModuleReport, PoolFixture, PropertyCheck,
    PropertyFailure, PropertyKind, default_fixtures,
};
pub use modules::{
    ConcentratedLiquidityModule, ConstantProductModule, LendingCurveModule, LiquidityModule,
    MockModule, ModuleWrapper, ProtocolId, Quote, QuoteDirection, QuoteError, QuoteRequest,
    StableSwapModule,
};
pub use registry::{
    ContractKind, Deployment, IndexedContract, Registration, RegistrationSection, Registry,
};
pub use state::{
    ConcentratedLiquidityState, ConstantProductState, FeeStats, LendingCurveState, PoolFamily,
    PoolState, StableSwapState,
};
pub use token::{ChainId, Token, TokenWrapper};
