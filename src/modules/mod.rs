pub mod concentrated_liquidity;
pub mod constant_product;
pub mod lending_curve;
pub mod math;
pub mod mock_module;
pub mod module;
pub mod stable_swap;
pub mod yield_stats;

pub use concentrated_liquidity::ConcentratedLiquidityModule;
pub use constant_product::ConstantProductModule;
pub use lending_curve::LendingCurveModule;
pub use mock_module::MockModule;
pub use module::{
    LiquidityModule, ModuleWrapper, ProtocolId, Quote, QuoteDirection, QuoteError, QuoteRequest,
    StateRequirements,
};
pub use stable_swap::StableSwapModule;
