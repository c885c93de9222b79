use crate::token::ChainId;
use alloy_primitives::{Address, U256, address};

/// Basis-point denominator (10 000 = 100%).
pub const BPS_DENOMINATOR: u32 = 10_000;

/// 365 days, the annualization window for APY.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Fixed-point resolution of sqrt prices (Q64.96).
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);

#[non_exhaustive]
pub struct KnownChain;

impl KnownChain {
    pub const ETHEREUM: ChainId = ChainId(1);
    pub const ARBITRUM_ONE: ChainId = ChainId(42_161);
    pub const ARBITRUM_SEPOLIA: ChainId = ChainId(421_614);
    pub const BASE: ChainId = ChainId(8_453);
    pub const BASE_SEPOLIA: ChainId = ChainId(84_532);
}

// Ethereum mainnet tokens used by tests and benches
pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
