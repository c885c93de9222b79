use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// EVM-style chain identifier. Well-known ids live in [`crate::utils::constants::KnownChain`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

/// A fungible asset on one chain. Two tokens are the same asset iff
/// `(chain_id, address)` match; symbol and reference price are metadata
/// and never enter identity or swap math.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Token {
    chain_id: ChainId,
    address: Address,
    decimals: u8,
    symbol: Option<String>,
    /// Price of one whole token in the chain's native token, used only by
    /// TVL/APY valuation.
    reference_price: Decimal,
}

pub type TokenWrapper = Arc<Token>;

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.chain_id, self.address).cmp(&(other.chain_id, other.address))
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.get_symbol(), self.chain_id)
    }
}

impl Token {
    pub fn new(chain_id: ChainId, address: Address, decimals: u8) -> Token {
        Token { chain_id, address, decimals, ..Token::default() }
    }

    pub fn new_with_data(
        chain_id: ChainId,
        address: Address,
        decimals: u8,
        symbol: Option<String>,
        reference_price: Decimal,
    ) -> Token {
        Token { chain_id, address, decimals, symbol, reference_price }
    }

    // For testing purposes
    pub fn random(chain_id: ChainId) -> Token {
        Token::new(chain_id, Address::random(), 18)
    }

    // For testing purposes
    pub fn repeat_byte(chain_id: ChainId, byte: u8) -> Token {
        Token::new(chain_id, Address::repeat_byte(byte), 18)
    }

    pub fn get_chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn get_decimals(&self) -> u8 {
        self.decimals
    }

    pub fn get_symbol(&self) -> String {
        self.symbol.clone().unwrap_or(self.address.to_string())
    }

    pub fn get_reference_price(&self) -> Decimal {
        self.reference_price
    }

    /// `10^decimals`, one whole token in base units.
    pub fn get_exp(&self) -> U256 {
        U256::from(10).pow(U256::from(self.decimals))
    }

    /// Scaling factor onto an 18-decimal grid, `10^(18 - decimals)`.
    /// `None` for tokens with more than 18 decimals.
    pub fn precision_multiplier(&self) -> Option<U256> {
        if self.decimals > 18 {
            return None;
        }
        Some(U256::from(10).pow(U256::from(18 - self.decimals)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{KnownChain, WETH};
    use rust_decimal_macros::dec;

    #[test]
    fn test_identity_ignores_metadata() {
        let plain = Token::new(KnownChain::ETHEREUM, WETH, 18);
        let rich = Token::new_with_data(KnownChain::ETHEREUM, WETH, 8, Some("WETH".to_string()), dec!(1));

        assert_eq!(plain, rich);

        let other_chain = Token::new(KnownChain::BASE, WETH, 18);
        assert_ne!(plain, other_chain);
    }

    #[test]
    fn test_precision_multiplier() {
        let six = Token::new(KnownChain::ETHEREUM, Address::repeat_byte(1), 6);
        assert_eq!(six.precision_multiplier(), Some(U256::from(1_000_000_000_000u64)));

        let eighteen = Token::new(KnownChain::ETHEREUM, Address::repeat_byte(2), 18);
        assert_eq!(eighteen.precision_multiplier(), Some(U256::from(1)));

        let odd = Token::new(KnownChain::ETHEREUM, Address::repeat_byte(3), 24);
        assert_eq!(odd.precision_multiplier(), None);
    }

    #[test]
    fn test_serialize() {
        let weth = Token::new_with_data(KnownChain::ETHEREUM, WETH, 18, Some("WETH".to_string()), dec!(1));

        let serialized = serde_json::to_string(&weth).unwrap();
        let deserialized: Token = serde_json::from_str(&serialized).unwrap();
        assert_eq!(weth, deserialized);
        assert_eq!(deserialized.get_decimals(), 18);
        assert_eq!(deserialized.get_reference_price(), dec!(1));
    }
}
