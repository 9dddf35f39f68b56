//! The contract this tool deploys and its constructor arguments.

use alloy::{
    primitives::{Address, address},
    sol_types::SolValue,
};

pub const CONTRACT_NAME: &str = "UniswapRepayAdapter";

/// Source file of the contract, relative to the Hardhat project root.
pub const SOURCE_NAME: &str = "contracts/adapters/UniswapRepayAdapter.sol";

/// Aave `LendingPoolAddressesProvider` on Kovan. Not valid on any other
/// network.
pub const KOVAN_LENDING_POOL_ADDRESSES_PROVIDER: Address =
    address!("0x88757f2f99175387aB4C6a4b3067c77A695b0349");

/// Uniswap V2 router on Kovan. Not valid on any other network.
pub const KOVAN_UNISWAP_ROUTER: Address = address!("0xfcd87315f0e4067070ade8682fcdbc3006631441");

/// Positional constructor arguments of `UniswapRepayAdapter`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstructorArgs {
    pub lending_pool_addresses_provider: Address,
    pub uniswap_router: Address,
}

impl ConstructorArgs {
    /// The only argument set this tool deploys with.
    pub const KOVAN: Self = Self {
        lending_pool_addresses_provider: KOVAN_LENDING_POOL_ADDRESSES_PROVIDER,
        uniswap_router: KOVAN_UNISWAP_ROUTER,
    };

    /// Arguments in constructor order.
    pub fn to_vec(self) -> Vec<Address> {
        vec![self.lending_pool_addresses_provider, self.uniswap_router]
    }

    /// ABI encoding as appended to the creation code.
    pub fn abi_encode(self) -> Vec<u8> {
        (self.lending_pool_addresses_provider, self.uniswap_router).abi_encode_params()
    }
}
