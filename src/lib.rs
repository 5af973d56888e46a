//! Build, price, sign and submit ERC-4337 user operations (EntryPoint v0.7)
//! through any bundler, then wait for their receipts.
//!
//! The entry point is [`sendop`]. Smart accounts plug in through
//! [`OperationBuilder`], paymasters through [`PaymasterBuilder`], and bundler
//! vendors through [`GasPricingStrategy`].

pub mod account;
pub mod bundler;
pub mod config;
pub mod encoding;
pub mod error;
pub mod gas;
pub mod paymaster;
pub mod rpc;
pub mod sendop;
pub mod types;

use ethers::types::{Address, H160};

pub use account::OperationBuilder;
pub use bundler::{Bundler, BundlerClient, GasValuesHook};
pub use error::{Error, JsonRpcError, Result};
pub use gas::{BaseFeeSource, Eip1559GasPricing, GasPricingStrategy, PimlicoGasPricing, PimlicoTier};
pub use paymaster::{PaymasterBuilder, PaymasterClient, PaymasterData, PaymasterStubData};
pub use rpc::{RpcProvider, RpcRequest};
pub use sendop::{sendop, SendOpOptions, UserOperationHandle, RECEIPT_POLL_INTERVAL};
pub use types::{
    Execution, GasValues, PackedUserOperation, UserOperation, UserOperationReceipt,
};

/// EntryPoint v0.7, `0x0000000071727De22E5E9d8BAf0edAc6f37da032`.
pub const ENTRY_POINT_V07: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x71, 0x72, 0x7d, 0xe2, 0x2e, 0x5e, 0x9d, 0x8b, 0xaf, 0x0e, 0xda,
    0xc6, 0xf3, 0x7d, 0xa0, 0x32,
]);
