use crate::error::Result;
use crate::types::Execution;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, H256, U256};

/// What the pipeline needs from a smart account implementation.
///
/// Account encoding, nonce-key derivation and the signature scheme all live behind
/// this trait; the pipeline only moves the values around.
#[async_trait]
pub trait OperationBuilder: Send + Sync {
    async fn get_sender(&self) -> Result<Address>;

    /// Full nonce (key and sequence) as the entry point expects it.
    async fn get_nonce(&self) -> Result<U256>;

    async fn get_call_data(&self, executions: &[Execution]) -> Result<Bytes>;

    /// A well-formed signature of the right length that will not verify. Only used
    /// so gas estimation sees a realistic operation size.
    async fn get_dummy_signature(&self) -> Result<Bytes>;

    async fn get_signature(&self, user_op_hash: H256) -> Result<Bytes>;

    /// `factory ++ factoryData` for an account that is not deployed yet.
    /// `None` or empty bytes mean the sender already exists.
    async fn get_init_code(&self) -> Result<Option<Bytes>> {
        Ok(None)
    }
}
