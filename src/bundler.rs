use crate::encoding::{fmt_address, fmt_h256, parse_h256};
use crate::error::{Error, Result};
use crate::gas::{Eip1559GasPricing, GasPricingStrategy, PimlicoGasPricing};
use crate::rpc::RpcProvider;
use crate::types::{GasValues, UserOperation, UserOperationReceipt};
use crate::ENTRY_POINT_V07;
use async_trait::async_trait;
use ethers::types::{Address, H256};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Post-processing applied to every [`GasValues`] a [`BundlerClient`] produces,
/// e.g. to pad limits by a margin.
pub type GasValuesHook = Arc<dyn Fn(GasValues) -> Result<GasValues> + Send + Sync>;

/// What [`crate::sendop`] needs from a bundler.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Chain the bundler submits to. Part of the operation hash.
    fn chain_id(&self) -> u64;

    async fn get_gas_values(&self, op: &UserOperation) -> Result<GasValues>;

    /// Hash reported by the bundler once it accepted `op`.
    async fn send_user_operation(&self, op: &UserOperation) -> Result<H256>;

    /// `Ok(None)` until the operation is included.
    async fn get_user_operation_receipt(&self, hash: H256) -> Result<Option<UserOperationReceipt>>;
}

#[async_trait]
impl<B: Bundler + ?Sized> Bundler for &B {
    fn chain_id(&self) -> u64 {
        (**self).chain_id()
    }

    async fn get_gas_values(&self, op: &UserOperation) -> Result<GasValues> {
        (**self).get_gas_values(op).await
    }

    async fn send_user_operation(&self, op: &UserOperation) -> Result<H256> {
        (**self).send_user_operation(op).await
    }

    async fn get_user_operation_receipt(&self, hash: H256) -> Result<Option<UserOperationReceipt>> {
        (**self).get_user_operation_receipt(hash).await
    }
}

#[async_trait]
impl<B: Bundler + ?Sized> Bundler for Arc<B> {
    fn chain_id(&self) -> u64 {
        (**self).chain_id()
    }

    async fn get_gas_values(&self, op: &UserOperation) -> Result<GasValues> {
        (**self).get_gas_values(op).await
    }

    async fn send_user_operation(&self, op: &UserOperation) -> Result<H256> {
        (**self).send_user_operation(op).await
    }

    async fn get_user_operation_receipt(&self, hash: H256) -> Result<Option<UserOperationReceipt>> {
        (**self).get_user_operation_receipt(hash).await
    }
}

/// JSON-RPC bundler endpoint plus the vendor's gas-pricing strategy.
#[derive(Clone)]
pub struct BundlerClient {
    chain_id: u64,
    rpc: RpcProvider,
    pricing: Arc<dyn GasPricingStrategy>,
    gas_values_hook: Option<GasValuesHook>,
}

impl std::fmt::Debug for BundlerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundlerClient")
            .field("chain_id", &self.chain_id)
            .field("url", &self.rpc.url())
            .field("vendor", &self.pricing.vendor())
            .field("gas_values_hook", &self.gas_values_hook.is_some())
            .finish()
    }
}

impl BundlerClient {
    pub fn new(
        chain_id: u64,
        url: impl Into<String>,
        pricing: impl GasPricingStrategy + 'static,
    ) -> Self {
        Self {
            chain_id,
            rpc: RpcProvider::new(url),
            pricing: Arc::new(pricing),
            gas_values_hook: None,
        }
    }

    pub fn pimlico(chain_id: u64, url: impl Into<String>) -> Self {
        Self::new(chain_id, url, PimlicoGasPricing::new())
    }

    pub fn alchemy(chain_id: u64, url: impl Into<String>) -> Self {
        Self::new(chain_id, url, Eip1559GasPricing::alchemy())
    }

    /// Any bundler that only implements the standard `eth_*` methods.
    pub fn standard(chain_id: u64, url: impl Into<String>) -> Self {
        Self::new(chain_id, url, Eip1559GasPricing::standard())
    }

    pub fn with_gas_values_hook(
        mut self,
        hook: impl Fn(GasValues) -> Result<GasValues> + Send + Sync + 'static,
    ) -> Self {
        self.gas_values_hook = Some(Arc::new(hook));
        self
    }

    pub fn rpc(&self) -> &RpcProvider {
        &self.rpc
    }

    pub fn vendor(&self) -> &'static str {
        self.pricing.vendor()
    }

    /// `eth_supportedEntryPoints`.
    pub async fn supported_entry_points(&self) -> Result<Vec<Address>> {
        const METHOD: &str = "eth_supportedEntryPoints";
        let res = self.rpc.send(METHOD, serde_json::json!([])).await?;
        res.as_array()
            .ok_or_else(|| Error::invalid_response(METHOD, format!("expected array, got {res}")))?
            .iter()
            .map(|v| {
                v.as_str()
                    .and_then(|s| Address::from_str(s).ok())
                    .ok_or_else(|| Error::invalid_response(METHOD, format!("not an address: {v}")))
            })
            .collect()
    }

    /// `eth_chainId` as reported by the bundler, which may differ from the configured one.
    pub async fn remote_chain_id(&self) -> Result<u64> {
        const METHOD: &str = "eth_chainId";
        let res = self.rpc.send(METHOD, serde_json::json!([])).await?;
        let s = res
            .as_str()
            .ok_or_else(|| Error::invalid_response(METHOD, format!("expected string, got {res}")))?;
        u64::from_str_radix(s.trim_start_matches("0x"), 16)
            .map_err(|e| Error::invalid_response(METHOD, format!("{s}: {e}")))
    }
}

#[async_trait]
impl Bundler for BundlerClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn get_gas_values(&self, op: &UserOperation) -> Result<GasValues> {
        let gas = self.pricing.get_gas_values(&self.rpc, op).await?;
        match &self.gas_values_hook {
            Some(hook) => hook(gas),
            None => Ok(gas),
        }
    }

    async fn send_user_operation(&self, op: &UserOperation) -> Result<H256> {
        const METHOD: &str = "eth_sendUserOperation";
        let params = serde_json::json!([op, fmt_address(ENTRY_POINT_V07)]);
        let res = self.rpc.send(METHOD, params).await?;
        // accepted at this point; an unreadable echo must not lose the operation
        match parse_userop_hash(&res) {
            Ok(hash) => Ok(hash),
            Err(e) => {
                let hash = op.hash(ENTRY_POINT_V07, self.chain_id);
                tracing::warn!(error = %e, user_op_hash = ?hash, "unreadable eth_sendUserOperation result, using local hash");
                Ok(hash)
            }
        }
    }

    async fn get_user_operation_receipt(&self, hash: H256) -> Result<Option<UserOperationReceipt>> {
        const METHOD: &str = "eth_getUserOperationReceipt";
        let res = self
            .rpc
            .send(METHOD, serde_json::json!([fmt_h256(hash)]))
            .await?;
        if res.is_null() {
            return Ok(None);
        }
        serde_json::from_value(res)
            .map(Some)
            .map_err(|e| Error::invalid_response(METHOD, e.to_string()))
    }
}

fn parse_userop_hash(res: &Value) -> Result<H256> {
    // Most bundlers return the hash as a bare string; some wrap it in an object.
    let hash_str = res
        .as_str()
        .or_else(|| {
            ["result", "userOpHash", "userOperationHash"]
                .iter()
                .find_map(|k| res.get(*k).and_then(Value::as_str))
        })
        .ok_or_else(|| {
            Error::invalid_response(
                "eth_sendUserOperation",
                format!("unexpected result shape (expected string or {{result: ...}}): {res}"),
            )
        })?;

    parse_h256(hash_str)
}
