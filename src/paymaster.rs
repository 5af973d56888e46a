use crate::encoding::{self, fmt_address};
use crate::error::{Error, Result};
use crate::rpc::RpcProvider;
use crate::types::UserOperation;
use crate::ENTRY_POINT_V07;
use async_trait::async_trait;
use ethers::types::{Address, Bytes, U128, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who is paying, as shown to the user by wallets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sponsor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// `pm_getPaymasterStubData` result (EntryPoint v0.7 fields).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymasterStubData {
    pub paymaster: Option<Address>,
    pub paymaster_data: Option<Bytes>,
    #[serde(deserialize_with = "encoding::de_opt_quantity128")]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(deserialize_with = "encoding::de_opt_quantity128")]
    pub paymaster_post_op_gas_limit: Option<U128>,
    pub sponsor: Option<Sponsor>,
    /// When true the stub is already the final sponsorship and no second call is made.
    pub is_final: bool,
}

/// `pm_getPaymasterData` result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymasterData {
    pub paymaster: Option<Address>,
    pub paymaster_data: Option<Bytes>,
    pub sponsor: Option<Sponsor>,
}

/// Two-phase paymaster sponsorship.
///
/// Stub data is requested before gas estimation. Final data is requested after,
/// only when the stub was not final.
#[async_trait]
pub trait PaymasterBuilder: Send + Sync {
    async fn get_paymaster_stub_data(&self, op: &UserOperation) -> Result<PaymasterStubData>;

    /// `Ok(None)` means this paymaster has no finalize step and the stub stands.
    async fn get_paymaster_data(&self, _op: &UserOperation) -> Result<Option<PaymasterData>> {
        Ok(None)
    }
}

/// ERC-7677 paymaster web service client.
///
/// `context` is vendor-defined and passed through untouched, e.g.
/// `{"sponsorshipPolicyId": ...}` for Pimlico or `{"policyId": ...}` for Alchemy Gas Manager.
#[derive(Debug, Clone)]
pub struct PaymasterClient {
    rpc: RpcProvider,
    chain_id: u64,
    context: Value,
}

impl PaymasterClient {
    pub fn new(url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            rpc: RpcProvider::new(url),
            chain_id,
            context: Value::Object(Default::default()),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Pimlico sponsorship policies.
    pub fn with_sponsorship_policy(self, policy_id: &str) -> Self {
        self.with_context(serde_json::json!({ "sponsorshipPolicyId": policy_id }))
    }

    /// Alchemy Gas Manager policies, with optional `webhookData`.
    pub fn with_gas_manager_policy(self, policy_id: &str, webhook_data: Option<&str>) -> Self {
        let mut ctx = serde_json::json!({ "policyId": policy_id });
        if let (Some(wd), Some(obj)) = (webhook_data, ctx.as_object_mut()) {
            obj.insert("webhookData".to_string(), Value::String(wd.to_string()));
        }
        self.with_context(ctx)
    }

    fn params(&self, op: &UserOperation) -> Value {
        serde_json::json!([
            op,
            fmt_address(ENTRY_POINT_V07),
            encoding::fmt_u256(U256::from(self.chain_id)),
            self.context,
        ])
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, op: &UserOperation) -> Result<T> {
        let res = self.rpc.send(method, self.params(op)).await?;
        let body = unwrap_v07_response(res);
        serde_json::from_value(body).map_err(|e| Error::invalid_response(method, e.to_string()))
    }
}

#[async_trait]
impl PaymasterBuilder for PaymasterClient {
    async fn get_paymaster_stub_data(&self, op: &UserOperation) -> Result<PaymasterStubData> {
        self.call("pm_getPaymasterStubData", op).await
    }

    async fn get_paymaster_data(&self, op: &UserOperation) -> Result<Option<PaymasterData>> {
        self.call("pm_getPaymasterData", op).await.map(Some)
    }
}

fn unwrap_v07_response(result: Value) -> Value {
    // ERC-7677 puts the fields at the top level:
    //   { "paymaster": "0x...", "paymasterData": "0x...", ... }
    // Alchemy wraps them per entry point version:
    //   { "entrypointV07Response": { "paymaster": "0x...", ... } }
    if result.get("paymaster").is_some() || result.get("paymasterData").is_some() {
        return result;
    }
    for key in ["entrypointV07Response", "entryPointV07Response"] {
        if let Some(inner) = result.get(key) {
            return inner.clone();
        }
    }
    result
}
