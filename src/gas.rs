use crate::encoding::{self, fmt_address, quantity128_field, quantity_field};
use crate::error::{Error, Result};
use crate::rpc::RpcProvider;
use crate::types::{GasValues, UserOperation};
use crate::ENTRY_POINT_V07;
use async_trait::async_trait;
use ethers::types::{U128, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Gas limit used for all three limits when estimation is skipped (0xf423f).
pub const DEFAULT_GAS_LIMIT: u64 = 999_999;

const BPS_DENOMINATOR: u64 = 10_000;

/// Vendor-specific price discovery plus gas estimation.
///
/// `draft` already carries sender, nonce, call data, the dummy signature and any
/// paymaster stub fields. Implementations must return a non-zero `max_fee_per_gas`
/// that is at least `max_priority_fee_per_gas`.
#[async_trait]
pub trait GasPricingStrategy: Send + Sync {
    /// Short vendor name used in errors and logs.
    fn vendor(&self) -> &'static str;

    async fn get_gas_values(&self, rpc: &RpcProvider, draft: &UserOperation) -> Result<GasValues>;
}

/// Limits returned by `eth_estimateUserOperationGas` (or the fixed fallback).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U128,
    pub call_gas_limit: U128,
    pub paymaster_verification_gas_limit: Option<U128>,
    pub paymaster_post_op_gas_limit: Option<U128>,
}

/// The generous fixed triple used when estimation is skipped.
pub fn default_gas_estimation() -> GasEstimate {
    GasEstimate {
        pre_verification_gas: U256::from(DEFAULT_GAS_LIMIT),
        verification_gas_limit: U128::from(DEFAULT_GAS_LIMIT),
        call_gas_limit: U128::from(DEFAULT_GAS_LIMIT),
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
    }
}

/// Check an estimation response for the three required fields.
pub fn validate_gas_estimation(res: &Value) -> Result<GasEstimate> {
    let empty = match res {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(Error::GasEstimation(
            "Empty response from gas estimation".to_string(),
        ));
    }

    let required = |key: &str| -> Result<Value> {
        match res.get(key) {
            Some(v) if !v.is_null() => Ok(v.clone()),
            _ => Err(Error::GasEstimation(format!(
                "Missing required gas estimation field: {key}"
            ))),
        }
    };
    let pre_verification_gas = required("preVerificationGas")?;
    let verification_gas_limit = required("verificationGasLimit")?;
    let call_gas_limit = required("callGasLimit")?;

    let as_str = |key: &str, v: &Value| -> Result<String> {
        v.as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::GasEstimation(format!("{key} is not a hex string: {v}")))
    };

    Ok(GasEstimate {
        pre_verification_gas: encoding::parse_u256_quantity(&as_str(
            "preVerificationGas",
            &pre_verification_gas,
        )?)?,
        verification_gas_limit: encoding::parse_u128_quantity(&as_str(
            "verificationGasLimit",
            &verification_gas_limit,
        )?)?,
        call_gas_limit: encoding::parse_u128_quantity(&as_str("callGasLimit", &call_gas_limit)?)?,
        paymaster_verification_gas_limit: quantity128_field(res, "paymasterVerificationGasLimit")?,
        paymaster_post_op_gas_limit: quantity128_field(res, "paymasterPostOpGasLimit")?,
    })
}

/// `eth_estimateUserOperationGas` against the v0.7 entry point, validated.
pub async fn estimate_user_operation_gas(
    rpc: &RpcProvider,
    draft: &UserOperation,
) -> Result<GasEstimate> {
    let params = json!([draft, fmt_address(ENTRY_POINT_V07)]);
    let res = rpc.send("eth_estimateUserOperationGas", params).await?;
    validate_gas_estimation(&res)
}

/// Put the fees on a copy of `draft`, then estimate (or fall back) and merge.
pub async fn estimate_with_fees(
    rpc: &RpcProvider,
    draft: &UserOperation,
    max_fee_per_gas: U128,
    max_priority_fee_per_gas: U128,
    skip_estimation: bool,
) -> Result<GasValues> {
    let mut op = draft.clone();
    op.max_fee_per_gas = max_fee_per_gas;
    op.max_priority_fee_per_gas = max_priority_fee_per_gas;

    let est = if skip_estimation {
        default_gas_estimation()
    } else {
        estimate_user_operation_gas(rpc, &op).await?
    };

    Ok(GasValues {
        max_fee_per_gas,
        max_priority_fee_per_gas,
        pre_verification_gas: est.pre_verification_gas,
        verification_gas_limit: est.verification_gas_limit,
        call_gas_limit: est.call_gas_limit,
        paymaster_verification_gas_limit: est.paymaster_verification_gas_limit,
        paymaster_post_op_gas_limit: est.paymaster_post_op_gas_limit,
    })
}

fn apply_bps(v: U256, bps: u64) -> U256 {
    v.saturating_mul(U256::from(bps)) / U256::from(BPS_DENOMINATOR)
}

fn fit_u128(vendor: &'static str, what: &str, v: U256) -> Result<U128> {
    if v.bits() > 128 {
        return Err(Error::VendorPrecondition {
            vendor,
            message: format!("{what} {v} does not fit in 128 bits"),
        });
    }
    Ok(U128::from(v.low_u128()))
}

fn nonzero_quantity(vendor: &'static str, what: &str, res: &Value) -> Result<U256> {
    let v = match res.as_str() {
        Some(s) => encoding::parse_u256_quantity(s)?,
        None => U256::zero(),
    };
    if v.is_zero() {
        return Err(Error::VendorPrecondition {
            vendor,
            message: format!("Invalid {what} response from bundler: {res}"),
        });
    }
    Ok(v)
}

/// Where the base-fee signal comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseFeeSource {
    /// `eth_gasPrice`
    #[default]
    GasPrice,
    /// `baseFeePerGas` of the latest block
    LatestBlock,
    /// `baseFeePerGas` of the pending block
    PendingBlock,
}

/// `maxFeePerGas = base * multiplier + priority` for bundlers that expose standard
/// fee RPCs (Alchemy/Rundler, or any node-backed bundler).
#[derive(Clone, Debug)]
pub struct Eip1559GasPricing {
    vendor: &'static str,
    priority_fee_method: &'static str,
    base_fee_source: BaseFeeSource,
    multiplier_bps: u64,
    skip_estimation: bool,
}

impl Eip1559GasPricing {
    /// Alchemy (Rundler): priority fee from `rundler_maxPriorityFeePerGas`.
    pub fn alchemy() -> Self {
        Self {
            vendor: "alchemy",
            priority_fee_method: "rundler_maxPriorityFeePerGas",
            base_fee_source: BaseFeeSource::GasPrice,
            multiplier_bps: BPS_DENOMINATOR,
            skip_estimation: false,
        }
    }

    /// Any bundler that proxies `eth_maxPriorityFeePerGas`.
    pub fn standard() -> Self {
        Self {
            vendor: "standard",
            priority_fee_method: "eth_maxPriorityFeePerGas",
            base_fee_source: BaseFeeSource::LatestBlock,
            multiplier_bps: BPS_DENOMINATOR,
            skip_estimation: false,
        }
    }

    pub fn with_base_fee_source(mut self, source: BaseFeeSource) -> Self {
        self.base_fee_source = source;
        self
    }

    /// Base-fee multiplier in basis points (15_000 = 1.5x).
    pub fn with_multiplier_bps(mut self, bps: u64) -> Self {
        self.multiplier_bps = bps.max(1);
        self
    }

    pub fn with_skip_estimation(mut self, skip: bool) -> Self {
        self.skip_estimation = skip;
        self
    }

    async fn base_fee(&self, rpc: &RpcProvider) -> Result<U256> {
        match self.base_fee_source {
            BaseFeeSource::GasPrice => {
                let res = rpc.send("eth_gasPrice", json!([])).await?;
                nonzero_quantity(self.vendor, "gas price", &res)
            }
            BaseFeeSource::LatestBlock | BaseFeeSource::PendingBlock => {
                let tag = if self.base_fee_source == BaseFeeSource::LatestBlock {
                    "latest"
                } else {
                    "pending"
                };
                let block = rpc.send("eth_getBlockByNumber", json!([tag, false])).await?;
                match quantity_field(&block, "baseFeePerGas")? {
                    Some(fee) if !fee.is_zero() => Ok(fee),
                    _ => Err(Error::VendorPrecondition {
                        vendor: self.vendor,
                        message: format!("{tag} block has no baseFeePerGas"),
                    }),
                }
            }
        }
    }

    async fn priority_fee(&self, rpc: &RpcProvider) -> Result<U256> {
        let res = rpc.send(self.priority_fee_method, json!([])).await?;
        nonzero_quantity(self.vendor, "maxPriorityFeePerGas", &res)
    }
}

#[async_trait]
impl GasPricingStrategy for Eip1559GasPricing {
    fn vendor(&self) -> &'static str {
        self.vendor
    }

    async fn get_gas_values(&self, rpc: &RpcProvider, draft: &UserOperation) -> Result<GasValues> {
        let (base, priority) = tokio::try_join!(self.base_fee(rpc), self.priority_fee(rpc))?;

        let max_fee = apply_bps(base, self.multiplier_bps).saturating_add(priority);
        tracing::debug!(
            vendor = self.vendor,
            %base,
            %priority,
            %max_fee,
            multiplier_bps = self.multiplier_bps,
            "fee signals"
        );

        let max_fee = fit_u128(self.vendor, "maxFeePerGas", max_fee)?;
        let priority = fit_u128(self.vendor, "maxPriorityFeePerGas", priority)?;
        estimate_with_fees(rpc, draft, max_fee, priority, self.skip_estimation).await
    }
}

/// Which `pimlico_getUserOperationGasPrice` tier to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PimlicoTier {
    Slow,
    #[default]
    Standard,
    Fast,
}

impl PimlicoTier {
    fn key(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Standard => "standard",
            Self::Fast => "fast",
        }
    }
}

/// Pimlico: tiered fee suggestions from `pimlico_getUserOperationGasPrice`.
#[derive(Clone, Debug)]
pub struct PimlicoGasPricing {
    tier: PimlicoTier,
    multiplier_bps: u64,
    skip_estimation: bool,
}

impl Default for PimlicoGasPricing {
    fn default() -> Self {
        Self {
            tier: PimlicoTier::Standard,
            multiplier_bps: BPS_DENOMINATOR,
            skip_estimation: false,
        }
    }
}

impl PimlicoGasPricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tier(mut self, tier: PimlicoTier) -> Self {
        self.tier = tier;
        self
    }

    /// Applied to the suggested `maxFeePerGas` (15_000 = 1.5x).
    pub fn with_multiplier_bps(mut self, bps: u64) -> Self {
        self.multiplier_bps = bps.max(1);
        self
    }

    pub fn with_skip_estimation(mut self, skip: bool) -> Self {
        self.skip_estimation = skip;
        self
    }
}

#[async_trait]
impl GasPricingStrategy for PimlicoGasPricing {
    fn vendor(&self) -> &'static str {
        "pimlico"
    }

    async fn get_gas_values(&self, rpc: &RpcProvider, draft: &UserOperation) -> Result<GasValues> {
        let res = rpc.send("pimlico_getUserOperationGasPrice", json!([])).await?;
        let tier = res.get(self.tier.key()).cloned().unwrap_or(Value::Null);

        let max_fee = quantity_field(&tier, "maxFeePerGas")?.unwrap_or_default();
        if max_fee.is_zero() {
            return Err(Error::VendorPrecondition {
                vendor: self.vendor(),
                message: "Invalid gas price response from bundler".to_string(),
            });
        }
        // an explicit "0x0" tip is valid (some L2s), a missing one is not
        let priority = quantity_field(&tier, "maxPriorityFeePerGas")?.ok_or_else(|| {
            Error::VendorPrecondition {
                vendor: self.vendor(),
                message: format!("gas price tier {} has no maxPriorityFeePerGas", self.tier.key()),
            }
        })?;

        // never below the tip, or the entry point rejects the operation
        let max_fee = apply_bps(max_fee, self.multiplier_bps).max(priority);
        if max_fee.is_zero() {
            return Err(Error::VendorPrecondition {
                vendor: self.vendor(),
                message: format!(
                    "maxFeePerGas is zero after applying {} bps multiplier",
                    self.multiplier_bps
                ),
            });
        }
        tracing::debug!(vendor = "pimlico", tier = self.tier.key(), %max_fee, %priority, "fee signals");

        let max_fee = fit_u128(self.vendor(), "maxFeePerGas", max_fee)?;
        let priority = fit_u128(self.vendor(), "maxPriorityFeePerGas", priority)?;
        estimate_with_fees(rpc, draft, max_fee, priority, self.skip_estimation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate, Times};

    fn ok(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
    }

    async fn mock_method(server: &MockServer, name: &str, result: Value, times: impl Into<Times>) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": name })))
            .respond_with(ok(result))
            .expect(times)
            .mount(server)
            .await;
    }

    fn estimate_response() -> Value {
        json!({
            "preVerificationGas": "0xc350",
            "verificationGasLimit": "0x186a0",
            "callGasLimit": "0x30d40",
            "paymasterVerificationGasLimit": null,
        })
    }

    fn draft() -> UserOperation {
        let mut op = UserOperation::new(Address::repeat_byte(0xaa));
        op.nonce = U256::one();
        op
    }

    /// The params[0].maxFeePerGas of the estimation request, as received by the mock.
    async fn estimated_max_fee(server: &MockServer) -> Value {
        let reqs = server.received_requests().await.unwrap();
        reqs.iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap())
            .find(|b| b["method"] == "eth_estimateUserOperationGas")
            .map(|b| b["params"][0]["maxFeePerGas"].clone())
            .unwrap()
    }

    #[test]
    fn validate_rejects_empty_and_missing_fields() {
        assert!(matches!(
            validate_gas_estimation(&Value::Null),
            Err(Error::GasEstimation(m)) if m.contains("Empty")
        ));
        assert!(matches!(
            validate_gas_estimation(&json!({})),
            Err(Error::GasEstimation(_))
        ));
        let missing = json!({ "preVerificationGas": "0x1", "verificationGasLimit": "0x1" });
        assert!(matches!(
            validate_gas_estimation(&missing),
            Err(Error::GasEstimation(m)) if m.contains("callGasLimit")
        ));
    }

    #[test]
    fn validate_reads_optional_paymaster_limits() {
        let est = validate_gas_estimation(&json!({
            "preVerificationGas": "0x1",
            "verificationGasLimit": "0x2",
            "callGasLimit": "0x3",
            "paymasterVerificationGasLimit": "0x4",
        }))
        .unwrap();
        assert_eq!(est.call_gas_limit, U128::from(3));
        assert_eq!(est.paymaster_verification_gas_limit, Some(U128::from(4)));
        assert_eq!(est.paymaster_post_op_gas_limit, None);
    }

    #[test]
    fn default_estimation_is_fixed() {
        let d = default_gas_estimation();
        assert_eq!(d.pre_verification_gas, U256::from(0xf423f));
        assert_eq!(d.verification_gas_limit, U128::from(0xf423f));
        assert_eq!(d.call_gas_limit, U128::from(0xf423f));
    }

    #[tokio::test]
    async fn pimlico_uses_standard_tier() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "pimlico_getUserOperationGasPrice",
            json!({
                "slow": { "maxFeePerGas": "0x1", "maxPriorityFeePerGas": "0x1" },
                "standard": { "maxFeePerGas": "0x64", "maxPriorityFeePerGas": "0xa" },
                "fast": { "maxFeePerGas": "0xc8", "maxPriorityFeePerGas": "0x14" },
            }),
            1,
        )
        .await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 1).await;

        let rpc = RpcProvider::new(server.uri());
        let gas = PimlicoGasPricing::new()
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();

        assert_eq!(gas.max_fee_per_gas, U128::from(100));
        assert_eq!(gas.max_priority_fee_per_gas, U128::from(10));
        assert_eq!(gas.pre_verification_gas, U256::from(50_000));
        assert_eq!(gas.verification_gas_limit, U128::from(100_000));
        assert_eq!(gas.call_gas_limit, U128::from(200_000));
        assert_eq!(gas.paymaster_verification_gas_limit, None);
        // the draft sent for estimation already carries the fee
        assert_eq!(estimated_max_fee(&server).await, json!("0x64"));
    }

    #[tokio::test]
    async fn pimlico_invalid_price_fails_before_estimation() {
        let server = MockServer::start().await;
        mock_method(&server, "pimlico_getUserOperationGasPrice", json!({ "standard": {} }), 1).await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 0).await;

        let rpc = RpcProvider::new(server.uri());
        let err = PimlicoGasPricing::new()
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VendorPrecondition { vendor: "pimlico", .. }));
    }

    #[tokio::test]
    async fn pimlico_missing_priority_fee_fails_before_estimation() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "pimlico_getUserOperationGasPrice",
            json!({ "standard": { "maxFeePerGas": "0x64", "maxPriorityFeePerGas": null } }),
            1,
        )
        .await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 0).await;

        let rpc = RpcProvider::new(server.uri());
        let err = PimlicoGasPricing::new()
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VendorPrecondition { vendor: "pimlico", message } if message.contains("maxPriorityFeePerGas")
        ));
    }

    #[tokio::test]
    async fn pimlico_accepts_explicit_zero_priority_fee() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "pimlico_getUserOperationGasPrice",
            json!({ "standard": { "maxFeePerGas": "0x64", "maxPriorityFeePerGas": "0x0" } }),
            1,
        )
        .await;

        let rpc = RpcProvider::new(server.uri());
        let gas = PimlicoGasPricing::new()
            .with_skip_estimation(true)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();
        assert_eq!(gas.max_fee_per_gas, U128::from(100));
        assert!(gas.max_priority_fee_per_gas.is_zero());
    }

    #[tokio::test]
    async fn pimlico_rejects_max_fee_rounded_to_zero() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "pimlico_getUserOperationGasPrice",
            json!({ "standard": { "maxFeePerGas": "0x1", "maxPriorityFeePerGas": "0x0" } }),
            1,
        )
        .await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 0).await;

        let rpc = RpcProvider::new(server.uri());
        let err = PimlicoGasPricing::new()
            .with_multiplier_bps(5_000)
            .with_skip_estimation(true)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::VendorPrecondition { vendor: "pimlico", message } if message.contains("zero")
        ));
    }

    #[tokio::test]
    async fn pimlico_max_fee_never_below_priority() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "pimlico_getUserOperationGasPrice",
            json!({ "standard": { "maxFeePerGas": "0x5", "maxPriorityFeePerGas": "0x9" } }),
            1,
        )
        .await;

        let rpc = RpcProvider::new(server.uri());
        let gas = PimlicoGasPricing::new()
            .with_skip_estimation(true)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();
        assert_eq!(gas.max_fee_per_gas, U128::from(9));
    }

    #[tokio::test]
    async fn alchemy_adds_priority_to_scaled_base() {
        let server = MockServer::start().await;
        mock_method(&server, "eth_gasPrice", json!("0x64"), 1).await;
        mock_method(&server, "rundler_maxPriorityFeePerGas", json!("0xa"), 1).await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 1).await;

        let rpc = RpcProvider::new(server.uri());
        let gas = Eip1559GasPricing::alchemy()
            .with_multiplier_bps(15_000)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();

        // 100 * 1.5 + 10
        assert_eq!(gas.max_fee_per_gas, U128::from(160));
        assert_eq!(gas.max_priority_fee_per_gas, U128::from(10));
        assert_eq!(estimated_max_fee(&server).await, json!("0xa0"));
    }

    #[tokio::test]
    async fn standard_reads_latest_block_base_fee() {
        let server = MockServer::start().await;
        mock_method(
            &server,
            "eth_getBlockByNumber",
            json!({ "number": "0x10", "baseFeePerGas": "0x32" }),
            1,
        )
        .await;
        mock_method(&server, "eth_maxPriorityFeePerGas", json!("0x2"), 1).await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 1).await;

        let rpc = RpcProvider::new(server.uri());
        let gas = Eip1559GasPricing::standard()
            .with_multiplier_bps(20_000)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();
        assert_eq!(gas.max_fee_per_gas, U128::from(102));
        assert!(gas.max_fee_per_gas >= gas.max_priority_fee_per_gas);
    }

    #[tokio::test]
    async fn zero_gas_price_is_a_precondition_error() {
        let server = MockServer::start().await;
        mock_method(&server, "eth_gasPrice", json!("0x0"), 1).await;
        mock_method(&server, "rundler_maxPriorityFeePerGas", json!("0xa"), 0..=1).await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 0).await;

        let rpc = RpcProvider::new(server.uri());
        let err = Eip1559GasPricing::alchemy()
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::VendorPrecondition { vendor: "alchemy", .. }));
    }

    #[tokio::test]
    async fn missing_estimate_field_is_gas_estimation_error() {
        let server = MockServer::start().await;
        mock_method(&server, "eth_gasPrice", json!("0x64"), 1).await;
        mock_method(&server, "rundler_maxPriorityFeePerGas", json!("0xa"), 1).await;
        mock_method(
            &server,
            "eth_estimateUserOperationGas",
            json!({ "preVerificationGas": "0x1", "callGasLimit": "0x1" }),
            1,
        )
        .await;

        let rpc = RpcProvider::new(server.uri());
        let err = Eip1559GasPricing::alchemy()
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GasEstimation(m) if m.contains("verificationGasLimit")));
    }

    #[tokio::test]
    async fn skip_estimation_uses_fixed_limits() {
        let server = MockServer::start().await;
        mock_method(&server, "eth_gasPrice", json!("0x64"), 1).await;
        mock_method(&server, "rundler_maxPriorityFeePerGas", json!("0xa"), 1).await;
        mock_method(&server, "eth_estimateUserOperationGas", estimate_response(), 0).await;

        let rpc = RpcProvider::new(server.uri());
        let gas = Eip1559GasPricing::alchemy()
            .with_skip_estimation(true)
            .get_gas_values(&rpc, &draft())
            .await
            .unwrap();
        assert_eq!(gas.pre_verification_gas, U256::from(DEFAULT_GAS_LIMIT));
        assert_eq!(gas.verification_gas_limit, U128::from(DEFAULT_GAS_LIMIT));
        assert_eq!(gas.call_gas_limit, U128::from(DEFAULT_GAS_LIMIT));
    }
}
