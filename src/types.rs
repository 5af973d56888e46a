use crate::encoding;
use crate::error::{Error, Result};
use ethers::types::{Address, Bytes, Log, TransactionReceipt, H256, U128, U256};
use serde::{Deserialize, Serialize};

/// One call the smart account should make.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl Execution {
    pub fn new(to: Address, value: U256, data: Bytes) -> Self {
        Self { to, value, data }
    }
}

/// ERC-4337 UserOperation (EntryPoint v0.7, unpacked RPC layout).
///
/// This is the record the pipeline fills in stage by stage and the shape bundlers
/// accept over JSON-RPC. Numeric fields serialize as hex quantities; every numeric
/// field starts at zero and is valid to send as-is.
///
/// `factory`/`factory_data` and `paymaster`/`paymaster_data` are set in pairs; use
/// [`UserOperation::set_init_code`] and [`UserOperation::set_paymaster`] to keep them so.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserOperation {
    pub sender: Address,
    /// Opaque to this crate; account implementations derive it from their nonce key.
    pub nonce: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U128,
    pub verification_gas_limit: U128,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    pub paymaster_verification_gas_limit: U128,
    pub paymaster_post_op_gas_limit: U128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperation {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            ..Default::default()
        }
    }

    /// Split `initCode` into factory address (first 20 bytes) and factory data.
    /// Empty init code clears both.
    pub fn set_init_code(&mut self, init_code: &[u8]) -> Result<()> {
        if init_code.is_empty() {
            self.factory = None;
            self.factory_data = None;
            return Ok(());
        }
        if init_code.len() < Address::len_bytes() {
            return Err(Error::Account(anyhow::anyhow!(
                "init code is {} bytes, shorter than a factory address",
                init_code.len()
            )));
        }
        let (factory, data) = init_code.split_at(Address::len_bytes());
        self.factory = Some(Address::from_slice(factory));
        self.factory_data = Some(Bytes::from(data.to_vec()));
        Ok(())
    }

    /// Set or clear the paymaster pair. A paymaster without data gets empty data.
    pub fn set_paymaster(&mut self, paymaster: Option<Address>, data: Option<Bytes>) {
        match paymaster {
            Some(pm) => {
                self.paymaster = Some(pm);
                self.paymaster_data = Some(data.unwrap_or_default());
            }
            None => {
                self.paymaster = None;
                self.paymaster_data = None;
            }
        }
    }

    /// Overwrite the fee and gas-limit fields.
    ///
    /// Paymaster gas limits are only replaced when the estimate carries them.
    pub fn apply_gas_values(&mut self, gas: &GasValues) {
        self.max_fee_per_gas = gas.max_fee_per_gas;
        self.max_priority_fee_per_gas = gas.max_priority_fee_per_gas;
        self.pre_verification_gas = gas.pre_verification_gas;
        self.verification_gas_limit = gas.verification_gas_limit;
        self.call_gas_limit = gas.call_gas_limit;
        if let Some(limit) = gas.paymaster_verification_gas_limit {
            self.paymaster_verification_gas_limit = limit;
        }
        if let Some(limit) = gas.paymaster_post_op_gas_limit {
            self.paymaster_post_op_gas_limit = limit;
        }
    }

    pub fn pack(&self) -> PackedUserOperation {
        encoding::pack_user_op(self)
    }

    /// The hash the account signs and the bundler reports back.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        encoding::get_user_op_hash(&self.pack(), entry_point, chain_id)
    }
}

/// The on-chain `PackedUserOperation` struct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackedUserOperation {
    pub sender: Address,
    pub nonce: U256,
    /// `factory ++ factoryData`, or empty.
    pub init_code: Bytes,
    pub call_data: Bytes,
    /// `verificationGasLimit (16 bytes) ++ callGasLimit (16 bytes)`.
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    /// `maxPriorityFeePerGas (16 bytes) ++ maxFeePerGas (16 bytes)`.
    pub gas_fees: H256,
    /// `paymaster ++ verificationGas (16) ++ postOpGas (16) ++ paymasterData`, or empty.
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl PackedUserOperation {
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> H256 {
        encoding::get_user_op_hash(self, entry_point, chain_id)
    }
}

/// Fee fields and gas limits produced by a gas-pricing strategy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasValues {
    pub max_fee_per_gas: U128,
    pub max_priority_fee_per_gas: U128,
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U128,
    pub call_gas_limit: U128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U128>,
}

/// Result of `eth_getUserOperationReceipt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: H256,
    #[serde(default)]
    pub entry_point: Address,
    pub sender: Address,
    #[serde(default)]
    pub nonce: U256,
    #[serde(default)]
    pub paymaster: Option<Address>,
    pub actual_gas_used: U256,
    pub actual_gas_cost: U256,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
    pub receipt: TransactionReceipt,
}
