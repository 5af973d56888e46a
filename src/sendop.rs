use crate::account::OperationBuilder;
use crate::bundler::Bundler;
use crate::error::{Error, Result};
use crate::paymaster::PaymasterBuilder;
use crate::types::{Execution, UserOperation, UserOperationReceipt};
use crate::ENTRY_POINT_V07;
use ethers::types::{Bytes, H256};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default delay between two `eth_getUserOperationReceipt` polls.
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Inputs of one [`sendop`] call.
pub struct SendOpOptions<'a, B> {
    pub bundler: B,
    pub executions: &'a [Execution],
    pub op_builder: &'a dyn OperationBuilder,
    /// `None` means the account pays for itself.
    pub pm_builder: Option<&'a dyn PaymasterBuilder>,
    /// `factory ++ factoryData`. Takes precedence over [`OperationBuilder::get_init_code`].
    pub init_code: Option<Bytes>,
}

impl<'a, B: Bundler> SendOpOptions<'a, B> {
    pub fn new(bundler: B, executions: &'a [Execution], op_builder: &'a dyn OperationBuilder) -> Self {
        Self {
            bundler,
            executions,
            op_builder,
            pm_builder: None,
            init_code: None,
        }
    }

    pub fn with_paymaster(mut self, pm_builder: &'a dyn PaymasterBuilder) -> Self {
        self.pm_builder = Some(pm_builder);
        self
    }

    pub fn with_init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = Some(init_code);
        self
    }
}

/// Build, price, sponsor, sign and submit one user operation.
///
/// Returns as soon as the bundler accepts the operation. The hash in the returned
/// handle is the one the account signed; use [`UserOperationHandle::wait`] for the
/// receipt.
pub async fn sendop<B: Bundler>(opts: SendOpOptions<'_, B>) -> Result<UserOperationHandle<B>> {
    let SendOpOptions {
        bundler,
        executions,
        op_builder,
        pm_builder,
        init_code,
    } = opts;

    // draft
    let (sender, nonce, call_data, dummy_signature) = tokio::try_join!(
        op_builder.get_sender(),
        op_builder.get_nonce(),
        op_builder.get_call_data(executions),
        op_builder.get_dummy_signature(),
    )?;
    let mut op = UserOperation::new(sender);
    let init_code = match init_code.filter(|c| !c.is_empty()) {
        Some(code) => Some(code),
        None => op_builder.get_init_code().await?,
    };
    if let Some(code) = init_code {
        op.set_init_code(&code)?;
    }
    op.nonce = nonce;
    op.call_data = call_data;
    op.signature = dummy_signature;
    tracing::debug!(sender = ?op.sender, nonce = %op.nonce, deploy = op.factory.is_some(), "draft user operation");

    // paymaster stub
    let mut is_final = false;
    if let Some(pm) = pm_builder {
        let stub = pm.get_paymaster_stub_data(&op).await?;
        op.set_paymaster(stub.paymaster, stub.paymaster_data);
        op.paymaster_verification_gas_limit = stub.paymaster_verification_gas_limit.unwrap_or_default();
        op.paymaster_post_op_gas_limit = stub.paymaster_post_op_gas_limit.unwrap_or_default();
        is_final = stub.is_final;
        tracing::debug!(paymaster = ?op.paymaster, is_final, "paymaster stub data");
    }

    // gas
    let gas = bundler.get_gas_values(&op).await?;
    op.apply_gas_values(&gas);
    tracing::debug!(
        max_fee_per_gas = %op.max_fee_per_gas,
        max_priority_fee_per_gas = %op.max_priority_fee_per_gas,
        pre_verification_gas = %op.pre_verification_gas,
        verification_gas_limit = %op.verification_gas_limit,
        call_gas_limit = %op.call_gas_limit,
        "gas values"
    );

    // paymaster final
    if let Some(pm) = pm_builder.filter(|_| !is_final) {
        if let Some(data) = pm.get_paymaster_data(&op).await? {
            op.set_paymaster(data.paymaster, data.paymaster_data);
            tracing::debug!(paymaster = ?op.paymaster, "paymaster final data");
        }
    }

    // sign
    let hash = op.hash(ENTRY_POINT_V07, bundler.chain_id());
    op.signature = op_builder.get_signature(hash).await?;

    // submit
    let reported = bundler.send_user_operation(&op).await?;
    if reported != hash {
        tracing::warn!(expected = ?hash, reported = ?reported, "bundler reported a different user operation hash");
    }
    tracing::info!(user_op_hash = ?hash, sender = ?op.sender, "user operation submitted");

    Ok(UserOperationHandle::new(hash, bundler))
}

/// A submitted user operation.
#[derive(Debug, Clone)]
pub struct UserOperationHandle<B> {
    hash: H256,
    bundler: B,
    poll_interval: Duration,
}

impl<B: Bundler> UserOperationHandle<B> {
    /// Track an operation submitted elsewhere.
    pub fn new(hash: H256, bundler: B) -> Self {
        Self {
            hash,
            bundler,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    pub fn hash(&self) -> H256 {
        self.hash
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Poll until the bundler reports a receipt.
    ///
    /// Never times out. Only a `null` receipt is retried; any error from the
    /// bundler ends the wait.
    pub async fn wait(&self) -> Result<UserOperationReceipt> {
        loop {
            if let Some(receipt) = self.bundler.get_user_operation_receipt(self.hash).await? {
                tracing::info!(
                    user_op_hash = ?self.hash,
                    success = receipt.success,
                    tx = ?receipt.receipt.transaction_hash,
                    "user operation included"
                );
                return Ok(receipt);
            }
            tracing::trace!(user_op_hash = ?self.hash, "receipt not available yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// [`wait`](Self::wait), stopping with [`Error::Cancelled`] once `token` fires.
    pub async fn wait_with_cancellation(&self, token: &CancellationToken) -> Result<UserOperationReceipt> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled(self.hash)),
            res = self.wait() => res,
        }
    }
}
