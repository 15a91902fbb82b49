//! Ethereum JSON-RPC implementation of [`ChainClient`].

use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes, U64, U128, U256};
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use url::Url;

use crate::{ChainClient, DeployError, DeployResult, HdWallet, LegacyTransaction, TxReceipt};

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between receipt polls while a transaction is pending.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Receipt polls before giving up on a pending transaction (~5 minutes).
const RECEIPT_POLL_ATTEMPTS: usize = 150;

/// JSON-RPC error code geth, anvil and hardhat use for execution reverts.
const EXECUTION_REVERTED_CODE: i64 = 3;

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> DeployResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| DeployError::Network(format!("failed to create HTTP client: {e}")))
}

/// Make a JSON-RPC call and deserialize the result.
///
/// Error responses that signal an execution revert become
/// [`DeployError::TransactionRevert`] with the node's message; everything else is a
/// [`DeployError::Network`].
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> DeployResult<T> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .map_err(|e| DeployError::Network(format!("failed to send {method} request: {e}")))?;

    let result: Value = response
        .json()
        .await
        .map_err(|e| DeployError::Network(format!("failed to parse {method} response: {e}")))?;

    if let Some(error) = result.get("error") {
        return Err(rpc_error(method, error));
    }

    let result_value = result
        .get("result")
        .cloned()
        .ok_or_else(|| DeployError::Network(format!("no result in {method} response")))?;

    serde_json::from_value(result_value)
        .map_err(|e| DeployError::Network(format!("failed to deserialize {method} result: {e}")))
}

/// Classify a JSON-RPC error object.
fn rpc_error(method: &str, error: &Value) -> DeployError {
    let code = error.get("code").and_then(Value::as_i64);
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    if code == Some(EXECUTION_REVERTED_CODE) || message.to_lowercase().contains("revert") {
        let message = match error.get("data") {
            Some(Value::String(data)) => format!("{message} (data: {data})"),
            _ => message.to_string(),
        };
        DeployError::TransactionRevert(message)
    } else {
        DeployError::Network(format!("RPC error on {method}: {message}"))
    }
}

/// Deserialize a u64 from a hex string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

/// Receipt as returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    contract_address: Option<Address>,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    status: u64,
}

/// Outcome of a single receipt poll.
#[derive(Debug)]
enum ReceiptPoll {
    Pending,
    Failed(DeployError),
}

/// [`ChainClient`] speaking Ethereum JSON-RPC.
///
/// Without a wallet the node holds the signer keys (`eth_sendTransaction`), as hardhat
/// and anvil nodes do. With an [`HdWallet`] the signers are the wallet's accounts and
/// transactions are signed locally and sent with `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct JsonRpcChain {
    client: reqwest::Client,
    url: Url,
    wallet: Option<HdWallet>,
}

impl JsonRpcChain {
    pub fn new(url: Url) -> DeployResult<Self> {
        Ok(Self {
            client: create_client()?,
            url,
            wallet: None,
        })
    }

    /// Sign transactions locally with `wallet` instead of relying on node-held keys.
    pub fn with_wallet(mut self, wallet: HdWallet) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub fn is_local_signer(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> DeployResult<T> {
        json_rpc_call(&self.client, &self.url, method, params).await
    }

    async fn poll_receipt(&self, tx_hash: B256) -> Result<RpcReceipt, ReceiptPoll> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", vec![serde_json::json!(tx_hash)])
            .await
            .map_err(ReceiptPoll::Failed)?;
        receipt.ok_or(ReceiptPoll::Pending)
    }

    /// Fill in nonce, gas price and gas limit for `request`, sign it with the wallet
    /// key of `from` and submit it raw.
    async fn send_signed(
        &self,
        wallet: &HdWallet,
        from: Address,
        to: Option<Address>,
        data: Bytes,
        request: Value,
    ) -> DeployResult<B256> {
        let chain_id = self.chain_id().await?;
        let nonce: U64 = self
            .call(
                "eth_getTransactionCount",
                vec![serde_json::json!(from), serde_json::json!("pending")],
            )
            .await?;
        let gas_price: U128 = self.call("eth_gasPrice", vec![]).await?;
        let gas_limit: U64 = self.call("eth_estimateGas", vec![request]).await?;

        let tx = LegacyTransaction {
            nonce: nonce.to(),
            gas_price: gas_price.to(),
            gas_limit: gas_limit.to(),
            to,
            value: U256::ZERO,
            input: data,
            chain_id,
        };
        tracing::debug!(
            from = %from,
            nonce = tx.nonce,
            gas_price = tx.gas_price,
            gas_limit = tx.gas_limit,
            "Signing transaction locally"
        );

        let raw = wallet.sign_transaction(from, &tx)?;
        self.call("eth_sendRawTransaction", vec![serde_json::json!(raw)]).await
    }

    /// Submit a transaction and wait until it is mined.
    ///
    /// Only the receipt lookup is repeated; the transaction itself is sent once.
    async fn transact(
        &self,
        from: Address,
        to: Option<Address>,
        data: Bytes,
    ) -> DeployResult<TxReceipt> {
        let mut request = serde_json::json!({
            "from": from,
            "data": &data,
        });
        if let Some(to) = to {
            request["to"] = serde_json::json!(to);
        }

        let tx_hash: B256 = match &self.wallet {
            Some(wallet) => self.send_signed(wallet, from, to, data, request).await?,
            None => self.call("eth_sendTransaction", vec![request]).await?,
        };
        tracing::info!(tx_hash = %tx_hash, "Transaction sent, waiting for receipt...");

        let receipt = (|| self.poll_receipt(tx_hash))
            .retry(
                ConstantBuilder::default()
                    .with_delay(RECEIPT_POLL_INTERVAL)
                    .with_max_times(RECEIPT_POLL_ATTEMPTS),
            )
            .when(|poll| matches!(poll, ReceiptPoll::Pending))
            .notify(|_, _| tracing::trace!(tx_hash = %tx_hash, "Receipt pending, retrying..."))
            .await
            .map_err(|poll| match poll {
                ReceiptPoll::Pending => {
                    DeployError::Network(format!("timeout waiting for receipt of {tx_hash}"))
                }
                ReceiptPoll::Failed(e) => e,
            })?;

        if receipt.status != 1 {
            return Err(DeployError::TransactionRevert(format!(
                "transaction {} failed in block {}",
                receipt.transaction_hash, receipt.block_number
            )));
        }

        tracing::debug!(
            tx_hash = %receipt.transaction_hash,
            block_number = receipt.block_number,
            "Transaction mined"
        );

        Ok(TxReceipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            contract_address: receipt.contract_address,
        })
    }
}

impl ChainClient for JsonRpcChain {
    async fn chain_id(&self) -> DeployResult<u64> {
        let chain_id: U64 = self.call("eth_chainId", vec![]).await?;
        Ok(chain_id.to())
    }

    async fn accounts(&self) -> DeployResult<Vec<Address>> {
        match &self.wallet {
            Some(wallet) => Ok(wallet.addresses()),
            None => self.call("eth_accounts", vec![]).await,
        }
    }

    async fn deploy_contract(&self, from: Address, init_code: Bytes) -> DeployResult<TxReceipt> {
        let receipt = self.transact(from, None, init_code).await?;

        if receipt.contract_address.is_none() {
            return Err(DeployError::Network(format!(
                "receipt of {} has no contract address",
                receipt.transaction_hash
            )));
        }
        Ok(receipt)
    }

    async fn send_transaction(
        &self,
        from: Address,
        to: Address,
        data: Bytes,
    ) -> DeployResult<TxReceipt> {
        self.transact(from, Some(to), data).await
    }
}
