use alloy::primitives::{Address, Bytes, Log, TxHash};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::listeners::Subscription;
use crate::networks::NativeCurrency;

/// EIP-1193 and wallet specific error codes.
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    pub const REQUEST_PENDING: i64 = -32002;
    pub const INVALID_INPUT: i64 = -32000;
    pub const TRANSACTION_REJECTED: i64 = -32003;
    pub const INTERNAL: i64 = -32603;
}

/// An error reported by a signing agent, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("agent error {code}: {message}")]
pub struct AgentError {
    pub code: i64,
    pub message: String,
    /// Revert data, if the agent passed any along.
    pub data: Option<Bytes>,
}

impl AgentError {
    pub fn new<S: Into<String>>(code: i64, message: S) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = Some(data);
        self
    }

    pub fn user_rejected() -> Self {
        Self::new(codes::USER_REJECTED, "User rejected the request.")
    }

    pub fn disconnected<S: Into<String>>(message: S) -> Self {
        Self::new(codes::DISCONNECTED, message)
    }

    pub fn unrecognized_chain(id: u64) -> Self {
        Self::new(
            codes::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID {id:#x}. Try adding the chain first."),
        )
    }

    pub fn is_user_rejected(&self) -> bool {
        self.code == codes::USER_REJECTED
            || self.message.contains("User rejected")
            || self.message.contains("user rejected")
            || self.message.contains("ACTION_REJECTED")
    }

    pub fn is_request_pending(&self) -> bool {
        self.code == codes::REQUEST_PENDING
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == codes::UNRECOGNIZED_CHAIN
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self.code, codes::DISCONNECTED | codes::CHAIN_DISCONNECTED)
    }
}

/// Chain definition handed to `wallet_addEthereumChain` (EIP-3085).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddChainParams {
    /// Hex encoded, e.g. `"0xaa36a7"`.
    pub chain_id: String,
    pub chain_name: String,
    pub rpc_urls: Vec<Url>,
    pub block_explorer_urls: Vec<Url>,
    pub native_currency: NativeCurrency,
}

impl AddChainParams {
    pub fn numeric_chain_id(&self) -> Option<u64> {
        let hex = self.chain_id.strip_prefix("0x")?;
        u64::from_str_radix(hex, 16).ok()
    }
}

/// What an agent reports once a transaction has been included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: bool,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

pub type AccountsListener = Box<dyn Fn(&[Address]) + Send + Sync>;
pub type ChainListener = Box<dyn Fn(&u64) + Send + Sync>;

/// A wallet that holds keys and authorizes transactions on the user's behalf.
///
/// Nothing here can be assumed to be under our control: every request may be
/// rejected, left pending or answered with a different account or chain than
/// last time.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    /// Whether the agent speaks the MetaMask dialect (chain switching,
    /// chain registration, error code 4902).
    fn is_metamask(&self) -> bool;

    /// Ask for account access, prompting the user if necessary.
    async fn request_accounts(&self) -> Result<Vec<Address>, AgentError>;

    /// Accounts already authorized for us. Never prompts.
    async fn accounts(&self) -> Result<Vec<Address>, AgentError>;

    async fn chain_id(&self) -> Result<u64, AgentError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), AgentError>;

    async fn add_chain(&self, chain: &AddChainParams) -> Result<(), AgentError>;

    /// Execute a read-only call against the active chain.
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, AgentError>;

    /// Sign and submit, returning as soon as the agent hands back a hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, AgentError>;

    /// Wait, without a deadline, for the transaction to be included.
    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, AgentError>;

    fn on_accounts_changed(&self, listener: AccountsListener) -> Subscription;

    fn on_chain_changed(&self, listener: ChainListener) -> Subscription;
}
