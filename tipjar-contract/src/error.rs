use alloy::sol_types::{Revert, SolError};
use tipjar_types::AmountError;
use tipjar_wallet::AgentError;

#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("transaction rejected by the user")]
    UserRejected,

    #[error("a wallet request is already pending")]
    RequestPending,

    #[error("contract reverted: {0}")]
    Reverted(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode result of {call}: {source}")]
    Decode {
        call: &'static str,
        #[source]
        source: alloy::sol_types::Error,
    },

    #[error(transparent)]
    Agent(AgentError),
}

impl ContractError {
    pub(crate) fn decode(call: &'static str, source: alloy::sol_types::Error) -> Self {
        Self::Decode { call, source }
    }
}

impl From<AgentError> for ContractError {
    fn from(err: AgentError) -> Self {
        if err.is_user_rejected() {
            return Self::UserRejected;
        }
        if err.is_request_pending() {
            return Self::RequestPending;
        }
        if err.is_disconnected() {
            return Self::Network(err.message);
        }
        if err.message.to_lowercase().contains("insufficient funds") {
            return Self::InsufficientFunds;
        }
        if let Some(reason) = revert_reason(&err) {
            return Self::Reverted(reason);
        }
        Self::Agent(err)
    }
}

/// Extract a revert reason from the error data or, failing that, from the
/// node's message (`"execution reverted: <reason>"`).
fn revert_reason(err: &AgentError) -> Option<String> {
    if let Some(r) = err
        .data
        .as_deref()
        .and_then(|d| Revert::abi_decode(d).ok())
    {
        return Some(r.reason);
    }
    let (_, rest) = err.message.split_once("execution reverted")?;
    let reason = rest.trim_start_matches(':').trim();
    if reason.is_empty() {
        Some("execution reverted".to_string())
    } else {
        Some(reason.to_string())
    }
}
