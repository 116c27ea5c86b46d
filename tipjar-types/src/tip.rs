use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

/// Off-chain metadata about an on-chain tip.
///
/// The transfer itself is authoritative; a missing record never
/// invalidates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TipRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub post_id: String,
    pub from_address: Address,
    pub to_address: Address,
    /// Decimal display amount, e.g. `"0.001"`.
    pub amount: String,
    pub currency: String,
    pub transaction_hash: TxHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl TipRecord {
    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.post_id.trim().is_empty() {
            missing.push("post_id")
        }
        if self.from_address.is_zero() {
            missing.push("from_address")
        }
        if self.to_address.is_zero() {
            missing.push("to_address")
        }
        if self.amount.trim().is_empty() {
            missing.push("amount")
        }
        if self.transaction_hash.is_zero() {
            missing.push("transaction_hash")
        }
        missing
    }
}
