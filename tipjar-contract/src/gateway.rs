use std::fmt;
use std::sync::Arc;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, Log, U256},
    rpc::types::TransactionRequest,
    sol_types::{SolCall, SolEvent},
};
use tipjar_types::{AmountError, DonationWindow, ETHER_DECIMALS, Timestamp, parse_amount};
use tipjar_wallet::{Receipt, Session, SigningAgent};
use tracing::{debug, info, warn};

use crate::{ContractError, TipJar};

/// One leaderboard slot as stored on chain. Unused slots hold the zero
/// address and a zero amount.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TopDonor {
    pub address: Address,
    pub amount: U256,
}

impl TopDonor {
    pub fn is_empty(&self) -> bool {
        self.address.is_zero() || self.amount.is_zero()
    }
}

/// A decoded `Donation` or `Withdrawal` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    /// The donor, or the owner for a withdrawal.
    pub account: Address,
    pub amount: U256,
    pub timestamp: Timestamp,
}

/// A mined value transfer and the event the contract emitted for it, if
/// the receipt carried one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub receipt: Receipt,
    pub event: Option<TransferEvent>,
}

/// Typed access to one deployed tip jar through a signing agent.
///
/// Writes wait for inclusion. Nothing is checked locally that the chain
/// enforces itself, e.g. ownership for `withdraw`.
#[derive(Clone)]
pub struct TipJarContract {
    address: Address,
    from: Address,
    agent: Arc<dyn SigningAgent>,
}

impl TipJarContract {
    pub fn new(address: Address, session: &Session) -> Self {
        Self::with_agent(address, session.address(), session.agent().clone())
    }

    pub fn with_agent(address: Address, from: Address, agent: Arc<dyn SigningAgent>) -> Self {
        Self {
            address,
            from,
            agent,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The account transactions are sent from.
    pub fn from(&self) -> Address {
        self.from
    }

    async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, ContractError> {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.address)
            .with_input(call.abi_encode());
        let out = self.agent.call(tx).await?;
        C::abi_decode_returns(&out).map_err(|e| ContractError::decode(C::SIGNATURE, e))
    }

    async fn transact<C: SolCall>(&self, call: C, value: U256) -> Result<Receipt, ContractError> {
        let tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(self.address)
            .with_value(value)
            .with_input(call.abi_encode());
        debug!(call = %C::SIGNATURE, %value, "submitting transaction");
        let tx_hash = self.agent.send_transaction(tx).await?;
        info!(%tx_hash, "waiting for tx to be mined");
        let receipt = self.agent.wait_for_receipt(tx_hash).await?;
        if !receipt.status {
            warn!(%tx_hash, call = %C::SIGNATURE, "transaction reverted");
            return Err(ContractError::Reverted("transaction reverted".to_string()));
        }
        info!(%receipt.gas_used, %tx_hash, "tx mined");
        Ok(receipt)
    }

    /// Donate a decimal amount of the native currency, e.g. `"0.001"`.
    pub async fn donate(&self, amount: &str) -> Result<Transfer, ContractError> {
        let wei = parse_amount(amount, ETHER_DECIMALS)?;
        self.donate_wei(wei).await
    }

    pub async fn donate_wei(&self, wei: U256) -> Result<Transfer, ContractError> {
        if wei.is_zero() {
            return Err(AmountError::NotPositive.into());
        }
        let receipt = self.transact(TipJar::donateCall {}, wei).await?;
        let event = find_event::<TipJar::Donation>(self.address, &receipt.logs).map(|e| {
            TransferEvent {
                account: e.donor,
                amount: e.amount,
                timestamp: e.timestamp.into(),
            }
        });
        Ok(Transfer { receipt, event })
    }

    /// Reverts on chain unless sent by the owner.
    pub async fn withdraw(&self) -> Result<Transfer, ContractError> {
        let receipt = self.transact(TipJar::withdrawCall {}, U256::ZERO).await?;
        let event = find_event::<TipJar::Withdrawal>(self.address, &receipt.logs).map(|e| {
            TransferEvent {
                account: e.owner,
                amount: e.amount,
                timestamp: e.timestamp.into(),
            }
        });
        Ok(Transfer { receipt, event })
    }

    pub async fn set_donation_period(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Receipt, ContractError> {
        let call = TipJar::setDonationPeriodCall {
            start: start.to_u256(),
            end: end.to_u256(),
        };
        self.transact(call, U256::ZERO).await
    }

    pub async fn disable_time_restriction(&self) -> Result<Receipt, ContractError> {
        self.transact(TipJar::disableTimeRestrictionCall {}, U256::ZERO)
            .await
    }

    pub async fn owner(&self) -> Result<Address, ContractError> {
        self.read(TipJar::ownerCall {}).await
    }

    /// Cumulative donations of `donor`, via the public mapping.
    pub async fn donation_of(&self, donor: Address) -> Result<U256, ContractError> {
        self.read(TipJar::donationsCall { donor }).await
    }

    /// Cumulative donations of `donor`, via the explicit getter.
    pub async fn get_donation(&self, donor: Address) -> Result<U256, ContractError> {
        self.read(TipJar::getDonationCall { donor }).await
    }

    pub async fn total_donations(&self) -> Result<U256, ContractError> {
        self.read(TipJar::totalDonationsCall {}).await
    }

    pub async fn contract_balance(&self) -> Result<U256, ContractError> {
        self.read(TipJar::getContractBalanceCall {}).await
    }

    /// The leaderboard verbatim, empty slots included.
    pub async fn top_donors(&self) -> Result<[TopDonor; 3], ContractError> {
        let donors = self.read(TipJar::getTopDonorsCall {}).await?;
        Ok(donors.map(|d| TopDonor {
            address: d.donorAddress,
            amount: d.amount,
        }))
    }

    pub async fn time_window(&self) -> Result<DonationWindow, ContractError> {
        let (enabled, start, end) = tokio::try_join!(
            self.read(TipJar::timeRestrictionEnabledCall {}),
            self.read(TipJar::startTimeCall {}),
            self.read(TipJar::endTimeCall {}),
        )?;
        Ok(DonationWindow {
            enabled,
            start: start.into(),
            end: end.into(),
        })
    }
}

impl fmt::Debug for TipJarContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TipJarContract")
            .field("address", &self.address)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// First `E` emitted by `contract` among `logs`.
fn find_event<E: SolEvent>(contract: Address, logs: &[Log]) -> Option<E> {
    logs.iter()
        .filter(|l| l.address == contract)
        .find_map(|l| E::decode_log(l).ok())
        .map(|l| l.data)
}
