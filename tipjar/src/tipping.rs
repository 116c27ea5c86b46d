use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use bon::Builder;
use tipjar_contract::{TipJarContract, Transfer};
use tipjar_ledger::TipLedger;
use tipjar_types::{ETHER_DECIMALS, Timestamp, TipRecord, format_amount, parse_amount};
use tipjar_wallet::{ConnectionManager, Session};
use tracing::{debug, info, warn};

use crate::Error;
use crate::snapshot::{ContractSnapshot, SnapshotCache};

/// Source of the current time for donation window checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipState {
    Idle,
    Loading,
    Ready(ContractSnapshot),
    Submitting,
    Settled(TxHash),
    /// User facing message of the last failure.
    Failed(String),
}

#[derive(Debug, Clone, Builder)]
pub struct TipRequest {
    #[builder(into)]
    pub post_id: String,
    #[builder(into)]
    pub post_title: String,
    /// Decimal amount of the native currency, e.g. `"0.001"`.
    #[builder(into)]
    pub amount: String,
    #[builder(into)]
    pub message: Option<String>,
}

impl TipRequest {
    fn message(&self) -> String {
        match &self.message {
            Some(m) if !m.trim().is_empty() => m.clone(),
            _ => format!("Tip for post: {}", self.post_title),
        }
    }
}

#[derive(Debug)]
pub struct TipOutcome {
    pub transfer: Transfer,
    pub amount: U256,
    /// The ledger entry as stored, or `None` if recording failed.
    pub record: Option<TipRecord>,
    /// Whether the snapshot reflects the tip.
    pub refreshed: bool,
}

/// Drives the visitor's side: show the jar, send a tip, record it.
#[derive(Builder)]
pub struct TippingOrchestrator {
    connection: ConnectionManager,
    contract: Address,
    /// The only chain tips are accepted on.
    chain_id: u64,
    ledger: Arc<dyn TipLedger>,
    /// Recipient recorded in the ledger.
    author: Address,
    #[builder(default = U256::from(1_000_000_000_000_000u64))]
    min_amount: U256,
    #[builder(default = String::from("ETH"), into)]
    currency: String,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    #[builder(skip)]
    cache: SnapshotCache,
    #[builder(skip = TipState::Idle)]
    state: TipState,
}

impl TippingOrchestrator {
    pub fn state(&self) -> &TipState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&ContractSnapshot> {
        self.cache.latest()
    }

    fn session(&self) -> Result<Session, Error> {
        let session = self.connection.session().ok_or(Error::NotConnected)?;
        if session.chain_id() != self.chain_id {
            return Err(Error::UnsupportedNetwork {
                expected: self.chain_id,
                actual: session.chain_id(),
            });
        }
        Ok(session)
    }

    fn fail(&mut self, err: Error) -> Error {
        warn!(%err, kind = ?err.kind(), "tip failed");
        self.state = TipState::Failed(err.user_message());
        err
    }

    /// Re-read the contract state. On failure the previous snapshot stays.
    pub async fn refresh(&mut self) -> Result<&ContractSnapshot, Error> {
        let loaded = match self.session() {
            Ok(session) => {
                let contract = TipJarContract::new(self.contract, &session);
                self.load(&contract, session.address()).await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = loaded {
            return Err(self.fail(err));
        }
        self.cache.latest().ok_or(Error::NotConnected)
    }

    async fn load(&mut self, contract: &TipJarContract, account: Address) -> Result<(), Error> {
        self.state = TipState::Loading;
        let s = self
            .cache
            .refresh(contract, account)
            .await
            .map_err(Error::Load)?;
        self.state = TipState::Ready(s.clone());
        Ok(())
    }

    /// Send a tip and record it.
    ///
    /// Everything that can be checked locally is, before the wallet is
    /// asked for anything. Once the transfer is mined the tip counts: a
    /// failure to record it or to refresh the snapshot afterwards is
    /// logged and reported in the outcome, not as an error.
    pub async fn tip(&mut self, req: TipRequest) -> Result<TipOutcome, Error> {
        match self.send(req).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn send(&mut self, req: TipRequest) -> Result<TipOutcome, Error> {
        let session = self.session()?;
        let amount = parse_amount(&req.amount, ETHER_DECIMALS)?;
        if amount < self.min_amount {
            return Err(Error::BelowMinimum {
                amount: req.amount.trim().to_string(),
                min: format_amount(self.min_amount, ETHER_DECIMALS),
            });
        }

        let contract = TipJarContract::new(self.contract, &session);
        if self.cache.get(session.address()).is_none() {
            self.load(&contract, session.address()).await?;
        }
        let window = match self.cache.get(session.address()) {
            Some(s) => s.window,
            None => return Err(Error::NotConnected),
        };
        let now = self.clock.now();
        if !window.admits(now) {
            if window.is_inverted() {
                warn!(start = %window.start, end = %window.end, "donation window is inverted");
            }
            return Err(Error::OutsideDonationWindow { now, window });
        }

        self.state = TipState::Submitting;
        info!(post = %req.post_id, amount = %req.amount, from = %session.address(), "sending tip");
        let transfer = contract.donate_wei(amount).await?;
        let tx_hash = transfer.receipt.transaction_hash;

        let tip = TipRecord {
            id: None,
            post_id: req.post_id.clone(),
            from_address: session.address(),
            to_address: self.author,
            amount: format_amount(amount, ETHER_DECIMALS),
            currency: self.currency.clone(),
            transaction_hash: tx_hash,
            message: Some(req.message()),
            created_at: None,
        };
        let record = match self.ledger.append(&tip).await {
            Ok(r) => {
                debug!(%tx_hash, id = ?r.id, "tip recorded");
                Some(r)
            }
            Err(err) => {
                warn!(%tx_hash, %err, "failed to record tip, the transfer stands");
                None
            }
        };

        let refreshed = match self.cache.refresh(&contract, session.address()).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%tx_hash, %err, "snapshot not refreshed after tip");
                false
            }
        };
        self.state = TipState::Settled(tx_hash);
        info!(%tx_hash, "tip settled");
        Ok(TipOutcome {
            transfer,
            amount,
            record,
            refreshed,
        })
    }
}
