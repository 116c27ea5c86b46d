use alloy::primitives::Address;
use tipjar_contract::{TipJarContract, Transfer};
use tipjar_types::Timestamp;
use tipjar_wallet::{ConnectionManager, Receipt, Session};
use tracing::{debug, info, warn};

use crate::Error;
use crate::snapshot::{ContractSnapshot, SnapshotCache};

/// Result of the last ownership check, valid for one session epoch and
/// account.
#[derive(Debug, Clone, Copy)]
struct Gate {
    epoch: u64,
    account: Address,
    owner: Address,
}

/// A confirmed owner write.
#[derive(Debug)]
pub struct AdminOutcome<T> {
    pub value: T,
    /// Whether the cached snapshot was reloaded after the write.
    pub refreshed: bool,
}

/// Drives the owner's side: donation window and withdrawals.
///
/// Every operation first checks that the connected account is the
/// contract owner.
pub struct AdminOrchestrator {
    connection: ConnectionManager,
    contract: Address,
    chain_id: u64,
    cache: SnapshotCache,
    gate: Option<Gate>,
}

impl AdminOrchestrator {
    pub fn new(connection: ConnectionManager, contract: Address, chain_id: u64) -> Self {
        Self {
            connection,
            contract,
            chain_id,
            cache: SnapshotCache::new(),
            gate: None,
        }
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

    /// Whether the connected account owns the contract.
    ///
    /// The owner is fetched again whenever the account or the session
    /// behind it changes.
    pub async fn is_owner(&mut self) -> Result<bool, Error> {
        let session = self.session()?;
        Ok(self.owner_of(&session).await? == session.address())
    }

    async fn owner_of(&mut self, session: &Session) -> Result<Address, Error> {
        if let Some(g) = self.gate {
            if g.epoch == session.epoch() && g.account == session.address() {
                return Ok(g.owner);
            }
        }
        let owner = TipJarContract::new(self.contract, session).owner().await?;
        debug!(%owner, account = %session.address(), "fetched contract owner");
        self.gate = Some(Gate {
            epoch: session.epoch(),
            account: session.address(),
            owner,
        });
        Ok(owner)
    }

    async fn authorize(&mut self) -> Result<(Session, TipJarContract), Error> {
        let session = self.session()?;
        if self.owner_of(&session).await? != session.address() {
            warn!(account = %session.address(), "privileged operation refused");
            return Err(Error::NotOwner(session.address()));
        }
        let contract = TipJarContract::new(self.contract, &session);
        Ok((session, contract))
    }

    pub async fn refresh(&mut self) -> Result<&ContractSnapshot, Error> {
        let session = self.session()?;
        let contract = TipJarContract::new(self.contract, &session);
        self.cache
            .refresh(&contract, session.address())
            .await
            .map_err(Error::Load)
    }

    async fn refresh_after_write(&mut self, contract: &TipJarContract, account: Address) -> bool {
        match self.cache.refresh(contract, account).await {
            Ok(_) => true,
            Err(err) => {
                warn!(%err, "snapshot not refreshed after write");
                false
            }
        }
    }

    /// Only open for donations between `start` and `end` (inclusive).
    pub async fn set_donation_window(
        &mut self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<AdminOutcome<Receipt>, Error> {
        if start >= end {
            return Err(Error::InvalidTimeRange { start, end });
        }
        let (session, contract) = self.authorize().await?;
        let receipt = contract.set_donation_period(start, end).await?;
        info!(%start, %end, tx_hash = %receipt.transaction_hash, "donation window set");
        let refreshed = self.refresh_after_write(&contract, session.address()).await;
        Ok(AdminOutcome {
            value: receipt,
            refreshed,
        })
    }

    pub async fn disable_time_restriction(&mut self) -> Result<AdminOutcome<Receipt>, Error> {
        let (session, contract) = self.authorize().await?;
        let receipt = contract.disable_time_restriction().await?;
        info!(tx_hash = %receipt.transaction_hash, "time restriction disabled");
        let refreshed = self.refresh_after_write(&contract, session.address()).await;
        Ok(AdminOutcome {
            value: receipt,
            refreshed,
        })
    }

    /// Move the whole balance to the owner.
    pub async fn withdraw(&mut self) -> Result<AdminOutcome<Transfer>, Error> {
        let (session, contract) = self.authorize().await?;
        let transfer = contract.withdraw().await?;
        match &transfer.event {
            Some(e) => info!(amount = %e.amount, tx_hash = %transfer.receipt.transaction_hash, "funds withdrawn"),
            None => info!(tx_hash = %transfer.receipt.transaction_hash, "funds withdrawn"),
        }
        let refreshed = self.refresh_after_write(&contract, session.address()).await;
        Ok(AdminOutcome {
            value: transfer,
            refreshed,
        })
    }
}
