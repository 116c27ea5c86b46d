use std::fmt;

use alloy::primitives::{Address, U256};
use tipjar_contract::{ContractError, TipJarContract, TopDonor};
use tipjar_types::{DonationWindow, Timestamp, WindowStatus, format_amount, short_address};
use tracing::{debug, warn};

/// Point-in-time read of the tip jar, as seen from one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSnapshot {
    pub account: Address,
    pub total_donations: U256,
    pub contract_balance: U256,
    pub my_donation: U256,
    /// The raw leaderboard, empty slots included.
    pub top_donors: [TopDonor; 3],
    pub window: DonationWindow,
}

impl ContractSnapshot {
    /// Issue all reads concurrently. Fails if any of them does.
    pub async fn load(contract: &TipJarContract, account: Address) -> Result<Self, ContractError> {
        let (total_donations, contract_balance, my_donation, top_donors, window) = tokio::try_join!(
            contract.total_donations(),
            contract.contract_balance(),
            contract.donation_of(account),
            contract.top_donors(),
            contract.time_window(),
        )?;
        Ok(Self {
            account,
            total_donations,
            contract_balance,
            my_donation,
            top_donors,
            window,
        })
    }

    /// Leaderboard entries that hold an actual donor.
    pub fn leaders(&self) -> impl Iterator<Item = &TopDonor> {
        self.top_donors.iter().filter(|d| !d.is_empty())
    }

    pub fn view(&self, decimals: u8) -> SnapshotView {
        SnapshotView {
            total_donations: format_amount(self.total_donations, decimals),
            contract_balance: format_amount(self.contract_balance, decimals),
            my_donation: format_amount(self.my_donation, decimals),
            top_donors: self
                .leaders()
                .map(|d| DonorView {
                    address: short_address(&d.address),
                    amount: format_amount(d.amount, decimals),
                })
                .collect(),
            window: self.window,
        }
    }
}

/// Display form of a [`ContractSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotView {
    pub total_donations: String,
    pub contract_balance: String,
    pub my_donation: String,
    pub top_donors: Vec<DonorView>,
    pub window: DonationWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorView {
    pub address: String,
    pub amount: String,
}

impl SnapshotView {
    pub fn window_status(&self, now: Timestamp) -> WindowStatus {
        self.window.status(now)
    }
}

impl fmt::Display for SnapshotView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "total donations:  {}", self.total_donations)?;
        writeln!(f, "contract balance: {}", self.contract_balance)?;
        writeln!(f, "my donation:      {}", self.my_donation)?;
        if self.window.enabled {
            writeln!(
                f,
                "donation window:  {} .. {}",
                self.window.start, self.window.end
            )?;
        } else {
            writeln!(f, "donation window:  unrestricted")?;
        }
        for (i, d) in self.top_donors.iter().enumerate() {
            writeln!(f, "#{} {} {}", i + 1, d.address, d.amount)?;
        }
        Ok(())
    }
}

/// The last snapshot that loaded completely.
///
/// A failed refresh leaves the previous snapshot in place.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: Option<ContractSnapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached snapshot, if it was taken for `account`.
    pub fn get(&self, account: Address) -> Option<&ContractSnapshot> {
        self.current.as_ref().filter(|s| s.account == account)
    }

    pub fn latest(&self) -> Option<&ContractSnapshot> {
        self.current.as_ref()
    }

    pub async fn refresh(
        &mut self,
        contract: &TipJarContract,
        account: Address,
    ) -> Result<&ContractSnapshot, ContractError> {
        match ContractSnapshot::load(contract, account).await {
            Ok(s) => {
                debug!(%account, total = %s.total_donations, "snapshot refreshed");
                Ok(self.current.insert(s))
            }
            Err(err) => {
                warn!(%account, %err, "snapshot refresh failed, keeping previous");
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.current = None
    }
}
