use alloy::primitives::Address;
use tipjar_contract::ContractError;
use tipjar_ledger::LedgerError;
use tipjar_types::{AmountError, DonationWindow, Timestamp};
use tipjar_wallet::{ConnectError, SwitchError};

/// Coarse classification of [`Error`]s, by where they originate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No or an incompatible signing agent.
    Environment,
    /// Not connected, or connected to the wrong network or account.
    Session,
    /// Rejected locally, before anything was sent.
    Validation,
    /// The signing agent refused or could not take the request.
    Provider,
    /// The chain rejected the transaction or could not be reached.
    Chain,
    /// The off-chain ledger failed.
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no wallet detected")]
    ProviderMissing,

    #[error("unsupported wallet")]
    WrongWalletKind,

    #[error("wallet not connected")]
    NotConnected,

    #[error("connected to chain {actual}, expected chain {expected}")]
    UnsupportedNetwork { expected: u64, actual: u64 },

    #[error("{0} is not the contract owner")]
    NotOwner(Address),

    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    #[error("amount {amount} is below the minimum of {min}")]
    BelowMinimum { amount: String, min: String },

    #[error("donations are not accepted at {now}")]
    OutsideDonationWindow {
        now: Timestamp,
        window: DonationWindow,
    },

    #[error("window start {start} is not before its end {end}")]
    InvalidTimeRange { start: Timestamp, end: Timestamp },

    #[error("request rejected by the user")]
    UserRejected,

    #[error("a wallet request is already pending")]
    RequestPending,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("contract reverted: {0}")]
    ContractReverted(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to load contract state: {0}")]
    Load(#[source] ContractError),

    #[error(transparent)]
    Contract(ContractError),

    #[error(transparent)]
    Switch(SwitchError),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProviderMissing | Self::WrongWalletKind => ErrorKind::Environment,
            Self::NotConnected | Self::UnsupportedNetwork { .. } | Self::NotOwner(_) => {
                ErrorKind::Session
            }
            Self::InvalidAmount(_)
            | Self::BelowMinimum { .. }
            | Self::OutsideDonationWindow { .. }
            | Self::InvalidTimeRange { .. } => ErrorKind::Validation,
            Self::UserRejected | Self::RequestPending | Self::Wallet(_) | Self::Switch(_) => {
                ErrorKind::Provider
            }
            Self::InsufficientFunds
            | Self::ContractReverted(_)
            | Self::Network(_)
            | Self::Load(_)
            | Self::Contract(_) => ErrorKind::Chain,
            Self::Ledger(_) => ErrorKind::Persistence,
        }
    }

    /// A short message fit to show to the user.
    ///
    /// Revert data and other raw payloads stay out of it; log the error
    /// itself for those.
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderMissing => "Please install MetaMask to continue.".into(),
            Self::WrongWalletKind => "Please use MetaMask to connect.".into(),
            Self::NotConnected => "Please connect your wallet first.".into(),
            Self::UnsupportedNetwork { expected, .. } => format!(
                "Please switch to {}.",
                tipjar_wallet::networks::network_name(*expected)
            ),
            Self::NotOwner(_) => "Only the contract owner can do this.".into(),
            Self::InvalidAmount(AmountError::NotPositive) => {
                "Please enter an amount greater than zero.".into()
            }
            Self::InvalidAmount(_) => "Please enter a valid amount.".into(),
            Self::BelowMinimum { min, .. } => format!("The minimum tip is {min}."),
            Self::OutsideDonationWindow { .. } => "Donations are currently closed.".into(),
            Self::InvalidTimeRange { .. } => "The start time must be before the end time.".into(),
            Self::UserRejected => "You rejected the request.".into(),
            Self::RequestPending => {
                "A request is already pending, please check your wallet.".into()
            }
            Self::InsufficientFunds => "Insufficient funds to cover the amount and gas.".into(),
            Self::ContractReverted(reason) => format!("The contract rejected the transaction: {reason}"),
            Self::Network(_) => "Network error, please try again.".into(),
            Self::Load(_) => "Could not load contract data, please try again.".into(),
            Self::Contract(ContractError::Agent(e)) => {
                format!("The request failed: {}", e.message)
            }
            Self::Wallet(m) => format!("The request failed: {m}"),
            Self::Contract(_) | Self::Switch(_) => "The request failed, please try again.".into(),
            Self::Ledger(_) => "The tip could not be recorded.".into(),
        }
    }
}

impl From<ContractError> for Error {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Amount(e) => Self::InvalidAmount(e),
            ContractError::InsufficientFunds => Self::InsufficientFunds,
            ContractError::UserRejected => Self::UserRejected,
            ContractError::RequestPending => Self::RequestPending,
            ContractError::Reverted(r) => Self::ContractReverted(r),
            ContractError::Network(m) => Self::Network(m),
            other => Self::Contract(other),
        }
    }
}

impl From<ConnectError> for Error {
    fn from(err: ConnectError) -> Self {
        match err {
            ConnectError::ProviderMissing => Self::ProviderMissing,
            ConnectError::WrongWalletKind => Self::WrongWalletKind,
            ConnectError::UserRejected => Self::UserRejected,
            ConnectError::RequestAlreadyPending => Self::RequestPending,
            ConnectError::Unknown(m) => Self::Wallet(m),
        }
    }
}

impl From<SwitchError> for Error {
    fn from(err: SwitchError) -> Self {
        match err {
            SwitchError::NotConnected => Self::NotConnected,
            SwitchError::Agent(e) if e.is_user_rejected() => Self::UserRejected,
            SwitchError::Agent(e) if e.is_request_pending() => Self::RequestPending,
            other => Self::Switch(other),
        }
    }
}
