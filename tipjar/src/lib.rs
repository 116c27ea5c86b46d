//! Coordinates a wallet and the tip jar contract on behalf of visitors
//! tipping posts, and of the owner administering the jar.

mod admin;
mod error;
mod snapshot;
mod tipping;

pub mod logging;

pub use admin::{AdminOrchestrator, AdminOutcome};
pub use error::{Error, ErrorKind};
pub use snapshot::{ContractSnapshot, DonorView, SnapshotCache, SnapshotView};
pub use tipping::{
    Clock, SystemClock, TipOutcome, TipRequest, TipRequestBuilder, TipState, TippingOrchestrator,
    TippingOrchestratorBuilder,
};

pub use tipjar_config as config;
pub use tipjar_contract as contract;
pub use tipjar_ledger as ledger;
pub use tipjar_types as types;
pub use tipjar_wallet as wallet;
