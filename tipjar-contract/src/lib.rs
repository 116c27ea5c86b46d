//! Tip jar contract bindings and the gateway orchestrators talk to.
//!
//! The on-chain interface is fixed: [`TipJar`] binds it, [`TipJarContract`]
//! drives it through a [`tipjar_wallet::SigningAgent`].

mod error;
mod gateway;
mod sol_types;

pub use error::ContractError;
pub use gateway::{TipJarContract, TopDonor, Transfer, TransferEvent};
pub use sol_types::TipJar;
