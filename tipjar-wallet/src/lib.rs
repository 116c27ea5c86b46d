//! Everything between the tip jar and the wallet that signs for it.
//!
//! A [`SigningAgent`] is the wallet capability (browser-injected in a web
//! page, [`RpcAgent`] natively). The [`ConnectionManager`] owns the session
//! negotiated with it, and [`networks`] knows which chains we can ask it to
//! switch to.

mod agent;
mod connection;
mod listeners;
mod rpc;

pub mod networks;

pub use agent::{
    AccountsListener, AddChainParams, AgentError, ChainListener, Receipt, SigningAgent, codes,
};
pub use connection::{
    ConnectError, ConnectionManager, ConnectionState, Discover, Reload, Session,
};
pub use listeners::{Listeners, Subscription};
pub use networks::{NativeCurrency, NetworkKey, SupportedNetwork, SwitchError};
pub use rpc::{RpcAgent, build_signer};
