//! Catalog of chains the tip jar knows how to talk about.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::agent::{AddChainParams, AgentError, SigningAgent};
use crate::connection::ConnectionManager;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: Cow<'static, str>,
    pub symbol: Cow<'static, str>,
    pub decimals: u8,
}

impl NativeCurrency {
    pub const fn ether() -> Self {
        Self {
            name: Cow::Borrowed("ETH"),
            symbol: Cow::Borrowed("ETH"),
            decimals: 18,
        }
    }

    pub const fn avax() -> Self {
        Self {
            name: Cow::Borrowed("AVAX"),
            symbol: Cow::Borrowed("AVAX"),
            decimals: 18,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkKey {
    EthereumMainnet,
    Sepolia,
    AvalancheMainnet,
    AvalancheFuji,
}

impl NetworkKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EthereumMainnet => "ethereum-mainnet",
            Self::Sepolia => "sepolia",
            Self::AvalancheMainnet => "avalanche-mainnet",
            Self::AvalancheFuji => "avalanche-fuji",
        }
    }
}

impl fmt::Display for NetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network {0:?}")]
pub struct UnknownNetwork(String);

impl FromStr for NetworkKey {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        catalog()
            .iter()
            .map(|n| n.key)
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownNetwork(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedNetwork {
    pub key: NetworkKey,
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub currency: NativeCurrency,
}

impl SupportedNetwork {
    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    pub fn add_chain_params(&self) -> Result<AddChainParams, url::ParseError> {
        Ok(AddChainParams {
            chain_id: self.hex_chain_id(),
            chain_name: self.name.to_string(),
            rpc_urls: vec![Url::parse(self.rpc_url)?],
            block_explorer_urls: vec![Url::parse(self.explorer_url)?],
            native_currency: self.currency.clone(),
        })
    }
}

static CATALOG: [SupportedNetwork; 4] = [
    SupportedNetwork {
        key: NetworkKey::EthereumMainnet,
        chain_id: 1,
        name: "Ethereum Mainnet",
        rpc_url: "https://mainnet.infura.io/v3/",
        explorer_url: "https://etherscan.io",
        currency: NativeCurrency::ether(),
    },
    SupportedNetwork {
        key: NetworkKey::Sepolia,
        chain_id: 11155111,
        name: "Sepolia Test Network",
        rpc_url: "https://sepolia.infura.io/v3/",
        explorer_url: "https://sepolia.etherscan.io",
        currency: NativeCurrency::ether(),
    },
    SupportedNetwork {
        key: NetworkKey::AvalancheMainnet,
        chain_id: 43114,
        name: "Avalanche Mainnet",
        rpc_url: "https://api.avax.network/ext/bc/C/rpc",
        explorer_url: "https://snowtrace.io",
        currency: NativeCurrency::avax(),
    },
    SupportedNetwork {
        key: NetworkKey::AvalancheFuji,
        chain_id: 43113,
        name: "Avalanche Fuji Testnet",
        rpc_url: "https://api.avax-test.network/ext/bc/C/rpc",
        explorer_url: "https://testnet.snowtrace.io",
        currency: NativeCurrency::avax(),
    },
];

pub fn catalog() -> &'static [SupportedNetwork] {
    &CATALOG
}

pub fn resolve(chain_id: u64) -> Option<&'static SupportedNetwork> {
    CATALOG.iter().find(|n| n.chain_id == chain_id)
}

pub fn get(key: NetworkKey) -> &'static SupportedNetwork {
    CATALOG
        .iter()
        .find(|n| n.key == key)
        .expect("every key has a catalog entry")
}

/// Display name of a chain, known or not.
pub fn network_name(chain_id: u64) -> String {
    match resolve(chain_id) {
        Some(n) => n.name.to_string(),
        None => format!("network {chain_id}"),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SwitchError {
    #[error("wallet not connected")]
    NotConnected,

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("invalid chain definition: {0}")]
    InvalidDefinition(#[from] url::ParseError),
}

/// Ask the connected wallet to make `key` its active chain.
///
/// Wallets that have never heard of the chain get its definition registered
/// instead, which activates it as well.
pub async fn request_switch(conn: &ConnectionManager, key: NetworkKey) -> Result<(), SwitchError> {
    let Some(session) = conn.session() else {
        return Err(SwitchError::NotConnected);
    };
    switch_to(session.agent().as_ref(), get(key)).await
}

pub(crate) async fn switch_to(
    agent: &dyn SigningAgent,
    network: &SupportedNetwork,
) -> Result<(), SwitchError> {
    debug!(chain = %network.chain_id, name = %network.name, "requesting chain switch");
    match agent.switch_chain(network.chain_id).await {
        Ok(()) => Ok(()),
        Err(err) if err.is_unrecognized_chain() => {
            info!(chain = %network.chain_id, "chain unknown to wallet, registering it");
            let params = network.add_chain_params()?;
            agent.add_chain(&params).await?;
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
