use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;
use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{ChainConfig, ConfigError, read_toml, write_toml};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "kebab-case")]
pub struct TipJarConfig {
    pub chain: ChainConfig,
    pub contract: ContractConfig,
    pub ledger: LedgerConfig,
    pub tipping: TippingConfig,
}

impl TipJarConfig {
    pub async fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        read_toml(path).await
    }

    pub async fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        write_toml(self, path).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "kebab-case")]
pub struct ContractConfig {
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "kebab-case")]
pub struct LedgerConfig {
    /// Base URL of the tips and posts API.
    pub base_url: Url,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    #[builder(default = default_timeout())]
    pub timeout: u64,
}

impl LedgerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "kebab-case")]
pub struct TippingConfig {
    /// Recorded as recipient of every tip.
    pub author_address: Address,

    #[serde(default = "default_currency")]
    #[builder(default = default_currency(), into)]
    pub currency: String,

    /// Smallest amount accepted, in display units.
    #[serde(default = "default_min_amount")]
    #[builder(default = default_min_amount(), into)]
    pub min_amount: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_currency() -> String {
    "ETH".to_string()
}

fn default_min_amount() -> String {
    "0.001".to_string()
}
