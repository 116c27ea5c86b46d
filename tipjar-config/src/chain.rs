use bon::Builder;
use serde::{Deserialize, Serialize};
use url::Url;

/// The chain the tip jar contract lives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    pub id: u64,
    pub rpc_url: Url,
}
