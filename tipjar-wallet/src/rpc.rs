//! A signing agent backed by a local key and a JSON-RPC endpoint.

use std::collections::BTreeMap;
use std::fmt;

use alloy::{
    network::{Ethereum, EthereumWallet, ReceiptResponse},
    primitives::{Address, Bytes, TxHash},
    providers::{
        PendingTransactionBuilder, Provider, ProviderBuilder, RootProvider,
        fillers::{FillProvider, JoinFill, WalletFiller},
        utils::JoinedRecommendedFillers,
    },
    rpc::types::TransactionRequest,
    signers::local::{LocalSignerError, MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
    transports::TransportError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::agent::{
    AccountsListener, AddChainParams, AgentError, ChainListener, Receipt, SigningAgent, codes,
};
use crate::listeners::{Listeners, Subscription};

/// Provider with recommended fillers and a wallet, ready to send transactions.
type HttpProviderWithWallet = FillProvider<
    JoinFill<JoinedRecommendedFillers, WalletFiller<EthereumWallet>>,
    RootProvider,
    Ethereum,
>;

/// Build a local signer from wallet mnemonic and account index
pub fn build_signer(
    mnemonic: String,
    account_index: u32,
) -> Result<PrivateKeySigner, LocalSignerError> {
    MnemonicBuilder::<English>::default()
        .phrase(mnemonic)
        .index(account_index)?
        .build()
}

/// Signs with one local key and submits through an HTTP endpoint.
///
/// Chain switching swaps the endpoint: only chains with a known endpoint
/// (given up front or registered through `add_chain`) can be switched to.
/// The single account never changes.
pub struct RpcAgent {
    wallet: EthereumWallet,
    address: Address,
    metamask: bool,
    provider: RwLock<HttpProviderWithWallet>,
    endpoints: RwLock<BTreeMap<u64, Url>>,
    accounts: Listeners<[Address]>,
    chains: Listeners<u64>,
}

impl RpcAgent {
    pub fn new(signer: PrivateKeySigner, rpc: Url) -> Self {
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new()
            .wallet(wallet.clone())
            .connect_http(rpc);
        Self {
            wallet,
            address,
            metamask: true,
            provider: RwLock::new(provider),
            endpoints: RwLock::new(BTreeMap::new()),
            accounts: Listeners::new(),
            chains: Listeners::new(),
        }
    }

    /// Make `chain_id` reachable through `url` when switching.
    pub fn with_endpoint(self, chain_id: u64, url: Url) -> Self {
        self.endpoints.write().insert(chain_id, url);
        self
    }

    pub fn with_metamask_dialect(mut self, yes: bool) -> Self {
        self.metamask = yes;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn provider(&self) -> HttpProviderWithWallet {
        self.provider.read().clone()
    }

    async fn activate(&self, chain_id: u64, url: Url) -> Result<(), AgentError> {
        let p = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(url.clone());
        let actual = p.get_chain_id().await.map_err(rpc_error)?;
        if actual != chain_id {
            return Err(AgentError::new(
                codes::INVALID_INPUT,
                format!("endpoint {url} serves chain {actual}, not {chain_id}"),
            ));
        }
        *self.provider.write() = p;
        info!(chain = %chain_id, %url, "switched active chain");
        self.chains.emit(&chain_id);
        Ok(())
    }
}

impl fmt::Debug for RpcAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcAgent")
            .field("address", &self.address)
            .field("metamask", &self.metamask)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningAgent for RpcAgent {
    fn is_metamask(&self) -> bool {
        self.metamask
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, AgentError> {
        Ok(vec![self.address])
    }

    async fn accounts(&self) -> Result<Vec<Address>, AgentError> {
        Ok(vec![self.address])
    }

    async fn chain_id(&self) -> Result<u64, AgentError> {
        self.provider().get_chain_id().await.map_err(rpc_error)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), AgentError> {
        if self.chain_id().await? == chain_id {
            debug!(chain = %chain_id, "chain already active");
            return Ok(());
        }
        let Some(url) = self.endpoints.read().get(&chain_id).cloned() else {
            return Err(AgentError::unrecognized_chain(chain_id));
        };
        self.activate(chain_id, url).await
    }

    async fn add_chain(&self, chain: &AddChainParams) -> Result<(), AgentError> {
        let Some(chain_id) = chain.numeric_chain_id() else {
            return Err(AgentError::new(
                codes::INVALID_INPUT,
                format!("invalid chainId {:?}", chain.chain_id),
            ));
        };
        let Some(url) = chain.rpc_urls.first().cloned() else {
            return Err(AgentError::new(codes::INVALID_INPUT, "rpcUrls is empty"));
        };
        self.endpoints.write().insert(chain_id, url.clone());
        self.activate(chain_id, url).await
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, AgentError> {
        self.provider().call(tx).await.map_err(rpc_error)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, AgentError> {
        let pending = self
            .provider()
            .send_transaction(tx)
            .await
            .map_err(rpc_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, hash: TxHash) -> Result<Receipt, AgentError> {
        let root = self.provider().root().clone();
        let receipt = PendingTransactionBuilder::new(root, hash)
            .get_receipt()
            .await
            .map_err(|e| AgentError::disconnected(e.to_string()))?;
        Ok(Receipt {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            status: receipt.status(),
            gas_used: receipt.gas_used,
            logs: receipt
                .inner
                .logs()
                .iter()
                .map(|l| l.inner.clone())
                .collect(),
        })
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> Subscription {
        self.accounts.subscribe(listener)
    }

    fn on_chain_changed(&self, listener: ChainListener) -> Subscription {
        self.chains.subscribe(listener)
    }
}

/// Keep the JSON-RPC error object intact; transport failures count as a
/// disconnect.
fn rpc_error(err: TransportError) -> AgentError {
    match err.as_error_resp() {
        Some(payload) => {
            let e = AgentError::new(payload.code, payload.message.to_string());
            match payload.as_revert_data() {
                Some(data) => e.with_data(data),
                None => e,
            }
        }
        None => AgentError::disconnected(err.to_string()),
    }
}
