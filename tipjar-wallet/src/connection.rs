use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use alloy::primitives::Address;
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::agent::{AgentError, SigningAgent};
use crate::listeners::Subscription;

/// Restarts everything bound to the previous chain.
///
/// Contract bindings are chain specific, so after a chain change nothing
/// derived from the old chain may be reused.
pub trait Reload: Send + Sync {
    fn reload(&self);
}

impl<F: Fn() + Send + Sync> Reload for F {
    fn reload(&self) {
        self()
    }
}

/// The signing agents currently present in the environment, in the order
/// they were discovered.
///
/// Asked again on every detection, so a wallet installed after start up
/// is picked up.
pub trait Discover: Send + Sync {
    fn agents(&self) -> Vec<Arc<dyn SigningAgent>>;
}

impl<F: Fn() -> Vec<Arc<dyn SigningAgent>> + Send + Sync> Discover for F {
    fn agents(&self) -> Vec<Arc<dyn SigningAgent>> {
        self()
    }
}

/// An authorized account on an active chain, and the agent that signs for it.
#[derive(Clone)]
pub struct Session {
    address: Address,
    chain_id: u64,
    agent: Arc<dyn SigningAgent>,
    epoch: u64,
}

impl Session {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn agent(&self) -> &Arc<dyn SigningAgent> {
        &self.agent
    }

    /// Changes whenever the signing capability behind the session does.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.chain_id == other.chain_id
            && self.epoch == other.epoch
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    /// No signing agent in this environment. Only a fresh detection can
    /// leave this state.
    NoProvider,
    Disconnected,
    Connecting,
    Connected(Session),
    /// The last connection attempt failed. There is no session.
    Error(String),
}

impl ConnectionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Connected(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("no wallet detected, please install MetaMask")]
    ProviderMissing,

    #[error("a non-MetaMask wallet was detected, please use MetaMask")]
    WrongWalletKind,

    #[error("the connection request was rejected")]
    UserRejected,

    #[error("a connection request is already pending, check the MetaMask window")]
    RequestAlreadyPending,

    #[error("connection failed: {0}")]
    Unknown(String),
}

impl From<AgentError> for ConnectError {
    fn from(err: AgentError) -> Self {
        if err.is_user_rejected() {
            Self::UserRejected
        } else if err.is_request_pending() {
            Self::RequestAlreadyPending
        } else {
            Self::Unknown(err.message)
        }
    }
}

/// Owns the relationship with the signing agent.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    inner: Mutex<Inner>,
    discover: Box<dyn Discover>,
    reload: Box<dyn Reload>,
}

struct Inner {
    /// Bumped on every session change; notifications from an older epoch are
    /// ignored.
    epoch: u64,
    subscriptions: Vec<Subscription>,
}

impl ConnectionManager {
    /// A manager over a fixed set of signing agents.
    pub fn new<R>(agents: Vec<Arc<dyn SigningAgent>>, reload: R) -> Self
    where
        R: Reload + 'static,
    {
        Self::discovering(move || agents.clone(), reload)
    }

    /// A manager that looks for signing agents anew on every detection.
    pub fn discovering<D, R>(discover: D, reload: R) -> Self
    where
        D: Discover + 'static,
        R: Reload + 'static,
    {
        let initial = if discover.agents().is_empty() {
            ConnectionState::NoProvider
        } else {
            ConnectionState::Disconnected
        };
        let (state, _) = watch::channel(initial);
        Self {
            shared: Arc::new(Shared {
                state,
                inner: Mutex::new(Inner {
                    epoch: 0,
                    subscriptions: Vec::new(),
                }),
                discover: Box::new(discover),
                reload: Box::new(reload),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    pub fn session(&self) -> Option<Session> {
        self.shared.state.borrow().session().cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state.borrow().is_connected()
    }

    /// Observe state transitions.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Pick the agent to talk to.
    pub fn detect(&self) -> Result<Arc<dyn SigningAgent>, ConnectError> {
        let agents = self.shared.discover.agents();
        if agents.is_empty() {
            self.shared.teardown(ConnectionState::NoProvider);
            return Err(ConnectError::ProviderMissing);
        }
        self.shared.state.send_if_modified(|state| {
            if *state != ConnectionState::NoProvider {
                return false;
            }
            info!(agents = agents.len(), "signing agent appeared");
            *state = ConnectionState::Disconnected;
            true
        });
        agents
            .into_iter()
            .find(|a| a.is_metamask())
            .ok_or(ConnectError::WrongWalletKind)
    }

    /// Re-establish a session without prompting, if the agent still has us
    /// authorized.
    pub async fn restore(&self) -> Option<Session> {
        if let Some(s) = self.session() {
            return Some(s);
        }
        let agent = match self.detect() {
            Ok(a) => a,
            Err(err) => {
                debug!(%err, "no wallet to restore a session from");
                return None;
            }
        };
        let accounts = match agent.accounts().await {
            Ok(a) => a,
            Err(err) => {
                warn!(%err, "failed to query authorized accounts");
                return None;
            }
        };
        let Some(&address) = accounts.first() else {
            debug!("wallet locked or no account authorized");
            return None;
        };
        let chain_id = match agent.chain_id().await {
            Ok(id) => id,
            Err(err) => {
                warn!(%err, "failed to query active chain");
                return None;
            }
        };
        info!(%address, chain = %chain_id, "restored wallet session");
        Some(self.establish(agent, address, chain_id))
    }

    /// Ask the agent for account access and open a session.
    pub async fn connect(&self) -> Result<Session, ConnectError> {
        let agent = self.detect()?;
        self.shared.state.send_replace(ConnectionState::Connecting);
        match handshake(agent.as_ref()).await {
            Ok((address, chain_id)) => {
                info!(%address, chain = %chain_id, "wallet connected");
                Ok(self.establish(agent, address, chain_id))
            }
            Err(err) => {
                warn!(%err, "wallet connection failed");
                self.shared.teardown(ConnectionState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Forget the session locally. The agent keeps its own authorization.
    pub fn disconnect(&self) {
        info!("wallet disconnected");
        self.shared.teardown(ConnectionState::Disconnected)
    }

    fn establish(&self, agent: Arc<dyn SigningAgent>, address: Address, chain_id: u64) -> Session {
        let mut inner = self.shared.inner.lock();
        inner.epoch += 1;
        let epoch = inner.epoch;

        let weak = Arc::downgrade(&self.shared);
        let on_accounts = agent.on_accounts_changed(Box::new(move |accounts: &[Address]| {
            if let Some(s) = Weak::upgrade(&weak) {
                s.accounts_changed(epoch, accounts)
            }
        }));
        let weak = Arc::downgrade(&self.shared);
        let on_chain = agent.on_chain_changed(Box::new(move |id: &u64| {
            if let Some(s) = Weak::upgrade(&weak) {
                s.chain_changed(epoch, *id)
            }
        }));
        let previous = mem::replace(&mut inner.subscriptions, vec![on_accounts, on_chain]);

        let session = Session {
            address,
            chain_id,
            agent,
            epoch,
        };
        self.shared
            .state
            .send_replace(ConnectionState::Connected(session.clone()));
        drop(inner);
        drop(previous);
        session
    }
}

async fn handshake(agent: &dyn SigningAgent) -> Result<(Address, u64), ConnectError> {
    let accounts = agent.request_accounts().await?;
    let Some(&address) = accounts.first() else {
        return Err(ConnectError::UserRejected);
    };
    let chain_id = agent.chain_id().await?;
    Ok((address, chain_id))
}

impl Shared {
    fn teardown(&self, next: ConnectionState) {
        self.close(self.inner.lock(), next)
    }

    /// End the current epoch while `inner` is held. Subscriptions are
    /// cancelled after the lock is released.
    fn close(&self, mut inner: MutexGuard<'_, Inner>, next: ConnectionState) {
        inner.epoch += 1;
        let subscriptions = mem::take(&mut inner.subscriptions);
        self.state.send_replace(next);
        drop(inner);
        for s in subscriptions {
            s.unsubscribe()
        }
    }

    fn accounts_changed(&self, epoch: u64, accounts: &[Address]) {
        let inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        let Some(&address) = accounts.first() else {
            info!("wallet reported no accounts, closing session");
            self.close(inner, ConnectionState::Disconnected);
            return;
        };
        self.state.send_if_modified(|state| match state {
            ConnectionState::Connected(s) if s.address != address => {
                info!(from = %s.address, to = %address, "account changed");
                s.address = address;
                true
            }
            _ => false,
        });
    }

    fn chain_changed(&self, epoch: u64, chain_id: u64) {
        {
            let inner = self.inner.lock();
            if inner.epoch != epoch {
                return;
            }
            self.state.send_if_modified(|state| match state {
                ConnectionState::Connected(s) => {
                    info!(from = %s.chain_id, to = %chain_id, "chain changed");
                    s.chain_id = chain_id;
                    true
                }
                _ => false,
            });
        }
        self.reload.reload()
    }
}
