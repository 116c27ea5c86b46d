use std::sync::Arc;

use alloy::primitives::Address;
use parking_lot::Mutex;
use tipjar_wallet::{AgentError, ConnectError, ConnectionManager, ConnectionState, SigningAgent};

use crate::{CHAIN, Env, FakeAgent, JAR, Jar, OWNER, VISITOR};

#[tokio::test]
async fn foreign_wallet_is_refused() {
    let env = Env::with_agent(FakeAgent::new(VISITOR, CHAIN, Jar::new(JAR, OWNER)).foreign());
    assert_eq!(env.conn.connect().await, Err(ConnectError::WrongWalletKind));
    assert_eq!(env.conn.state(), ConnectionState::Disconnected);
    assert_eq!(env.agent.counters().request_accounts, 0);
    assert_eq!(env.agent.accounts_listeners(), 0);
}

#[tokio::test]
async fn connect_opens_a_session() {
    let env = Env::new(VISITOR);
    let mut states = env.conn.watch();
    let session = env.conn.connect().await.unwrap();
    assert_eq!(session.address(), VISITOR);
    assert_eq!(session.chain_id(), CHAIN);
    assert!(states.has_changed().unwrap());
    assert_eq!(
        *states.borrow_and_update(),
        ConnectionState::Connected(session.clone())
    );
    assert_eq!(env.conn.session(), Some(session));
}

#[tokio::test]
async fn rejected_connection_leaves_no_session() {
    let env = Env::new(VISITOR);
    env.agent.reject_connect(AgentError::user_rejected());
    assert_eq!(env.conn.connect().await, Err(ConnectError::UserRejected));
    assert!(matches!(env.conn.state(), ConnectionState::Error(_)));
    assert!(env.conn.session().is_none());
    assert_eq!(env.agent.accounts_listeners(), 0);

    env.agent.reject_connect(AgentError::new(tipjar_wallet::codes::REQUEST_PENDING, "pending"));
    assert_eq!(
        env.conn.connect().await,
        Err(ConnectError::RequestAlreadyPending)
    );

    // A later attempt may succeed.
    assert!(env.conn.connect().await.is_ok());
}

#[tokio::test]
async fn reconnects_do_not_stack_listeners() {
    let env = Env::new(VISITOR);
    for _ in 0..3 {
        env.conn.connect().await.unwrap();
    }
    assert_eq!(env.agent.accounts_listeners(), 1);
    assert_eq!(env.agent.chain_listeners(), 1);

    env.conn.disconnect();
    assert_eq!(env.agent.accounts_listeners(), 0);
    assert_eq!(env.agent.chain_listeners(), 0);
    assert_eq!(env.conn.state(), ConnectionState::Disconnected);

    env.conn.connect().await.unwrap();
    assert_eq!(env.agent.accounts_listeners(), 1);
    assert_eq!(env.agent.chain_listeners(), 1);
}

#[tokio::test]
async fn restore_never_prompts() {
    let env = Env::new(VISITOR);
    assert!(env.conn.restore().await.is_none());
    assert_eq!(env.conn.state(), ConnectionState::Disconnected);

    env.agent.authorize();
    let session = env.conn.restore().await.unwrap();
    assert_eq!(session.address(), VISITOR);
    assert_eq!(env.agent.counters().request_accounts, 0);
}

#[tokio::test]
async fn account_change_updates_session_in_place() {
    let env = Env::connected(VISITOR).await;
    let epoch = env.conn.session().unwrap().epoch();
    let other = Address::repeat_byte(0x42);

    env.agent.change_accounts(&[other]);
    let session = env.conn.session().unwrap();
    assert_eq!(session.address(), other);
    assert_eq!(session.chain_id(), CHAIN);
    assert_eq!(session.epoch(), epoch);
    assert_eq!(env.reloads(), 0);

    env.agent.change_accounts(&[]);
    assert_eq!(env.conn.state(), ConnectionState::Disconnected);
    assert_eq!(env.agent.accounts_listeners(), 0);
}

#[tokio::test]
async fn chain_change_reloads_once() {
    let env = Env::connected(VISITOR).await;
    env.agent.change_chain(43113);
    assert_eq!(env.conn.session().unwrap().chain_id(), 43113);
    assert_eq!(env.reloads(), 1);
}

#[tokio::test]
async fn stale_notifications_are_ignored() {
    let env = Env::connected(VISITOR).await;
    env.conn.disconnect();
    env.agent.change_chain(1);
    env.agent.change_accounts(&[OWNER]);
    assert_eq!(env.reloads(), 0);
    assert_eq!(env.conn.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn late_wallet_is_detected() {
    let present: Arc<Mutex<Vec<Arc<dyn SigningAgent>>>> = Arc::new(Mutex::new(Vec::new()));
    let source = present.clone();
    let conn = ConnectionManager::discovering(move || source.lock().clone(), || {});
    assert_eq!(conn.state(), ConnectionState::NoProvider);
    assert_eq!(conn.connect().await, Err(ConnectError::ProviderMissing));
    assert_eq!(conn.state(), ConnectionState::NoProvider);

    let agent = Arc::new(FakeAgent::new(VISITOR, CHAIN, Jar::new(JAR, OWNER)));
    present.lock().push(agent.clone());
    assert!(conn.detect().is_ok());
    assert_eq!(conn.state(), ConnectionState::Disconnected);

    let session = conn.connect().await.unwrap();
    assert_eq!(session.address(), VISITOR);
    assert_eq!(agent.counters().request_accounts, 1);

    present.lock().clear();
    assert_eq!(conn.detect().err(), Some(ConnectError::ProviderMissing));
    assert_eq!(conn.state(), ConnectionState::NoProvider);
    assert!(conn.session().is_none());
    assert_eq!(agent.accounts_listeners(), 0);
}
