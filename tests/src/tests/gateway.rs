use alloy::primitives::U256;
use tipjar_contract::{ContractError, TipJar, TopDonor};
use tipjar_types::{AmountError, DonationWindow};
use tipjar_wallet::AgentError;

use crate::{Env, MILLI_ETHER, OWNER, VISITOR};

#[tokio::test]
async fn donate_carries_value_and_event() {
    let env = Env::connected(VISITOR).await;
    let jar = env.contract();
    let t = jar.donate("0.001").await.unwrap();

    let sent = env.agent.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value, Some(MILLI_ETHER));
    assert_eq!(sent[0].from, Some(VISITOR));
    assert!(t.receipt.status);

    let e = t.event.unwrap();
    assert_eq!(e.account, VISITOR);
    assert_eq!(e.amount, MILLI_ETHER);
    assert_eq!(e.timestamp, env.agent.jar().now);
}

#[tokio::test]
async fn reads_follow_contract_state() {
    let env = Env::connected(VISITOR).await;
    let jar = env.contract();
    jar.donate("0.001").await.unwrap();
    jar.donate("0.002").await.unwrap();

    let three = MILLI_ETHER * U256::from(3);
    assert_eq!(jar.total_donations().await.unwrap(), three);
    assert_eq!(jar.contract_balance().await.unwrap(), three);
    assert_eq!(jar.donation_of(VISITOR).await.unwrap(), three);
    assert_eq!(jar.get_donation(VISITOR).await.unwrap(), three);
    assert_eq!(jar.owner().await.unwrap(), OWNER);

    let top = jar.top_donors().await.unwrap();
    assert_eq!(
        top[0],
        TopDonor {
            address: VISITOR,
            amount: three
        }
    );
    assert!(top[1].is_empty() && top[2].is_empty());
    assert_eq!(jar.time_window().await.unwrap(), DonationWindow::disabled());
}

#[tokio::test]
async fn zero_is_refused_locally() {
    let env = Env::connected(VISITOR).await;
    let err = env.contract().donate("0").await.unwrap_err();
    assert!(matches!(err, ContractError::Amount(AmountError::NotPositive)));
    let err = env.contract().donate("abc").await.unwrap_err();
    assert!(matches!(err, ContractError::Amount(_)));
    assert_eq!(env.agent.counters().sends, 0);
}

#[tokio::test]
async fn non_owner_withdraw_reverts_on_chain() {
    let env = Env::connected(VISITOR).await;
    env.contract().donate("0.001").await.unwrap();
    match env.contract().withdraw().await {
        Err(ContractError::Reverted(reason)) => {
            assert_eq!(reason, "Only owner can call this function")
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(env.agent.jar().balance, MILLI_ETHER);
}

#[tokio::test]
async fn failed_receipt_is_a_revert() {
    let env = Env::connected(VISITOR).await;
    env.agent.fail_receipts();
    match env.contract().donate("0.001").await {
        Err(ContractError::Reverted(reason)) => assert_eq!(reason, "transaction reverted"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn agent_failures_are_classified() {
    let env = Env::connected(VISITOR).await;
    env.agent.fail_send(AgentError::new(
        -32000,
        "insufficient funds for gas * price + value",
    ));
    assert!(matches!(
        env.contract().donate("0.001").await,
        Err(ContractError::InsufficientFunds)
    ));

    env.agent.fail_send(AgentError::user_rejected());
    assert!(matches!(
        env.contract().donate("0.001").await,
        Err(ContractError::UserRejected)
    ));

    env.agent.fail_read::<TipJar::totalDonationsCall>(AgentError::disconnected("offline"));
    match env.contract().total_donations().await {
        Err(ContractError::Network(m)) => assert_eq!(m, "offline"),
        other => panic!("unexpected result: {other:?}"),
    }
}
