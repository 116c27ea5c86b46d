use alloy::primitives::U256;
use tipjar::{Error, TipRequest, TipState};
use tipjar_contract::TipJar;
use tipjar_types::{AmountError, DonationWindow};
use tipjar_wallet::AgentError;

use crate::{AUTHOR, CHAIN, Env, MILLI_ETHER, VISITOR};

fn request(amount: &str) -> TipRequest {
    TipRequest::builder()
        .post_id("p1")
        .post_title("Hello")
        .amount(amount)
        .build()
}

#[tokio::test]
async fn tip_is_sent_and_recorded() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    let outcome = tipping.tip(request("0.001")).await.unwrap();
    let tx_hash = outcome.transfer.receipt.transaction_hash;

    let sent = env.agent.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].value, Some(MILLI_ETHER));
    assert_eq!(outcome.amount, MILLI_ETHER);

    let records = env.ledger.records();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.transaction_hash, tx_hash);
    assert_eq!(r.post_id, "p1");
    assert_eq!(r.from_address, VISITOR);
    assert_eq!(r.to_address, AUTHOR);
    assert_eq!(r.amount, "0.001");
    assert_eq!(r.currency, "ETH");
    assert_eq!(r.message.as_deref(), Some("Tip for post: Hello"));
    assert_eq!(outcome.record.as_ref(), Some(r));

    assert!(outcome.refreshed);
    assert_eq!(tipping.state(), &TipState::Settled(tx_hash));
    let s = tipping.snapshot().unwrap();
    assert_eq!(s.my_donation, MILLI_ETHER);
    assert_eq!(s.contract_balance, MILLI_ETHER);
}

#[tokio::test]
async fn snapshot_reflects_each_tip() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    let before = tipping.refresh().await.unwrap().clone();
    assert!(matches!(tipping.state(), TipState::Ready(_)));

    tipping.tip(request("0.002")).await.unwrap();
    let after = tipping.refresh().await.unwrap().clone();

    let two = MILLI_ETHER * U256::from(2);
    assert_eq!(after.contract_balance, before.contract_balance + two);
    assert_eq!(after.total_donations, before.total_donations + two);
    assert_eq!(after.my_donation, before.my_donation + two);
    assert_eq!(after.leaders().count(), 1);
}

#[tokio::test]
async fn bad_amounts_never_reach_the_wallet() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    for amount in ["0", "-1", "abc", "", "0.0000000000000000001"] {
        let err = tipping.tip(request(amount)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)), "{amount:?}: {err}");
        assert!(matches!(tipping.state(), TipState::Failed(_)));
    }
    let err = tipping.tip(request("0")).await.unwrap_err();
    assert!(matches!(err, Error::InvalidAmount(AmountError::NotPositive)));

    let c = env.agent.counters();
    assert_eq!(c.calls, 0);
    assert_eq!(c.sends, 0);
}

#[tokio::test]
async fn below_minimum_is_refused() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    match tipping.tip(request("0.0001")).await {
        Err(Error::BelowMinimum { amount, min }) => {
            assert_eq!(amount, "0.0001");
            assert_eq!(min, "0.001");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(env.agent.counters().sends, 0);
}

#[tokio::test]
async fn closed_window_blocks_before_sending() {
    let env = Env::connected(VISITOR).await;
    let now = *env.agent.jar().now;
    env.agent
        .with_jar(|j| j.window = DonationWindow::new(now + 100, now + 200));
    let mut tipping = env.tipping();

    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::OutsideDonationWindow { .. }));
    assert_eq!(
        tipping.state(),
        &TipState::Failed("Donations are currently closed.".into())
    );
    assert_eq!(env.agent.counters().sends, 0);

    env.set_time(now + 150);
    tipping.tip(request("0.001")).await.unwrap();

    env.set_time(now + 201);
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::OutsideDonationWindow { .. }));
    assert_eq!(env.agent.counters().sends, 1);
}

#[tokio::test]
async fn inverted_window_admits_nothing() {
    let env = Env::connected(VISITOR).await;
    let now = *env.agent.jar().now;
    env.agent
        .with_jar(|j| j.window = DonationWindow::new(now + 100, now - 100));
    let mut tipping = env.tipping();
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::OutsideDonationWindow { .. }));
    assert_eq!(env.agent.counters().sends, 0);
}

#[tokio::test]
async fn disabled_window_never_blocks() {
    let env = Env::connected(VISITOR).await;
    env.agent.with_jar(|j| {
        j.window = DonationWindow {
            enabled: false,
            start: 1u64.into(),
            end: 2u64.into(),
        }
    });
    let mut tipping = env.tipping();
    tipping.tip(request("0.001")).await.unwrap();
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    let a = tipping.refresh().await.unwrap().clone();
    let b = tipping.refresh().await.unwrap().clone();
    assert_eq!(a, b);
    assert_eq!(env.agent.counters().sends, 0);
}

#[tokio::test]
async fn failed_refresh_keeps_the_last_snapshot() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    let good = tipping.refresh().await.unwrap().clone();

    env.agent
        .fail_read::<TipJar::getTopDonorsCall>(AgentError::disconnected("offline"));
    let err = tipping.refresh().await.unwrap_err();
    assert!(matches!(err, Error::Load(_)));
    assert_eq!(tipping.snapshot(), Some(&good));
    assert!(matches!(tipping.state(), TipState::Failed(_)));

    env.agent.heal_reads();
    tipping.refresh().await.unwrap();
    assert!(matches!(tipping.state(), TipState::Ready(_)));
}

#[tokio::test]
async fn ledger_outage_does_not_undo_the_tip() {
    let env = Env::connected(VISITOR).await;
    env.ledger.set_down(true);
    let mut tipping = env.tipping();
    let outcome = tipping.tip(request("0.001")).await.unwrap();
    assert!(outcome.record.is_none());
    assert!(matches!(tipping.state(), TipState::Settled(_)));
    assert!(env.ledger.records().is_empty());
    assert_eq!(env.agent.jar().balance, MILLI_ETHER);
}

#[tokio::test]
async fn stale_snapshot_after_tip_is_reported() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    let before = tipping.refresh().await.unwrap().clone();

    env.agent
        .fail_read::<TipJar::getTopDonorsCall>(AgentError::disconnected("offline"));
    let outcome = tipping.tip(request("0.001")).await.unwrap();
    let tx_hash = outcome.transfer.receipt.transaction_hash;
    assert!(!outcome.refreshed);
    assert!(outcome.record.is_some());
    assert_eq!(tipping.state(), &TipState::Settled(tx_hash));
    assert_eq!(tipping.snapshot(), Some(&before));
    assert_eq!(env.agent.jar().balance, MILLI_ETHER);

    env.agent.heal_reads();
    assert_eq!(tipping.refresh().await.unwrap().my_donation, MILLI_ETHER);
}

#[tokio::test]
async fn failures_read_differently() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    tipping.refresh().await.unwrap();

    env.agent.fail_send(AgentError::new(
        -32000,
        "insufficient funds for gas * price + value",
    ));
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds));
    let funds = tipping.state().clone();
    assert_eq!(
        funds,
        TipState::Failed("Insufficient funds to cover the amount and gas.".into())
    );

    // The cached window is still open, the chain has closed it since.
    let now = *env.agent.jar().now;
    env.agent
        .with_jar(|j| j.window = DonationWindow::new(now + 100, now + 200));
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    match &err {
        Error::ContractReverted(reason) => {
            assert_eq!(reason, "Donations are not allowed at this time")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let reverted = tipping.state().clone();
    assert_eq!(
        reverted,
        TipState::Failed(
            "The contract rejected the transaction: Donations are not allowed at this time".into()
        )
    );

    env.agent.with_jar(|j| j.window = DonationWindow::disabled());
    env.agent.fail_send(AgentError::disconnected("offline"));
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    let network = tipping.state().clone();
    assert_eq!(
        network,
        TipState::Failed("Network error, please try again.".into())
    );

    assert_ne!(funds, reverted);
    assert_ne!(reverted, network);
    assert_ne!(funds, network);
    assert!(env.ledger.records().is_empty());
    assert!(env.agent.jar().balance.is_zero());
}

#[tokio::test]
async fn rejection_is_reported() {
    let env = Env::connected(VISITOR).await;
    let mut tipping = env.tipping();
    tipping.refresh().await.unwrap();
    env.agent.fail_send(AgentError::user_rejected());
    let err = tipping.tip(request("0.001")).await.unwrap_err();
    assert!(matches!(err, Error::UserRejected));
    assert_eq!(
        tipping.state(),
        &TipState::Failed("You rejected the request.".into())
    );
    assert!(env.ledger.records().is_empty());
}

#[tokio::test]
async fn wrong_chain_is_refused() {
    let env = Env::connected(VISITOR).await;
    env.agent.change_chain(43113);
    let mut tipping = env.tipping();
    match tipping.tip(request("0.001")).await {
        Err(Error::UnsupportedNetwork { expected, actual }) => {
            assert_eq!(expected, CHAIN);
            assert_eq!(actual, 43113);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(env.agent.counters().calls, 0);
}

#[tokio::test]
async fn tipping_needs_a_session() {
    let env = Env::new(VISITOR);
    let mut tipping = env.tipping();
    assert!(matches!(
        tipping.tip(request("0.001")).await,
        Err(Error::NotConnected)
    ));
    assert!(matches!(tipping.refresh().await, Err(Error::NotConnected)));
}
