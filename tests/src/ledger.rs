use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tipjar_ledger::{LedgerError, StatusCode, TipLedger};
use tipjar_types::TipRecord;

/// Tip ledger kept in memory.
#[derive(Debug, Default)]
pub struct MemLedger {
    records: Mutex<Vec<TipRecord>>,
    next_id: AtomicU64,
    down: AtomicBool,
}

impl MemLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request fail until `false` is passed.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<TipRecord> {
        self.records.lock().clone()
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(LedgerError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "ledger unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TipLedger for MemLedger {
    async fn append(&self, tip: &TipRecord) -> Result<TipRecord, LedgerError> {
        self.check()?;
        let missing = tip.missing_fields();
        if !missing.is_empty() {
            return Err(LedgerError::MissingFields(missing));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut stored = tip.clone();
        stored.id = Some(n.to_string());
        stored.created_at = Some(format!("2024-01-01T00:00:{:02}Z", n % 60));
        self.records.lock().push(stored.clone());
        Ok(stored)
    }

    async fn list_by_post(&self, post_id: &str) -> Result<Vec<TipRecord>, LedgerError> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|t| t.post_id == post_id)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<TipRecord>, LedgerError> {
        self.check()?;
        Ok(self.records.lock().iter().rev().cloned().collect())
    }
}
