// In-memory implementation of the appeal/transaction store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::appeal::{
    AppealError, AppealStatus, AppealStore, AppealTransaction, ChainTransaction,
    TransactionStatus,
};

/// Appeals keyed by message id (one active appeal per message, last
/// submission wins) and transactions keyed by hash.
pub struct InMemoryAppealStore {
    appeals: DashMap<String, AppealTransaction>,
    transactions: DashMap<String, ChainTransaction>,
}

impl InMemoryAppealStore {
    pub fn new() -> Self {
        Self {
            appeals: DashMap::new(),
            transactions: DashMap::new(),
        }
    }
}

impl Default for InMemoryAppealStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppealStore for InMemoryAppealStore {
    async fn put_appeal(&self, appeal: AppealTransaction) -> Result<(), AppealError> {
        self.appeals.insert(appeal.message_id.clone(), appeal);
        Ok(())
    }

    async fn appeal(&self, message_id: &str) -> Result<Option<AppealTransaction>, AppealError> {
        Ok(self.appeals.get(message_id).map(|entry| entry.clone()))
    }

    async fn set_appeal_status(
        &self,
        message_id: &str,
        status: AppealStatus,
    ) -> Result<(), AppealError> {
        if let Some(mut appeal) = self.appeals.get_mut(message_id) {
            appeal.status = status;
        }
        Ok(())
    }

    async fn put_transaction(&self, transaction: ChainTransaction) -> Result<(), AppealError> {
        self.transactions
            .insert(transaction.hash.clone(), transaction);
        Ok(())
    }

    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>, AppealError> {
        Ok(self.transactions.get(hash).map(|entry| entry.clone()))
    }

    async fn set_transaction_status(
        &self,
        hash: &str,
        status: TransactionStatus,
    ) -> Result<(), AppealError> {
        if let Some(mut transaction) = self.transactions.get_mut(hash) {
            transaction.status = status;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_appeal(message_id: &str, reason: &str) -> AppealTransaction {
        AppealTransaction {
            message_id: message_id.to_string(),
            appealer: "0xDuckdeadbeef".to_string(),
            stake_amount: 50,
            reason: reason.to_string(),
            tx_hash: format!("0x{:016x}", rand::random::<u64>()),
            submitted_at: Utc::now(),
            status: AppealStatus::Submitted,
            voting_deadline: Utc::now(),
        }
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() {
        let store = InMemoryAppealStore::new();
        assert!(store.appeal("m1").await.unwrap().is_none());
        assert!(store.transaction("0xabc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn later_appeal_replaces_earlier_one() {
        let store = InMemoryAppealStore::new();
        store.put_appeal(sample_appeal("m1", "first")).await.unwrap();
        store.put_appeal(sample_appeal("m1", "second")).await.unwrap();

        let stored = store.appeal("m1").await.unwrap().unwrap();
        assert_eq!(stored.reason, "second");
    }

    #[tokio::test]
    async fn status_updates_are_visible_to_readers() {
        let store = InMemoryAppealStore::new();
        store.put_appeal(sample_appeal("m1", "reason")).await.unwrap();

        store
            .set_appeal_status("m1", AppealStatus::Voting)
            .await
            .unwrap();
        let stored = store.appeal("m1").await.unwrap().unwrap();
        assert_eq!(stored.status, AppealStatus::Voting);
    }
}
