// Appeal service - wallet connection, stake-gated appeal submission and
// timed progression through the appeal state machine.
//
// Submission deducts the stake and stores the appeal while holding the
// wallet lock, so a failed gate never leaves a partial charge. The
// submitted -> voting transition and transaction confirmation run on
// spawned timers; resolution comes from an external vote tally.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use super::appeal_models::{
    AppealStatus, AppealTransaction, ChainConfig, ChainConnection, ChainStatus, ChainTransaction,
    TransactionKind, TransactionStatus, VoteOutcome, WalletInfo,
};
use crate::core::events::{EventBus, Subscription};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AppealError {
    #[allow(dead_code)]
    #[error("failed to connect to chain network: {0}")]
    ConnectionFailed(String),

    #[error("wallet not connected to chain network")]
    NotConnected,

    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("no appeal found for message {0}")]
    UnknownAppeal(String),

    #[error("appeal for message {message_id} is {status}, not in voting")]
    NotInVoting {
        message_id: String,
        status: AppealStatus,
    },

    #[allow(dead_code)]
    #[error("storage error: {0}")]
    Storage(String),
}

impl AppealError {
    /// Machine-readable error code surfaced alongside the message.
    #[allow(dead_code)]
    pub fn code(&self) -> &'static str {
        match self {
            AppealError::ConnectionFailed(_) => "CONNECTION_FAILED",
            AppealError::NotConnected => "NOT_CONNECTED",
            AppealError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            AppealError::UnknownAppeal(_) => "UNKNOWN_APPEAL",
            AppealError::NotInVoting { .. } => "NOT_IN_VOTING",
            AppealError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Store for appeals (keyed by message id, last write wins) and chain
/// transactions (keyed by hash).
#[async_trait]
pub trait AppealStore: Send + Sync {
    async fn put_appeal(&self, appeal: AppealTransaction) -> Result<(), AppealError>;

    async fn appeal(&self, message_id: &str) -> Result<Option<AppealTransaction>, AppealError>;

    async fn set_appeal_status(
        &self,
        message_id: &str,
        status: AppealStatus,
    ) -> Result<(), AppealError>;

    async fn put_transaction(&self, transaction: ChainTransaction) -> Result<(), AppealError>;

    async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>, AppealError>;

    async fn set_transaction_status(
        &self,
        hash: &str,
        status: TransactionStatus,
    ) -> Result<(), AppealError>;
}

// ============================================================================
// VOTE TALLY (PORT)
// ============================================================================

/// External collaborator that decides the outcome of an appeal once
/// voting has run. The engine never invents an outcome on its own.
#[async_trait]
pub trait VoteTally: Send + Sync {
    async fn tally(&self, appeal: &AppealTransaction) -> VoteOutcome;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Stake-backed appeal workflow over a mocked chain.
pub struct AppealService<S: AppealStore + 'static> {
    config: ChainConfig,
    store: Arc<S>,
    connection: Mutex<ChainConnection>,
    connection_events: EventBus<ChainConnection>,
}

impl<S: AppealStore + 'static> AppealService<S> {
    pub fn new(config: ChainConfig, store: S) -> Self {
        let connection = ChainConnection::disconnected(config.network.clone());
        Self {
            config,
            store: Arc::new(store),
            connection: Mutex::new(connection),
            connection_events: EventBus::new(),
        }
    }

    /// Connect a mock wallet. Address and balance are randomized the way
    /// the testnet faucet would hand them out.
    pub async fn connect(&self) -> Result<ChainConnection, AppealError> {
        {
            let mut connection = self.connection.lock().await;
            connection.status = ChainStatus::Connecting;
            self.connection_events.emit(&connection.clone());
        }

        tokio::time::sleep(Duration::from_millis(self.config.connect_delay_ms)).await;

        let (address, balance, block_height) = {
            let mut rng = rand::thread_rng();
            (
                format!("0xDuck{:08x}", rng.gen::<u32>()),
                rng.gen_range(100..1100),
                rng.gen_range(500_000..1_500_000),
            )
        };

        let snapshot = {
            let mut connection = self.connection.lock().await;
            connection.status = ChainStatus::Connected;
            connection.block_height = Some(block_height);
            connection.wallet = Some(WalletInfo {
                address,
                balance,
                is_connected: true,
            });
            connection.clone()
        };

        tracing::info!(network = %snapshot.network, "wallet connected");
        self.connection_events.emit(&snapshot);
        Ok(snapshot)
    }

    pub async fn disconnect(&self) {
        let snapshot = {
            let mut connection = self.connection.lock().await;
            *connection = ChainConnection::disconnected(self.config.network.clone());
            connection.clone()
        };
        self.connection_events.emit(&snapshot);
        tracing::info!("wallet disconnected");
    }

    pub async fn connection(&self) -> ChainConnection {
        self.connection.lock().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_connected()
    }

    /// Submit an appeal for a flagged message, staking the configured
    /// amount. A repeat submission for the same message replaces the
    /// earlier appeal and stakes again.
    pub async fn submit_appeal(
        &self,
        message_id: &str,
        reason: &str,
    ) -> Result<AppealTransaction, AppealError> {
        let mut connection = self.connection.lock().await;
        if !connection.is_connected() {
            return Err(AppealError::NotConnected);
        }
        let wallet = connection.wallet.as_mut().ok_or(AppealError::NotConnected)?;

        let required = self.config.stake_amount;
        if wallet.balance < required {
            return Err(AppealError::InsufficientFunds {
                required,
                available: wallet.balance,
            });
        }

        let tx_hash = format!("0x{:016x}", rand::random::<u64>());
        let now = Utc::now();
        let appeal = AppealTransaction {
            message_id: message_id.to_string(),
            appealer: wallet.address.clone(),
            stake_amount: required,
            reason: reason.to_string(),
            tx_hash: tx_hash.clone(),
            submitted_at: now,
            status: AppealStatus::Submitted,
            voting_deadline: now + ChronoDuration::milliseconds(self.config.voting_period_ms as i64),
        };
        let transaction = ChainTransaction {
            id: tx_hash.clone(),
            kind: TransactionKind::Appeal,
            status: TransactionStatus::Pending,
            hash: tx_hash.clone(),
            timestamp: now,
            amount: required,
            message_id: Some(message_id.to_string()),
        };

        // Stake deduction and appeal creation happen under the wallet
        // lock: either both take effect or neither does.
        self.store.put_appeal(appeal.clone()).await?;
        self.store.put_transaction(transaction).await?;
        wallet.balance -= required;

        let snapshot = connection.clone();
        drop(connection);
        self.connection_events.emit(&snapshot);
        tracing::info!(message_id, tx_hash = %tx_hash, stake = required, "appeal submitted");

        self.schedule_confirmation(tx_hash.clone());
        self.schedule_voting_progression(message_id.to_string(), tx_hash);

        Ok(appeal)
    }

    pub async fn appeal(
        &self,
        message_id: &str,
    ) -> Result<Option<AppealTransaction>, AppealError> {
        self.store.appeal(message_id).await
    }

    pub async fn transaction(&self, hash: &str) -> Result<Option<ChainTransaction>, AppealError> {
        self.store.transaction(hash).await
    }

    /// Settle an appeal that has reached voting using the external vote
    /// tally. An upheld appeal refunds the stake to the appealer's
    /// connected wallet; a rejected one forfeits it.
    pub async fn resolve_appeal<T: VoteTally + ?Sized>(
        &self,
        message_id: &str,
        tally: &T,
    ) -> Result<AppealTransaction, AppealError> {
        let mut appeal = self
            .store
            .appeal(message_id)
            .await?
            .ok_or_else(|| AppealError::UnknownAppeal(message_id.to_string()))?;

        if appeal.status != AppealStatus::Voting {
            return Err(AppealError::NotInVoting {
                message_id: message_id.to_string(),
                status: appeal.status,
            });
        }

        let outcome = tally.tally(&appeal).await;
        appeal.status = match outcome {
            VoteOutcome::Upheld => AppealStatus::Resolved,
            VoteOutcome::Rejected => AppealStatus::Rejected,
        };
        self.store.put_appeal(appeal.clone()).await?;

        if outcome == VoteOutcome::Upheld {
            self.refund_stake(&appeal).await;
        }
        tracing::info!(message_id, outcome = ?outcome, "appeal resolved");

        Ok(appeal)
    }

    pub fn on_connection_change(
        &self,
        callback: impl Fn(&ChainConnection) + Send + Sync + 'static,
    ) -> Subscription<ChainConnection> {
        self.connection_events.subscribe(callback)
    }

    /// Return the stake to the appealer's wallet, if it is still the one
    /// connected here.
    async fn refund_stake(&self, appeal: &AppealTransaction) {
        let mut connection = self.connection.lock().await;
        let Some(wallet) = connection.wallet.as_mut() else {
            tracing::warn!(
                message_id = %appeal.message_id,
                "upheld appeal but no wallet connected, stake not refunded"
            );
            return;
        };
        if wallet.address != appeal.appealer {
            tracing::warn!(
                message_id = %appeal.message_id,
                "upheld appeal for a different wallet, stake not refunded"
            );
            return;
        }
        wallet.balance += appeal.stake_amount;
        let snapshot = connection.clone();
        drop(connection);
        self.connection_events.emit(&snapshot);
    }

    fn schedule_confirmation(&self, tx_hash: String) {
        let store = Arc::clone(&self.store);
        let delay = Duration::from_millis(self.config.confirm_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(error) = store
                .set_transaction_status(&tx_hash, TransactionStatus::Confirmed)
                .await
            {
                tracing::warn!(tx_hash = %tx_hash, %error, "failed to confirm transaction");
            }
        });
    }

    fn schedule_voting_progression(&self, message_id: String, tx_hash: String) {
        let store = Arc::clone(&self.store);
        let delay = Duration::from_millis(self.config.voting_progress_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A newer appeal may have replaced this one; only the appeal
            // this timer was scheduled for advances.
            match store.appeal(&message_id).await {
                Ok(Some(appeal))
                    if appeal.tx_hash == tx_hash && appeal.status == AppealStatus::Submitted =>
                {
                    if let Err(error) = store
                        .set_appeal_status(&message_id, AppealStatus::Voting)
                        .await
                    {
                        tracing::warn!(%message_id, %error, "failed to advance appeal to voting");
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    tracing::warn!(%message_id, %error, "failed to load appeal for progression");
                }
            }
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================
