// Appeal domain models - wallets, chain transactions and the appeal
// state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// WALLET & CONNECTION
// ============================================================================

/// A connected wallet. `balance` is the spendable stake currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
    pub is_connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Snapshot of the chain connection, including the wallet when one is
/// attached. Cloned out to listeners on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConnection {
    pub status: ChainStatus,
    pub network: String,
    pub block_height: Option<u64>,
    pub wallet: Option<WalletInfo>,
}

impl ChainConnection {
    pub fn disconnected(network: impl Into<String>) -> Self {
        Self {
            status: ChainStatus::Disconnected,
            network: network.into(),
            block_height: None,
            wallet: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == ChainStatus::Connected
            && self.wallet.as_ref().is_some_and(|wallet| wallet.is_connected)
    }
}

// ============================================================================
// TRANSACTIONS & APPEALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Appeal,
    Vote,
    Stake,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A chain transaction record, keyed by its hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub hash: String,
    pub timestamp: DateTime<Utc>,
    pub amount: u64,
    pub message_id: Option<String>,
}

/// Appeal lifecycle. The "no appeal" state is the absence of a record;
/// stored appeals start at `Submitted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Submitted,
    Voting,
    Resolved,
    Rejected,
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppealStatus::Submitted => write!(f, "submitted"),
            AppealStatus::Voting => write!(f, "voting"),
            AppealStatus::Resolved => write!(f, "resolved"),
            AppealStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// One appeal against a moderation verdict, keyed by message id.
/// A later appeal for the same message replaces the earlier one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppealTransaction {
    pub message_id: String,
    pub appealer: String,
    pub stake_amount: u64,
    pub reason: String,
    pub tx_hash: String,
    pub submitted_at: DateTime<Utc>,
    pub status: AppealStatus,
    pub voting_deadline: DateTime<Utc>,
}

/// Outcome delivered by the external vote tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteOutcome {
    /// The community sided with the appealer; the stake is refunded.
    Upheld,
    /// The community confirmed the verdict; the stake is forfeited.
    Rejected,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the appeal/staking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub contract_address: String,
    pub network: String,
    /// Tokens locked per appeal submission
    pub stake_amount: u64,
    /// How long voting stays open after submission
    pub voting_period_ms: u64,
    /// Simulated connect handshake delay
    pub connect_delay_ms: u64,
    /// Delay until a submitted transaction confirms
    pub confirm_delay_ms: u64,
    /// Delay until a submitted appeal advances to voting
    pub voting_progress_delay_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://testnet-rpc.duckchain.network".to_string(),
            chain_id: 6969,
            contract_address: "0xDUCK1234567890abcdef1234567890abcdef1234".to_string(),
            network: "DuckChain Testnet".to_string(),
            stake_amount: 50,
            voting_period_ms: 86_400_000, // 24 hours
            connect_delay_ms: 1000,
            confirm_delay_ms: 2000,
            voting_progress_delay_ms: 5000,
        }
    }
}

impl ChainConfig {
    /// Defaults with environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(rpc_url) = std::env::var("DUCKCHAIN_RPC_URL") {
            config.rpc_url = rpc_url;
        }
        if let Some(stake) = std::env::var("DUCKCHAIN_STAKE_AMOUNT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.stake_amount = stake;
        }
        if let Some(period) = std::env::var("DUCKCHAIN_VOTING_PERIOD_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.voting_period_ms = period;
        }
        config
    }
}
