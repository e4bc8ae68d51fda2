// This is the entry point of the moderation demo.
//
// **Architecture Overview:**
// - `core/` = Business logic (detectors, verdict composer, appeal workflow)
// - `infra/` = Implementations of core traits (in-memory stores)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run a sample feed through analysis and the appeal flow

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::core::appeal::{
    AppealService, AppealStatus, AppealTransaction, ChainConfig, VoteOutcome, VoteTally,
};
use crate::core::moderation::formatting::{
    action_icon, format_address, format_balance, format_confidence, risk_color,
};
use crate::core::moderation::{
    AnalysisEvent, AnalysisRequest, Message, ModerationConfig, ModerationService,
};
use crate::infra::appeal::InMemoryAppealStore;
use crate::infra::moderation::InMemoryResultStore;

/// Sample community feed: a mix of clean chatter, spam, scams and bad links.
const SAMPLE_FEED: [(&str, &str); 6] = [
    ("alice", "Hi everyone! Welcome to QuackNet"),
    ("bob", "Anyone going to the launch party tonight?"),
    (
        "spamduck",
        "Claim your free airdrop now: http://claim-airdrop.tk/login - limited time!",
    ),
    ("carol", "Check this cool doc: https://vitejs.dev/guide/"),
    (
        "scammer",
        "Send me your crypto for guaranteed returns! Risk-free investment!",
    ),
    ("troll", "You're all getting scammed, check http://verify-wallet.ru/"),
];

/// Mock community vote: a coin flip standing in for the on-chain tally.
struct MockCommunityTally;

#[async_trait]
impl VoteTally for MockCommunityTally {
    async fn tally(&self, appeal: &AppealTransaction) -> VoteOutcome {
        let upheld = rand::thread_rng().gen_bool(0.5);
        tracing::info!(
            message_id = %appeal.message_id,
            upheld,
            "community vote tallied"
        );
        if upheld {
            VoteOutcome::Upheld
        } else {
            VoteOutcome::Rejected
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let moderation = Arc::new(ModerationService::new(
        ModerationConfig::from_env(),
        InMemoryResultStore::new(),
    ));
    let appeals = Arc::new(AppealService::new(
        ChainConfig::from_env(),
        InMemoryAppealStore::new(),
    ));

    let analysis_sub = moderation.on_analysis_event(|event| match event {
        AnalysisEvent::Started { request_id, .. } => {
            tracing::info!(%request_id, "analysis started");
        }
        AnalysisEvent::Progress {
            request_id,
            progress,
        } => {
            tracing::debug!(%request_id, progress, "analysis in progress");
        }
        AnalysisEvent::Completed { request_id, result } => {
            tracing::info!(%request_id, risk = %result.overall_risk, "analysis completed");
        }
        AnalysisEvent::Failed { request_id, error } => {
            tracing::warn!(%request_id, %error, "analysis failed");
        }
    });
    let _chain_sub = appeals.on_connection_change(|connection| {
        if let Some(wallet) = &connection.wallet {
            tracing::debug!(
                address = %format_address(&wallet.address),
                balance = %format_balance(wallet.balance),
                "wallet state changed"
            );
        }
    });

    let api_key = std::env::var("MODERATION_API_KEY").ok();
    moderation.connect(api_key.as_deref()).await?;
    tracing::debug!(capabilities = ?moderation.capabilities(), "analysis backend ready");
    let chain = appeals.connect().await?;
    if let Some(wallet) = &chain.wallet {
        println!(
            "wallet {} funded with {}",
            format_address(&wallet.address),
            format_balance(wallet.balance)
        );
    }

    let mut flagged: Vec<Message> = Vec::new();
    for (index, (author, text)) in SAMPLE_FEED.iter().enumerate() {
        let mut message = Message::new(format!("m{}", index + 1), *author, *text);
        let result = moderation
            .analyze_content(AnalysisRequest::new(
                message.id.clone(),
                message.text.clone(),
            ))
            .await?;
        message.apply_verdict(&result);

        println!(
            "{} [{}] {} ({}, {} risk, confidence {})",
            action_icon(result.recommended_action),
            message.id,
            message.text,
            result.category,
            risk_color(result.overall_risk),
            format_confidence(result.confidence),
        );
        if message.removed || result.should_flag {
            flagged.push(message);
        }
    }

    // Walk one flagged message through recommendation and appeal.
    if let Some(message) = flagged.first_mut() {
        if let Some(stored) = moderation.analysis_result(&message.id).await? {
            tracing::debug!(request_id = %stored.id, reasoning = %stored.reasoning, "stored verdict");
        }
        if let Some(recommendation) = moderation.recommendation(&message.id).await? {
            println!(
                "recommendation for {}: {} ({}), evidence: {}",
                message.id,
                recommendation.action,
                format_confidence(recommendation.confidence),
                recommendation.evidence.join("; "),
            );
        }

        let appeal = appeals
            .submit_appeal(&message.id, "I believe this was a false positive")
            .await?;
        println!(
            "appeal for {} submitted, staked {}, tx {}",
            appeal.message_id,
            format_balance(appeal.stake_amount),
            appeal.tx_hash,
        );

        // Give the simulated chain time to confirm and open voting.
        tokio::time::sleep(Duration::from_millis(5500)).await;
        if let Some(appeal) = appeals.appeal(&message.id).await? {
            println!("appeal for {} is now {}", appeal.message_id, appeal.status);
        }

        let resolved = appeals
            .resolve_appeal(&message.id, &MockCommunityTally)
            .await?;
        println!("appeal for {} settled: {}", resolved.message_id, resolved.status);
        message.appeal_status = Some(resolved.status);
        if resolved.status == AppealStatus::Rejected {
            message.mark_removed("Community vote confirmed the verdict");
        }
        if let Some(wallet) = appeals.connection().await.wallet {
            println!("wallet balance after settlement: {}", format_balance(wallet.balance));
        }
    }

    analysis_sub.unsubscribe();
    println!(
        "usage stats: {}",
        serde_json::to_string_pretty(&moderation.usage_stats())?
    );

    moderation.disconnect().await;
    appeals.disconnect().await;
    Ok(())
}
