// Moderation service - connection management, the analysis pipeline,
// the session store port and event fan-out.
//
// The service is constructed once at process start and shared by
// reference; there is no global instance. All simulated latency goes
// through tokio::time so tests can run under a paused clock.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

use super::moderation_models::{
    AiConnection, AlternativeAction, AnalysisEvent, AnalysisRequest, AnalysisResult, Capabilities,
    ConnectionEvent, ConnectionState, ModerationAction, ModerationConfig, ModerationRecommendation,
    ToxicityLevel, UsageStats,
};
use super::verdict;
use crate::core::events::{EventBus, Subscription};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[allow(dead_code)]
    #[error("failed to connect to content analysis API: {0}")]
    ConnectionFailed(String),

    #[error("not connected to the content analysis API")]
    NotConnected,

    #[error("rate limited: {remaining} requests remaining, quota resets at {reset_at}")]
    RateLimited {
        remaining: u32,
        reset_at: chrono::DateTime<Utc>,
    },

    #[allow(dead_code)]
    #[error("storage error: {0}")]
    Storage(String),
}

impl ModerationError {
    /// Machine-readable error code surfaced alongside the message.
    #[allow(dead_code)]
    pub fn code(&self) -> &'static str {
        match self {
            ModerationError::ConnectionFailed(_) => "CONNECTION_FAILED",
            ModerationError::NotConnected => "NOT_CONNECTED",
            ModerationError::RateLimited { .. } => "RATE_LIMITED",
            ModerationError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Session store for completed verdicts, keyed by request id.
///
/// Writing the same id again overwrites the previous result; lookups for
/// unknown ids return None rather than an error.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn put(&self, result: AnalysisResult) -> Result<(), ModerationError>;

    async fn get(&self, id: &str) -> Result<Option<AnalysisResult>, ModerationError>;
}

// ============================================================================
// USAGE COUNTERS
// ============================================================================

/// Process-wide counters behind the UsageStats snapshot.
#[derive(Default)]
struct UsageCounters {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    total_response_ms: AtomicU64,
    rate_limit_hits: AtomicU64,
}

impl UsageCounters {
    fn snapshot(&self) -> UsageStats {
        let successful = self.successful.load(Ordering::Relaxed);
        let total_response_ms = self.total_response_ms.load(Ordering::Relaxed);
        UsageStats {
            total_requests: self.total.load(Ordering::Relaxed),
            successful_requests: successful,
            failed_requests: self.failed.load(Ordering::Relaxed),
            average_response_time_ms: if successful == 0 {
                0.0
            } else {
                total_response_ms as f64 / successful as f64
            },
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

/// Content moderation service backed by a session store.
pub struct ModerationService<S: ResultStore> {
    config: ModerationConfig,
    store: S,
    connection: Mutex<AiConnection>,
    stats: UsageCounters,
    analysis_events: EventBus<AnalysisEvent>,
    connection_events: EventBus<ConnectionEvent>,
}

impl<S: ResultStore> ModerationService<S> {
    pub fn new(config: ModerationConfig, store: S) -> Self {
        let connection = AiConnection::disconnected(config.model.clone());
        Self {
            config,
            store,
            connection: Mutex::new(connection),
            stats: UsageCounters::default(),
            analysis_events: EventBus::new(),
            connection_events: EventBus::new(),
        }
    }

    /// Connect to the analysis API. The handshake is simulated with a
    /// fixed delay; a fresh connection starts with a full rate-limit quota.
    pub async fn connect(&self, api_key: Option<&str>) -> Result<AiConnection, ModerationError> {
        {
            let mut connection = self.connection.lock().await;
            connection.state = ConnectionState::Connecting;
        }
        tracing::info!(model = %self.config.model, "connecting to content analysis API");
        if api_key.is_none() {
            tracing::debug!("no API key supplied, connecting anonymously");
        }

        tokio::time::sleep(Duration::from_millis(self.config.connect_delay_ms)).await;

        let snapshot = {
            let mut connection = self.connection.lock().await;
            connection.state = ConnectionState::Connected;
            connection.is_authenticated = true;
            connection.rate_limit_remaining = Some(self.config.rate_limit_quota);
            connection.rate_limit_reset = Some(Utc::now() + ChronoDuration::hours(1));
            connection.clone()
        };

        self.connection_events.emit(&ConnectionEvent::Connected {
            model: snapshot.model.clone(),
        });
        Ok(snapshot)
    }

    pub async fn disconnect(&self) {
        {
            let mut connection = self.connection.lock().await;
            *connection = AiConnection::disconnected(self.config.model.clone());
        }
        self.connection_events.emit(&ConnectionEvent::Disconnected);
        tracing::info!("disconnected from content analysis API");
    }

    pub async fn connection(&self) -> AiConnection {
        self.connection.lock().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_connected()
    }

    /// Analyze one message. Runs the enabled detectors after a simulated
    /// network round trip, stores the verdict under the request id (overwriting
    /// any earlier verdict for that id) and emits lifecycle events.
    pub async fn analyze_content(
        &self,
        request: AnalysisRequest,
    ) -> Result<AnalysisResult, ModerationError> {
        self.check_quota().await?;

        self.stats.total.fetch_add(1, Ordering::Relaxed);
        self.analysis_events.emit(&AnalysisEvent::Started {
            request_id: request.id.clone(),
            at: Utc::now(),
        });

        let started = tokio::time::Instant::now();

        // Simulated API processing time: base latency plus uniform jitter.
        let latency_ms = {
            let mut rng = rand::thread_rng();
            self.config.latency_base_ms + rng.gen_range(0..=self.config.latency_jitter_ms)
        };
        tokio::time::sleep(Duration::from_millis(latency_ms)).await;

        self.analysis_events.emit(&AnalysisEvent::Progress {
            request_id: request.id.clone(),
            progress: 0.5,
        });

        let mut result = verdict::compose(&request, &self.config.model);
        result.processing_time_ms = started.elapsed().as_millis() as u64;

        if let Err(error) = self.store.put(result.clone()).await {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            self.analysis_events.emit(&AnalysisEvent::Failed {
                request_id: request.id.clone(),
                error: error.to_string(),
            });
            return Err(error);
        }

        self.stats.successful.fetch_add(1, Ordering::Relaxed);
        self.stats
            .total_response_ms
            .fetch_add(result.processing_time_ms, Ordering::Relaxed);

        tracing::debug!(
            request_id = %result.id,
            risk = %result.overall_risk,
            category = %result.category,
            action = %result.recommended_action,
            "analysis completed"
        );
        self.analysis_events.emit(&AnalysisEvent::Completed {
            request_id: result.id.clone(),
            result: result.clone(),
        });

        Ok(result)
    }

    /// Look up a stored verdict. Unknown ids are None, not an error.
    pub async fn analysis_result(
        &self,
        id: &str,
    ) -> Result<Option<AnalysisResult>, ModerationError> {
        self.store.get(id).await
    }

    /// Derive a moderation recommendation from a stored verdict.
    pub async fn recommendation(
        &self,
        message_id: &str,
    ) -> Result<Option<ModerationRecommendation>, ModerationError> {
        let Some(result) = self.store.get(message_id).await? else {
            return Ok(None);
        };

        Ok(Some(ModerationRecommendation {
            message_id: message_id.to_string(),
            action: result.recommended_action,
            confidence: result.confidence,
            reasoning: result.reasoning.clone(),
            evidence: evidence_for(&result),
            alternative_actions: alternatives_for(result.recommended_action),
        }))
    }

    pub fn usage_stats(&self) -> UsageStats {
        self.stats.snapshot()
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            content_analysis: true,
            toxicity_detection: true,
            spam_detection: true,
            scam_detection: true,
            link_analysis: true,
            contextual_analysis: true,
            multi_language_support: false,
            real_time_analysis: true,
        }
    }

    pub fn on_analysis_event(
        &self,
        callback: impl Fn(&AnalysisEvent) + Send + Sync + 'static,
    ) -> Subscription<AnalysisEvent> {
        self.analysis_events.subscribe(callback)
    }

    pub fn on_connection_event(
        &self,
        callback: impl Fn(&ConnectionEvent) + Send + Sync + 'static,
    ) -> Subscription<ConnectionEvent> {
        self.connection_events.subscribe(callback)
    }

    /// Reject callers that are disconnected or out of quota, and consume
    /// one unit of quota otherwise.
    async fn check_quota(&self) -> Result<(), ModerationError> {
        let mut connection = self.connection.lock().await;
        if !connection.is_connected() {
            return Err(ModerationError::NotConnected);
        }

        let remaining = connection.rate_limit_remaining.unwrap_or(0);
        let reset_at = connection
            .rate_limit_reset
            .unwrap_or_else(|| Utc::now() + ChronoDuration::hours(1));
        if remaining == 0 {
            self.stats.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
            drop(connection);
            self.connection_events
                .emit(&ConnectionEvent::RateLimited { reset_at });
            tracing::warn!("analysis request rejected: rate limit quota exhausted");
            return Err(ModerationError::RateLimited {
                remaining: 0,
                reset_at,
            });
        }

        connection.rate_limit_remaining = Some(remaining - 1);
        Ok(())
    }
}

/// One evidence line per detector that fired.
fn evidence_for(result: &AnalysisResult) -> Vec<String> {
    let mut evidence = Vec::new();

    if let Some(toxicity) = &result.toxicity {
        if toxicity.level != ToxicityLevel::Low {
            evidence.push(format!("Toxicity level: {}", toxicity.level));
        }
    }
    if result.spam.as_ref().is_some_and(|spam| spam.is_spam) {
        evidence.push("Contains spam patterns".to_string());
    }
    if result.scam.as_ref().is_some_and(|scam| scam.is_scam) {
        evidence.push("Contains scam indicators".to_string());
    }
    if result
        .malicious_links
        .as_ref()
        .is_some_and(|links| links.has_malicious_links)
    {
        evidence.push("Contains suspicious links".to_string());
    }

    if evidence.is_empty() {
        evidence.push("AI analysis completed".to_string());
    }
    evidence
}

/// Fixed alternative-action tables for the two reviewable verdicts.
fn alternatives_for(action: ModerationAction) -> Vec<AlternativeAction> {
    match action {
        ModerationAction::Remove => vec![
            AlternativeAction {
                action: ModerationAction::Flag,
                reasoning: "Flag for manual review instead of immediate removal".to_string(),
                confidence: 0.7,
            },
            AlternativeAction {
                action: ModerationAction::Escalate,
                reasoning: "Escalate to senior moderators".to_string(),
                confidence: 0.8,
            },
        ],
        ModerationAction::Flag => vec![
            AlternativeAction {
                action: ModerationAction::Approve,
                reasoning: "Allow with monitoring".to_string(),
                confidence: 0.6,
            },
            AlternativeAction {
                action: ModerationAction::Remove,
                reasoning: "Remove if risk tolerance is low".to_string(),
                confidence: 0.7,
            },
        ],
        _ => vec![],
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::{ContentCategory, RiskLevel};
    use dashmap::DashMap;
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    /// In-memory store for testing
    struct MockResultStore {
        results: DashMap<String, AnalysisResult>,
    }

    impl MockResultStore {
        fn new() -> Self {
            Self {
                results: DashMap::new(),
            }
        }
    }

    #[async_trait]
    impl ResultStore for MockResultStore {
        async fn put(&self, result: AnalysisResult) -> Result<(), ModerationError> {
            self.results.insert(result.id.clone(), result);
            Ok(())
        }

        async fn get(&self, id: &str) -> Result<Option<AnalysisResult>, ModerationError> {
            Ok(self.results.get(id).map(|entry| entry.clone()))
        }
    }

    fn service() -> ModerationService<MockResultStore> {
        ModerationService::new(ModerationConfig::default(), MockResultStore::new())
    }

    #[tokio::test(start_paused = true)]
    async fn analyze_requires_connection() {
        let service = service();
        let error = service
            .analyze_content(AnalysisRequest::new("r1", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(error, ModerationError::NotConnected));
        assert_eq!(error.code(), "NOT_CONNECTED");
        assert_eq!(service.usage_stats().total_requests, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_message_is_allowed_and_stored() {
        let service = service();
        service.connect(None).await.unwrap();

        let result = service
            .analyze_content(AnalysisRequest::new(
                "m1",
                "Hello everyone! This is a normal message.",
            ))
            .await
            .unwrap();

        assert_eq!(result.category, ContentCategory::Clean);
        assert!(!result.should_flag);
        assert_eq!(result.recommended_action, ModerationAction::Allow);

        let stored = service.analysis_result("m1").await.unwrap().unwrap();
        assert_eq!(stored.category, ContentCategory::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_id_returns_none() {
        let service = service();
        assert!(service.analysis_result("missing").await.unwrap().is_none());
        assert!(service.recommendation("missing").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_an_id_overwrites_the_stored_verdict() {
        let service = service();
        service.connect(None).await.unwrap();

        service
            .analyze_content(AnalysisRequest::new("m1", "Hello there"))
            .await
            .unwrap();
        service
            .analyze_content(AnalysisRequest::new(
                "m1",
                "Risk-free investment, guaranteed returns!",
            ))
            .await
            .unwrap();

        let stored = service.analysis_result("m1").await.unwrap().unwrap();
        assert_eq!(stored.category, ContentCategory::Scam);
        assert_eq!(stored.overall_risk, RiskLevel::Critical);
        assert_eq!(service.usage_stats().total_requests, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn quota_exhaustion_is_rate_limited_with_metadata() {
        let config = ModerationConfig {
            rate_limit_quota: 1,
            ..Default::default()
        };
        let service = ModerationService::new(config, MockResultStore::new());
        service.connect(None).await.unwrap();

        service
            .analyze_content(AnalysisRequest::new("m1", "hello"))
            .await
            .unwrap();

        let error = service
            .analyze_content(AnalysisRequest::new("m2", "hello again"))
            .await
            .unwrap_err();
        match error {
            ModerationError::RateLimited { remaining, .. } => assert_eq!(remaining, 0),
            other => panic!("expected RateLimited, got {other:?}"),
        }
        assert_eq!(service.usage_stats().rate_limit_hits, 1);
        // The rejected call never counts as a request.
        assert_eq!(service.usage_stats().total_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stats_track_successes_and_response_time() {
        let service = service();
        service.connect(None).await.unwrap();

        service
            .analyze_content(AnalysisRequest::new("m1", "first"))
            .await
            .unwrap();
        service
            .analyze_content(AnalysisRequest::new("m2", "second"))
            .await
            .unwrap();

        let stats = service.usage_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 2);
        assert_eq!(stats.failed_requests, 0);
        // Simulated latency is at least the configured base.
        assert!(stats.average_response_time_ms >= 1000.0);
    }

    #[tokio::test(start_paused = true)]
    async fn remove_verdict_offers_flag_and_escalate_alternatives() {
        let service = service();
        service.connect(None).await.unwrap();

        service
            .analyze_content(AnalysisRequest::new(
                "m1",
                "Send me your crypto for guaranteed returns! Risk-free investment!",
            ))
            .await
            .unwrap();

        let recommendation = service.recommendation("m1").await.unwrap().unwrap();
        assert_eq!(recommendation.action, ModerationAction::Remove);
        assert!(recommendation
            .evidence
            .contains(&"Contains scam indicators".to_string()));
        let alternatives: Vec<ModerationAction> = recommendation
            .alternative_actions
            .iter()
            .map(|alt| alt.action)
            .collect();
        assert_eq!(
            alternatives,
            vec![ModerationAction::Flag, ModerationAction::Escalate]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn allow_verdict_has_fallback_evidence_and_no_alternatives() {
        let service = service();
        service.connect(None).await.unwrap();

        service
            .analyze_content(AnalysisRequest::new("m1", "lovely weather today"))
            .await
            .unwrap();

        let recommendation = service.recommendation("m1").await.unwrap().unwrap();
        assert_eq!(recommendation.action, ModerationAction::Allow);
        assert_eq!(recommendation.evidence, vec!["AI analysis completed"]);
        assert!(recommendation.alternative_actions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn analysis_events_fire_in_lifecycle_order() {
        let service = service();
        service.connect(None).await.unwrap();

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let subscription = service.on_analysis_event(move |event| {
            let label = match event {
                AnalysisEvent::Started { .. } => "started",
                AnalysisEvent::Progress { .. } => "progress",
                AnalysisEvent::Completed { .. } => "completed",
                AnalysisEvent::Failed { .. } => "failed",
            };
            seen_clone.lock().unwrap().push(label);
        });

        service
            .analyze_content(AnalysisRequest::new("m1", "hello"))
            .await
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["started", "progress", "completed"]);

        subscription.unsubscribe();
        service
            .analyze_content(AnalysisRequest::new("m2", "hello again"))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_and_disconnect_emit_connection_events() {
        let service = service();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let _sub = service.on_connection_event(move |event| {
            let label = match event {
                ConnectionEvent::Connected { .. } => "connected",
                ConnectionEvent::Disconnected => "disconnected",
                ConnectionEvent::RateLimited { .. } => "rate_limited",
                ConnectionEvent::Error { .. } => "error",
            };
            seen_clone.lock().unwrap().push(label);
        });

        service.connect(None).await.unwrap();
        assert!(service.is_connected().await);
        service.disconnect().await;
        assert!(!service.is_connected().await);

        assert_eq!(*seen.lock().unwrap(), vec!["connected", "disconnected"]);
    }
}
