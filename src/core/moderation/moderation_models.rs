// Moderation domain models - data structures for content analysis.
//
// These are pure domain types with no transport dependencies.
// The service layer converts these to whatever the UI needs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::appeal::AppealStatus;

// ============================================================================
// MESSAGES
// ============================================================================

/// Lifecycle status of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Nothing objectionable found (or not analyzed yet)
    Normal,
    /// Flagged by the moderation verdict, pending review/appeal
    FlaggedByModerator,
    /// Verdict confirmed by a verifier; message hidden
    VerifiedByVerifier,
}

/// A chat message as seen by the moderation pipeline.
///
/// `text` is immutable once created; only `status`, `reason`, `removed`
/// and `appeal_status` change over the message's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub reason: Option<String>,
    pub removed: bool,
    pub appeal_status: Option<AppealStatus>,
}

impl Message {
    pub fn new(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            created_at: Utc::now(),
            status: MessageStatus::Normal,
            reason: None,
            removed: false,
            appeal_status: None,
        }
    }

    /// Apply a completed verdict to this message. Flagging only - the
    /// verifier/appeal flow decides about removal.
    pub fn apply_verdict(&mut self, result: &AnalysisResult) {
        if result.should_flag {
            self.status = MessageStatus::FlaggedByModerator;
            self.reason = Some(result.reasoning.clone());
        }
    }

    /// Confirm a flagged message as a violation and hide it.
    pub fn mark_removed(&mut self, reason: impl Into<String>) {
        self.status = MessageStatus::VerifiedByVerifier;
        self.reason = Some(reason.into());
        self.removed = true;
    }
}

// ============================================================================
// ANALYSIS PRIMITIVES
// ============================================================================

/// Aggregated risk of a message. Ordered so that verdict stages can
/// escalate with `max` and never downgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Severity of toxic language in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToxicityLevel {
    Low,
    Medium,
    High,
    Severe,
}

impl fmt::Display for ToxicityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToxicityLevel::Low => write!(f, "low"),
            ToxicityLevel::Medium => write!(f, "medium"),
            ToxicityLevel::High => write!(f, "high"),
            ToxicityLevel::Severe => write!(f, "severe"),
        }
    }
}

/// Which class of violation dominated the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    Clean,
    Spam,
    HateSpeech,
    Scam,
    MaliciousLink,
    Inappropriate,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentCategory::Clean => write!(f, "clean"),
            ContentCategory::Spam => write!(f, "spam"),
            ContentCategory::HateSpeech => write!(f, "hate_speech"),
            ContentCategory::Scam => write!(f, "scam"),
            ContentCategory::MaliciousLink => write!(f, "malicious_link"),
            ContentCategory::Inappropriate => write!(f, "inappropriate"),
        }
    }
}

/// What the pipeline recommends doing with a message.
///
/// Verdicts only ever produce `Allow`, `Flag`, `Remove` or `Escalate`;
/// `Approve` appears in recommendation alternatives ("allow with
/// monitoring").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Allow,
    Approve,
    Flag,
    Remove,
    Escalate,
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationAction::Allow => write!(f, "allow"),
            ModerationAction::Approve => write!(f, "approve"),
            ModerationAction::Flag => write!(f, "flag"),
            ModerationAction::Remove => write!(f, "remove"),
            ModerationAction::Escalate => write!(f, "escalate"),
        }
    }
}

// ============================================================================
// REQUESTS
// ============================================================================

/// Per-request gates over which detectors run. All detectors are
/// enabled by default; suggestions are opt-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOptions {
    pub check_toxicity: bool,
    pub check_spam: bool,
    pub check_scams: bool,
    pub check_malicious_links: bool,
    pub provide_suggestions: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            check_toxicity: true,
            check_spam: true,
            check_scams: true,
            check_malicious_links: true,
            provide_suggestions: false,
        }
    }
}

/// One content-analysis request, keyed by the message id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: String,
    pub content: String,
    pub author: Option<String>,
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author: None,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }
}

// ============================================================================
// DETECTOR FINDINGS
// ============================================================================

/// Toxicity detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToxicityFinding {
    pub level: ToxicityLevel,
    pub confidence: f64,
    pub categories: Vec<String>,
    pub explanation: String,
}

/// Spam detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamFinding {
    pub is_spam: bool,
    pub confidence: f64,
    pub indicators: Vec<String>,
    pub explanation: String,
}

/// Classification of a detected scam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScamType {
    Phishing,
    Investment,
    FakeAirdrop,
    Impersonation,
    Other,
}

/// Scam detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamFinding {
    pub is_scam: bool,
    pub confidence: f64,
    pub scam_type: Option<ScamType>,
    pub risk_factors: Vec<String>,
    pub explanation: String,
}

/// Risk assigned to a single extracted URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkCategory {
    Suspicious,
    Malware,
    Phishing,
    Scam,
}

/// One URL the link detector flagged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedLink {
    pub url: String,
    pub risk_level: LinkRiskLevel,
    pub category: LinkCategory,
    pub explanation: String,
}

/// Malicious-link detector output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkFinding {
    pub has_malicious_links: bool,
    pub links: Vec<FlaggedLink>,
}

// ============================================================================
// VERDICTS
// ============================================================================

/// The aggregated verdict for one analysis request.
///
/// Immutable once the analysis completes; owned by the session store,
/// keyed by request id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub overall_risk: RiskLevel,
    pub should_flag: bool,
    pub category: ContentCategory,
    pub confidence: f64,

    // Per-detector sub-results (None when the detector was gated off)
    pub toxicity: Option<ToxicityFinding>,
    pub spam: Option<SpamFinding>,
    pub scam: Option<ScamFinding>,
    pub malicious_links: Option<LinkFinding>,

    pub recommended_action: ModerationAction,
    pub reasoning: String,
    pub suggestions: Vec<String>,

    pub processing_time_ms: u64,
    pub model_version: String,
}

/// An alternative a moderator could take instead of the recommended action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeAction {
    pub action: ModerationAction,
    pub reasoning: String,
    pub confidence: f64,
}

/// Derived view over a stored verdict - computed on demand, not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRecommendation {
    pub message_id: String,
    pub action: ModerationAction,
    pub confidence: f64,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub alternative_actions: Vec<AlternativeAction>,
}

// ============================================================================
// CONNECTION & STATS
// ============================================================================

/// State of the connection to the content-analysis API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Snapshot of the analysis-API connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConnection {
    pub state: ConnectionState,
    pub model: String,
    pub is_authenticated: bool,
    pub rate_limit_remaining: Option<u32>,
    pub rate_limit_reset: Option<DateTime<Utc>>,
}

impl AiConnection {
    pub fn disconnected(model: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            model: model.into(),
            is_authenticated: false,
            rate_limit_remaining: None,
            rate_limit_reset: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.is_authenticated
    }
}

/// Process-wide usage counters. Monotonic; reset only on restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub rate_limit_hits: u64,
}

/// Static capability matrix of the analysis backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    pub content_analysis: bool,
    pub toxicity_detection: bool,
    pub spam_detection: bool,
    pub scam_detection: bool,
    pub link_analysis: bool,
    pub contextual_analysis: bool,
    pub multi_language_support: bool,
    pub real_time_analysis: bool,
}

// ============================================================================
// EVENTS
// ============================================================================

/// Lifecycle events emitted per analysis request.
#[derive(Debug, Clone)]
pub enum AnalysisEvent {
    Started {
        request_id: String,
        at: DateTime<Utc>,
    },
    Progress {
        request_id: String,
        progress: f32,
    },
    Completed {
        request_id: String,
        result: AnalysisResult,
    },
    Failed {
        request_id: String,
        error: String,
    },
}

/// Connection lifecycle events.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected { model: String },
    Disconnected,
    RateLimited { reset_at: DateTime<Utc> },
    #[allow(dead_code)]
    Error { message: String },
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the moderation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
    /// Simulated connect handshake delay
    pub connect_delay_ms: u64,
    /// Simulated analysis latency: base + uniform jitter
    pub latency_base_ms: u64,
    pub latency_jitter_ms: u64,
    /// Requests allowed per connection before RATE_LIMITED
    pub rate_limit_quota: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.chaingpt.org/v1/analyze".to_string(),
            model: "chaingpt-moderation-v2".to_string(),
            temperature: 0.1,
            max_tokens: 1000,
            timeout_ms: 10_000,
            connect_delay_ms: 800,
            latency_base_ms: 1000,
            latency_jitter_ms: 2000,
            rate_limit_quota: 1000,
        }
    }
}

impl ModerationConfig {
    /// Defaults with environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var("MODERATION_ENDPOINT") {
            config.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("MODERATION_MODEL") {
            config.model = model;
        }
        if let Some(quota) = std::env::var("MODERATION_RATE_LIMIT_QUOTA")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.rate_limit_quota = quota;
        }
        if let Some(base) = std::env::var("MODERATION_LATENCY_BASE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.latency_base_ms = base;
        }
        config
    }
}

// ============================================================================
// TESTS
// ============================================================================
