// Verdict composer - folds detector findings into one analysis result.
//
// Stages run in fixed order: toxicity -> spam -> scam -> malicious links.
// Risk merging is escalation-only: a later stage may raise the overall
// risk but never lower it, so a scam-critical verdict stays critical even
// when the link stage fires after it.

use chrono::Utc;

use super::detectors;
use super::moderation_models::{
    AnalysisRequest, AnalysisResult, ContentCategory, LinkRiskLevel, ModerationAction, RiskLevel,
    ToxicityLevel,
};

/// Confidence reported on the aggregate verdict. Kept as a fixed baseline
/// rather than a function of the individual detector confidences; the
/// per-detector values stay available on the findings.
const BASELINE_CONFIDENCE: f64 = 0.95;

/// Run the enabled detectors over a request and fold their findings into
/// a single verdict. Pure: no IO, no clock beyond the result timestamp.
pub fn compose(request: &AnalysisRequest, model_version: &str) -> AnalysisResult {
    let mut result = AnalysisResult {
        id: request.id.clone(),
        content: request.content.clone(),
        timestamp: Utc::now(),
        overall_risk: RiskLevel::Low,
        should_flag: false,
        category: ContentCategory::Clean,
        confidence: BASELINE_CONFIDENCE,
        toxicity: None,
        spam: None,
        scam: None,
        malicious_links: None,
        recommended_action: ModerationAction::Allow,
        reasoning: "Content appears to be safe and appropriate.".to_string(),
        suggestions: vec![],
        processing_time_ms: 0,
        model_version: model_version.to_string(),
    };

    if request.options.check_toxicity {
        let finding = detectors::detect_toxicity(&request.content);
        if finding.level != ToxicityLevel::Low {
            let severe = finding.level == ToxicityLevel::Severe;
            result.overall_risk = result.overall_risk.max(if severe {
                RiskLevel::Critical
            } else {
                RiskLevel::High
            });
            result.should_flag = true;
            result.category = ContentCategory::HateSpeech;
            result.recommended_action = if severe {
                ModerationAction::Remove
            } else {
                ModerationAction::Flag
            };
            result.reasoning = finding.explanation.clone();
        }
        result.toxicity = Some(finding);
    }

    if request.options.check_spam {
        let finding = detectors::detect_spam(&request.content);
        if finding.is_spam {
            result.overall_risk = result.overall_risk.max(RiskLevel::Medium);
            result.should_flag = true;
            result.category = ContentCategory::Spam;
            // Never downgrade a prior remove to a flag.
            if result.recommended_action == ModerationAction::Allow {
                result.recommended_action = ModerationAction::Flag;
                result.reasoning = finding.explanation.clone();
            }
        }
        result.spam = Some(finding);
    }

    if request.options.check_scams {
        let finding = detectors::detect_scam(&request.content);
        if finding.is_scam {
            // Scam dominates: force the strictest outcome.
            result.overall_risk = RiskLevel::Critical;
            result.should_flag = true;
            result.category = ContentCategory::Scam;
            result.recommended_action = ModerationAction::Remove;
            result.reasoning = finding.explanation.clone();
        }
        result.scam = Some(finding);
    }

    if request.options.check_malicious_links {
        let finding = detectors::detect_malicious_links(&request.content);
        if finding.has_malicious_links {
            let has_high_risk = finding
                .links
                .iter()
                .any(|link| link.risk_level == LinkRiskLevel::High);
            result.overall_risk = result.overall_risk.max(if has_high_risk {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            });
            result.should_flag = true;
            result.category = ContentCategory::MaliciousLink;
            if result.recommended_action == ModerationAction::Allow {
                result.recommended_action = if has_high_risk {
                    ModerationAction::Remove
                } else {
                    ModerationAction::Flag
                };
                result.reasoning = "Content contains potentially malicious links".to_string();
            }
        }
        result.malicious_links = Some(finding);
    }

    if request.options.provide_suggestions {
        result.suggestions = suggestions_for(&result);
    }

    result
}

/// Moderator-facing follow-ups derived from the final verdict.
fn suggestions_for(result: &AnalysisResult) -> Vec<String> {
    let mut suggestions = Vec::new();

    if result.should_flag {
        suggestions.push("Consider notifying the user about community guidelines".to_string());
        suggestions.push("Monitor user for repeated violations".to_string());
    }

    if result
        .malicious_links
        .as_ref()
        .is_some_and(|links| links.has_malicious_links)
    {
        suggestions.push("Strip links and warn user about suspicious URLs".to_string());
    }

    suggestions
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::moderation::moderation_models::AnalysisOptions;

    fn verdict(content: &str) -> AnalysisResult {
        compose(&AnalysisRequest::new("r1", content), "test-model")
    }

    #[test]
    fn clean_message_gets_clean_verdict() {
        let result = verdict("Hello everyone! This is a normal message.");
        assert_eq!(result.overall_risk, RiskLevel::Low);
        assert!(!result.should_flag);
        assert_eq!(result.category, ContentCategory::Clean);
        assert_eq!(result.recommended_action, ModerationAction::Allow);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.reasoning, "Content appears to be safe and appropriate.");
    }

    #[test]
    fn three_toxic_keywords_mean_severe_and_remove() {
        let result = verdict("I hate you, you stupid worthless fool");
        let toxicity = result.toxicity.as_ref().unwrap();
        assert_eq!(toxicity.level, ToxicityLevel::Severe);
        assert_eq!(result.overall_risk, RiskLevel::Critical);
        assert_eq!(result.recommended_action, ModerationAction::Remove);
        assert!(result.should_flag);
    }

    #[test]
    fn single_toxic_keyword_flags_as_hate_speech() {
        let result = verdict("don't be an idiot");
        assert_eq!(result.overall_risk, RiskLevel::High);
        assert_eq!(result.category, ContentCategory::HateSpeech);
        assert_eq!(result.recommended_action, ModerationAction::Flag);
    }

    #[test]
    fn scam_example_forces_remove() {
        let result = verdict("Send me your crypto for guaranteed returns! Risk-free investment!");
        assert_eq!(result.category, ContentCategory::Scam);
        assert!(result.should_flag);
        assert_eq!(result.recommended_action, ModerationAction::Remove);
        assert_eq!(result.overall_risk, RiskLevel::Critical);
    }

    #[test]
    fn link_stage_cannot_downgrade_scam_critical_risk() {
        // Scam fires first (stage order) and the link stage finds a high
        // risk URL afterwards; risk must stay critical and the action must
        // stay remove.
        let result = verdict(
            "Guaranteed returns, verify your wallet at https://airdrop-claim.tk/verify-wallet",
        );
        assert_eq!(result.overall_risk, RiskLevel::Critical);
        assert_eq!(result.recommended_action, ModerationAction::Remove);
        assert!(result
            .malicious_links
            .as_ref()
            .unwrap()
            .has_malicious_links);
    }

    #[test]
    fn malicious_link_alone_flags_message() {
        let result = verdict("grab it here https://airdrop-claim.tk/verify-wallet");
        assert!(result.should_flag);
        assert_eq!(result.category, ContentCategory::MaliciousLink);
        assert_eq!(result.overall_risk, RiskLevel::High);
        assert_eq!(result.recommended_action, ModerationAction::Remove);
    }

    #[test]
    fn spam_does_not_downgrade_prior_remove() {
        // Severe toxicity picks remove; the spam stage flags the content but
        // must leave the action alone.
        let result = verdict("I hate you stupid worthless trash, claim now your free prize");
        assert!(result.spam.as_ref().unwrap().is_spam);
        assert_eq!(result.recommended_action, ModerationAction::Remove);
        assert_eq!(result.overall_risk, RiskLevel::Critical);
    }

    #[test]
    fn gated_detectors_do_not_run() {
        let options = AnalysisOptions {
            check_toxicity: false,
            check_spam: false,
            check_scams: false,
            check_malicious_links: true,
            provide_suggestions: false,
        };
        let request = AnalysisRequest::new("r2", "you stupid idiot").with_options(options);
        let result = compose(&request, "test-model");

        assert!(result.toxicity.is_none());
        assert!(result.spam.is_none());
        assert!(result.scam.is_none());
        assert!(result.malicious_links.is_some());
        assert!(!result.should_flag);
    }

    #[test]
    fn suggestions_only_when_requested() {
        let spam_text = "Claim now your free airdrop at https://claim-bonus.tk limited time!";
        let without = verdict(spam_text);
        assert!(without.suggestions.is_empty());

        let mut options = AnalysisOptions::default();
        options.provide_suggestions = true;
        let request = AnalysisRequest::new("r3", spam_text).with_options(options);
        let with = compose(&request, "test-model");

        assert!(with
            .suggestions
            .iter()
            .any(|s| s.contains("community guidelines")));
        assert!(with.suggestions.iter().any(|s| s.contains("Strip links")));
    }
}
