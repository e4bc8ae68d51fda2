// Content detectors - independent pure functions over message text.
//
// Each detector inspects the raw text and returns a structured finding.
// They never fail on well-formed input: empty or non-matching text yields
// the "clean" finding with the stated default confidence.

use regex::Regex;
use std::sync::LazyLock;

use super::moderation_models::{
    FlaggedLink, LinkCategory, LinkFinding, LinkRiskLevel, ScamFinding, ScamType, SpamFinding,
    ToxicityFinding, ToxicityLevel,
};

/// Fixed keyword list for the toxicity detector.
const TOXIC_KEYWORDS: [&str; 8] = [
    "hate", "stupid", "idiot", "trash", "garbage", "kill", "die", "worthless",
];

/// Promotional-urgency phrasing typical of spam. Order matters only for
/// reporting; a single match is enough.
static SPAM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(free|win|claim|airdrop|giveaway)\s+(now|here|click)\b",
        r"(?i)\b(guaranteed|100%|instant)\s+(profit|money|crypto)\b",
        r"(?i)\b(urgent|act\s+fast|limited\s+time)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("spam pattern must compile"))
    .collect()
});

/// Phrases that mark crypto scams, matched case-insensitively as substrings.
const SCAM_INDICATORS: [&str; 8] = [
    "send me crypto",
    "doubling coins",
    "investment opportunity",
    "risk-free",
    "guaranteed returns",
    "verify your wallet",
    "connect wallet here",
    "exclusive access",
];

/// Suspicious domain fragments and throwaway TLDs.
const MALICIOUS_DOMAINS: [&str; 9] = [
    ".tk",
    ".ml",
    ".ga",
    ".cf",
    "bit.ly",
    "tinyurl.com",
    "airdrop-claim",
    "verify-wallet",
    "crypto-bonus",
];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url pattern must compile"));

/// Count toxic keywords and map the count to a severity level.
pub fn detect_toxicity(text: &str) -> ToxicityFinding {
    let normalized = text.to_lowercase();
    let matched: Vec<&str> = TOXIC_KEYWORDS
        .iter()
        .copied()
        .filter(|word| normalized.contains(word))
        .collect();

    let level = match matched.len() {
        0 => ToxicityLevel::Low,
        1 => ToxicityLevel::Medium,
        2 => ToxicityLevel::High,
        _ => ToxicityLevel::Severe,
    };

    if matched.is_empty() {
        ToxicityFinding {
            level,
            confidence: 0.95,
            categories: vec![],
            explanation: "No toxic language detected".to_string(),
        }
    } else {
        ToxicityFinding {
            level,
            confidence: 0.85,
            categories: vec!["offensive_language".to_string()],
            explanation: format!(
                "Detected potentially toxic language: {}",
                matched.join(", ")
            ),
        }
    }
}

/// Test the fixed spam patterns; any match makes the message spam.
pub fn detect_spam(text: &str) -> SpamFinding {
    let is_spam = SPAM_PATTERNS.iter().any(|pattern| pattern.is_match(text));

    if is_spam {
        SpamFinding {
            is_spam: true,
            confidence: 0.8,
            indicators: vec![
                "promotional_language".to_string(),
                "urgency_keywords".to_string(),
            ],
            explanation: "Content contains spam-like promotional language".to_string(),
        }
    } else {
        SpamFinding {
            is_spam: false,
            confidence: 0.9,
            indicators: vec![],
            explanation: "No spam indicators detected".to_string(),
        }
    }
}

/// Substring-match the scam phrase list. Matches default to phishing.
pub fn detect_scam(text: &str) -> ScamFinding {
    let normalized = text.to_lowercase();
    let matched: Vec<String> = SCAM_INDICATORS
        .iter()
        .filter(|indicator| normalized.contains(*indicator))
        .map(|indicator| indicator.to_string())
        .collect();

    if matched.is_empty() {
        ScamFinding {
            is_scam: false,
            confidence: 0.95,
            scam_type: None,
            risk_factors: vec![],
            explanation: "No scam indicators detected".to_string(),
        }
    } else {
        let explanation = format!(
            "Potential scam detected with indicators: {}",
            matched.join(", ")
        );
        ScamFinding {
            is_scam: true,
            confidence: 0.9,
            scam_type: Some(ScamType::Phishing),
            risk_factors: matched,
            explanation,
        }
    }
}

/// Extract every http(s) URL and flag the ones that hit the suspicious
/// domain list. Flagged URLs are always reported as high risk.
pub fn detect_malicious_links(text: &str) -> LinkFinding {
    let links: Vec<FlaggedLink> = URL_PATTERN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|url| MALICIOUS_DOMAINS.iter().any(|domain| url.contains(domain)))
        .map(|url| FlaggedLink {
            url: url.to_string(),
            risk_level: LinkRiskLevel::High,
            category: LinkCategory::Suspicious,
            explanation: "URL contains suspicious domain patterns".to_string(),
        })
        .collect();

    LinkFinding {
        has_malicious_links: !links.is_empty(),
        links,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_yields_low_toxicity_with_default_confidence() {
        let finding = detect_toxicity("Hello everyone! This is a normal message.");
        assert_eq!(finding.level, ToxicityLevel::Low);
        assert_eq!(finding.confidence, 0.95);
        assert!(finding.categories.is_empty());
    }

    #[test]
    fn toxicity_level_scales_with_keyword_count() {
        assert_eq!(detect_toxicity("you idiot").level, ToxicityLevel::Medium);
        assert_eq!(
            detect_toxicity("you stupid idiot").level,
            ToxicityLevel::High
        );
        assert_eq!(
            detect_toxicity("I hate you, you stupid worthless idiot").level,
            ToxicityLevel::Severe
        );
    }

    #[test]
    fn toxicity_matching_ignores_case() {
        let finding = detect_toxicity("You IDIOT");
        assert_eq!(finding.level, ToxicityLevel::Medium);
        assert_eq!(finding.confidence, 0.85);
    }

    #[test]
    fn empty_text_is_clean_for_every_detector() {
        assert_eq!(detect_toxicity("").level, ToxicityLevel::Low);
        assert!(!detect_spam("").is_spam);
        assert!(!detect_scam("").is_scam);
        assert!(!detect_malicious_links("").has_malicious_links);
    }

    #[test]
    fn promotional_urgency_is_spam() {
        let finding = detect_spam("Claim now your free tokens, limited time offer!");
        assert!(finding.is_spam);
        assert_eq!(finding.confidence, 0.8);

        let clean = detect_spam("Anyone going to the launch party tonight?");
        assert!(!clean.is_spam);
        assert_eq!(clean.confidence, 0.9);
    }

    #[test]
    fn guaranteed_profit_phrasing_is_spam() {
        assert!(detect_spam("guaranteed profit for everyone").is_spam);
        assert!(detect_spam("instant crypto if you join today").is_spam);
    }

    #[test]
    fn scam_phrases_match_case_insensitively() {
        let finding = detect_scam("Totally RISK-FREE investment, Guaranteed Returns!");
        assert!(finding.is_scam);
        assert_eq!(finding.scam_type, Some(ScamType::Phishing));
        assert!(finding.risk_factors.contains(&"risk-free".to_string()));
        assert!(finding.risk_factors.contains(&"guaranteed returns".to_string()));
    }

    #[test]
    fn suspicious_tld_link_is_flagged_high_risk() {
        let finding = detect_malicious_links(
            "check this out https://airdrop-claim.tk/verify-wallet before it expires",
        );
        assert!(finding.has_malicious_links);
        assert_eq!(finding.links.len(), 1);
        assert_eq!(finding.links[0].risk_level, LinkRiskLevel::High);
        assert_eq!(finding.links[0].category, LinkCategory::Suspicious);
    }

    #[test]
    fn reputable_link_is_not_flagged() {
        let finding = detect_malicious_links("Check this cool doc: https://vitejs.dev/guide/");
        assert!(!finding.has_malicious_links);
        assert!(finding.links.is_empty());
    }

    #[test]
    fn multiple_bad_urls_are_all_reported() {
        let finding = detect_malicious_links(
            "http://verify-wallet.ru and also https://bit.ly/3abc plus http://crypto-bonus.ml/x",
        );
        assert_eq!(finding.links.len(), 3);
    }
}
