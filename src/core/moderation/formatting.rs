//! Formatting utilities for presenting verdicts and wallet state.
//!
//! Pure presentation helpers for the UI layer; nothing here is part of
//! the moderation contract.

use regex::Regex;
use std::sync::LazyLock;

use super::moderation_models::{ModerationAction, RiskLevel};

static ADDRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{8,40}$").expect("address pattern must compile"));

/// Confidence score as a whole-number percentage string, e.g. `95%`.
pub fn format_confidence(confidence: f64) -> String {
    format!("{}%", (confidence * 100.0).round() as i64)
}

/// Display color for a risk level.
pub fn risk_color(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "green",
        RiskLevel::Medium => "yellow",
        RiskLevel::High => "orange",
        RiskLevel::Critical => "red",
    }
}

/// Display icon for a moderation action.
pub fn action_icon(action: ModerationAction) -> &'static str {
    match action {
        ModerationAction::Allow | ModerationAction::Approve => "✅",
        ModerationAction::Flag => "⚠️",
        ModerationAction::Remove => "🚫",
        ModerationAction::Escalate => "⬆️",
    }
}

/// Token balance with thousands separators, e.g. `1,250 $DUCK`.
pub fn format_balance(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{grouped} $DUCK")
}

/// Shorten a wallet address for display: `0xDuck1a...4f2e`.
pub fn format_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Whether a string looks like a valid chain address.
#[allow(dead_code)]
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_PATTERN.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_rounds_to_whole_percent() {
        assert_eq!(format_confidence(0.95), "95%");
        assert_eq!(format_confidence(0.854), "85%");
        assert_eq!(format_confidence(0.856), "86%");
        assert_eq!(format_confidence(1.0), "100%");
    }

    #[test]
    fn risk_colors_match_display_palette() {
        assert_eq!(risk_color(RiskLevel::Low), "green");
        assert_eq!(risk_color(RiskLevel::Medium), "yellow");
        assert_eq!(risk_color(RiskLevel::High), "orange");
        assert_eq!(risk_color(RiskLevel::Critical), "red");
    }

    #[test]
    fn action_icons() {
        assert_eq!(action_icon(ModerationAction::Allow), "✅");
        assert_eq!(action_icon(ModerationAction::Flag), "⚠️");
        assert_eq!(action_icon(ModerationAction::Remove), "🚫");
        assert_eq!(action_icon(ModerationAction::Escalate), "⬆️");
    }

    #[test]
    fn balance_groups_thousands() {
        assert_eq!(format_balance(50), "50 $DUCK");
        assert_eq!(format_balance(1250), "1,250 $DUCK");
        assert_eq!(format_balance(1_000_000), "1,000,000 $DUCK");
    }

    #[test]
    fn long_addresses_are_shortened() {
        assert_eq!(format_address("0xDuck12345678"), "0xDuck...5678");
        assert_eq!(format_address("0xABC"), "0xABC");
    }

    #[test]
    fn address_validation() {
        assert!(is_valid_address("0x1234abcd"));
        assert!(is_valid_address("0xDEADBEEF00112233"));
        assert!(!is_valid_address("1234abcd"));
        assert!(!is_valid_address("0x12"));
        assert!(!is_valid_address("0xZZZZZZZZ"));
    }
}
