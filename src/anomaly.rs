// ============================================================================
// Anomaly Scoring
// ============================================================================
//
// Rule-based spam heuristic. Rules are additive and evaluated in a fixed
// order; reasons are reported in that same order. The result is clamped to
// [0, 1] and anything above SPAM_THRESHOLD is classified as spam.
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Message;

pub const SPAM_THRESHOLD: f64 = 0.7;

const SPAM_KEYWORDS: [&str; 6] = ["free", "win", "urgent", "click here", "limited time", "act now"];
const KEYWORD_WEIGHT: f64 = 0.4;

const CAPS_RATIO_LIMIT: f64 = 0.5;
const CAPS_PENALTY: f64 = 0.3;

const EXCLAMATION_LIMIT: usize = 3;
const EXCLAMATION_PENALTY: f64 = 0.2;

const SHORT_MESSAGE_CHARS: usize = 10;
const SHORT_MESSAGE_PENALTY: f64 = 0.1;

pub const REASON_KEYWORDS: &str = "Contains spam keywords";
pub const REASON_CAPS: &str = "Excessive capitalization";
pub const REASON_EXCLAMATION: &str = "Excessive exclamation marks";
pub const REASON_SHORT: &str = "Very short message";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    pub message_id: Uuid,
    pub score: f64,
    pub is_spam: bool,
    pub reasons: Vec<String>,
    /// When the score was computed
    pub timestamp: DateTime<Utc>,
}

impl AnomalyScore {
    pub fn for_message(message: &Message) -> Self {
        let (score, reasons) = score(&message.content);
        Self {
            message_id: message.id,
            score,
            is_spam: is_spam(score),
            reasons,
            timestamp: Utc::now(),
        }
    }
}

pub fn is_spam(score: f64) -> bool {
    score > SPAM_THRESHOLD
}

/// Score `content`. Pure and deterministic.
pub fn score(content: &str) -> (f64, Vec<String>) {
    let mut total = 0.0;
    let mut reasons = Vec::new();

    // 1. Keywords
    let lowered = content.to_lowercase();
    let matched = SPAM_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .count();
    if matched > 0 {
        total += matched as f64 / SPAM_KEYWORDS.len() as f64 * KEYWORD_WEIGHT;
        reasons.push(REASON_KEYWORDS.to_string());
    }

    // 2. Capitalization
    let length = content.chars().count();
    if length > 0 {
        let upper = content.chars().filter(|c| c.is_ascii_uppercase()).count();
        if upper as f64 / length as f64 > CAPS_RATIO_LIMIT {
            total += CAPS_PENALTY;
            reasons.push(REASON_CAPS.to_string());
        }
    }

    // 3. Exclamation marks
    if content.matches('!').count() > EXCLAMATION_LIMIT {
        total += EXCLAMATION_PENALTY;
        reasons.push(REASON_EXCLAMATION.to_string());
    }

    // 4. Brevity
    if content.trim().chars().count() < SHORT_MESSAGE_CHARS {
        total += SHORT_MESSAGE_PENALTY;
        reasons.push(REASON_SHORT.to_string());
    }

    (f64::min(total, 1.0), reasons)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_clean_message_scores_zero() {
        let (total, reasons) = score("Hello, how are you today?");
        assert!(approx(total, 0.0));
        assert!(reasons.is_empty());
        assert!(!is_spam(total));
    }

    #[test]
    fn test_shouting_promo() {
        // 10 of 20 characters are capitals: exactly 0.5 is not "excessive"
        let (total, reasons) = score("FREE!!!! WIN NOW!!!!");
        assert_eq!(reasons, vec![REASON_KEYWORDS, REASON_EXCLAMATION]);
        assert!(approx(total, 2.0 / 6.0 * 0.4 + 0.2));
        assert!(!is_spam(total));
    }

    #[test]
    fn test_all_rules_but_brevity_make_spam() {
        let content = "FREE WIN URGENT CLICK HERE LIMITED TIME ACT NOW!!!!";
        let (total, reasons) = score(content);

        assert_eq!(reasons, vec![REASON_KEYWORDS, REASON_CAPS, REASON_EXCLAMATION]);
        assert!(approx(total, 0.4 + 0.3 + 0.2));
        assert!(is_spam(total));
    }

    #[test]
    fn test_rules_accumulate_in_order() {
        let (total, reasons) = score("WIN FREE!!!!");
        assert_eq!(
            reasons,
            vec![REASON_KEYWORDS, REASON_CAPS, REASON_EXCLAMATION]
        );
        assert!(approx(total, 2.0 / 6.0 * 0.4 + 0.3 + 0.2));

        // Short as well: every rule fires once
        let (total, reasons) = score("FREEE!!!!");
        assert_eq!(
            reasons,
            vec![REASON_KEYWORDS, REASON_CAPS, REASON_EXCLAMATION, REASON_SHORT]
        );
        assert!(approx(total, 1.0 / 6.0 * 0.4 + 0.3 + 0.2 + 0.1));
    }

    #[test]
    fn test_keywords_are_case_insensitive_substrings() {
        let (total, reasons) = score("Please Click Here before the offer ends, it is urgent");
        assert_eq!(reasons, vec![REASON_KEYWORDS]);
        assert!(approx(total, 2.0 / 6.0 * 0.4));

        // "winter" contains "win"
        let (_, reasons) = score("See you this winter, friend");
        assert_eq!(reasons, vec![REASON_KEYWORDS]);
    }

    #[test]
    fn test_short_message_uses_trimmed_length() {
        let (total, reasons) = score("   hi there   ");
        assert_eq!(reasons, vec![REASON_SHORT]);
        assert!(approx(total, 0.1));
    }

    #[test]
    fn test_empty_content_skips_capitalization() {
        let (total, reasons) = score("");
        assert_eq!(reasons, vec![REASON_SHORT]);
        assert!(approx(total, 0.1));
    }

    #[test]
    fn test_exclamation_limit_is_strict() {
        let (_, reasons) = score("wow, that is amazing!!!");
        assert!(reasons.is_empty());
        let (_, reasons) = score("wow, that is amazing!!!!");
        assert_eq!(reasons, vec![REASON_EXCLAMATION]);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let content = "URGENT: act now, limited time offer!!!!";
        assert_eq!(score(content), score(content));
    }
}
