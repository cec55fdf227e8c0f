//! Keyword classifier mapping free-text employee roles onto the canonical vocabulary.
//!
//! Rules are checked in order, first match wins, substring test on the
//! lowercased value:
//! 1. "assistant" | "hygienist"  -> Assistant Dentist
//! 2. "reception" | "front"      -> Receptionist
//! 3. "admin" | "dentist"        -> Dentist
//! 4. anything else              -> Dentist (fallback)
//!
//! The fallback is kept for compatibility with the existing data cleanup.
//! Conversions that reach it are reported separately so an operator can
//! review them.

use serde::Serialize;

use crate::models::CanonicalRole;

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    AssistantKeyword,
    ReceptionKeyword,
    DentistKeyword,
    Fallback,
}

impl MatchRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssistantKeyword => "assistant_keyword",
            Self::ReceptionKeyword => "reception_keyword",
            Self::DentistKeyword => "dentist_keyword",
            Self::Fallback => "fallback",
        }
    }
}

const RULES: &[(&[&str], CanonicalRole, MatchRule)] = &[
    (&["assistant", "hygienist"], CanonicalRole::AssistantDentist, MatchRule::AssistantKeyword),
    (&["reception", "front"], CanonicalRole::Receptionist, MatchRule::ReceptionKeyword),
    (&["admin", "dentist"], CanonicalRole::Dentist, MatchRule::DentistKeyword),
];

const FALLBACK: CanonicalRole = CanonicalRole::Dentist;

/// Canonical label for an arbitrary role string. Total and deterministic.
pub fn classify_and_normalize(value: &str) -> CanonicalRole {
    classify_with_rule(value).0
}

/// Like [`classify_and_normalize`], also naming the rule that matched.
pub fn classify_with_rule(value: &str) -> (CanonicalRole, MatchRule) {
    let lower = value.to_lowercase();
    RULES
        .iter()
        .find(|(keywords, _, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, role, rule)| (*role, *rule))
        .unwrap_or((FALLBACK, MatchRule::Fallback))
}
