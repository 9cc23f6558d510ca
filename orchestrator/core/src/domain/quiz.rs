// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Quiz Content Shapes
//!
//! Normalized request and output types shared by every provider adapter.
//! Vendor responses are parsed into these shapes regardless of wire schema.
//!
//! Content is bilingual: every question carries Swedish (`sv`) and English
//! (`en`) text, exactly [`OPTION_COUNT`] options per language, and a single
//! correct option index.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::provider::ProviderId;

/// Options per language on every quiz item.
pub const OPTION_COUNT: usize = 4;

/// The two fixed output languages.
pub const SUPPORTED_LANGUAGES: [&str; 2] = ["sv", "en"];

/// Age group labels treated as a children's audience regardless of range.
const CHILDREN_ALIASES: &[&str] = &["children", "child", "kids", "barn", "småbarn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Hints steering generation away from recently produced content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FreshnessHints {
    /// Question texts that must not be repeated or paraphrased.
    #[serde(default)]
    pub avoid_questions: Vec<String>,
    /// Free-form guidance, e.g. "prefer events after 2020".
    #[serde(default)]
    pub hints: Vec<String>,
}

impl FreshnessHints {
    pub fn is_empty(&self) -> bool {
        self.avoid_questions.is_empty() && self.hints.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub category: Option<String>,
    /// Free-form age group, e.g. `"6-12"`, `"25+"`, `"children"`.
    pub age_group: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub target_audiences: Vec<String>,
    /// Primary language the caller will display; output is always bilingual.
    #[serde(default = "default_language")]
    pub language: String,
    pub quantity: u32,
    #[serde(default)]
    pub freshness: FreshnessHints,
}

fn default_language() -> String {
    "sv".to_string()
}

impl GenerationRequest {
    pub fn new(quantity: u32) -> Self {
        Self {
            category: None,
            age_group: None,
            difficulty: Difficulty::default(),
            target_audiences: Vec::new(),
            language: default_language(),
            quantity,
            freshness: FreshnessHints::default(),
        }
    }

    /// True when the stricter children's content guardrail applies.
    pub fn targets_children(&self) -> bool {
        self.age_group.as_deref().is_some_and(is_children_age_group)
    }
}

/// Upper bound of an age group label such as `"6-12"` or `"10"`.
/// Open-ended ranges (`"25+"`) have no upper bound.
pub fn age_group_upper_bound(age_group: &str) -> Option<u32> {
    let trimmed = age_group.trim();
    if trimmed.ends_with('+') {
        return None;
    }
    trimmed
        .split(|c: char| c == '-' || c == '–' || c.is_whitespace())
        .filter_map(|part| part.trim_end_matches("år").trim().parse::<u32>().ok())
        .last()
}

pub fn is_children_age_group(age_group: &str) -> bool {
    let lowered = age_group.trim().to_lowercase();
    if CHILDREN_ALIASES.iter().any(|alias| lowered == *alias) {
        return true;
    }
    age_group_upper_bound(&lowered).is_some_and(|upper| upper <= 12)
}

/// Bilingual quiz content without provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question_sv: String,
    pub question_en: String,
    pub options_sv: Vec<String>,
    pub options_en: Vec<String>,
    #[serde(rename = "correctOption")]
    pub correct_option: u8,
    #[serde(default)]
    pub explanation_sv: String,
    #[serde(default)]
    pub explanation_en: String,
    #[serde(default)]
    pub background_sv: String,
    #[serde(default)]
    pub background_en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(rename = "targetAudience", default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
}

impl QuizItem {
    pub fn correct_answer_sv(&self) -> Option<&str> {
        self.options_sv.get(self.correct_option as usize).map(String::as_str)
    }

    pub fn correct_answer_en(&self) -> Option<&str> {
        self.options_en.get(self.correct_option as usize).map(String::as_str)
    }
}

/// A generated item stamped with the provider and model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    #[serde(flatten)]
    pub item: QuizItem,
    pub provider: ProviderId,
    pub model: String,
}

/// Context a validator checks an item against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCriteria {
    pub category: Option<String>,
    pub age_group: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub target_audience: Option<String>,
    /// Additional operator rules, one per line in the prompt.
    #[serde(default)]
    pub rules: Vec<String>,
}

/// Minimal edit set for a quiz item. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedEdits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_sv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_sv: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options_en: Option<Vec<String>>,
    #[serde(rename = "correctOption", default, skip_serializing_if = "Option::is_none")]
    pub correct_option: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_sv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_en: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_sv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_en: Option<String>,
}

impl ProposedEdits {
    pub fn is_empty(&self) -> bool {
        self == &ProposedEdits::default()
    }

    /// Applies the edits to a copy of `item`.
    pub fn apply_to(&self, item: &QuizItem) -> QuizItem {
        let mut edited = item.clone();
        if let Some(v) = &self.question_sv {
            edited.question_sv = v.clone();
        }
        if let Some(v) = &self.question_en {
            edited.question_en = v.clone();
        }
        if let Some(v) = &self.options_sv {
            edited.options_sv = v.clone();
        }
        if let Some(v) = &self.options_en {
            edited.options_en = v.clone();
        }
        if let Some(v) = self.correct_option {
            edited.correct_option = v;
        }
        if let Some(v) = &self.explanation_sv {
            edited.explanation_sv = v.clone();
        }
        if let Some(v) = &self.explanation_en {
            edited.explanation_en = v.clone();
        }
        if let Some(v) = &self.background_sv {
            edited.background_sv = v.clone();
        }
        if let Some(v) = &self.background_en {
            edited.background_en = v.clone();
        }
        edited
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub provider: ProviderId,
    pub model: String,
    pub is_valid: bool,
    /// 0-100
    pub confidence: u8,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub feedback: String,
    pub multiple_correct_options: bool,
    pub alternative_correct_options: Vec<u8>,
    pub time_sensitive: bool,
    pub best_before_date: Option<NaiveDate>,
    pub proposed_edits: Option<ProposedEdits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmbiguityResult {
    pub provider: ProviderId,
    pub model: String,
    pub multiple_correct_options: bool,
    pub alternative_correct_options: Vec<u8>,
    pub reason: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditProposal {
    pub provider: ProviderId,
    pub model: String,
    pub proposed_edits: Option<ProposedEdits>,
    pub suggestions: Vec<String>,
    pub reason: String,
}

/// Findings from an earlier analysis passed to an edit proposal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditContext {
    #[serde(default)]
    pub multiple_correct_options: bool,
    #[serde(default)]
    pub alternative_correct_options: Vec<u8>,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Illustration {
    pub provider: ProviderId,
    pub model: String,
    pub emoji: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_group_upper_bound() {
        assert_eq!(age_group_upper_bound("6-12"), Some(12));
        assert_eq!(age_group_upper_bound("13 - 25"), Some(25));
        assert_eq!(age_group_upper_bound("10"), Some(10));
        assert_eq!(age_group_upper_bound("25+"), None);
        assert_eq!(age_group_upper_bound("adults"), None);
    }

    #[test]
    fn test_children_detection() {
        assert!(is_children_age_group("6-12"));
        assert!(is_children_age_group("Children"));
        assert!(is_children_age_group("barn"));
        assert!(!is_children_age_group("13-25"));
        assert!(!is_children_age_group("25+"));
    }

    #[test]
    fn test_proposed_edits_apply() {
        let item = QuizItem {
            question_sv: "Fråga?".into(),
            question_en: "Question?".into(),
            options_sv: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            options_en: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_option: 0,
            explanation_sv: String::new(),
            explanation_en: String::new(),
            background_sv: "Bakgrund".into(),
            background_en: "Background".into(),
            emoji: None,
            target_audience: None,
        };
        let edits = ProposedEdits {
            question_en: Some("Better question?".into()),
            correct_option: Some(2),
            ..Default::default()
        };
        let edited = edits.apply_to(&item);
        assert_eq!(edited.question_en, "Better question?");
        assert_eq!(edited.question_sv, "Fråga?");
        assert_eq!(edited.correct_option, 2);
        assert!(ProposedEdits::default().is_empty());
    }
}
