// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Response parsing
//
// Turns completion text into the normalized quiz shapes. Parsers are
// lenient about vendor formatting (markdown fences, numbers as strings)
// but strict about the content contract.

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::provider::ProviderId;
use crate::domain::quiz::{
    AmbiguityResult, EditProposal, GeneratedItem, Illustration, ProposedEdits, QuizItem,
    ValidationResult, OPTION_COUNT,
};

/// Longest cleaned emoji response accepted, in chars.
pub const MAX_EMOJI_CHARS: usize = 16;

const GENERIC_REJECTION_SUGGESTION: &str =
    "Review the question for factual accuracy and make sure exactly one option is correct.";

/// Provenance stamped onto every parsed result.
#[derive(Debug, Clone, Copy)]
pub struct Provenance<'a> {
    pub provider: &'a ProviderId,
    pub model: &'a str,
}

/// Extracts the JSON object from completion text: the first fenced block
/// if present, otherwise the outermost `{...}` span.
pub fn extract_json(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced.trim()) {
            return Ok(value);
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => serde_json::from_str(&trimmed[start..=end])
            .map_err(|e| format!("Invalid JSON in response: {}", e)),
        _ => Err("No JSON object found in response".to_string()),
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_open.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    let close = body.find("```")?;
    Some(&body[..close])
}

fn string_field(object: &Value, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn optional_string(object: &Value, key: &str) -> Option<String> {
    Some(string_field(object, key)).filter(|s| !s.is_empty())
}

fn bool_field(object: &Value, key: &str) -> bool {
    match object.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Integer from a JSON number or numeric string.
fn as_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn option_index(value: Option<&Value>) -> Option<u8> {
    value
        .and_then(as_index)
        .filter(|i| (0..OPTION_COUNT as i64).contains(i))
        .map(|i| i as u8)
}

fn string_list(object: &Value, key: &str) -> Vec<String> {
    let Some(items) = object.get(key).and_then(Value::as_array) else {
        return match object.get(key).and_then(Value::as_str) {
            Some(single) if !single.trim().is_empty() => vec![single.trim().to_string()],
            _ => Vec::new(),
        };
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Null => None,
            // Some vendors return `{ "issue": "..." }` objects.
            Value::Object(map) => map
                .values()
                .find_map(Value::as_str)
                .map(|s| s.trim().to_string()),
            other => Some(other.to_string()),
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn options_field(object: &Value, key: &str) -> Option<Vec<String>> {
    object.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .map(|o| match o {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .collect()
    })
}

fn alternative_indexes(object: &Value, correct: Option<u8>) -> Vec<u8> {
    let mut indexes: Vec<u8> = object
        .get("alternativeCorrectOptions")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|v| option_index(Some(v))).collect())
        .unwrap_or_default();
    indexes.retain(|i| Some(*i) != correct);
    indexes.sort_unstable();
    indexes.dedup();
    indexes
}

/// Acceptance rule for generated content.
fn accept_item(raw: &Value) -> Result<QuizItem, &'static str> {
    let question_sv = string_field(raw, "question_sv");
    let question_en = string_field(raw, "question_en");
    if question_sv.is_empty() || question_en.is_empty() {
        return Err("missing bilingual question");
    }

    let options_sv = options_field(raw, "options_sv").unwrap_or_default();
    let options_en = options_field(raw, "options_en").unwrap_or_default();
    if options_sv.len() != OPTION_COUNT || options_en.len() != OPTION_COUNT {
        return Err("option count is not 4 per language");
    }
    if options_sv.iter().chain(options_en.iter()).any(|o| o.is_empty()) {
        return Err("blank option");
    }

    let Some(correct_option) = option_index(raw.get("correctOption")) else {
        return Err("correct option index out of range");
    };

    let background_sv = string_field(raw, "background_sv");
    let background_en = string_field(raw, "background_en");
    if background_sv.is_empty() || background_en.is_empty() {
        return Err("missing bilingual background");
    }

    Ok(QuizItem {
        question_sv,
        question_en,
        options_sv,
        options_en,
        correct_option,
        explanation_sv: string_field(raw, "explanation_sv"),
        explanation_en: string_field(raw, "explanation_en"),
        background_sv,
        background_en,
        emoji: optional_string(raw, "emoji").and_then(|e| clean_emoji(&e).ok()),
        target_audience: optional_string(raw, "targetAudience"),
    })
}

/// Parses generated items, dropping every item that fails acceptance.
pub fn parse_generated(text: &str, origin: Provenance<'_>) -> Result<Vec<GeneratedItem>, String> {
    let document = extract_json(text)?;
    let questions = match &document {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => document
            .get("questions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| "Response has no questions array".to_string())?,
        _ => return Err("Response is not a JSON object".to_string()),
    };

    let mut accepted = Vec::with_capacity(questions.len());
    for (index, raw) in questions.iter().enumerate() {
        match accept_item(raw) {
            Ok(item) => accepted.push(GeneratedItem {
                item,
                provider: origin.provider.clone(),
                model: origin.model.to_string(),
            }),
            Err(reason) => tracing::warn!(
                provider = %origin.provider,
                index,
                reason,
                "Dropping generated item"
            ),
        }
    }

    tracing::debug!(
        provider = %origin.provider,
        accepted = accepted.len(),
        received = questions.len(),
        "Parsed generated items"
    );
    Ok(accepted)
}

fn parse_confidence(value: Option<&Value>) -> u8 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    // Some models answer on a 0-1 scale.
    let scaled = if raw > 0.0 && raw < 1.0 { raw * 100.0 } else { raw };
    scaled.round().clamp(0.0, 100.0) as u8
}

fn parse_best_before(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = value?.as_str()?.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Ensures a rejection carries at least one concrete suggestion.
pub fn ensure_rejection_suggestions(
    is_valid: bool,
    suggestions: Vec<String>,
    issues: &[String],
    feedback: &str,
) -> Vec<String> {
    if is_valid || !suggestions.is_empty() {
        return suggestions;
    }
    if !issues.is_empty() {
        return issues.iter().map(|issue| format!("Fix: {}", issue)).collect();
    }
    if !feedback.trim().is_empty() {
        return vec![feedback.trim().to_string()];
    }
    vec![GENERIC_REJECTION_SUGGESTION.to_string()]
}

pub fn parse_validation(text: &str, item: &QuizItem, origin: Provenance<'_>) -> Result<ValidationResult, String> {
    let document = extract_json(text)?;
    if !document.is_object() {
        return Err("Validation response is not a JSON object".to_string());
    }
    let is_valid = match document.get("isValid") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => return Err("Validation response has no isValid verdict".to_string()),
    };

    let issues = string_list(&document, "issues");
    let feedback = string_field(&document, "feedback");
    let suggestions =
        ensure_rejection_suggestions(is_valid, string_list(&document, "suggestions"), &issues, &feedback);

    let alternative_correct_options = alternative_indexes(&document, Some(item.correct_option));
    // A best-before date implies the item is time-sensitive.
    let best_before_date = parse_best_before(document.get("bestBeforeDate"));
    let time_sensitive = bool_field(&document, "timeSensitive") || best_before_date.is_some();
    let proposed_edits = document
        .get("proposedEdits")
        .and_then(|raw| match normalize_edits(item, raw) {
            Ok(edits) => edits,
            Err(reason) => {
                tracing::debug!(provider = %origin.provider, reason = %reason, "Discarding proposed edits");
                None
            }
        });

    Ok(ValidationResult {
        provider: origin.provider.clone(),
        model: origin.model.to_string(),
        is_valid,
        confidence: parse_confidence(document.get("confidence")),
        issues,
        suggestions,
        feedback,
        multiple_correct_options: bool_field(&document, "multipleCorrectOptions")
            || !alternative_correct_options.is_empty(),
        alternative_correct_options,
        time_sensitive,
        best_before_date,
        proposed_edits,
    })
}

pub fn parse_ambiguity(text: &str, item: &QuizItem, origin: Provenance<'_>) -> Result<AmbiguityResult, String> {
    let document = extract_json(text)?;
    if !document.is_object() {
        return Err("Ambiguity response is not a JSON object".to_string());
    }
    let alternative_correct_options = alternative_indexes(&document, Some(item.correct_option));
    Ok(AmbiguityResult {
        provider: origin.provider.clone(),
        model: origin.model.to_string(),
        multiple_correct_options: bool_field(&document, "multipleCorrectOptions")
            || !alternative_correct_options.is_empty(),
        alternative_correct_options,
        reason: string_field(&document, "reason"),
        suggestions: string_list(&document, "suggestions"),
    })
}

pub fn parse_edit_proposal(text: &str, item: &QuizItem, origin: Provenance<'_>) -> Result<EditProposal, String> {
    let document = extract_json(text)?;
    if !document.is_object() {
        return Err("Edit response is not a JSON object".to_string());
    }
    let mut reason = string_field(&document, "reason");
    let proposed_edits = match document.get("proposedEdits") {
        Some(raw) => match normalize_edits(item, raw) {
            Ok(edits) => edits,
            Err(rejected) => {
                tracing::warn!(provider = %origin.provider, reason = %rejected, "Rejecting proposed edits");
                reason = rejected;
                None
            }
        },
        None => None,
    };

    Ok(EditProposal {
        provider: origin.provider.clone(),
        model: origin.model.to_string(),
        proposed_edits,
        suggestions: string_list(&document, "suggestions"),
        reason,
    })
}

fn answer_position(options: &[String], answer: Option<&str>) -> Option<u8> {
    let answer = answer?.trim();
    options
        .iter()
        .position(|o| o.trim().eq_ignore_ascii_case(answer))
        .map(|i| i as u8)
}

/// Validates a raw edit set against `item`.
///
/// Returns `Ok(None)` when there is nothing to change. Replacement option
/// lists must hold exactly four entries. When options were replaced without
/// an explicit `correctOption`, the index is recomputed from the original
/// answer text so a reorder keeps pointing at the same answer. The index is
/// shared by both languages, so it may only move when both option lists are
/// replaced.
pub fn normalize_edits(item: &QuizItem, raw: &Value) -> Result<Option<ProposedEdits>, String> {
    if raw.is_null() {
        return Ok(None);
    }
    if !raw.is_object() {
        return Err("Proposed edits are not a JSON object".to_string());
    }

    let mut edits = ProposedEdits {
        question_sv: optional_string(raw, "question_sv"),
        question_en: optional_string(raw, "question_en"),
        options_sv: options_field(raw, "options_sv"),
        options_en: options_field(raw, "options_en"),
        correct_option: None,
        explanation_sv: optional_string(raw, "explanation_sv"),
        explanation_en: optional_string(raw, "explanation_en"),
        background_sv: optional_string(raw, "background_sv"),
        background_en: optional_string(raw, "background_en"),
    };

    for options in [&edits.options_sv, &edits.options_en].into_iter().flatten() {
        if options.len() != OPTION_COUNT {
            return Err(format!(
                "Proposed edits must keep exactly {} options per language",
                OPTION_COUNT
            ));
        }
    }

    match raw.get("correctOption") {
        None | Some(Value::Null) => {}
        Some(value) => match option_index(Some(value)) {
            Some(index) => edits.correct_option = Some(index),
            None => return Err("Proposed correctOption is out of range".to_string()),
        },
    }

    if edits.correct_option.is_none() && (edits.options_sv.is_some() || edits.options_en.is_some()) {
        let mut positions = Vec::new();
        if let Some(options) = &edits.options_sv {
            positions.push(answer_position(options, item.correct_answer_sv()));
        }
        if let Some(options) = &edits.options_en {
            positions.push(answer_position(options, item.correct_answer_en()));
        }
        let found: Vec<u8> = positions.iter().flatten().copied().collect();
        if found.is_empty() {
            return Err("Could not locate the correct answer in the edited options".to_string());
        }
        if found.iter().any(|p| *p != found[0]) {
            return Err("Edited options disagree on the correct answer position".to_string());
        }
        if found[0] != item.correct_option {
            edits.correct_option = Some(found[0]);
        }
    }

    let one_sided = match (&edits.options_sv, &edits.options_en) {
        (Some(options), None) => Some((options, item.correct_answer_sv())),
        (None, Some(options)) => Some((options, item.correct_answer_en())),
        _ => None,
    };
    if let Some((options, answer)) = one_sided {
        let index = edits.correct_option.unwrap_or(item.correct_option);
        let moved = answer_position(options, answer).is_some_and(|p| p != index);
        if index != item.correct_option || moved {
            return Err("Moving the correct answer requires edited options for both languages".to_string());
        }
    }

    if edits.is_empty() {
        return Ok(None);
    }
    Ok(Some(edits))
}

/// Strips fences, quotes and whitespace from an emoji completion.
pub fn clean_emoji(text: &str) -> Result<String, String> {
    let stripped = text
        .trim()
        .trim_matches('`')
        .trim()
        .trim_start_matches("text")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    let first = stripped.split_whitespace().next().unwrap_or_default();
    if first.is_empty() {
        return Err("Empty emoji response".to_string());
    }
    if first.chars().count() > MAX_EMOJI_CHARS {
        return Err("Emoji response is too long".to_string());
    }
    if first.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Emoji response contains text".to_string());
    }
    Ok(first.to_string())
}

pub fn parse_illustration(text: &str, origin: Provenance<'_>) -> Result<Illustration, String> {
    Ok(Illustration {
        provider: origin.provider.clone(),
        model: origin.model.to_string(),
        emoji: clean_emoji(text)?,
    })
}
