// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Prompt templates
//!
//! Vendor-neutral prompts for every capability, rendered with Handlebars
//! from a serde context. Backends differ only in transport; all families
//! receive the same text so output contracts stay identical across vendors.
//!
//! Templates are rendered without HTML escaping: quiz content goes to the
//! model verbatim.

use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

use crate::domain::quiz::{EditContext, GenerationRequest, QuizItem, ValidationCriteria, OPTION_COUNT};

pub const GENERATION_TEMPERATURE: f32 = 0.7;
pub const VALIDATION_TEMPERATURE: f32 = 0.3;
pub const AMBIGUITY_TEMPERATURE: f32 = 0.1;
pub const EDIT_TEMPERATURE: f32 = 0.2;
pub const ILLUSTRATION_TEMPERATURE: f32 = 0.5;
pub const LIVENESS_MAX_TOKENS: u32 = 5;
pub const LIVENESS_PROMPT: &str = "Hi";
pub const ILLUSTRATION_MAX_TOKENS: u32 = 16;

pub const GENERATION_SYSTEM: &str = "You are an expert at writing educational quiz questions. \
You write every question in both Swedish and English with high quality and real educational value. \
Respond with JSON only.";

pub const VALIDATION_SYSTEM: &str = "You are an expert at reviewing quiz questions for quality, \
factual correctness and educational value. Respond with JSON only.";

pub const AMBIGUITY_SYSTEM: &str = "You check multiple-choice quiz questions for ambiguous answer \
options. Respond with JSON only.";

pub const EDIT_SYSTEM: &str = "You make minimal, precise corrections to bilingual quiz questions. \
Respond with JSON only.";

pub const ILLUSTRATION_SYSTEM: &str = "You pick a single emoji that illustrates the topic of a quiz \
question. Reply with the emoji only.";

/// Topics flagged as too advanced for a children's audience.
const CHILDREN_EXCLUDED_TOPICS: &[&str] = &[
    "named artists, painting and art history",
    "politics",
    "war",
    "economics",
    "advanced natural science",
    "advanced music history",
];

const GENERATION_TEMPLATE: &str = r#"Create {{amount}} quiz questions about {{category}} with difficulty {{difficulty}}{{#if age_group}} for age group {{age_group}}{{/if}}.
The caller's primary language is "{{language}}".

{{#if single_audience}}Target audience: "{{single_audience}}". Set targetAudience to this value.
{{/if}}{{#if audience_list}}Vary the questions between these target audiences: {{audience_list}}. Set targetAudience on each question to the audience it was written for.
{{/if}}{{#if children}}
CHILD SAFETY (the audience is children aged 12 or younger):
- Use simple, concrete language and well-known everyday facts
- No violent, frightening, sexual or otherwise age-inappropriate content
- Avoid these topics entirely: {{excluded_topics}}
- Every wrong option must be clearly wrong to an adult, never a trick
{{/if}}{{#if has_freshness}}
FRESHNESS:
{{#each hints}}- {{this}}
{{/each}}{{#if avoid_questions}}- Do not repeat or paraphrase any of these existing questions:
{{#each avoid_questions}}  * {{this}}
{{/each}}{{/if}}{{/if}}
IMPORTANT: every question MUST have both a Swedish and an English version:
- question_sv / question_en: the question
- options_sv / options_en: exactly {{option_count}} answer options per language, in the same order
- correctOption: index (0-{{max_index}}) of the single correct option, identical for both languages
- explanation_sv / explanation_en: a short educational explanation
- background_sv / background_en: background facts giving context to the question
- emoji: one emoji illustrating the topic without revealing the answer

Return JSON in exactly this format:
{
  "questions": [
    {
      "question_sv": "...", "question_en": "...",
      "options_sv": ["...", "...", "...", "..."],
      "options_en": ["...", "...", "...", "..."],
      "correctOption": 0,
      "explanation_sv": "...", "explanation_en": "...",
      "background_sv": "...", "background_en": "...",
      "emoji": "...", "targetAudience": "..."
    }
  ]
}
"#;

const VALIDATION_TEMPLATE: &str = r#"Validate the following quiz question.

QUESTION:
{{question}}

CONTEXT:
{{#if category}}- Category: {{category}}
{{/if}}{{#if age_group}}- Age group: {{age_group}}
{{/if}}{{#if difficulty}}- Difficulty: {{difficulty}}
{{/if}}{{#if target_audience}}- Target audience: {{target_audience}}
{{/if}}{{#each rules}}- Rule: {{this}}
{{/each}}
Check:
1. Is the question factually correct?
2. Is the marked answer (correctOption) actually correct?
3. Is exactly one option correct? List the indexes of any other option that could also be judged correct.
4. Are the Swedish and English versions equivalent, including option order?
5. Are the explanation and background accurate?
6. Is the difficulty appropriate for the audience?
7. Is the question time-sensitive (trends, news, current events)? If so give a reasonable best-before date.

If the question is not valid you MUST give at least one concrete suggestion for fixing it.

Return JSON:
{
  "isValid": true,
  "confidence": 0-100,
  "issues": ["..."],
  "suggestions": ["..."],
  "feedback": "short summary",
  "multipleCorrectOptions": false,
  "alternativeCorrectOptions": [],
  "timeSensitive": false,
  "bestBeforeDate": null,
  "proposedEdits": null
}
"#;

const AMBIGUITY_TEMPLATE: &str = r#"Determine whether more than one answer option in this quiz question could reasonably be judged correct.
Only consider ambiguity between the options; do not review style or difficulty.

QUESTION:
{{question}}

Return JSON:
{
  "multipleCorrectOptions": false,
  "alternativeCorrectOptions": [],
  "reason": "...",
  "suggestions": ["..."]
}
alternativeCorrectOptions lists indexes (0-{{max_index}}) other than correctOption.
"#;

const EDIT_TEMPLATE: &str = r#"Propose minimal edits that fix the listed issues in this quiz question.

QUESTION:
{{question}}

ISSUES:
{{#each issues}}- {{this}}
{{else}}- (none listed, fix anything clearly wrong)
{{/each}}{{#if multiple_correct}}
An earlier analysis found more than one correct option. Alternative correct indexes: [{{alternatives}}]
{{/if}}{{#if feedback}}
Reviewer feedback: {{feedback}}
{{/if}}
Rules:
- Change as little as possible; omit fields that need no change
- Keep exactly {{option_count}} options per language
- If you reorder options, set correctOption to the new index of the correct answer
- Reordering must be applied to both options_sv and options_en
- Keep Swedish and English versions equivalent

Return JSON:
{
  "proposedEdits": { "question_sv": "...", "options_en": ["..."], "correctOption": 0 } or null,
  "suggestions": ["..."],
  "reason": "..."
}
"#;

/// The correct answer is deliberately left out so the model cannot depict it.
const ILLUSTRATION_TEMPLATE: &str = r#"Choose ONE emoji that represents the topic of this quiz question.
The emoji must NOT reveal or hint at the correct answer.
Reply with the emoji only, no text.

Question (sv): {{question_sv}}
Question (en): {{question_en}}"#;

static ENGINE: LazyLock<Handlebars<'static>> = LazyLock::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(false);
    handlebars
});

#[derive(Debug, thiserror::Error)]
#[error("Failed to render {template} prompt: {source}")]
pub struct PromptError {
    template: &'static str,
    #[source]
    source: handlebars::RenderError,
}

fn render<T: Serialize>(template: &'static str, text: &str, context: &T) -> Result<String, PromptError> {
    ENGINE
        .render_template(text, context)
        .map_err(|source| PromptError { template, source })
}

/// Unique, non-blank audiences in request order.
pub fn distinct_audiences(audiences: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    audiences
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .filter(|a| seen.insert(a.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[derive(Serialize)]
struct GenerationContext<'a> {
    amount: u32,
    category: &'a str,
    difficulty: &'static str,
    age_group: Option<&'a str>,
    language: &'a str,
    single_audience: Option<String>,
    audience_list: Option<String>,
    children: bool,
    excluded_topics: String,
    has_freshness: bool,
    hints: &'a [String],
    avoid_questions: &'a [String],
    option_count: usize,
    max_index: usize,
}

pub fn generation_prompt(request: &GenerationRequest, amount: u32) -> Result<String, PromptError> {
    let mut audiences = distinct_audiences(&request.target_audiences);
    let (single_audience, audience_list) = match audiences.len() {
        0 => (None, None),
        1 => (audiences.pop(), None),
        _ => {
            let quoted: Vec<String> = audiences.iter().map(|a| format!("\"{}\"", a)).collect();
            (None, Some(quoted.join(", ")))
        }
    };

    let context = GenerationContext {
        amount,
        category: request.category.as_deref().unwrap_or("general knowledge"),
        difficulty: request.difficulty.as_str(),
        age_group: request.age_group.as_deref(),
        language: &request.language,
        single_audience,
        audience_list,
        children: request.targets_children(),
        excluded_topics: CHILDREN_EXCLUDED_TOPICS.join(", "),
        has_freshness: !request.freshness.is_empty(),
        hints: &request.freshness.hints,
        avoid_questions: &request.freshness.avoid_questions,
        option_count: OPTION_COUNT,
        max_index: OPTION_COUNT - 1,
    };
    render("generation", GENERATION_TEMPLATE, &context)
}

fn item_json(item: &QuizItem) -> String {
    serde_json::to_string_pretty(item).unwrap_or_else(|_| format!("{:?}", item))
}

#[derive(Serialize)]
struct ValidationContext<'a> {
    question: String,
    category: Option<&'a str>,
    age_group: Option<&'a str>,
    difficulty: Option<&'static str>,
    target_audience: Option<&'a str>,
    rules: &'a [String],
}

pub fn validation_prompt(item: &QuizItem, criteria: &ValidationCriteria) -> Result<String, PromptError> {
    let context = ValidationContext {
        question: item_json(item),
        category: criteria.category.as_deref(),
        age_group: criteria.age_group.as_deref(),
        difficulty: criteria.difficulty.map(|d| d.as_str()),
        target_audience: criteria.target_audience.as_deref(),
        rules: &criteria.rules,
    };
    render("validation", VALIDATION_TEMPLATE, &context)
}

#[derive(Serialize)]
struct AmbiguityContext {
    question: String,
    max_index: usize,
}

pub fn ambiguity_prompt(item: &QuizItem) -> Result<String, PromptError> {
    let context = AmbiguityContext {
        question: item_json(item),
        max_index: OPTION_COUNT - 1,
    };
    render("ambiguity", AMBIGUITY_TEMPLATE, &context)
}

#[derive(Serialize)]
struct EditPromptContext<'a> {
    question: String,
    issues: &'a [String],
    multiple_correct: bool,
    alternatives: String,
    feedback: Option<&'a str>,
    option_count: usize,
}

pub fn edit_prompt(item: &QuizItem, issues: &[String], analysis: &EditContext) -> Result<String, PromptError> {
    let alternatives = analysis
        .alternative_correct_options
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let context = EditPromptContext {
        question: item_json(item),
        issues,
        multiple_correct: analysis.multiple_correct_options,
        alternatives,
        feedback: analysis.feedback.as_deref().map(str::trim).filter(|f| !f.is_empty()),
        option_count: OPTION_COUNT,
    };
    render("edit", EDIT_TEMPLATE, &context)
}

#[derive(Serialize)]
struct IllustrationContext<'a> {
    question_sv: &'a str,
    question_en: &'a str,
}

pub fn illustration_prompt(item: &QuizItem) -> Result<String, PromptError> {
    let context = IllustrationContext {
        question_sv: &item.question_sv,
        question_en: &item.question_en,
    };
    render("illustration", ILLUSTRATION_TEMPLATE, &context)
}
