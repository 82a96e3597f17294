//! The eight text tasks, as static descriptors.
//!
//! A descriptor bundles everything task-specific: the request schema, the
//! prompt renderer (template + fixed sampling temperature), the response
//! shaper, and the failure messages. The dispatcher in [`super`] is the same
//! for all of them.

use std::fmt;

use serde_json::{Value, json};

use super::schema::{DefaultValue, FieldKind, FieldSpec, TaskInput};
use super::template::render;
use crate::llm::{GenerationParams, LlmError};

/// Shown when the configured model does not exist upstream.
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "The AI model is currently unavailable. Please try again later.";

/// Categories offered when a classify request names none.
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Technology",
    "Business",
    "Sports",
    "Entertainment",
    "Politics",
    "Science",
    "Health",
    "Education",
    "Travel",
    "Food",
];

/// Content types accepted by the generate task.
pub const CONTENT_TYPES: [&str; 6] = [
    "email",
    "story",
    "blog",
    "social_media",
    "product_description",
    "general",
];

/// Summarization methods; all three run the same single-prompt summary.
pub const SUMMARY_METHODS: [&str; 3] = ["stuff", "map_reduce", "refine"];

/// Identifies one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Summarize,
    Sentiment,
    Keywords,
    Classify,
    DetectLanguage,
    Translate,
    Answer,
    Generate,
}

impl TaskKind {
    /// URL path segment, e.g. `detect-language`.
    pub fn slug(self) -> &'static str {
        match self {
            TaskKind::Summarize => "summarize",
            TaskKind::Sentiment => "sentiment",
            TaskKind::Keywords => "keywords",
            TaskKind::Classify => "classify",
            TaskKind::DetectLanguage => "detect-language",
            TaskKind::Translate => "translate",
            TaskKind::Answer => "answer",
            TaskKind::Generate => "generate",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A rendered prompt plus the parameters to send it with.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub params: GenerationParams,
}

/// How a failed completion is reported.
#[derive(Debug, Clone, Copy)]
pub struct FailurePolicy {
    /// Generic message for any upstream failure.
    pub message: &'static str,
    /// When set, a model-not-found failure is reported as unavailable with this message.
    pub model_unavailable: Option<&'static str>,
}

/// Mapped failure of the upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureResponse {
    /// Generic server error.
    Upstream(&'static str),
    /// Distinguished service-unavailable case.
    Unavailable(&'static str),
}

/// Everything that varies between tasks.
#[derive(Debug, Clone, Copy)]
pub struct TaskDescriptor {
    pub kind: TaskKind,
    pub fields: &'static [FieldSpec],
    pub render: fn(&TaskInput) -> Prompt,
    pub shape: fn(&TaskInput, &str) -> Value,
    pub failure: FailurePolicy,
}

impl TaskDescriptor {
    /// Map an upstream error to the response this task reports.
    pub fn map_failure(&self, err: &LlmError) -> FailureResponse {
        match self.failure.model_unavailable {
            Some(message) if err.is_model_unavailable() => FailureResponse::Unavailable(message),
            _ => FailureResponse::Upstream(self.failure.message),
        }
    }
}

/// All tasks, in route order.
pub static TASKS: [TaskDescriptor; 8] = [
    TaskDescriptor {
        kind: TaskKind::Summarize,
        fields: &[
            FieldSpec::required("text", TEXT),
            FieldSpec::with_default(
                "method",
                FieldKind::Choice(&SUMMARY_METHODS),
                DefaultValue::Text("stuff"),
            ),
        ],
        render: render_summarize,
        shape: shape_summarize,
        failure: generic("An unexpected error occurred during summarization"),
    },
    TaskDescriptor {
        kind: TaskKind::Sentiment,
        fields: &[FieldSpec::required("text", TEXT)],
        render: render_sentiment,
        shape: shape_sentiment,
        failure: generic("An unexpected error occurred during sentiment analysis"),
    },
    TaskDescriptor {
        kind: TaskKind::Keywords,
        fields: &[
            FieldSpec::required("text", TEXT),
            FieldSpec::with_default(
                "count",
                FieldKind::Integer {
                    min: Some(1),
                    max: None,
                },
                DefaultValue::Integer(5),
            ),
        ],
        render: render_keywords,
        shape: shape_keywords,
        failure: FailurePolicy {
            message: "An unexpected error occurred during keyword extraction",
            model_unavailable: Some(MODEL_UNAVAILABLE_MESSAGE),
        },
    },
    TaskDescriptor {
        kind: TaskKind::Classify,
        fields: &[
            FieldSpec::required("text", TEXT),
            FieldSpec::optional("categories", FieldKind::TextList),
        ],
        render: render_classify,
        shape: shape_classify,
        failure: generic("An unexpected error occurred during text classification"),
    },
    TaskDescriptor {
        kind: TaskKind::DetectLanguage,
        fields: &[FieldSpec::required("text", TEXT)],
        render: render_detect_language,
        shape: shape_detect_language,
        failure: generic("An unexpected error occurred during language detection"),
    },
    TaskDescriptor {
        kind: TaskKind::Translate,
        fields: &[
            FieldSpec::required("text", TEXT),
            FieldSpec::required("target_language", TEXT),
            FieldSpec::with_default("source_language", TEXT, DefaultValue::Text(AUTO)),
        ],
        render: render_translate,
        shape: shape_translate,
        failure: generic("An unexpected error occurred during translation"),
    },
    TaskDescriptor {
        kind: TaskKind::Answer,
        fields: &[
            FieldSpec::required("question", TEXT),
            FieldSpec::optional("context", FieldKind::Text { allow_blank: true }),
        ],
        render: render_answer,
        shape: shape_answer,
        failure: generic("An unexpected error occurred during question answering"),
    },
    TaskDescriptor {
        kind: TaskKind::Generate,
        fields: &[
            FieldSpec::required("prompt_text", TEXT),
            FieldSpec::with_default(
                "content_type",
                FieldKind::Choice(&CONTENT_TYPES),
                DefaultValue::Text("general"),
            ),
            FieldSpec::with_default(
                "max_length",
                FieldKind::Integer {
                    min: Some(50),
                    max: Some(2000),
                },
                DefaultValue::Integer(500),
            ),
        ],
        render: render_generate,
        shape: shape_generate,
        failure: generic("An unexpected error occurred during content generation"),
    },
];

/// Descriptor for `kind`.
pub fn descriptor(kind: TaskKind) -> &'static TaskDescriptor {
    // TASKS is declared in TaskKind order.
    &TASKS[kind as usize]
}

/// Descriptor whose slug matches.
pub fn by_slug(slug: &str) -> Option<&'static TaskDescriptor> {
    TASKS.iter().find(|d| d.kind.slug() == slug)
}

const TEXT: FieldKind = FieldKind::Text { allow_blank: false };
const AUTO: &str = "auto";

const fn generic(message: &'static str) -> FailurePolicy {
    FailurePolicy {
        message,
        model_unavailable: None,
    }
}

fn field<'a>(input: &'a TaskInput, name: &str) -> &'a str {
    input.text(name).unwrap_or_default()
}

// ── Summarize ────────────────────────────────────────────────────────────────

const SUMMARIZE_TEMPLATE: &str = "Please provide a concise summary of the following text:

{text}

Summary:";

fn render_summarize(input: &TaskInput) -> Prompt {
    Prompt {
        text: render(SUMMARIZE_TEMPLATE, &[("text", field(input, "text"))]),
        params: GenerationParams::with_temperature(0.0),
    }
}

fn shape_summarize(_input: &TaskInput, reply: &str) -> Value {
    json!({ "summary": reply })
}

// ── Sentiment ────────────────────────────────────────────────────────────────

const SENTIMENT_TEMPLATE: &str = "Analyze the sentiment of the following text. \
Respond only with one of: 'positive', 'negative', or 'neutral'.
Text: {text}";

fn render_sentiment(input: &TaskInput) -> Prompt {
    Prompt {
        text: render(SENTIMENT_TEMPLATE, &[("text", field(input, "text"))]),
        params: GenerationParams::with_temperature(0.0),
    }
}

fn shape_sentiment(_input: &TaskInput, reply: &str) -> Value {
    json!({ "sentiment": reply })
}

// ── Keywords ─────────────────────────────────────────────────────────────────

const KEYWORDS_TEMPLATE: &str = "Extract the {count} most important keywords or key phrases from the following text:

TEXT: {text}

Return only the keywords or key phrases as a comma-separated list.";

fn render_keywords(input: &TaskInput) -> Prompt {
    let count = input.integer("count").unwrap_or(5).to_string();
    Prompt {
        text: render(
            KEYWORDS_TEMPLATE,
            &[("count", &count), ("text", field(input, "text"))],
        ),
        params: GenerationParams::with_temperature(0.2),
    }
}

fn shape_keywords(_input: &TaskInput, reply: &str) -> Value {
    let keywords: Vec<&str> = reply
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    json!({ "keywords": keywords })
}

// ── Classify ─────────────────────────────────────────────────────────────────

const CLASSIFY_TEMPLATE: &str = "Classify the following text into one of these categories: {categories}

Text: {text}

Respond with only the category name that best fits the text content. \
Choose the most appropriate category from the list provided.";

fn categories(input: &TaskInput) -> Vec<String> {
    match input.list("categories") {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect(),
    }
}

fn render_classify(input: &TaskInput) -> Prompt {
    let joined = categories(input).join(", ");
    Prompt {
        text: render(
            CLASSIFY_TEMPLATE,
            &[("categories", &joined), ("text", field(input, "text"))],
        ),
        params: GenerationParams::with_temperature(0.1),
    }
}

fn shape_classify(input: &TaskInput, reply: &str) -> Value {
    let available = categories(input);
    let matched = available
        .iter()
        .find(|c| c.to_lowercase() == reply.to_lowercase());
    match matched {
        Some(category) => json!({
            "category": category,
            "confidence": "high",
            "available_categories": available,
        }),
        None => json!({
            "category": reply,
            "confidence": "medium",
            "available_categories": available,
        }),
    }
}

// ── Detect language ──────────────────────────────────────────────────────────

const DETECT_LANGUAGE_TEMPLATE: &str = "Detect the language of the following text. \
Respond with the language name in English and its ISO 639-1 code.

Text: {text}

Format your response as: \"Language Name (ISO Code)\"
For example: \"English (en)\" or \"Spanish (es)\" or \"French (fr)\"

If the text contains multiple languages, identify the dominant language.";

fn render_detect_language(input: &TaskInput) -> Prompt {
    Prompt {
        text: render(DETECT_LANGUAGE_TEMPLATE, &[("text", field(input, "text"))]),
        params: GenerationParams::with_temperature(0.1),
    }
}

/// Split `"Name (code)"`; `None` when the reply lacks the parenthesized code.
fn split_language(reply: &str) -> Option<(&str, &str)> {
    let (name, rest) = reply.split_once('(')?;
    let (code, _) = rest.split_once(')')?;
    Some((name.trim(), code.trim()))
}

fn shape_detect_language(_input: &TaskInput, reply: &str) -> Value {
    match split_language(reply) {
        Some((language, code)) => json!({
            "language": language,
            "language_code": code,
            "raw_response": reply,
            "confidence": "high",
        }),
        None => json!({
            "language": reply,
            "language_code": "unknown",
            "raw_response": reply,
            "confidence": "medium",
        }),
    }
}

// ── Translate ────────────────────────────────────────────────────────────────

const TRANSLATE_AUTO_TEMPLATE: &str = "Translate the following text to {target_language}. \
Maintain the original meaning and tone.

Text to translate: {text}

Provide only the translation without any additional explanation.";

const TRANSLATE_TEMPLATE: &str = "Translate the following text from {source_language} to {target_language}. \
Maintain the original meaning and tone.

Text to translate: {text}

Provide only the translation without any additional explanation.";

fn render_translate(input: &TaskInput) -> Prompt {
    let source = field(input, "source_language");
    let template = if source == AUTO {
        TRANSLATE_AUTO_TEMPLATE
    } else {
        TRANSLATE_TEMPLATE
    };
    Prompt {
        text: render(
            template,
            &[
                ("text", field(input, "text")),
                ("source_language", source),
                ("target_language", field(input, "target_language")),
            ],
        ),
        params: GenerationParams::with_temperature(0.1),
    }
}

fn shape_translate(input: &TaskInput, reply: &str) -> Value {
    let source = match field(input, "source_language") {
        AUTO => "auto-detected",
        other => other,
    };
    json!({
        "translated_text": reply,
        "source_language": source,
        "target_language": field(input, "target_language"),
        "original_text": field(input, "text"),
    })
}

// ── Answer ───────────────────────────────────────────────────────────────────

const ANSWER_WITH_CONTEXT_TEMPLATE: &str = "Based on the following context, answer the question as accurately as possible. \
If the answer cannot be found in the context, say \"I cannot find the answer in the provided context.\"

Context: {context}

Question: {question}

Answer:";

const ANSWER_TEMPLATE: &str = "Answer the following question accurately and concisely. \
Provide factual information when possible.

Question: {question}

Answer:";

/// A blank context counts as no context.
fn context(input: &TaskInput) -> Option<&str> {
    input.text("context").filter(|c| !c.is_empty())
}

fn render_answer(input: &TaskInput) -> Prompt {
    let question = field(input, "question");
    match context(input) {
        Some(ctx) => Prompt {
            text: render(
                ANSWER_WITH_CONTEXT_TEMPLATE,
                &[("context", ctx), ("question", question)],
            ),
            params: GenerationParams::with_temperature(0.2),
        },
        None => Prompt {
            text: render(ANSWER_TEMPLATE, &[("question", question)]),
            params: GenerationParams::with_temperature(0.3),
        },
    }
}

fn shape_answer(input: &TaskInput, reply: &str) -> Value {
    let has_context = context(input).is_some();
    json!({
        "answer": reply,
        "question": field(input, "question"),
        "has_context": has_context,
        "context_provided": has_context,
    })
}

// ── Generate ─────────────────────────────────────────────────────────────────

fn generate_template(content_type: &str) -> &'static str {
    match content_type {
        "email" => "Write a professional email based on the following requirements:

{prompt_text}

Make it professional, clear, and concise. Include appropriate greeting and closing.",
        "story" => "Write a creative story based on the following prompt:

{prompt_text}

Make it engaging and imaginative. Keep it around {max_length} words.",
        "blog" => "Write a blog post based on the following topic:

{prompt_text}

Make it informative, engaging, and well-structured. Include an introduction, main points, and conclusion.",
        "social_media" => "Create a social media post based on the following idea:

{prompt_text}

Make it engaging, concise, and suitable for social media platforms. Include relevant hashtags if appropriate.",
        "product_description" => "Write a compelling product description based on the following details:

{prompt_text}

Highlight key features, benefits, and make it appealing to potential customers.",
        _ => "Generate content based on the following prompt:

{prompt_text}

Be creative and provide useful, well-written content.",
    }
}

fn render_generate(input: &TaskInput) -> Prompt {
    let max_length = input.integer("max_length").unwrap_or(500).to_string();
    Prompt {
        text: render(
            generate_template(field(input, "content_type")),
            &[
                ("prompt_text", field(input, "prompt_text")),
                ("max_length", &max_length),
            ],
        ),
        params: GenerationParams::with_temperature(0.7),
    }
}

fn shape_generate(input: &TaskInput, reply: &str) -> Value {
    json!({
        "generated_content": reply,
        "content_type": field(input, "content_type"),
        "original_prompt": field(input, "prompt_text"),
        "max_length": input.integer("max_length").unwrap_or(500),
        "word_count": reply.split_whitespace().count(),
    })
}
