// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gemini integration for journal advice and grammar correction.
//!
//! The prompts instruct the model to answer in the input's language and to
//! signal unusable input with an `ERROR:` marker, which [`AdviceOutcome`]
//! surfaces as a refusal rather than a transport failure.

use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Marker the prompts ask the model to emit when the input is unusable.
const REFUSAL_MARKER: &str = "ERROR:";

#[derive(Debug, thiserror::Error)]
pub enum AdviceError {
    #[error("Gemini configuration missing: {0}")]
    MissingConfig(String),

    #[error("Gemini request failed: {0}")]
    Request(String),

    #[error("Gemini response was invalid: {0}")]
    InvalidResponse(String),
}

/// What the model produced: usable text, or its own refusal.
///
/// A refusal is not a failure; the API layer maps it to a 200 response
/// with an error flag so the client can show the model's message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceOutcome {
    Text(String),
    Refused(String),
}

#[derive(Debug, Clone)]
pub struct AdviceClient {
    api_base_url: String,
    model: String,
    api_key: String,
    http: Client,
}

impl AdviceClient {
    pub fn is_configured() -> bool {
        required_env_present("GEMINI_API_KEY")
    }

    pub fn from_env() -> Result<Self, AdviceError> {
        let api_base_url = env_or_default("GEMINI_API_BASE_URL", DEFAULT_API_BASE_URL);
        let model = env_or_default("GEMINI_MODEL", DEFAULT_MODEL);
        let api_key = env_required("GEMINI_API_KEY")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AdviceError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url,
            model,
            api_key,
            http,
        })
    }

    /// Ask the model for practical advice about a journal entry.
    pub async fn advice(&self, content: &str) -> Result<AdviceOutcome, AdviceError> {
        let text = self.generate(&advice_prompt(content)).await?;
        Ok(classify_outcome(text))
    }

    /// Ask the model to proofread a text, keeping meaning and tone.
    pub async fn fix_grammar(&self, content: &str) -> Result<AdviceOutcome, AdviceError> {
        let text = self.generate(&grammar_prompt(content)).await?;
        Ok(classify_outcome(text))
    }

    async fn generate(&self, prompt: &str) -> Result<String, AdviceError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );
        let payload = json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }]
        });

        debug!(model = %self.model, "Gemini generate: sending request");

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AdviceError::Request(format!("request failed: {e}")))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| AdviceError::InvalidResponse(format!("non-JSON response: {e}")))?;

        if !status.is_success() {
            let detail = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(AdviceError::Request(format!(
                "API returned {status}: {detail}"
            )));
        }

        let text = extract_candidate_text(&body).ok_or_else(|| {
            AdviceError::InvalidResponse("missing candidate text in response".to_string())
        })?;
        Ok(text.to_string())
    }
}

fn advice_prompt(content: &str) -> String {
    format!(
        "I'm going to give you a piece of content. Analyze this content and provide relevant, helpful advice about it.\n\
         \n\
         Content: \"{content}\"\n\
         \n\
         Important rules:\n\
         1. DETECT THE LANGUAGE of the content and respond in THE SAME LANGUAGE as the input.\n\
         2. If the content is about a plan, activity, or task, provide practical advice for it.\n\
         3. If the content mentions a specific topic (e.g., shopping, travel, meeting, buying tickets), give topic-specific advice.\n\
         4. Format your response using valid HTML elements for better readability:\n\
            - Use <strong> or <b> for emphasis and important points\n\
            - Use <br> for line breaks\n\
            - Use <ul> and <li> for lists\n\
            - Use <h3> for section headings if needed\n\
         5. Keep your advice concise and practical, no more than 3-5 sentences.\n\
         6. If the content is completely nonsensical, respond with \"ERROR: Please provide valid content.\" in the SAME LANGUAGE as the input.\n\
         7. Do not mention that you detected the language in your response.\n\
         8. Make sure your HTML is valid and properly formatted.\n\
         9. DO NOT INCLUDE any visible HTML tags in your output like <html>, <body>, <p> at the beginning and end of your response.\n\
         10. Your output must be ready to be inserted directly into an HTML element."
    )
}

fn grammar_prompt(content: &str) -> String {
    format!(
        "You are a professional proofreader. I'll give you a text that may contain spelling or grammar errors.\n\
         \n\
         Text: \"{content}\"\n\
         \n\
         Important rules:\n\
         1. DETECT THE LANGUAGE of the text automatically.\n\
         2. Fix any spelling, grammar, and punctuation errors in THE SAME LANGUAGE as the input.\n\
         3. Preserve the original meaning, style, and tone - only fix errors.\n\
         4. Start your response with \"Corrected:\" followed by the fixed text.\n\
         5. If the text is already correct, respond with \"ERROR: The text is already correct.\" in THE SAME LANGUAGE as the input.\n\
         6. Do not explain or comment on the corrections, just provide the fixed text.\n\
         7. Do not mention that you detected the language in your response."
    )
}

/// Split generated text into usable output or the model's own refusal.
///
/// The refusal message keeps everything around the first marker, with the
/// marker itself removed and whitespace trimmed.
fn classify_outcome(text: String) -> AdviceOutcome {
    if text.contains(REFUSAL_MARKER) {
        let message = text.replacen(REFUSAL_MARKER, "", 1).trim().to_string();
        AdviceOutcome::Refused(message)
    } else {
        AdviceOutcome::Text(text)
    }
}

fn extract_candidate_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

fn required_env_present(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .is_some()
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_required(name: &str) -> Result<String, AdviceError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdviceError::MissingConfig(name.to_string()))
}
