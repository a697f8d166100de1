//! Gemini `generateContent` backend over blocking HTTP.
use super::{normalize_output, GenerationClient, GenerationError, GenerationRequest};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Default)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Generation backend for Google's Gemini API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "Gemini API key is empty".to_string(),
            ));
        }
        if model.trim().is_empty() {
            return Err(GenerationError::Configuration(
                "Gemini model is empty".to_string(),
            ));
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn agent(timeout: Option<Duration>) -> ureq::Agent {
        ureq::Agent::config_builder()
            .timeout_global(timeout)
            .http_status_as_error(false)
            .build()
            .into()
    }
}

fn status_error(status: u16, body: &str) -> GenerationError {
    let detail = format!("HTTP {status}: {}", body.trim());
    match status {
        401 | 403 => GenerationError::Authentication(detail),
        429 => GenerationError::RateLimited(detail),
        400 | 404 | 413 => GenerationError::InvalidRequest(detail),
        500..=599 => GenerationError::Unavailable(detail),
        _ => GenerationError::Provider(detail),
    }
}

fn transport_error(err: ureq::Error, start: Instant) -> GenerationError {
    match err {
        ureq::Error::Timeout(_) => GenerationError::Timeout {
            elapsed_ms: start.elapsed().as_millis() as u64,
        },
        other => GenerationError::Network(other.to_string()),
    }
}

fn response_text(response: GeminiResponse) -> Result<String, GenerationError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(GenerationError::Provider(format!("prompt blocked: {reason}")));
    }
    let candidate = response.candidates.into_iter().next().unwrap_or_default();
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|reason| reason != "STOP") {
            return Err(GenerationError::Provider(format!(
                "generation stopped: {reason}"
            )));
        }
    }
    normalize_output(&text)
}

impl GenerationClient for GeminiClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        if request.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiRequestPart {
                    text: request.prompt,
                }],
            }],
        };
        let start = Instant::now();
        let mut response = Self::agent(request.timeout)
            .post(self.endpoint().as_str())
            .header("x-goog-api-key", self.api_key.as_str())
            .send_json(&body)
            .map_err(|err| transport_error(err, start))?;

        let status = response.status().as_u16();
        tracing::info!(
            label = request.label,
            model = %self.model,
            status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            prompt_bytes = request.prompt.len(),
            "gemini request complete"
        );
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(status_error(status, &body));
        }
        // The call cannot be interrupted mid-flight; honor a cancel that
        // arrived while it was running.
        if request.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let parsed: GeminiResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| match err {
                ureq::Error::Timeout(_) => GenerationError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                },
                other => GenerationError::Provider(format!("decode Gemini response: {other}")),
            })?;
        response_text(parsed)
    }
}
