//! HTTP implementation of the AI text-structuring collaborator.
//!
//! Speaks a Gemini-style `generateContent` endpoint: the instruction plus
//! the document text go out as one user turn, the structured guess comes
//! back as candidate text. Transient conditions (overload, timeouts) are
//! retried with exponential backoff up to a small fixed attempt ceiling;
//! everything else is a terminal [`NotaError::Ai`] for the file.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::NotaError;
use crate::pdf::TextStructurer;

/// Blocking HTTP structurer with bounded retry.
pub struct HttpStructurer {
    client: Client,
    endpoint: String,
    api_key: String,
    max_attempts: u32,
    base_delay: Duration,
}

impl HttpStructurer {
    /// Build a structurer for the given `generateContent`-style endpoint.
    ///
    /// The API key is passed as the `key` query parameter. Requests time
    /// out after 30 seconds; transient failures are retried 3 times with
    /// exponential backoff starting at 500ms.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, NotaError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| NotaError::Ai(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Override the retry ceiling and initial backoff delay.
    pub fn with_retry(mut self, max_attempts: u32, base_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.base_delay = base_delay;
        self
    }

    fn attempt(&self, prompt: &str) -> Result<String, AttemptError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, self.api_key))
            .json(&request)
            .send()
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    AttemptError::Transient(e.to_string())
                } else {
                    AttemptError::Terminal(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AttemptError::Transient(e.to_string()))?;

        if is_transient_status(status) {
            return Err(AttemptError::Transient(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            return Err(AttemptError::Terminal(format!("HTTP {status}: {body}")));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| AttemptError::Terminal(format!("unexpected response shape: {e}")))?;
        let text = parsed.candidate_text();
        if text.is_empty() {
            return Err(AttemptError::Terminal("response carried no text".into()));
        }
        Ok(text)
    }
}

impl TextStructurer for HttpStructurer {
    fn structure(&self, instruction: &str, text: &str) -> Result<String, NotaError> {
        let prompt = format!("{instruction}\n\nTexto do documento:\n{text}");

        let mut delay = self.base_delay;
        let mut last_transient = String::new();
        for attempt in 1..=self.max_attempts {
            match self.attempt(&prompt) {
                Ok(text) => {
                    debug!(attempt, chars = text.len(), "structuring response received");
                    return Ok(text);
                }
                Err(AttemptError::Terminal(e)) => return Err(NotaError::Ai(e)),
                Err(AttemptError::Transient(e)) => {
                    warn!(attempt, error = %e, "transient structuring failure");
                    last_transient = e;
                    if attempt < self.max_attempts {
                        std::thread::sleep(delay);
                        delay *= 2;
                    }
                }
            }
        }
        Err(NotaError::Ai(format!(
            "gave up after {} attempts: {last_transient}",
            self.max_attempts
        )))
    }
}

enum AttemptError {
    Transient(String),
    Terminal(String),
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    fn candidate_text(&self) -> String {
        self.candidates
            .as_deref()
            .and_then(<[Candidate]>::first)
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}
