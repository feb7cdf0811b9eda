//! Summarization client
//!
//! The pipeline only needs "prompt in, text out". [`Summarizer`] is that seam;
//! [`MessagesClient`] implements it over a Messages-style HTTP API.

use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// One generation request
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// Anything that can turn a prompt into a summary
///
/// Implementations are called concurrently from batch workers.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, request: &SummaryRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
    temperature: f64,
    top_p: f64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// HTTP client for a Messages-style generation endpoint
pub struct MessagesClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    version: String,
}

impl MessagesClient {
    /// Build a client from the run configuration
    ///
    /// The API key is read from the environment variable named by
    /// `api_key_env`; a missing key is fatal.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Credentials {
                var: config.api_key_env.clone(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model_id.clone(),
            version: config.anthropic_version.clone(),
        })
    }

    fn body<'a>(&'a self, request: &'a SummaryRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            top_p: request.top_p,
        }
    }
}

impl Summarizer for MessagesClient {
    fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.version)
            .json(&self.body(request))
            .send()
            .map_err(|e| Error::Request(e.to_string()))?;

        let status = response.status();
        let text = response.text().map_err(|e| Error::Request(e.to_string()))?;
        trace!(%status, bytes = text.len(), "Received summarization response");

        if !status.is_success() {
            return Err(Error::Request(format!("{}: {}", status, text)));
        }

        parse_response(&text)
    }
}

/// Extract the first text block of a Messages response
pub fn parse_response(body: &str) -> Result<String> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("failed to decode response: {}", e)))?;

    match response.content.into_iter().next() {
        Some(block) if !block.text.is_empty() => Ok(block.text),
        _ => Err(Error::MalformedResponse("content is missing or empty".into())),
    }
}
