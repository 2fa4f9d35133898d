use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::core::rate_limit::RateLimiter;
use crate::error::{PigenError, SoftFailure};
use crate::models::GatewayConfig;

/// Prompt used by the connectivity check
pub const PING_PROMPT: &str = "Write a single line of C code that prints 'Hello World'";
const PING_TEMPERATURE: f32 = 0.1;

/// Multiplier applied to the base delay after an HTTP 429
const RATE_LIMIT_PENALTY_FACTOR: u32 = 5;

/// Anything that turns a prompt into generated text.
///
/// Failures are always soft: callers fall back or retry, never abort.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, SoftFailure>;
}

/// generateContent client with round-robin keys and per-key rate windows
pub struct GeminiClient {
    client: Client,
    config: GatewayConfig,
    limiter: RateLimiter,
    penalty: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationParams,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
    }
}

impl GeminiClient {
    /// Create a client. `base_delay` scales the penalty sleep after a 429.
    pub fn new(config: GatewayConfig, base_delay: Duration) -> Result<Self, PigenError> {
        if config.api_keys.is_empty() {
            return Err(PigenError::NoCredentials);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| SoftFailure::Transport(e.to_string()))?;

        let limiter = RateLimiter::new(config.api_keys.len(), config.max_requests_per_minute);

        Ok(Self {
            client,
            config,
            limiter,
            penalty: base_delay * RATE_LIMIT_PENALTY_FACTOR,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn endpoint(&self, key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            key
        )
    }

    fn request<'a>(&self, prompt: &'a str, temperature: f32) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationParams {
                temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn invoke(&self, prompt: &str, temperature: f32) -> Result<String, SoftFailure> {
        let index = self.limiter.next_credential();
        let slot = self.limiter.acquire(index).await;
        let url = self.endpoint(&self.config.api_keys[index]);

        debug!(
            "[KEY {}] Sending request to model {} (temperature {:.2})",
            index, self.config.model, temperature
        );

        let response = self
            .client
            .post(&url)
            .json(&self.request(prompt, temperature))
            .send()
            .await
            .map_err(|e| {
                let failure = if e.is_timeout() {
                    SoftFailure::Timeout(self.config.timeout_seconds)
                } else {
                    SoftFailure::Transport(e.without_url().to_string())
                };
                error!("[KEY {}] Exception during API call: {}", index, failure);
                failure
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            error!("[KEY {}] API Error {}: {}", index, status.as_u16(), message);
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "429 Too Many Requests: waiting {:.0}s",
                    self.penalty.as_secs_f64()
                );
                drop(slot);
                tokio::time::sleep(self.penalty).await;
                return Err(SoftFailure::RateLimited);
            }
            return Err(SoftFailure::Http {
                status: status.as_u16(),
                message,
            });
        }

        // Any 200 counts against the window, even if the body is unusable
        slot.record();

        let body: GenerateResponse = response.json().await.map_err(|e| {
            warn!("[KEY {}] Unreadable response body: {}", index, e);
            SoftFailure::MalformedBody(e.to_string())
        })?;

        body.into_text().ok_or_else(|| {
            warn!("[KEY {}] Response had no candidate text", index);
            SoftFailure::EmptyResponse
        })
    }
}

/// Send the one-line test prompt; any text back counts as success
pub async fn test_connection(gateway: &dyn ModelGateway) -> Result<String, PigenError> {
    info!("Testing connection to the model API...");
    match gateway.invoke(PING_PROMPT, PING_TEMPERATURE).await {
        Ok(text) if !text.trim().is_empty() => {
            info!("API connection successful");
            Ok(text)
        }
        Ok(_) => Err(PigenError::ConnectionTest(
            SoftFailure::EmptyResponse.to_string(),
        )),
        Err(e) => {
            error!("API connection failed. Check your API keys and network connection.");
            Err(PigenError::ConnectionTest(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(keys: &[&str]) -> GatewayConfig {
        GatewayConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_failure() {
        let config = GatewayConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 5,
            ..config_with_keys(&["secret-key"])
        };
        let client = GeminiClient::new(config, Duration::from_millis(10)).unwrap();

        match client.invoke("ping", 0.1).await {
            Err(SoftFailure::Transport(message)) => assert!(!message.contains("secret-key")),
            other => panic!("expected transport failure, got {:?}", other),
        }
        assert_eq!(client.limiter().recorded(0).await, 0);
    }

    #[test]
    fn test_new_requires_credentials() {
        let result = GeminiClient::new(GatewayConfig::default(), Duration::from_secs(5));
        assert!(matches!(result, Err(PigenError::NoCredentials)));
    }

    #[test]
    fn test_limiter_sized_per_key() {
        let client = GeminiClient::new(config_with_keys(&["a", "b", "c"]), Duration::from_secs(5)).unwrap();
        assert_eq!(client.limiter().credential_count(), 3);
        assert_eq!(client.limiter().max_per_window(), 15);
        assert_eq!(client.penalty, Duration::from_secs(25));
    }

    #[test]
    fn test_endpoint_format() {
        let mut config = config_with_keys(&["k1"]);
        config.base_url = "http://localhost:8080/v1beta/".to_string();
        let client = GeminiClient::new(config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint("k1"),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent?key=k1"
        );
    }

    #[test]
    fn test_request_serialization() {
        let client = GeminiClient::new(config_with_keys(&["k"]), Duration::from_secs(1)).unwrap();
        let json = serde_json::to_value(client.request("hello", 0.75)).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["topK"], 40);
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.75).abs() < 1e-6);
        assert_eq!(json["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(json["safetySettings"][0]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"int main(void) { return 0; }"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().as_deref(), Some("int main(void) { return 0; }"));
    }

    #[test]
    fn test_response_missing_structure() {
        for json in [
            r#"{}"#,
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
        ] {
            let response: GenerateResponse = serde_json::from_str(json).unwrap();
            assert!(response.into_text().is_none(), "{}", json);
        }
    }

    struct FixedGateway(Result<String, SoftFailure>);

    #[async_trait]
    impl ModelGateway for FixedGateway {
        async fn invoke(&self, _prompt: &str, _temperature: f32) -> Result<String, SoftFailure> {
            self.0.clone()
        }
    }

    #[tokio::test]
    async fn test_connection_outcomes() {
        let ok = FixedGateway(Ok("printf(\"Hello World\\n\");".to_string()));
        assert!(test_connection(&ok).await.is_ok());

        let blank = FixedGateway(Ok("  ".to_string()));
        assert!(matches!(
            test_connection(&blank).await,
            Err(PigenError::ConnectionTest(_))
        ));

        let down = FixedGateway(Err(SoftFailure::Transport("refused".to_string())));
        let err = test_connection(&down).await.unwrap_err();
        assert!(err.to_string().contains("refused"));
    }
}
