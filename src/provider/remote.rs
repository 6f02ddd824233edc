use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};

use super::TextGenerator;

/// OpenAI-compatible chat completions backend.
pub struct RemoteApiProvider {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl RemoteApiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            timeout: config.timeout(),
        })
    }
}

#[async_trait::async_trait]
impl TextGenerator for RemoteApiProvider {
    async fn generate(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::CredentialMissing)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            // Pinned for reproducible patches.
            temperature: 0.0,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Generation request failed");
            return Err(ProviderError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| self.classify(e))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no choices[0].message.content".to_string()))
    }
}

impl RemoteApiProvider {
    fn classify(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else {
            ProviderError::Http(e)
        }
    }
}

// --- Request types ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

// --- Response types ---

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(url: &str, key: Option<&str>, timeout_secs: u64) -> RemoteApiProvider {
        RemoteApiProvider::new(&ProviderConfig {
            api_url: url.to_string(),
            api_key: key.map(str::to_string),
            timeout_secs,
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    fn completions_url(server: &MockServer) -> String {
        format!("{}/v1/chat/completions", server.uri())
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let p = provider("http://127.0.0.1:9/unused", None, 5);
        let err = p.generate("hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::CredentialMissing));
    }

    #[tokio::test]
    async fn test_success_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "add greeting"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "PATCH_START\nPATCH_END"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&completions_url(&server), Some("sk-test"), 5)
            .generate("add greeting")
            .await
            .unwrap();
        assert_eq!(text, "PATCH_START\nPATCH_END");
    }

    #[tokio::test]
    async fn test_non_success_captures_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"bad key"}"#))
            .mount(&server)
            .await;

        let err = provider(&completions_url(&server), Some("sk-test"), 5)
            .generate("x")
            .await
            .unwrap_err();
        match err {
            ProviderError::RequestFailed { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&completions_url(&server), Some("sk-test"), 5)
            .generate("x")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"choices": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = provider(&completions_url(&server), Some("sk-test"), 1)
            .generate("x")
            .await
            .unwrap_err();
        match err {
            ProviderError::Timeout(after) => assert_eq!(after, Duration::from_secs(1)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
