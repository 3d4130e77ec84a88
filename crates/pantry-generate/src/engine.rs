use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use pantry_core::settings::{self, Settings};
use pantry_core::{Recipe, RecipeInput};

use crate::error::GenerationError;
use crate::{parse, prompt};

pub const TEMPERATURE: f32 = 0.7;
pub const TOP_P: f32 = 0.9;
pub const MAX_TOKENS: u32 = 2000;

const APP_TITLE: &str = "Pantry Chef";

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never got an answer: DNS, connect, timeout.
    #[error("{0}")]
    Network(String),
    #[error("{0}")]
    Other(String),
}

/// Sends one JSON POST with a bearer credential.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

fn transport_error(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() || e.is_request() {
        TransportError::Network(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        body: &Value,
    ) -> Result<HttpReply, TransportError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .header("X-Title", APP_TITLE)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;
        Ok(HttpReply { status, body })
    }
}

// --- Wire format ---

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

fn response_format() -> Value {
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "recipe",
            "strict": false,
            "schema": parse::draft_schema(),
        }
    })
}

/// Map a provider reply onto the completion text or a classified error.
pub fn classify_reply(reply: &HttpReply) -> Result<String, GenerationError> {
    if reply.status == 429 {
        return Err(GenerationError::RateLimited);
    }

    if !(200..300).contains(&reply.status) {
        let message = serde_json::from_str::<Value>(&reply.body)
            .ok()
            .as_ref()
            .and_then(|v| v.pointer("/error/message"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("API error: {}", reply.status));
        return Err(GenerationError::Remote {
            status: reply.status,
            message,
        });
    }

    let parsed: Value = serde_json::from_str(&reply.body)
        .map_err(|e| GenerationError::Unknown(format!("unreadable provider response: {e}")))?;

    match parsed
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(GenerationError::EmptyResponse {
            raw: reply.body.clone(),
        }),
    }
}

type SettingsSource = Box<dyn Fn() -> Settings + Send + Sync>;

/// Single-shot recipe generation against an OpenAI-compatible chat endpoint.
///
/// Settings are looked up again for every request, so a key added while the
/// program runs is picked up by the next attempt.
pub struct RecipeGenerator<T = ReqwestTransport> {
    settings: SettingsSource,
    transport: T,
}

impl RecipeGenerator<ReqwestTransport> {
    /// Reads `settings.json` and the environment on every call.
    pub fn from_config() -> Self {
        Self::with_source(
            || settings::read_settings().with_env_overrides(),
            ReqwestTransport::new(),
        )
    }
}

impl<T: ChatTransport> RecipeGenerator<T> {
    /// Generator pinned to one set of settings.
    pub fn new(settings: Settings, transport: T) -> Self {
        Self::with_source(move || settings.clone(), transport)
    }

    pub fn with_source(
        source: impl Fn() -> Settings + Send + Sync + 'static,
        transport: T,
    ) -> Self {
        Self {
            settings: Box::new(source),
            transport,
        }
    }

    /// The settings the next request would use.
    pub fn settings(&self) -> Settings {
        (self.settings)()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(
        &self,
        settings: &Settings,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<HttpReply, GenerationError> {
        let body = serde_json::to_value(request)
            .map_err(|e| GenerationError::Unknown(format!("could not encode request: {e}")))?;

        self.transport
            .post_json(&settings.endpoint, api_key, &body)
            .await
            .map_err(|e| match e {
                TransportError::Network(msg) => GenerationError::Network(msg),
                TransportError::Other(msg) => GenerationError::Unknown(msg),
            })
    }

    /// Ask the provider for a recipe and return the raw completion text.
    pub async fn complete(&self, input: &RecipeInput) -> Result<String, GenerationError> {
        let settings = self.settings();
        let api_key = credential(&settings)?;

        let system = prompt::system_prompt();
        let user_msg = prompt::user_message(input);
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user_msg,
                },
            ],
            temperature: Some(TEMPERATURE),
            max_tokens: MAX_TOKENS,
            top_p: Some(TOP_P),
            response_format: settings.structured_output.then(response_format),
        };

        tracing::info!(model = %settings.model, "requesting recipe");
        let reply = self.send(&settings, api_key, &request).await?;
        tracing::debug!(status = reply.status, "provider replied");

        classify_reply(&reply).inspect_err(|e| {
            tracing::warn!(kind = e.kind(), error = %e, "recipe request failed");
        })
    }

    /// Full pipeline: prompt, remote call, normalization.
    pub async fn generate(&self, input: &RecipeInput) -> Result<Recipe, GenerationError> {
        let raw = self.complete(input).await?;
        tracing::debug!(raw = %raw, "raw completion");

        let recipe = parse::normalize(&raw, input).inspect_err(|e| {
            tracing::error!(error = ?e, "error parsing AI response");
        })?;
        tracing::info!(id = %recipe.id, name = %recipe.name, "recipe generated");
        Ok(recipe)
    }

    /// Cheap connectivity and credential check.
    pub async fn ping(&self) -> Result<(), GenerationError> {
        let settings = self.settings();
        let api_key = credential(&settings)?;
        let request = ChatRequest {
            model: &settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: "Hello",
            }],
            temperature: None,
            max_tokens: 5,
            top_p: None,
            response_format: None,
        };

        let reply = self.send(&settings, api_key, &request).await?;
        match reply.status {
            200..=299 => Ok(()),
            _ => classify_reply(&reply).map(|_| ()),
        }
    }
}

fn credential(settings: &Settings) -> Result<&str, GenerationError> {
    settings.credential().ok_or_else(|| {
        tracing::warn!("OpenRouter API key not configured");
        GenerationError::Configuration
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::{CaloriePreference, DietType, ServingSize};
    use std::sync::{Arc, Mutex};

    /// Replays a canned reply and records what was sent.
    struct FakeTransport {
        reply: Result<HttpReply, fn() -> TransportError>,
        sent: Mutex<Vec<(String, String, Value)>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> TransportError) -> Self {
            Self {
                reply: Err(err),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<(String, String, Value)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatTransport for FakeTransport {
        async fn post_json(
            &self,
            url: &str,
            api_key: &str,
            body: &Value,
        ) -> Result<HttpReply, TransportError> {
            self.sent
                .lock()
                .unwrap()
                .push((url.to_string(), api_key.to_string(), body.clone()));
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn settings(key: &str) -> Settings {
        Settings {
            api_key: key.to_string(),
            ..Settings::default()
        }
    }

    fn input() -> RecipeInput {
        RecipeInput {
            ingredients: vec!["chickpeas".to_string(), "spinach".to_string()],
            diet_type: DietType::Vegan,
            calorie_preference: CaloriePreference::Custom,
            custom_calories: Some(725),
            serving_size: ServingSize::Four,
        }
    }

    fn completion(content: &str) -> String {
        serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
            .to_string()
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let generator = RecipeGenerator::new(settings("  "), FakeTransport::replying(200, "{}"));
        let err = generator.generate(&input()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Configuration));
        assert!(generator.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn request_carries_prompt_model_and_sampling() {
        let body = completion(r#"{"name":"Chana Saag"}"#);
        let generator =
            RecipeGenerator::new(settings("sk-test"), FakeTransport::replying(200, &body));

        generator.generate(&input()).await.unwrap();

        let sent = generator.transport.sent();
        assert_eq!(sent.len(), 1);
        let (url, key, body) = &sent[0];
        assert_eq!(url, pantry_core::settings::DEFAULT_ENDPOINT);
        assert_eq!(key, "sk-test");
        assert_eq!(body["model"], pantry_core::settings::DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("725 calories"));
        assert!(user.contains("- chickpeas"));
        assert_eq!(body["max_tokens"], 2000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((body["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn structured_output_adds_a_response_schema() {
        let mut s = settings("sk-test");
        s.structured_output = true;
        let body = completion(r#"{"name":"Soup"}"#);
        let generator = RecipeGenerator::new(s, FakeTransport::replying(200, &body));

        generator.generate(&input()).await.unwrap();

        let (_, _, body) = &generator.transport.sent()[0];
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
    }

    #[tokio::test]
    async fn servings_always_echo_the_input() {
        let body = completion(r#"{"name":"Big Pot","servings":10}"#);
        let generator = RecipeGenerator::new(settings("k"), FakeTransport::replying(200, &body));
        let recipe = generator.generate(&input()).await.unwrap();
        assert_eq!(recipe.servings, 4);
        assert_eq!(recipe.diet_type, DietType::Vegan);
    }

    #[tokio::test]
    async fn status_429_is_a_rate_limit() {
        let generator = RecipeGenerator::new(
            settings("k"),
            FakeTransport::replying(429, r#"{"error":{"message":"slow down"}}"#),
        );
        let err = generator.generate(&input()).await.unwrap_err();
        assert!(matches!(err, GenerationError::RateLimited));
    }

    #[tokio::test]
    async fn transport_failures_are_classified() {
        let generator = RecipeGenerator::new(
            settings("k"),
            FakeTransport::failing(|| TransportError::Network("connection refused".into())),
        );
        assert!(matches!(
            generator.generate(&input()).await,
            Err(GenerationError::Network(_))
        ));

        let generator = RecipeGenerator::new(
            settings("k"),
            FakeTransport::failing(|| TransportError::Other("body decode".into())),
        );
        assert!(matches!(
            generator.generate(&input()).await,
            Err(GenerationError::Unknown(_))
        ));
    }

    #[tokio::test]
    async fn unparseable_completion_is_a_parse_error() {
        let body = completion("Sorry, no recipe today.");
        let generator = RecipeGenerator::new(settings("k"), FakeTransport::replying(200, &body));
        assert!(matches!(
            generator.generate(&input()).await,
            Err(GenerationError::Parse(_))
        ));
    }

    #[test]
    fn remote_errors_prefer_provider_message() {
        let err = classify_reply(&HttpReply {
            status: 401,
            body: r#"{"error":{"message":"No auth credentials found"}}"#.to_string(),
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "No auth credentials found");

        let err = classify_reply(&HttpReply {
            status: 502,
            body: "<html>bad gateway</html>".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, GenerationError::Remote { status: 502, .. }));
        assert_eq!(err.to_string(), "API error: 502");
    }

    #[test]
    fn empty_completion_keeps_the_raw_payload() {
        let body = r#"{"choices":[{"message":{"content":"   "}}]}"#;
        match classify_reply(&HttpReply {
            status: 200,
            body: body.to_string(),
        }) {
            Err(GenerationError::EmptyResponse { raw }) => assert_eq!(raw, body),
            other => panic!("expected EmptyResponse, got {other:?}"),
        }

        let no_choices = classify_reply(&HttpReply {
            status: 200,
            body: r#"{"choices":[]}"#.to_string(),
        });
        assert!(matches!(no_choices, Err(GenerationError::EmptyResponse { .. })));

        for body in [
            r#"{"choices":null}"#,
            r#"{"choices":[{"message":null}]}"#,
            r#"{"choices":[{"message":{"content":[{"type":"text","text":"hi"}]}}]}"#,
            r#"{}"#,
        ] {
            match classify_reply(&HttpReply {
                status: 200,
                body: body.to_string(),
            }) {
                Err(GenerationError::EmptyResponse { raw }) => assert_eq!(raw, body),
                other => panic!("expected EmptyResponse for {body}, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_json_success_body_is_unknown() {
        let err = classify_reply(&HttpReply {
            status: 200,
            body: "not json".to_string(),
        })
        .unwrap_err();
        assert!(matches!(err, GenerationError::Unknown(_)));
    }

    #[tokio::test]
    async fn ping_uses_a_tiny_request() {
        let generator = RecipeGenerator::new(settings("k"), FakeTransport::replying(200, "{}"));
        generator.ping().await.unwrap();
        let (_, _, body) = &generator.transport.sent()[0];
        assert_eq!(body["max_tokens"], 5);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn key_added_between_calls_is_used_by_the_next_one() {
        let shared = Arc::new(Mutex::new(settings("")));
        let source = Arc::clone(&shared);
        let body = completion(r#"{"name":"Dal"}"#);
        let generator = RecipeGenerator::with_source(
            move || source.lock().unwrap().clone(),
            FakeTransport::replying(200, &body),
        );

        let err = generator.generate(&input()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Configuration));
        assert!(generator.settings().credential().is_none());

        shared.lock().unwrap().api_key = "sk-new".to_string();

        assert_eq!(generator.settings().credential(), Some("sk-new"));
        generator.generate(&input()).await.unwrap();
        let sent = generator.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "sk-new");
    }
}
