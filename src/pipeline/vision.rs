//! Vision classification: image file → meaningful / not meaningful.
//!
//! [`ImageClassifier`] is the seam between the classification loop and the
//! network. Two implementations ship:
//!
//! * [`SambaNovaClassifier`]: posts directly to an OpenAI-compatible
//!   `/chat/completions` endpoint (SambaNova by default), `top_p` included.
//! * [`ProviderClassifier`]: wraps any edgequake-llm [`LLMProvider`]
//!   (OpenAI, Anthropic, Gemini, Ollama, …).
//!
//! Both send one user message holding the instruction prompt and the image,
//! and interpret the answer with [`parse_verdict`].

use crate::config::{ClassifyConfig, API_KEY_ENV, DEFAULT_MODEL, DEFAULT_PROVIDER_MODEL};
use crate::error::{ItemError, SiftError};
use crate::output::ClassificationResult;
use crate::pipeline::discover::ImageFile;
use crate::pipeline::encode::{data_url, image_data};
use crate::prompts::parse_verdict;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, ProviderFactory};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Decides whether one image is meaningful.
///
/// Implementations return `Err` only when no answer was obtained; an answer
/// that is neither yes nor no is an `Ok` with [`crate::Verdict::Ambiguous`].
#[async_trait]
pub trait ImageClassifier: Send + Sync {
    async fn classify(&self, image: &ImageFile) -> Result<ClassificationResult, ItemError>;

    /// Short label for logs and auth errors.
    fn name(&self) -> &str {
        "custom"
    }
}

fn result_from_text(name: &str, text: Option<String>) -> Result<ClassificationResult, ItemError> {
    let text = text.map(|t| t.trim().to_string()).unwrap_or_default();
    if text.is_empty() {
        return Err(ItemError::EmptyResponse {
            name: name.to_string(),
        });
    }
    Ok(ClassificationResult {
        verdict: parse_verdict(&text),
        response: text,
    })
}

// ── OpenAI-compatible HTTP backend ───────────────────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Classifier for an OpenAI-compatible chat-completions endpoint.
pub struct SambaNovaClassifier {
    http: Client,
    api_key: String,
    endpoint: String,
    model: String,
    prompt: String,
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl SambaNovaClassifier {
    /// Build a classifier from the request settings in `config`.
    pub fn new(api_key: impl Into<String>, config: &ClassifyConfig) -> Result<Self, SiftError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| SiftError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            prompt: config.effective_prompt().to_string(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }
}

#[async_trait]
impl ImageClassifier for SambaNovaClassifier {
    async fn classify(&self, image: &ImageFile) -> Result<ClassificationResult, ItemError> {
        let name = image.name.as_str();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![WireMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: &self.prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url(&image.bytes, image.mime),
                        },
                    },
                ],
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        debug!("POST {} for {}", self.endpoint, name);
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ItemError::Timeout {
                        name: name.to_string(),
                        secs: self.timeout_secs,
                    }
                } else {
                    ItemError::RequestFailed {
                        name: name.to_string(),
                        detail: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ItemError::Unauthorized {
                name: name.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ItemError::ApiStatus {
                name: name.to_string(),
                status: status.as_u16(),
                detail: body.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ItemError::Timeout {
                    name: name.to_string(),
                    secs: self.timeout_secs,
                }
            } else {
                ItemError::RequestFailed {
                    name: name.to_string(),
                    detail: format!("unreadable response: {e}"),
                }
            }
        })?;

        let text = parsed.choices.into_iter().next().and_then(|c| c.message.content);
        result_from_text(name, text)
    }

    fn name(&self) -> &str {
        "sambanova"
    }
}

// ── edgequake-llm backend ────────────────────────────────────────────────

/// Classifier backed by an edgequake-llm provider.
pub struct ProviderClassifier {
    provider: Arc<dyn LLMProvider>,
    label: String,
    prompt: String,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderClassifier {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        label: impl Into<String>,
        config: &ClassifyConfig,
    ) -> Self {
        Self {
            provider,
            label: label.into(),
            prompt: config.effective_prompt().to_string(),
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }
}

/// `CompletionOptions` from the classify config.
fn build_options(config: &ClassifyConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// Map a provider failure onto the per-image error. Only a credential
/// rejection aborts the run.
fn item_error(name: &str, err: LlmError) -> ItemError {
    match err {
        LlmError::AuthError(_) => ItemError::Unauthorized {
            name: name.to_string(),
            status: 401,
        },
        other => ItemError::RequestFailed {
            name: name.to_string(),
            detail: other.to_string(),
        },
    }
}

#[async_trait]
impl ImageClassifier for ProviderClassifier {
    async fn classify(&self, image: &ImageFile) -> Result<ClassificationResult, ItemError> {
        let name = image.name.as_str();
        let messages = vec![ChatMessage::user_with_images(
            self.prompt.as_str(),
            vec![image_data(&image.bytes, image.mime)],
        )];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| ItemError::Timeout {
                name: name.to_string(),
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| item_error(name, e))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            name, response.prompt_tokens, response.completion_tokens
        );
        result_from_text(name, Some(response.content))
    }

    fn name(&self) -> &str {
        &self.label
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Pick the classifier for a run, from most to least specific.
///
/// 1. A pre-built classifier in `config.classifier`.
/// 2. A named edgequake-llm provider (`config.provider_name`), which reads
///    its own credential variable (`OPENAI_API_KEY`, …).
/// 3. SambaNova with `config.api_key`, falling back to `SAMBANOVA_API_KEY`.
///
/// With none of these available the run fails with
/// [`SiftError::MissingApiKey`] before any image is read.
pub fn resolve_classifier(config: &ClassifyConfig) -> Result<Arc<dyn ImageClassifier>, SiftError> {
    if let Some(ref classifier) = config.classifier {
        return Ok(Arc::clone(classifier));
    }

    if let Some(ref provider_name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            SiftError::ProviderNotConfigured {
                provider: provider_name.clone(),
                hint: format!("{e}"),
            }
        })?;
        debug!("Using edgequake-llm provider {} ({})", provider_name, model);
        return Ok(Arc::new(ProviderClassifier::new(
            provider,
            provider_name.clone(),
            config,
        )));
    }

    let api_key = config
        .api_key
        .clone()
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| SiftError::MissingApiKey {
            var: API_KEY_ENV.to_string(),
        })?;
    Ok(Arc::new(SambaNovaClassifier::new(api_key, config)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::Verdict;
    use std::path::PathBuf;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image(name: &str) -> ImageFile {
        ImageFile {
            path: PathBuf::from(name),
            name: name.to_string(),
            mime: "image/png",
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    fn answer(text: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": text } }]
        })
    }

    fn classifier_for(server: &MockServer) -> SambaNovaClassifier {
        let config = ClassifyConfig::builder()
            .base_url(server.uri())
            .api_timeout_secs(5)
            .build()
            .unwrap();
        SambaNovaClassifier::new("test-key", &config).unwrap()
    }

    #[tokio::test]
    async fn yes_answer_is_meaningful() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_string_contains("data:image/png;base64,"))
            .and(body_string_contains("Llama-3.2-90B-Vision-Instruct"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer(" SI ")))
            .expect(1)
            .mount(&server)
            .await;

        let result = classifier_for(&server).classify(&image("a.png")).await.unwrap();
        assert_eq!(result.verdict, Verdict::Meaningful);
        assert_eq!(result.response, "SI");
    }

    #[tokio::test]
    async fn no_answer_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("No.")))
            .mount(&server)
            .await;

        let result = classifier_for(&server).classify(&image("b.png")).await.unwrap();
        assert!(!result.is_meaningful());
        assert_eq!(result.verdict, Verdict::NotMeaningful);
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = classifier_for(&server).classify(&image("c.png")).await.unwrap_err();
        assert_eq!(
            err,
            ItemError::Unauthorized {
                name: "c.png".into(),
                status: 401
            }
        );
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = classifier_for(&server).classify(&image("d.png")).await.unwrap_err();
        match err {
            ItemError::ApiStatus { status, detail, .. } => {
                assert_eq!(status, 503);
                assert_eq!(detail, "overloaded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let err = classifier_for(&server).classify(&image("e.png")).await.unwrap_err();
        assert!(matches!(err, ItemError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(answer("SI"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = ClassifyConfig::builder()
            .base_url(server.uri())
            .api_timeout_secs(1)
            .build()
            .unwrap();
        let classifier = SambaNovaClassifier::new("k", &config).unwrap();
        let err = classifier.classify(&image("f.png")).await.unwrap_err();
        assert_eq!(
            err,
            ItemError::Timeout {
                name: "f.png".into(),
                secs: 1
            }
        );
    }

    #[test]
    fn request_body_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![WireMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: "hi" },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/png;base64,AA==".into(),
                        },
                    },
                ],
            }],
            temperature: 0.1,
            top_p: 0.1,
            max_tokens: 32,
        };
        let json = serde_json::to_value(&body).unwrap();
        let content = &json["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,AA==");
        assert_eq!(json["max_tokens"], 32);
    }

    #[test]
    fn explicit_classifier_wins() {
        struct Always;
        #[async_trait]
        impl ImageClassifier for Always {
            async fn classify(&self, _: &ImageFile) -> Result<ClassificationResult, ItemError> {
                Ok(ClassificationResult {
                    verdict: Verdict::Meaningful,
                    response: "SI".into(),
                })
            }
            fn name(&self) -> &str {
                "always"
            }
        }
        let config = ClassifyConfig::builder()
            .classifier(Arc::new(Always))
            .build()
            .unwrap();
        assert_eq!(resolve_classifier(&config).unwrap().name(), "always");
    }

    #[test]
    fn explicit_api_key_selects_sambanova() {
        let config = ClassifyConfig::builder().api_key("k").build().unwrap();
        assert_eq!(resolve_classifier(&config).unwrap().name(), "sambanova");
    }

    #[test]
    fn only_auth_errors_are_unauthorized() {
        let err = item_error("a.png", LlmError::AuthError("invalid api key".into()));
        assert!(matches!(err, ItemError::Unauthorized { status: 401, .. }));

        let err = item_error(
            "a.png",
            LlmError::ApiError("prompt has 4013 tokens, model limit exceeded".into()),
        );
        assert!(
            matches!(err, ItemError::RequestFailed { ref detail, .. } if detail.contains("4013"))
        );

        let err = item_error("a.png", LlmError::NetworkError("HTTP 403 from proxy".into()));
        assert!(matches!(err, ItemError::RequestFailed { .. }));
    }

    #[test]
    fn build_options_from_config() {
        let opts = build_options(&ClassifyConfig::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(32));
    }
}
