use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult, InputError};
use crate::pipeline::FuelKind;

const SYSTEM_INSTRUCTION: &str =
    "You are a fuel efficiency expert who gives concise, practical advice to everyday drivers.";
const MAX_OUTPUT_TOKENS: u32 = 350;
const TEMPERATURE: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct AdvicePrompt {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, prompt: &AdvicePrompt) -> AppResult<String>;
}

/// Recommendation requester. Absent entirely when no key is configured, so
/// the feature degrades to a disabled control instead of failing per call.
#[derive(Clone)]
pub struct Advisor {
    inner: Arc<dyn ChatCompletion>,
}

impl Advisor {
    pub fn maybe_new(config: &AppConfig) -> Option<Self> {
        config.openrouter_api_key.clone().map(|key| Self {
            inner: Arc::new(HttpChatClient::new(
                key,
                config.openrouter_api_base.clone(),
                config.advisor_model.clone(),
                config.http_timeout_secs,
            )),
        })
    }

    pub fn from_api(api: Arc<dyn ChatCompletion>) -> Self {
        Self { inner: api }
    }

    /// Builds the templated prompt and requests free-text advice. The
    /// efficiency text is required before any network call happens.
    pub async fn fuel_tips(&self, fuel: FuelKind, efficiency_text: &str) -> AppResult<String> {
        let trimmed = efficiency_text.trim();
        if trimmed.is_empty() {
            return Err(InputError::MissingEfficiency.into());
        }
        let prompt = build_prompt(fuel, trimmed);
        self.inner.complete(&prompt).await
    }
}

pub fn build_prompt(fuel: FuelKind, efficiency_text: &str) -> AdvicePrompt {
    AdvicePrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: format!(
            "Provide 4-5 practical fuel-saving tips for someone using {} fuel.\n\
             Vehicle MPG: {}\n\
             Keep each tip short and actionable.",
            fuel.label(),
            efficiency_text,
        ),
    }
}

struct HttpChatClient {
    http: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    model: String,
}

impl HttpChatClient {
    fn new(api_key: SecretString, api_base: String, model: String, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("chat http client");
        Self {
            http,
            api_key,
            api_base,
            model,
        }
    }
}

#[async_trait]
impl ChatCompletion for HttpChatClient {
    async fn complete(&self, prompt: &AdvicePrompt) -> AppResult<String> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            model: &'a str,
            messages: [Message<'a>; 2],
            max_tokens: u32,
            temperature: f64,
        }

        #[derive(Serialize)]
        struct Message<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            #[serde(default)]
            choices: Vec<ResponseChoice>,
        }

        #[derive(Deserialize)]
        struct ResponseChoice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let body = RequestBody {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let parsed: Response = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                AppError::Malformed("chat completion", "response carried no content".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    struct ScriptedChat {
        responses: Mutex<Vec<AppResult<String>>>,
        prompts: Mutex<Vec<AdvicePrompt>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<AppResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedChat {
        async fn complete(&self, prompt: &AdvicePrompt) -> AppResult<String> {
            self.prompts.lock().push(prompt.clone());
            self.responses.lock().remove(0)
        }
    }

    #[tokio::test]
    async fn interpolates_fuel_and_efficiency_into_the_prompt() {
        let chat = ScriptedChat::new(vec![Ok("coast more".into())]);
        let advisor = Advisor::from_api(chat.clone());

        let tips = advisor.fuel_tips(FuelKind::Diesel, " 31.5 ").await.unwrap();
        assert_eq!(tips, "coast more");

        let prompts = chat.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].user.contains("Diesel fuel"));
        assert!(prompts[0].user.contains("Vehicle MPG: 31.5"));
        assert_eq!(prompts[0].system, SYSTEM_INSTRUCTION);
    }

    #[tokio::test]
    async fn missing_efficiency_short_circuits_before_the_network() {
        let chat = ScriptedChat::new(vec![]);
        let advisor = Advisor::from_api(chat.clone());

        let err = advisor.fuel_tips(FuelKind::Gasoline, "  ").await.unwrap_err();
        assert_eq!(err.kind(), "missing_efficiency");
        assert!(chat.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn service_failures_surface_as_errors() {
        let chat = ScriptedChat::new(vec![Err(AppError::Malformed(
            "chat completion",
            "response carried no content".into(),
        ))]);
        let advisor = Advisor::from_api(chat);

        let err = advisor.fuel_tips(FuelKind::Gasoline, "25").await.unwrap_err();
        assert_eq!(err.kind(), "transient");
    }
}
