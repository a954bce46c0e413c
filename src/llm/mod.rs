pub mod gemini;
pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LLMProviderType {
    #[default]
    Gemini,
    OpenAI,
}

impl LLMProviderType {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "openai" => LLMProviderType::OpenAI,
            _ => LLMProviderType::Gemini,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LLMProviderType::Gemini => "gemini",
            LLMProviderType::OpenAI => "openai",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LLMSettings {
    pub provider: LLMProviderType,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
}

impl LLMSettings {
    pub fn from_config(config: &Config) -> Self {
        LLMSettings {
            provider: LLMProviderType::parse(&config.llm_provider),
            gemini_api_key: config.gemini_api_key.clone(),
            gemini_model: config.gemini_model.clone(),
            openai_api_key: config.openai_api_key.clone(),
            openai_model: config.openai_model.clone(),
        }
    }

    /// Apply `llm_*` overrides from the settings table.
    pub fn apply_overrides(&mut self, pairs: &[(String, String)]) {
        for (key, value) in pairs {
            let non_empty = if value.is_empty() { None } else { Some(value.clone()) };
            match key.as_str() {
                "llm_provider" => self.provider = LLMProviderType::parse(value),
                "llm_gemini_key" => self.gemini_api_key = non_empty,
                "llm_gemini_model" if !value.is_empty() => self.gemini_model = value.clone(),
                "llm_openai_key" => self.openai_api_key = non_empty,
                "llm_openai_model" if !value.is_empty() => self.openai_model = value.clone(),
                _ => {}
            }
        }
    }
}

/// Load LLM settings: config defaults, then database overrides
pub async fn load_settings(pool: &SqlitePool, config: &Config) -> Result<LLMSettings> {
    let mut settings = LLMSettings::from_config(config);
    let pairs = db::get_settings_with_prefix(pool, "llm_").await?;
    settings.apply_overrides(&pairs);
    Ok(settings)
}

/// Save LLM settings to database
pub async fn save_settings(pool: &SqlitePool, settings: &LLMSettings) -> Result<()> {
    let pairs = [
        ("llm_provider", settings.provider.as_str().to_string()),
        ("llm_gemini_key", settings.gemini_api_key.clone().unwrap_or_default()),
        ("llm_gemini_model", settings.gemini_model.clone()),
        ("llm_openai_key", settings.openai_api_key.clone().unwrap_or_default()),
        ("llm_openai_model", settings.openai_model.clone()),
    ];
    for (key, value) in pairs {
        db::save_setting(pool, key, &value).await?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        ChatMessage { role: ChatRole::User, text: text.to_string() }
    }

    pub fn model(text: &str) -> Self {
        ChatMessage { role: ChatRole::Model, text: text.to_string() }
    }
}

/// Hosted language model behind the chat widget.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, system: &str, history: &[ChatMessage]) -> Result<String>;
}

pub struct HostedModel {
    settings: LLMSettings,
    client: reqwest::Client,
}

impl HostedModel {
    pub fn new(settings: LLMSettings) -> Self {
        Self { settings, client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ChatBackend for HostedModel {
    async fn reply(&self, system: &str, history: &[ChatMessage]) -> Result<String> {
        match self.settings.provider {
            LLMProviderType::Gemini => {
                let key = self.settings.gemini_api_key.as_deref()
                    .ok_or_else(|| DashboardError::Chat("Gemini API Key not configured".to_string()))?;
                gemini::generate(&self.client, key, &self.settings.gemini_model, system, history).await
            }
            LLMProviderType::OpenAI => {
                let key = self.settings.openai_api_key.as_deref()
                    .ok_or_else(|| DashboardError::Chat("OpenAI API Key not configured".to_string()))?;
                openai::generate(&self.client, key, &self.settings.openai_model, system, history).await
            }
        }
    }
}

/// Conversation state of the chat widget. Provider failures never escape:
/// they show up as an apology turn.
pub struct ChatSession<B: ChatBackend> {
    backend: B,
    messages: Vec<ChatMessage>,
}

impl<B: ChatBackend> ChatSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            messages: vec![ChatMessage::model(prompt::GREETING)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Send one user turn. Blank input is ignored and returns `None`.
    pub async fn send(&mut self, input: &str) -> Option<&ChatMessage> {
        if input.trim().is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::user(input));

        // The greeting is local; the provider only sees the conversation
        let history: Vec<ChatMessage> = self.messages.iter().skip(1).cloned().collect();
        let reply = match self.backend.reply(prompt::SYSTEM_INSTRUCTION, &history).await {
            Ok(text) => {
                info!("Chat reply received ({} chars)", text.len());
                ChatMessage::model(&text)
            }
            Err(e) => {
                warn!("Chat provider error: {}", e);
                ChatMessage::model(prompt::APOLOGY)
            }
        };
        self.messages.push(reply);
        self.messages.last()
    }
}
