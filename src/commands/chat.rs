use sqlx::SqlitePool;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::config::Config;
use crate::error::{DashboardError, Result};
use crate::llm::{self, ChatBackend, ChatMessage, ChatSession, HostedModel, LLMProviderType, LLMSettings};

/// Chat session for the configured provider (config, then `llm_*` overrides).
pub async fn open_session(pool: &SqlitePool, config: &Config) -> Result<ChatSession<HostedModel>> {
    let settings = llm::load_settings(pool, config).await?;
    info!("Chat provider: {}", settings.provider.as_str());
    Ok(ChatSession::new(HostedModel::new(settings)))
}

/// Fields of a `settings` change. The model and key apply to the provider
/// that is active after the change.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
}

/// Merge `update` into the stored provider settings and write them back.
pub async fn update_settings(pool: &SqlitePool, config: &Config, update: SettingsUpdate) -> Result<LLMSettings> {
    let mut settings = llm::load_settings(pool, config).await?;

    if let Some(name) = update.provider.as_deref() {
        settings.provider = match name.trim().to_lowercase().as_str() {
            "gemini" => LLMProviderType::Gemini,
            "openai" => LLMProviderType::OpenAI,
            other => return Err(DashboardError::InvalidInput(format!("unknown provider '{}'", other))),
        };
    }

    let (model, key) = match settings.provider {
        LLMProviderType::Gemini => (&mut settings.gemini_model, &mut settings.gemini_api_key),
        LLMProviderType::OpenAI => (&mut settings.openai_model, &mut settings.openai_api_key),
    };
    if let Some(m) = update.model.filter(|m| !m.trim().is_empty()) {
        *model = m;
    }
    if let Some(k) = update.api_key {
        *key = if k.trim().is_empty() { None } else { Some(k) };
    }

    llm::save_settings(pool, &settings).await?;
    info!("Saved chat settings (provider: {})", settings.provider.as_str());
    Ok(settings)
}

/// One user turn; returns the reply text, or nothing for blank input.
pub async fn ask<B: ChatBackend>(session: &mut ChatSession<B>, text: &str) -> Option<String> {
    session.send(text).await.map(|m: &ChatMessage| m.text.clone())
}

/// Read lines from stdin until EOF or `exit`.
pub async fn interactive<B: ChatBackend>(session: &mut ChatSession<B>) -> Result<()> {
    if let Some(greeting) = session.messages().first() {
        println!("AI> {}", greeting.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| DashboardError::Chat(format!("stdin: {}", e)))?
    {
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }
        if let Some(reply) = ask(session, &line).await {
            println!("AI> {}", reply);
        }
    }
    Ok(())
}
