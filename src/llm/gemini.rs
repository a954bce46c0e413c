use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRole};
use crate::error::{DashboardError, Result};

#[derive(Serialize)]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiMessage>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<GeminiPart>>,
}

fn build_request(system: &str, history: &[ChatMessage]) -> GeminiRequest {
    GeminiRequest {
        system_instruction: GeminiContent {
            parts: vec![GeminiPart { text: system.to_string() }],
        },
        contents: history
            .iter()
            .map(|m| GeminiMessage {
                role: match m.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Model => "model".to_string(),
                },
                parts: vec![GeminiPart { text: m.text.clone() }],
            })
            .collect(),
        generation_config: GenerationConfig {
            temperature: 0.7,
            max_output_tokens: 2000,
        },
    }
}

fn extract_text(body: &serde_json::Value) -> Result<String> {
    let data: GeminiResponse = serde_json::from_value(body.clone())
        .map_err(|e| DashboardError::Chat(format!("Failed to parse Gemini response: {}", e)))?;

    let text = data
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.is_empty() {
        return Err(DashboardError::Chat("Gemini returned empty response".to_string()));
    }
    Ok(text)
}

/// Generate the next model turn with the Gemini REST API
pub async fn generate(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    system: &str,
    history: &[ChatMessage],
) -> Result<String> {
    let url = format!(
        "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
        model, api_key
    );

    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&build_request(system, history))
        .send()
        .await
        .map_err(|e| DashboardError::Chat(format!("Gemini request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let excerpt: String = body.chars().take(300).collect();
        return Err(DashboardError::Chat(format!("Gemini API error ({}): {}", status, excerpt)));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| DashboardError::Chat(format!("Failed to parse Gemini response: {}", e)))?;
    extract_text(&body)
}
