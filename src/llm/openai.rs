use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatRole};
use crate::error::{DashboardError, Result};

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

fn build_request(model: &str, system: &str, history: &[ChatMessage]) -> OpenAIRequest {
    let mut messages = vec![Message {
        role: "system".to_string(),
        content: system.to_string(),
    }];
    messages.extend(history.iter().map(|m| Message {
        role: match m.role {
            ChatRole::User => "user".to_string(),
            ChatRole::Model => "assistant".to_string(),
        },
        content: m.text.clone(),
    }));

    OpenAIRequest {
        model: model.to_string(),
        messages,
        temperature: 0.7,
        max_tokens: 2000,
    }
}

/// Generate the next model turn using the OpenAI chat completions API
pub async fn generate(
    client: &reqwest::Client,
    api_key: &str,
    model: &str,
    system: &str,
    history: &[ChatMessage],
) -> Result<String> {
    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&build_request(model, system, history))
        .send()
        .await
        .map_err(|e| DashboardError::Chat(format!("OpenAI request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(DashboardError::Chat(format!("OpenAI API error ({}): {}", status, body)));
    }

    let result: OpenAIResponse = response
        .json()
        .await
        .map_err(|e| DashboardError::Chat(format!("Failed to parse OpenAI response: {}", e)))?;

    result.choices
        .first()
        .map(|c| c.message.content.clone())
        .ok_or_else(|| DashboardError::Chat("No response from OpenAI".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_leads() {
        let history = vec![ChatMessage::user("Explain MVRV")];
        let req = build_request("gpt-4o-mini", "tutor", &history);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert_eq!(req.messages[1].role, "user");
        assert_eq!(req.messages[1].content, "Explain MVRV");
    }

    #[test]
    fn test_model_turns_become_assistant() {
        let history = vec![ChatMessage::model("hi"), ChatMessage::user("q")];
        let req = build_request("m", "s", &history);
        assert_eq!(req.messages[1].role, "assistant");
    }
}
