//! JSON bodies exchanged with the chat-completions and image-generation endpoints.

use serde::{Deserialize, Serialize};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const IMAGE_GENERATIONS_PATH: &str = "/v1/images/generations";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if there is one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
    pub n: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageGenerationResponse {
    #[serde(default)]
    pub data: Vec<GeneratedImageEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneratedImageEntry {
    #[serde(default)]
    pub url: Option<String>,
}

impl ImageGenerationResponse {
    /// Url of the first generated image, if there is one.
    pub fn first_url(&self) -> Option<&str> {
        self.data
            .first()?
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_parts_use_the_type_tag() {
        let parts = vec![
            ContentPart::Text {
                text: "hello".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,AA==".to_string(),
                },
            },
        ];
        assert_eq!(
            serde_json::to_value(&parts).unwrap(),
            json!([
                { "type": "text", "text": "hello" },
                { "type": "image_url", "image_url": { "url": "data:image/png;base64,AA==" } }
            ])
        );
    }

    #[test]
    fn chat_body_without_choices_is_rejected() {
        let decoded = serde_json::from_value::<ChatCompletionResponse>(json!({ "id": "x" }));
        assert!(decoded.is_err());
    }

    #[test]
    fn missing_fields_decode_to_empty() {
        let chat: ChatCompletionResponse =
            serde_json::from_value(json!({ "choices": [{ "message": {} }] })).unwrap();
        assert_eq!(chat.first_content(), None);

        let images: ImageGenerationResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(images.first_url(), None);

        let chat: ChatCompletionResponse =
            serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert_eq!(chat.first_content(), None);

        let images: ImageGenerationResponse =
            serde_json::from_value(json!({ "data": [{ "url": "" }] })).unwrap();
        assert_eq!(images.first_url(), None);
    }
}
