//! Stage implementations speaking the OpenAI wire format, addressed at the proxy.

use crate::{
    config::ClientConfig,
    error::{Stage, TryOnError},
    messages::{
        CHAT_COMPLETIONS_PATH, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
        ContentPart, IMAGE_GENERATIONS_PATH, ImageGenerationRequest, ImageGenerationResponse,
        ImageUrl,
    },
    pipeline::{
        DescribeRequest, DescribeStage, Description, GenerateRequest, GenerateStage,
        GeneratedImage, TryOnPipeline,
    },
};
use serde::{Serialize, de::DeserializeOwned};

/// Pipeline made of the two OpenAI-format stages.
pub type OpenAiPipeline = TryOnPipeline<ChatDescriber, ImageGenerator>;

impl OpenAiPipeline {
    pub fn from_config(client: reqwest::Client, config: &ClientConfig) -> Self {
        TryOnPipeline::new(
            ChatDescriber::new(client.clone(), config),
            ImageGenerator::new(client, config),
        )
    }
}

async fn post_json<Req, Res>(
    client: &reqwest::Client,
    url: &str,
    body: &Req,
    stage: Stage,
) -> Result<Res, TryOnError>
where
    Req: Serialize + ?Sized,
    Res: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| TryOnError::Transport {
            stage,
            message: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        log::warn!("{stage} request to {url} returned {status}");
        return Err(TryOnError::UpstreamRequestFailed {
            stage,
            status: status.as_u16(),
        });
    }

    response.json::<Res>().await.map_err(|e| TryOnError::Decode {
        stage,
        message: e.to_string(),
    })
}

/// Describe stage backed by a chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct ChatDescriber {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl ChatDescriber {
    pub fn new(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(CHAT_COMPLETIONS_PATH),
            model: config.chat_model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    pub fn build_request(&self, request: &DescribeRequest) -> ChatCompletionRequest {
        let image_part = |url: String| ContentPart::ImageUrl {
            image_url: ImageUrl { url },
        };
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: request.instruction.clone(),
                    },
                    image_part(request.subject.data_url()),
                    image_part(request.garment.data_url()),
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }
}

impl DescribeStage for ChatDescriber {
    async fn describe(&self, request: &DescribeRequest) -> Result<Description, TryOnError> {
        let body = self.build_request(request);
        let response: ChatCompletionResponse =
            post_json(&self.client, &self.endpoint, &body, Stage::Describe).await?;
        Ok(Description {
            text: response.first_content().map(str::to_string),
        })
    }
}

/// Generate stage backed by an image-generations endpoint. Always asks for one image.
#[derive(Clone, Debug)]
pub struct ImageGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    size: String,
    quality: String,
}

impl ImageGenerator {
    pub fn new(client: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint(IMAGE_GENERATIONS_PATH),
            model: config.image_model.clone(),
            size: config.image_size.clone(),
            quality: config.image_quality.clone(),
        }
    }

    pub fn build_request(&self, request: &GenerateRequest) -> ImageGenerationRequest {
        ImageGenerationRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            size: self.size.clone(),
            quality: self.quality.clone(),
            n: 1,
        }
    }
}

impl GenerateStage for ImageGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedImage, TryOnError> {
        let body = self.build_request(request);
        let response: ImageGenerationResponse =
            post_json(&self.client, &self.endpoint, &body, Stage::Generate).await?;
        let url = response
            .first_url()
            .ok_or(TryOnError::MissingGeneratedImage)?;
        Ok(GeneratedImage {
            url: url.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EncodedImage;
    use serde_json::json;

    #[test]
    fn chat_request_inlines_both_images_after_the_text() {
        let describer = ChatDescriber::new(reqwest::Client::new(), &ClientConfig::default());
        let body = describer.build_request(&DescribeRequest {
            instruction: "dress them".to_string(),
            subject: EncodedImage {
                mime_type: "image/jpeg".to_string(),
                base64: "AAA".to_string(),
            },
            garment: EncodedImage {
                mime_type: "image/png".to_string(),
                base64: "BBB".to_string(),
            },
        });

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "gpt-4o",
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": "dress them" },
                        { "type": "image_url", "image_url": { "url": "data:image/jpeg;base64,AAA" } },
                        { "type": "image_url", "image_url": { "url": "data:image/png;base64,BBB" } }
                    ]
                }],
                "max_tokens": 1000
            })
        );
        assert_eq!(describer.endpoint, "http://localhost:3000/v1/chat/completions");
    }

    #[test]
    fn image_request_asks_for_one_hd_square() {
        let generator = ImageGenerator::new(reqwest::Client::new(), &ClientConfig::default());
        let body = generator.build_request(&GenerateRequest {
            prompt: "a photo".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "model": "dall-e-3",
                "prompt": "a photo",
                "size": "1024x1024",
                "quality": "hd",
                "n": 1
            })
        );
    }
}
