use crate::{
    error::TryOnError,
    prompt::{build_generation_prompt, build_instruction},
    upload::UploadedImage,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use std::future::Future;

/// Everything one generation needs, captured at submission time.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub subject: UploadedImage,
    pub garment: UploadedImage,
    pub custom_prompt: Option<String>,
}

/// Outcome of a successful generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResult {
    pub image_url: String,
}

/// An image ready to be inlined into a request: base64 payload without any data-URL prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub base64: String,
}

impl EncodedImage {
    pub fn encode(image: &UploadedImage) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            base64: BASE64.encode(&image.bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

impl std::fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("base64_len", &self.base64.len())
            .finish()
    }
}

/// Input of the describe stage.
#[derive(Clone, Debug)]
pub struct DescribeRequest {
    pub instruction: String,
    pub subject: EncodedImage,
    pub garment: EncodedImage,
}

/// Output of the describe stage. The text may be absent when the model returned no content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Description {
    pub text: Option<String>,
}

/// Input of the generate stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
}

/// Output of the generate stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
}

/// First stage: turn the instruction and both images into descriptive text.
pub trait DescribeStage: Send + Sync {
    fn describe(
        &self,
        request: &DescribeRequest,
    ) -> impl Future<Output = Result<Description, TryOnError>> + Send;
}

/// Second stage: generate one image from a text prompt.
pub trait GenerateStage: Send + Sync {
    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<GeneratedImage, TryOnError>> + Send;
}

/// The two stages chained: describe, then generate from the description.
pub struct TryOnPipeline<D, G> {
    describer: D,
    generator: G,
}

impl<D: DescribeStage, G: GenerateStage> TryOnPipeline<D, G> {
    pub fn new(describer: D, generator: G) -> Self {
        Self {
            describer,
            generator,
        }
    }

    pub fn describer(&self) -> &D {
        &self.describer
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Runs both stages in order. The generate stage only runs if describe succeeded.
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult, TryOnError> {
        let instruction = build_instruction(request.custom_prompt.as_deref());
        let describe_request = DescribeRequest {
            subject: EncodedImage::encode(&request.subject),
            garment: EncodedImage::encode(&request.garment),
            instruction: instruction.clone(),
        };

        log::debug!("Running describe stage");
        let description = self.describer.describe(&describe_request).await?;

        let generate_request = GenerateRequest {
            prompt: build_generation_prompt(description.text.as_deref(), &instruction),
        };

        log::debug!("Running generate stage");
        let image = self.generator.generate(&generate_request).await?;

        if image.url.is_empty() {
            return Err(TryOnError::MissingGeneratedImage);
        }

        Ok(GenerationResult {
            image_url: image.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Stage, upload::SelectedFile};
    use std::sync::Mutex;

    struct ScriptedDescriber {
        reply: Result<Description, TryOnError>,
        seen: Mutex<Vec<DescribeRequest>>,
    }

    impl DescribeStage for ScriptedDescriber {
        async fn describe(&self, request: &DescribeRequest) -> Result<Description, TryOnError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    struct ScriptedGenerator {
        reply: Result<GeneratedImage, TryOnError>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl GenerateStage for ScriptedGenerator {
        async fn generate(&self, request: &GenerateRequest) -> Result<GeneratedImage, TryOnError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn pipeline(
        describe: Result<Description, TryOnError>,
        generate: Result<GeneratedImage, TryOnError>,
    ) -> TryOnPipeline<ScriptedDescriber, ScriptedGenerator> {
        TryOnPipeline::new(
            ScriptedDescriber {
                reply: describe,
                seen: Mutex::default(),
            },
            ScriptedGenerator {
                reply: generate,
                seen: Mutex::default(),
            },
        )
    }

    fn request(custom_prompt: Option<&str>) -> GenerationRequest {
        let image = |name: &str, mime: &str, bytes: &[u8]| {
            UploadedImage::from_file(SelectedFile::new(name, mime, bytes.to_vec())).unwrap()
        };
        GenerationRequest {
            subject: image("subject.jpg", "image/jpeg", b"jpeg"),
            garment: image("shirt.png", "image/png", b"png"),
            custom_prompt: custom_prompt.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn chains_description_into_generation() {
        let pipeline = pipeline(
            Ok(Description {
                text: Some("A person in a red shirt.".to_string()),
            }),
            Ok(GeneratedImage {
                url: "https://cdn.example/out.png".to_string(),
            }),
        );

        let result = pipeline.run(&request(Some("formal styling"))).await.unwrap();
        assert_eq!(result.image_url, "https://cdn.example/out.png");

        let described = pipeline.describer().seen.lock().unwrap();
        assert_eq!(described.len(), 1);
        assert_eq!(described[0].subject.data_url(), "data:image/jpeg;base64,anBlZw==");
        assert_eq!(described[0].garment.base64, "cG5n");
        assert!(described[0].instruction.contains("Additional requirements: formal styling"));

        let generated = pipeline.generator().seen.lock().unwrap();
        assert_eq!(
            generated[0].prompt,
            "A realistic photo of a person wearing the clothing item. A person in a red shirt."
        );
    }

    #[tokio::test]
    async fn empty_description_falls_back_to_instruction() {
        let pipeline = pipeline(
            Ok(Description::default()),
            Ok(GeneratedImage {
                url: "https://cdn.example/out.png".to_string(),
            }),
        );
        pipeline.run(&request(None)).await.unwrap();

        let generated = pipeline.generator().seen.lock().unwrap();
        assert_eq!(
            generated[0].prompt,
            format!(
                "A realistic photo of a person wearing the clothing item. {}",
                build_instruction(None)
            )
        );
    }

    #[tokio::test]
    async fn describe_failure_skips_generation() {
        let failure = TryOnError::UpstreamRequestFailed {
            stage: Stage::Describe,
            status: 401,
        };
        let pipeline = pipeline(
            Err(failure.clone()),
            Ok(GeneratedImage {
                url: "unused".to_string(),
            }),
        );
        assert_eq!(pipeline.run(&request(None)).await.unwrap_err(), failure);
        assert!(pipeline.generator().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_url_is_missing_image() {
        let pipeline = pipeline(
            Ok(Description::default()),
            Ok(GeneratedImage { url: String::new() }),
        );
        assert_eq!(
            pipeline.run(&request(None)).await.unwrap_err(),
            TryOnError::MissingGeneratedImage
        );
    }
}
