//! Virtual try-on client.
//!
//! A user picks a photo of themselves and a photo of a garment; [`TryOnEngine`]
//! validates both, runs a two-stage [`TryOnPipeline`] (describe the composite with a
//! multimodal chat model, then generate an image from that description) and exposes
//! the outcome as a single [`ProcessingState`].
//!
//! The upstream bearer token never reaches the client. The OpenAI-format stages in
//! [`openai`] talk to the [`proxy`], which holds the token and forwards the calls.

pub mod config;
pub mod engine;
pub mod error;
pub mod messages;
pub mod openai;
pub mod pipeline;
pub mod present;
pub mod prompt;
pub mod proxy;
pub mod upload;

pub use config::{ApiKey, ClientConfig, ProxyConfig};
pub use engine::{ProcessingState, TryOnEngine};
pub use error::{Stage, TryOnError};
pub use openai::{ChatDescriber, ImageGenerator, OpenAiPipeline};
pub use pipeline::{
    DescribeRequest, DescribeStage, Description, EncodedImage, GenerateRequest, GenerateStage,
    GeneratedImage, GenerationRequest, GenerationResult, TryOnPipeline,
};
pub use present::{
    Notification, NotificationLevel, Notifier, Platform, RecordingNotifier, ResultView,
    ShareData, ShareOutcome,
};
pub use upload::{ImageRole, MAX_IMAGE_BYTES, SelectedFile, UploadSlots, UploadedImage};
