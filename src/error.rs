use std::fmt;

/// The two upstream calls a generation is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Multimodal chat call that describes the desired composite.
    Describe,
    /// Image generation call driven by the description.
    Generate,
}

impl Stage {
    /// Returns the stage as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Describe => "describe",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can go wrong between picking a file and sharing the result.
///
/// The error is `Clone` so a failed generation can keep it inside
/// [`crate::ProcessingState::Failed`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TryOnError {
    #[error("unsupported media type `{0}`, expected an image")]
    InvalidFileType(String),

    #[error("image is {size} bytes, the limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("both the subject and the garment image are required")]
    MissingInput,

    #[error("a generation is already in flight")]
    AlreadyInFlight,

    #[error("{stage} request failed with status {status}")]
    UpstreamRequestFailed { stage: Stage, status: u16 },

    #[error("{stage} request could not be sent: {message}")]
    Transport { stage: Stage, message: String },

    #[error("{stage} response could not be decoded: {message}")]
    Decode { stage: Stage, message: String },

    #[error("image generation response contained no image url")]
    MissingGeneratedImage,

    #[error("generation task stopped before completing")]
    Interrupted,

    #[error("there is no result yet")]
    NoResult,

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("share failed: {0}")]
    ShareUnsupportedOrDenied(String),

    #[error("missing credential, set the {0} environment variable")]
    MissingCredential(&'static str),

    #[error("io error: {0}")]
    Io(String),
}

impl TryOnError {
    /// Short message shown to the user for this error.
    ///
    /// Everything that happens after submission collapses into one generic
    /// message; developer detail goes to the log instead.
    pub fn user_message(&self) -> &'static str {
        match self {
            TryOnError::InvalidFileType(_) => "Please upload a valid image file (JPEG, PNG, WebP)",
            TryOnError::FileTooLarge { .. } => "Image size should be less than 10MB",
            TryOnError::MissingInput => "Please upload both person and clothing images",
            TryOnError::AlreadyInFlight => "A try-on is already being processed",
            TryOnError::NoResult => "There is no result yet",
            TryOnError::DownloadFailed(_) => "Failed to download image",
            TryOnError::ShareUnsupportedOrDenied(_) => "Failed to share image",
            TryOnError::MissingCredential(_) | TryOnError::Io(_) => "Something went wrong",
            TryOnError::UpstreamRequestFailed { .. }
            | TryOnError::Transport { .. }
            | TryOnError::Decode { .. }
            | TryOnError::MissingGeneratedImage
            | TryOnError::Interrupted => "Failed to process virtual try-on. Please try again.",
        }
    }

    /// The upstream stage this error is attributed to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            TryOnError::UpstreamRequestFailed { stage, .. }
            | TryOnError::Transport { stage, .. }
            | TryOnError::Decode { stage, .. } => Some(*stage),
            TryOnError::MissingGeneratedImage => Some(Stage::Generate),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TryOnError {
    fn from(err: std::io::Error) -> Self {
        TryOnError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_failures_share_one_user_message() {
        let errors = [
            TryOnError::UpstreamRequestFailed {
                stage: Stage::Describe,
                status: 500,
            },
            TryOnError::Transport {
                stage: Stage::Generate,
                message: "connection refused".to_string(),
            },
            TryOnError::MissingGeneratedImage,
        ];
        for err in errors {
            assert_eq!(
                err.user_message(),
                "Failed to process virtual try-on. Please try again."
            );
        }
    }

    #[test]
    fn failures_keep_their_stage() {
        let err = TryOnError::UpstreamRequestFailed {
            stage: Stage::Generate,
            status: 429,
        };
        assert_eq!(err.stage(), Some(Stage::Generate));
        assert_eq!(err.to_string(), "generate request failed with status 429");
        assert_eq!(TryOnError::MissingInput.stage(), None);
    }
}
