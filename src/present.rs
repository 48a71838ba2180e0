use crate::error::TryOnError;
use std::{future::Future, sync::Mutex};

/// File name used when saving a result.
pub const RESULT_FILE_NAME: &str = "virtual-tryon-result.png";
pub const SHARE_TITLE: &str = "My Virtual Try-On Result";
pub const SHARE_TEXT: &str = "Check out how this outfit looks on me!";

/// What the result region shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResultView {
    /// Nothing generated and nothing running.
    Placeholder,
    /// A generation is in flight; the submit action is disabled.
    Processing,
    /// The generated image, with download and share available.
    Result { image_url: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A short transient message for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }

    pub fn from_error(err: &TryOnError) -> Self {
        Self::error(err.user_message())
    }
}

/// Where notifications end up.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps every notification, oldest first.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notifications
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notification);
    }
}

/// Payload for a native share sheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShareData {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl ShareData {
    pub fn for_result(url: &str) -> Self {
        Self {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            url: url.to_string(),
        }
    }
}

/// Host capabilities used by the result actions.
pub trait Platform: Send + Sync {
    /// Whether a native share capability exists.
    fn can_share(&self) -> bool;

    fn share(&self, data: &ShareData) -> impl Future<Output = Result<(), TryOnError>> + Send;

    fn copy_to_clipboard(&self, text: &str) -> impl Future<Output = Result<(), TryOnError>> + Send;

    /// Saves the resource behind `url` under `file_name`.
    fn save_url(
        &self,
        url: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<(), TryOnError>> + Send;
}

/// How a share request was fulfilled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    CopiedToClipboard,
}

pub async fn download_result<P: Platform>(
    platform: &P,
    notifier: &dyn Notifier,
    image_url: &str,
) -> Result<(), TryOnError> {
    match platform.save_url(image_url, RESULT_FILE_NAME).await {
        Ok(()) => {
            notifier.notify(Notification::success("Image downloaded successfully!"));
            Ok(())
        }
        Err(err) => {
            log::error!("Error downloading result: {err}");
            let err = match err {
                TryOnError::DownloadFailed(_) => err,
                other => TryOnError::DownloadFailed(other.to_string()),
            };
            notifier.notify(Notification::from_error(&err));
            Err(err)
        }
    }
}

/// Native share when available, clipboard otherwise.
pub async fn share_result<P: Platform>(
    platform: &P,
    notifier: &dyn Notifier,
    image_url: &str,
) -> Result<ShareOutcome, TryOnError> {
    let outcome = if platform.can_share() {
        platform
            .share(&ShareData::for_result(image_url))
            .await
            .map(|()| ShareOutcome::Shared)
    } else {
        platform
            .copy_to_clipboard(image_url)
            .await
            .map(|()| ShareOutcome::CopiedToClipboard)
    };

    match outcome {
        Ok(ShareOutcome::Shared) => Ok(ShareOutcome::Shared),
        Ok(ShareOutcome::CopiedToClipboard) => {
            notifier.notify(Notification::success("Image URL copied to clipboard!"));
            Ok(ShareOutcome::CopiedToClipboard)
        }
        Err(err) => {
            log::error!("Error sharing: {err}");
            let err = match err {
                TryOnError::ShareUnsupportedOrDenied(_) => err,
                other => TryOnError::ShareUnsupportedOrDenied(other.to_string()),
            };
            notifier.notify(Notification::from_error(&err));
            Err(err)
        }
    }
}
