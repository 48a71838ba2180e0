use crate::{
    error::TryOnError,
    pipeline::{DescribeStage, GenerateStage, GenerationRequest, GenerationResult, TryOnPipeline},
    present::{self, Notification, Notifier, Platform, ResultView, ShareOutcome},
    upload::{ImageRole, SelectedFile, UploadSlots, UploadedImage},
};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Instant,
};
use tokio::task::JoinHandle;

/// Where the engine is in its generate cycle. Each variant carries its own payload,
/// so a result can never coexist with a running generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessingState {
    /// Nothing has been generated yet, or the last generation was cancelled.
    Idle,
    /// A generation is running.
    InFlight,
    /// The last generation produced an image.
    Succeeded(GenerationResult),
    /// The last generation failed.
    Failed(TryOnError),
}

impl ProcessingState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Idle => "idle",
            ProcessingState::InFlight => "in_flight",
            ProcessingState::Succeeded(_) => "succeeded",
            ProcessingState::Failed(_) => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, ProcessingState::InFlight)
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            ProcessingState::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn view(&self) -> ResultView {
        match self {
            ProcessingState::Idle | ProcessingState::Failed(_) => ResultView::Placeholder,
            ProcessingState::InFlight => ResultView::Processing,
            ProcessingState::Succeeded(result) => ResultView::Result {
                image_url: result.image_url.clone(),
            },
        }
    }
}

/// The state plus the id of the generation allowed to write it. `submit`, `cancel`
/// and `Drop` bump the id, so an older task finishing late finds itself stale.
#[derive(Debug)]
struct Tracked {
    generation: u64,
    state: ProcessingState,
}

fn lock(tracked: &Mutex<Tracked>) -> MutexGuard<'_, Tracked> {
    tracked.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The try-on component: two upload slots, an optional custom prompt and at most
/// one generation running on the tokio runtime.
///
/// The generation task belongs to the engine. [`TryOnEngine::cancel`] and dropping
/// the engine abort it, so a late completion never writes into a stale state.
pub struct TryOnEngine<D, G>
where
    D: DescribeStage + 'static,
    G: GenerateStage + 'static,
{
    pipeline: Arc<TryOnPipeline<D, G>>,
    notifier: Arc<dyn Notifier>,
    uploads: UploadSlots,
    custom_prompt: String,
    tracked: Arc<Mutex<Tracked>>,
    generation: Option<JoinHandle<()>>,
}

impl<D, G> TryOnEngine<D, G>
where
    D: DescribeStage + 'static,
    G: GenerateStage + 'static,
{
    pub fn new(pipeline: TryOnPipeline<D, G>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            notifier,
            uploads: UploadSlots::new(),
            custom_prompt: String::new(),
            tracked: Arc::new(Mutex::new(Tracked {
                generation: 0,
                state: ProcessingState::Idle,
            })),
            generation: None,
        }
    }

    pub fn pipeline(&self) -> &TryOnPipeline<D, G> {
        &self.pipeline
    }

    /// Returns the current state of the engine.
    pub fn state(&self) -> ProcessingState {
        lock(&self.tracked).state.clone()
    }

    pub fn view(&self) -> ResultView {
        lock(&self.tracked).state.view()
    }

    pub fn image(&self, role: ImageRole) -> Option<&UploadedImage> {
        self.uploads.get(role)
    }

    /// Data URL of the image in `role`, for rendering a preview.
    pub fn preview(&self, role: ImageRole) -> Option<&str> {
        self.uploads.get(role).map(|image| image.preview_url.as_str())
    }

    pub fn custom_prompt(&self) -> &str {
        &self.custom_prompt
    }

    pub fn set_custom_prompt(&mut self, prompt: impl Into<String>) {
        self.custom_prompt = prompt.into();
    }

    /// Validates `file` and stores it in `role`, replacing any previous image.
    /// A rejected file leaves the slot untouched.
    pub fn select_image(&mut self, role: ImageRole, file: SelectedFile) -> Result<(), TryOnError> {
        let name = file.name.clone();
        match UploadedImage::from_file(file) {
            Ok(image) => {
                log::debug!("Selected {role} image {name} ({} bytes)", image.size_bytes());
                self.uploads.set(role, image);
                Ok(())
            }
            Err(err) => {
                log::warn!("Rejected {role} image {name}: {err}");
                self.notifier.notify(Notification::from_error(&err));
                Err(err)
            }
        }
    }

    pub fn remove_image(&mut self, role: ImageRole) {
        self.uploads.clear(role);
    }

    /// Both images present and nothing running.
    pub fn can_submit(&self) -> bool {
        self.uploads.both().is_some() && !lock(&self.tracked).state.is_in_flight()
    }

    /// Starts a generation in the background. Must be called from within a tokio runtime.
    ///
    /// Fails without touching the network when an image is missing, and without any
    /// effect when a generation is already running.
    pub fn submit(&mut self) -> Result<(), TryOnError> {
        let mut tracked = lock(&self.tracked);
        if tracked.state.is_in_flight() {
            log::debug!("Engine is still processing");
            return Err(TryOnError::AlreadyInFlight);
        }

        let Some((subject, garment)) = self.uploads.both() else {
            drop(tracked);
            let err = TryOnError::MissingInput;
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        };

        let request = GenerationRequest {
            subject: subject.clone(),
            garment: garment.clone(),
            custom_prompt: Some(self.custom_prompt.trim())
                .filter(|prompt| !prompt.is_empty())
                .map(str::to_string),
        };

        tracked.generation += 1;
        tracked.state = ProcessingState::InFlight;
        let id = tracked.generation;
        drop(tracked);

        // a finished task's handle is all that can be left here
        if let Some(previous) = self.generation.take() {
            previous.abort();
        }

        let pipeline = Arc::clone(&self.pipeline);
        let notifier = Arc::clone(&self.notifier);
        let tracked = Arc::clone(&self.tracked);

        self.generation = Some(tokio::spawn(async move {
            let start_time = Instant::now();
            let outcome = pipeline.run(&request).await;

            // notify under the lock so a cancel cannot slip in between
            let mut tracked = lock(&tracked);
            if tracked.generation != id {
                log::debug!("Discarding outcome of superseded generation {id}");
                return;
            }
            tracked.state = match outcome {
                Ok(result) => {
                    log::info!(
                        "Generation completed in {:?}: {}",
                        start_time.elapsed(),
                        result.image_url
                    );
                    notifier.notify(Notification::success("Virtual try-on completed! 🎉"));
                    ProcessingState::Succeeded(result)
                }
                Err(err) => {
                    match err.stage() {
                        Some(stage) => log::error!("Virtual try-on failed at {stage} stage: {err}"),
                        None => log::error!("Error processing virtual try-on: {err}"),
                    }
                    notifier.notify(Notification::from_error(&err));
                    ProcessingState::Failed(err)
                }
            };
        }));

        log::info!("Scheduled generation successfully");
        Ok(())
    }

    /// Waits for the running generation, if any, and returns the state it left behind.
    pub async fn wait(&mut self) -> ProcessingState {
        if let Some(handle) = self.generation.take() {
            if let Err(e) = handle.await {
                log::error!("Generation task failed: {e}");
                let mut tracked = lock(&self.tracked);
                if tracked.state.is_in_flight() {
                    tracked.state = ProcessingState::Failed(TryOnError::Interrupted);
                }
            }
        }
        self.state()
    }

    /// Aborts the running generation and goes back to idle.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.generation.take() {
            handle.abort();
            let mut tracked = lock(&self.tracked);
            tracked.generation += 1;
            if tracked.state.is_in_flight() {
                log::info!("Generation cancelled");
                tracked.state = ProcessingState::Idle;
            }
        }
    }

    fn result_url(&self) -> Result<String, TryOnError> {
        lock(&self.tracked)
            .state
            .result()
            .map(|result| result.image_url.clone())
            .ok_or(TryOnError::NoResult)
    }

    /// Saves the current result through the platform.
    pub async fn download<P: Platform>(&self, platform: &P) -> Result<(), TryOnError> {
        let url = self.result_url()?;
        present::download_result(platform, self.notifier.as_ref(), &url).await
    }

    /// Shares the current result through the platform.
    pub async fn share<P: Platform>(&self, platform: &P) -> Result<ShareOutcome, TryOnError> {
        let url = self.result_url()?;
        present::share_result(platform, self.notifier.as_ref(), &url).await
    }
}

impl<D, G> Drop for TryOnEngine<D, G>
where
    D: DescribeStage + 'static,
    G: GenerateStage + 'static,
{
    fn drop(&mut self) {
        if let Some(handle) = self.generation.take() {
            handle.abort();
            lock(&self.tracked).generation += 1;
        }
    }
}
