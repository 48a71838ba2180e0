use argh::FromArgs;
use std::{path::PathBuf, sync::Arc};
use virtual_tryon::{
    ClientConfig, ImageRole, Notification, NotificationLevel, Notifier, OpenAiPipeline, Platform,
    ProcessingState, ResultView, SelectedFile, ShareData, TryOnEngine, TryOnError,
};

#[derive(FromArgs)]
/// Virtual try-on client: sends a photo and a garment through the proxy and shows the result
struct ClientArgs {
    /// proxy base url, overrides TRYON_PROXY_URL
    #[argh(option)]
    proxy: Option<String>,

    /// command to execute: "generate" or "ping"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Generate(GenerateCommand),
    Ping(PingCommand),
}

#[derive(FromArgs)]
/// Generate a try-on image from a subject photo and a garment photo
#[argh(subcommand, name = "generate")]
struct GenerateCommand {
    /// the photo of the person
    #[argh(option, short = 's')]
    subject: PathBuf,

    /// the photo of the clothing item
    #[argh(option, short = 'g')]
    garment: PathBuf,

    /// optional extra requirements, e.g. "formal styling"
    #[argh(option, short = 'p')]
    prompt: Option<String>,

    /// save the result into this directory
    #[argh(option, short = 'd')]
    download: Option<PathBuf>,

    /// copy the result url to the clipboard
    #[argh(switch)]
    share: bool,
}

#[derive(FromArgs)]
/// Check that the proxy is reachable
#[argh(subcommand, name = "ping")]
struct PingCommand {}

/// Prints notifications to stderr.
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => eprintln!("✔ {}", notification.message),
            NotificationLevel::Error => eprintln!("✖ {}", notification.message),
        }
    }
}

/// A terminal has no share sheet; sharing goes through the clipboard.
struct TerminalPlatform {
    http: reqwest::Client,
    out_dir: PathBuf,
}

impl Platform for TerminalPlatform {
    fn can_share(&self) -> bool {
        false
    }

    async fn share(&self, _data: &ShareData) -> Result<(), TryOnError> {
        Err(TryOnError::ShareUnsupportedOrDenied(
            "no native share in a terminal".to_string(),
        ))
    }

    async fn copy_to_clipboard(&self, text: &str) -> Result<(), TryOnError> {
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| TryOnError::ShareUnsupportedOrDenied(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| TryOnError::ShareUnsupportedOrDenied(e.to_string()))
    }

    async fn save_url(&self, url: &str, file_name: &str) -> Result<(), TryOnError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TryOnError::DownloadFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TryOnError::DownloadFailed(format!(
                "server answered {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TryOnError::DownloadFailed(e.to_string()))?;

        let path = self.out_dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        println!("Saved: {}", path.display());
        Ok(())
    }
}

fn render(view: &ResultView) {
    match view {
        ResultView::Placeholder => println!("Your result will appear here"),
        ResultView::Processing => {
            println!("Processing your virtual try-on...");
            println!("This may take a few moments");
        }
        ResultView::Result { image_url } => println!("Result: {image_url}"),
    }
}

async fn generate(
    http: reqwest::Client,
    config: &ClientConfig,
    command: GenerateCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = OpenAiPipeline::from_config(http.clone(), config);
    let mut engine = TryOnEngine::new(pipeline, Arc::new(ConsoleNotifier));

    engine.select_image(ImageRole::Subject, SelectedFile::from_path(&command.subject)?)?;
    engine.select_image(ImageRole::Garment, SelectedFile::from_path(&command.garment)?)?;
    if let Some(prompt) = command.prompt {
        engine.set_custom_prompt(prompt);
    }

    engine.submit()?;
    render(&engine.view());

    let state = engine.wait().await;
    log::info!("Generation finished: {}", state.as_str());
    render(&state.view());
    if let ProcessingState::Failed(err) = state {
        return Err(err.into());
    }

    let platform = TerminalPlatform {
        http,
        out_dir: command.download.clone().unwrap_or_default(),
    };
    if command.download.is_some() {
        engine.download(&platform).await?;
    }
    if command.share {
        engine.share(&platform).await?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ClientArgs = argh::from_env();

    let mut config = ClientConfig::from_env();
    if let Some(proxy) = args.proxy {
        config = config.with_proxy_url(proxy);
    }

    let http = reqwest::Client::new();

    match args.command {
        ClientCommands::Generate(command) => generate(http, &config, command).await?,
        ClientCommands::Ping(_) => {
            let response = http.get(config.endpoint("/")).send().await?;
            println!("{}: {}", response.status(), response.text().await?);
        }
    }

    Ok(())
}
