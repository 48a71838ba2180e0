use argh::FromArgs;
use virtual_tryon::{ProxyConfig, proxy};

// defaults for the server
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Forwards try-on requests upstream, holding the API key read from OPENAI_API_KEY.
struct ProxyArgs {
    /// the host to run the server on
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to run the server on
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// upstream base url, overrides TRYON_UPSTREAM_URL
    #[argh(option, short = 'u')]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: ProxyArgs = argh::from_env();

    let mut config = ProxyConfig::from_env()?;
    if let Some(upstream) = args.upstream {
        config.upstream_url = upstream;
    }

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    log::info!("Starting the try-on proxy");
    log::info!("Forwarding to: {}", config.upstream_url);
    log::info!("Listening on: {}", addr);

    let app = proxy::router(proxy::ProxyState::new(reqwest::Client::new(), config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
