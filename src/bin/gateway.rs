//! LineAgent Gateway - LINE webhook server
//!
//! Verifies LINE webhook signatures, routes text messages to an agent and
//! replies through the Messaging API.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lineagent::agent::{AgentCatalog, AgentRunner, ModelClient, Router, SessionStore, Toolkit};
use lineagent::config::{apply_env_overrides, load_config, load_config_from_path, validate_config};
use lineagent::gateway::{build_router, AppState, Dispatcher};
use lineagent::line::{LineClient, SignatureVerifier};
use lineagent::market::{CachedMarketData, YahooChart};
use lineagent::tools::{ArxivClient, WebSearchTool};
use lineagent::Config;

#[derive(Parser)]
#[command(name = "lineagent-gateway", version, about = "LINE webhook bot backed by tool-calling agents")]
struct Args {
    /// Config file (TOML or JSON5); defaults to LINEAGENT_CONFIG or the user config dir
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on, overriding config and PORT
    #[arg(long, short)]
    port: Option<u16>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,lineagent=debug"));

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load(args: &Args) -> anyhow::Result<Config> {
    let mut config = match args.config {
        Some(ref path) => {
            let mut config = load_config_from_path(path)?;
            apply_env_overrides(&mut config);
            config
        }
        None => load_config()?,
    };

    if let Some(port) = args.port {
        config.gateway.port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    info!("Starting LineAgent Gateway v{}", lineagent::VERSION);

    let config = load(&args)?;

    let validation = validate_config(&config);
    for issue in &validation.warnings {
        warn!("Config warning: {}", issue);
    }
    for issue in &validation.errors {
        error!("Config error: {}", issue);
    }
    if args.check {
        if validation.valid {
            info!("Configuration is valid");
            return Ok(());
        }
        anyhow::bail!("configuration has {} error(s)", validation.errors.len());
    }
    if !validation.valid {
        anyhow::bail!("refusing to start with an invalid configuration");
    }

    // Clients
    let model = Arc::new(ModelClient::new(&config.provider).context("building model client")?);
    let market = Arc::new(CachedMarketData::new(
        Arc::new(YahooChart::new(&config.market).context("building market data client")?),
        config.market.cache_ttl,
    ));
    let messenger = Arc::new(LineClient::new(&config.line).context("building LINE client")?);

    let toolkit = Toolkit {
        market,
        arxiv: ArxivClient::new()?,
        web_search: Arc::new(WebSearchTool::new()?),
    };
    let agents = AgentCatalog::build(&config, &toolkit)?;
    info!(
        "Initialized {} agents with model {}, default agent: {}",
        agents.len(),
        config.provider.model_id(),
        config.agent.default
    );

    let sessions = Arc::new(SessionStore::new(config.agent.history_limit, config.agent.session_ttl));
    let runtime = Arc::new(AgentRunner::new(model, agents, sessions, &config.agent));

    let state = Arc::new(AppState {
        verifier: SignatureVerifier::new(config.line.channel_secret.clone()),
        dispatcher: Dispatcher::new(runtime, messenger, Router::new(config.agent.default), config.agent.timeout),
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .context("invalid bind address")?;
    info!("Webhook server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
