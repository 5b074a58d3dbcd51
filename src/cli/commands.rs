use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::AppConfig;
use crate::middleware::{from_fn, Middleware, MiddlewareOutcome, RequestIdMiddleware};
use crate::response::Reply;
use crate::router::{ActionMethod, Router};
use crate::server::ActionServer;
use crate::App;

/// Command-line interface for metime
#[derive(Parser)]
#[command(name = "metime")]
#[command(about = "Single entry point action dispatcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the demo application
    Serve {
        /// Configuration file (YAML, or TOML by extension)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address and port to bind the server to
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: String,
    },
    /// Load and validate a configuration file
    Check {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Load `path` (if given), apply environment overrides, and fall back to
/// `http://<addr>/` when no base URL is configured.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>, addr: &str) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let mut config = config.apply_env();
    if config.base_url.is_none() {
        config.base_url = Some(format!("http://{addr}/"));
    }
    Ok(config)
}

/// Two Markdown pages linking to each other.
pub fn demo_router() -> Router {
    let mut router = Router::new();
    let passthrough: Arc<dyn Middleware> =
        Arc::new(from_fn(|req, _res| Ok(MiddlewareOutcome::next(req))));

    router.register(
        ActionMethod::Get,
        "home",
        |req, _res| {
            let link = format!("{}?{}=hello", req.config().base_url(), req.config().action_key);
            Ok(Reply::markdown(format!(
                "# Home\n[Go to the hello page]({link})"
            )))
        },
        vec![passthrough],
    );
    router.get("hello", |req, _res| {
        let link = format!("{}?{}=home", req.config().base_url(), req.config().action_key);
        Ok(Reply::markdown(format!(
            "# Hello\n[Back to the home page]({link})"
        )))
    });
    router
}

/// Parse arguments and run the selected command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the server fails to
/// start.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve { config, addr } => {
            let config = load_config(config.as_deref(), &addr)?;
            config
                .validate()
                .context("invalid configuration")?;

            let mut app = App::from_config(config);
            app.add_middleware(RequestIdMiddleware)
                .add_router(demo_router());
            info!(base_url = %app.config().base_url(), addr = %addr, "Starting demo app");

            let handle = ActionServer::new(Arc::new(app)).start(addr.as_str())?;
            handle.join()?;
            Ok(())
        }
        Commands::Check { config } => {
            let loaded = AppConfig::load(&config)?.apply_env();
            loaded
                .validate()
                .with_context(|| format!("{} is invalid", config.display()))?;
            println!("{}: ok", config.display());
            println!("{}", serde_yaml::to_string(&loaded)?);
            Ok(())
        }
    }
}
