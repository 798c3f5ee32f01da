//! CLI entry point for the fsev event server.
//!
//! Watches a directory tree and logs every filesystem event it serves.
//! Useful on its own as a change monitor, and as the reference wiring for
//! programs that register their own handlers.
//!
//! # Usage
//!
//! ```bash
//! fsev ~/Downloads --ignore '**/partial/**' --max-depth 3
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fsev_core::ServerConfig;
use fsev_router::{apply, handler_fn, Handler, LoggingMiddleware};
use fsev_server::Server;

/// Watch a directory tree and log every filesystem event.
#[derive(Debug, Parser)]
#[command(name = "fsev", version, about)]
struct Args {
    /// Directory to watch. Defaults to the current directory; a leading
    /// `~` is expanded.
    root: Option<Utf8PathBuf>,

    /// Glob patterns to exclude from watching. May be repeated.
    /// `.git` directories are always excluded.
    #[arg(short, long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Maximum directory depth below the root. 0 watches the whole tree.
    #[arg(long, default_value_t = 0, value_name = "DEPTH")]
    max_depth: usize,

    /// Keep serving when a directory cannot be subscribed instead of
    /// aborting startup.
    #[arg(long)]
    skip: bool,

    /// Deadline in seconds applied to every handler invocation.
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// JSON configuration file. Command-line flags override its values.
    #[arg(short, long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,
}

impl Args {
    /// Resolves the effective configuration from the file and the flags.
    fn resolve_config(&self) -> color_eyre::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)?,
            None => ServerConfig::default(),
        };

        if !self.ignore.is_empty() {
            config.ignore.clone_from(&self.ignore);
        }
        if self.max_depth > 0 {
            config.max_depth = Some(self.max_depth);
        }
        if self.skip {
            config.skip = true;
        }
        if let Some(seconds) = self.timeout {
            config.handler_timeout_ms = Some(seconds.saturating_mul(1000));
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.resolve_config()?;

    let handler: Arc<dyn Handler> = Arc::new(handler_fn(|_ctx| async { Ok(()) }));
    let handler = apply(handler, &[&LoggingMiddleware]);

    let server = Arc::new(
        Server::builder(args.root.clone().unwrap_or_default())
            .handler(handler)
            .config(config)
            .build(),
    );
    let mut serving = tokio::spawn({
        let server = Arc::clone(&server);
        async move { server.listen_and_serve().await }
    });

    tokio::select! {
        result = &mut serving => {
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            server.close();
        }
    }

    serving.await??;
    Ok(())
}
