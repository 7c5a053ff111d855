mod action;
mod app;
mod config;
mod content;
mod html;
mod local;
mod logging;
mod osc;
mod session;
mod ssh;
mod state;
mod terminal;
mod theme;
mod timers;
mod ui;
mod ui_state;
mod web;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use content::Content;
use logging::LogTarget;

/// A personal portfolio served over SSH, with a parallel web view
#[derive(Parser, Debug)]
#[command(name = "termfolio", version, about)]
struct Args {
    /// SSH listen port
    #[arg(long, env = "PORT", default_value_t = 2222)]
    port: u16,

    /// Address both servers bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// SSH host private key
    #[arg(long, env = "HOST_KEY", default_value = "host.key")]
    host_key: PathBuf,

    /// Serve the web view on this port as well
    #[arg(long, env = "WEB_PORT")]
    web_port: Option<u16>,

    /// JSON file overriding the built-in content
    #[arg(long)]
    content: Option<PathBuf>,

    /// Preview in this terminal instead of serving
    #[arg(long)]
    local: bool,

    /// Log file (local preview defaults to termfolio.log in the temp dir)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn log_target(&self) -> LogTarget {
        match (&self.log_file, self.local) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::File(std::env::temp_dir().join("termfolio.log")),
            (None, false) => LogTarget::Stderr,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_target = args.log_target();
    if let Err(err) = logging::init(&log_target) {
        eprintln!("failed to set up logging: {err:#}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            if log_target != LogTarget::Stderr {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let content = Arc::new(match &args.content {
        Some(path) => Content::load(path)?,
        None => Content::default(),
    });

    if args.local {
        return local::run(content).await;
    }

    let key = ssh::load_host_key(&args.host_key)?;
    let ssh = ssh::serve(&args.host, args.port, key, Arc::clone(&content));
    let web = async {
        match args.web_port {
            Some(port) => web::serve(&args.host, port, content).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = ssh => result,
        result = web => result,
        () = shutdown_signal() => {
            tracing::info!("shutting down");
            Ok(())
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["termfolio"]).unwrap();
        assert_eq!(args.host, "0.0.0.0");
        assert!(!args.local);
        assert!(args.content.is_none());
    }

    #[test]
    fn test_local_mode_logs_to_file() {
        let args = Args::try_parse_from(["termfolio", "--local"]).unwrap();
        assert_eq!(
            args.log_target(),
            LogTarget::File(std::env::temp_dir().join("termfolio.log"))
        );

        let args = Args::try_parse_from(["termfolio", "--web-port", "8080"]).unwrap();
        assert_eq!(args.web_port, Some(8080));
    }

    #[test]
    fn test_args_verify() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
