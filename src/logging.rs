//! Tracing subscriber setup.
//!
//! Servers log to stderr. The local preview draws on the terminal, so it logs
//! to a file instead.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init(target: &LogTarget) -> anyhow::Result<()> {
    match target {
        LogTarget::Stderr => build_subscriber(io::stderr, true).try_init()?,
        LogTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            build_subscriber(Arc::new(file), false).try_init()?
        }
    }
    Ok(())
}

pub fn build_subscriber<W>(writer: W, ansi: bool) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_writes_to_file() {
        let log_file = tempfile::NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(Arc::new(log_file.reopen().unwrap()), false);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(port = 2222, "ssh server starting");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("ssh server starting"));
        assert!(contents.contains("port=2222"));
    }

    #[test]
    fn test_unwritable_log_file_reported() {
        let dir = tempfile::tempdir().unwrap();
        let target = LogTarget::File(dir.path().join("missing").join("termfolio.log"));
        let err = init(&target).unwrap_err();
        assert!(err.to_string().contains("creating log file"));
    }
}
