//! # Logging Initialization
//!
//! One global `tracing` subscriber, installed at most once per process.
//!
//! - **Filter**: `RUST_LOG` when set, otherwise `<level>,sf_mcp=debug`.
//! - **stderr** (default): ANSI-coloured output. stdout is never written to because the
//!   stdio transport owns it.
//! - **File** (`log_to_file = true`): a daily rolling `sf_mcp.log` in the user cache
//!   directory resolved by `directories`, written through a non-blocking appender.
//!   Falls back to stderr when that directory is missing or read-only.
//! - **OpenTelemetry** (`opentelemetry` feature): an extra OTLP span exporter layer,
//!   active only when `OTEL_EXPORTER_OTLP_ENDPOINT` is set.

use anyhow::Result;
use directories::ProjectDirs;
#[cfg(feature = "opentelemetry")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "opentelemetry")]
use opentelemetry_otlp::WithExportConfig;
#[cfg(feature = "opentelemetry")]
use opentelemetry_sdk::{
    Resource,
    trace::{self as sdktrace, SdkTracerProvider},
};
use std::{
    io::stderr,
    path::{Path, PathBuf},
    sync::Once,
};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

const LOG_FILE_NAME: &str = "sf_mcp.log";

/// `trace`-level stderr logging for tests.
pub fn init_test_logging() {
    // Repeated calls are no-ops, so the result carries no information here.
    let _ = init_logging("trace", false);
}

/// Directory that receives log files when file logging is requested.
pub fn log_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "SalesforceCliMcp", "sf_mcp").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Installs the global subscriber. Later calls do nothing.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},sf_mcp=debug")));

        if log_to_file
            && let Some(log_dir) = log_directory()
            && is_writable(&log_dir)
        {
            // tracing_appender::rolling::daily panics on an unwritable directory.
            let appender = std::panic::catch_unwind(|| {
                tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME)
            });
            if let Ok(appender) = appender {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let subscriber = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(writer).with_ansi(false));

                #[cfg(feature = "opentelemetry")]
                let subscriber = subscriber.with(init_otel());

                subscriber.init();
                // Flushes on drop; must live for the rest of the process.
                Box::leak(Box::new(guard));
                return;
            }
        }

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true));

        #[cfg(feature = "opentelemetry")]
        let subscriber = subscriber.with(init_otel());

        subscriber.init();
    });

    Ok(())
}

#[cfg(feature = "opentelemetry")]
fn init_otel<S>() -> Option<tracing_opentelemetry::OpenTelemetryLayer<S, sdktrace::Tracer>>
where
    S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
    let endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok()?;
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(format!("{}/v1/traces", endpoint.trim_end_matches('/')))
        .build()
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(crate::config::SERVICE_NAME)
        .build();

    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build();

    Some(tracing_opentelemetry::layer().with_tracer(provider.tracer("sf_mcp")))
}

/// Creates `dir` if needed and checks that a file can be written inside it.
fn is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".sf_mcp_log_probe");
    match std::fs::write(&probe, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_probe_creates_missing_directories() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        assert!(is_writable(&nested));
        assert!(nested.is_dir());
        assert!(!nested.join(".sf_mcp_log_probe").exists());
    }

    #[cfg(unix)]
    #[test]
    fn writable_probe_rejects_a_file_path() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        assert!(!is_writable(&temp.path().join("sub")));
    }

    #[test]
    fn init_is_idempotent() {
        init_test_logging();
        assert!(init_logging("info", true).is_ok());
        tracing::debug!("logging initialised");
    }
}
