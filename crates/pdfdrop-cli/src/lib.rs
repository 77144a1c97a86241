//! pdfdrop CLI: terminal front end for the upload-and-convert workflow.

pub mod view;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for the CLI binary.
///
/// Logs go to stderr so rendered frames and JSON on stdout stay clean. With
/// `json` set, each event is one JSON object per line.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if let Err(e) =
        tracing::subscriber::set_global_default(build_subscriber(filter, json, std::io::stderr))
    {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }
}

fn build_subscriber<W>(filter: EnvFilter, json: bool, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        Box::new(registry.with(tracing_subscriber::fmt::layer().json().with_writer(writer)))
    } else {
        Box::new(registry.with(tracing_subscriber::fmt::layer().with_writer(writer)))
    }
}
