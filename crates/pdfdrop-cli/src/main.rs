//! pdfdrop: upload a document and wait for its converted PDF.
//!
//! Storage settings come from the environment (S3_BUCKET, AWS_REGION,
//! AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, ...) and can be overridden by flags.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use pdfdrop_cli::init_tracing;
use pdfdrop_cli::view::{render, Notification, ViewModel};
use pdfdrop_core::{Config, SelectedFile, SignedUrl, StorageBackend, UploadedFilename};
use pdfdrop_services::{ConversionSession, UploadWorkflow};
use pdfdrop_storage::{create_storage, derive_output_key, upload_key, Storage};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "pdfdrop", about = "Upload a document and fetch its converted PDF")]
struct Cli {
    /// Storage backend: s3 or local
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Bucket name (overrides S3_BUCKET)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Region (overrides S3_REGION / AWS_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Endpoint of an S3-compatible store (overrides S3_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Seconds between two checks for the converted file
    #[arg(long, global = true)]
    poll_interval_secs: Option<u64>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and wait for the converted PDF
    Convert {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Upload a file without waiting for the conversion
    Upload {
        /// Path to the file to upload
        file: PathBuf,
    },
    /// Wait for the converted PDF of a file uploaded earlier
    Wait {
        /// Original name of the uploaded file
        filename: String,
    },
    /// Show metadata of a stored object
    Stat {
        /// Object key, e.g. uploads/report.docx
        key: String,
    },
}

#[derive(Serialize)]
struct UploadOutput<'a> {
    filename: &'a str,
    key: String,
    output_key: String,
}

#[derive(Serialize)]
struct LinkOutput<'a> {
    filename: &'a str,
    output_key: String,
    url: Option<&'a SignedUrl>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::from_env().context("Failed to read configuration")?;

    if let Some(backend) = &cli.backend {
        config.storage.backend = Some(backend.parse::<StorageBackend>()?);
    }
    if let Some(bucket) = &cli.bucket {
        config.storage.bucket = Some(bucket.clone());
    }
    if let Some(region) = &cli.region {
        config.storage.region = Some(region.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.storage.endpoint = Some(endpoint.clone());
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.poll_interval_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

async fn read_file(path: &PathBuf) -> anyhow::Result<SelectedFile> {
    SelectedFile::from_path(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Wait for the link, tearing the session down on Ctrl-C.
async fn wait_for_link(session: &mut ConversionSession) -> Option<SignedUrl> {
    let url = tokio::select! {
        url = session.wait_for_link() => url,
        _ = tokio::signal::ctrl_c() => None,
    };

    if url.is_none() {
        session.teardown();
    }
    url
}

async fn convert(
    storage: Arc<dyn Storage>,
    config: &Config,
    path: &PathBuf,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let file = read_file(path).await?;
    let mut session = ConversionSession::from_config(storage, config);
    let text = format == OutputFormat::Text;

    if text {
        let mut view = ViewModel::from_session(Some(&file), &session);
        view.uploading = true;
        println!("{}\n", render(&view));
    }

    let filename = match session.upload_file(&file).await {
        Ok(filename) => filename,
        Err(e) => {
            if text {
                let view = ViewModel::from_session(Some(&file), &session)
                    .with_notification(Notification::UploadFailed(e.reason().to_string()));
                println!("{}\n", render(&view));
            }
            return Err(e).context("Upload failed");
        }
    };

    if text {
        let view = ViewModel::from_session(Some(&file), &session)
            .with_notification(Notification::UploadSucceeded);
        println!("{}\n", render(&view));
    }

    let url = wait_for_link(&mut session).await;
    if url.is_none() {
        tracing::info!(filename = %filename, "Stopped waiting for conversion");
    }

    if text {
        match &url {
            Some(_) => println!("{}", render(&ViewModel::from_session(Some(&file), &session))),
            None => println!("Cancelled before the converted PDF was ready"),
        }
    } else {
        print_json(&LinkOutput {
            filename: filename.as_str(),
            output_key: derive_output_key(filename.as_str()),
            url: url.as_ref(),
        })?;
    }

    Ok(())
}

async fn wait(
    storage: Arc<dyn Storage>,
    config: &Config,
    filename: String,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let filename = UploadedFilename::new(filename).context("Filename must not be empty")?;
    let mut session = ConversionSession::from_config(storage, config);

    session.start_polling(filename.clone());
    if format == OutputFormat::Text {
        println!("{}\n", render(&ViewModel::from_session(None, &session)));
    }

    let url = wait_for_link(&mut session).await;

    match format {
        OutputFormat::Text => match &url {
            Some(url) => println!("Download converted PDF: {}", url),
            None => println!("Cancelled before the converted PDF was ready"),
        },
        OutputFormat::Json => print_json(&LinkOutput {
            filename: filename.as_str(),
            output_key: derive_output_key(filename.as_str()),
            url: url.as_ref(),
        })?,
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.format == OutputFormat::Json);

    let config = load_config(&cli)?;

    let storage = create_storage(&config.storage)
        .await
        .context("Failed to create storage client")?;

    tracing::debug!(
        backend = %storage.backend_type(),
        bucket = storage.bucket(),
        poll_interval_secs = config.poll_interval_secs,
        "Storage client ready"
    );

    match cli.command {
        Commands::Convert { file } => {
            convert(storage, &config, &file, cli.format).await?;
        }
        Commands::Upload { file } => {
            let file = read_file(&file).await?;
            let filename = UploadWorkflow::new(storage)
                .upload(&file)
                .await
                .context("Upload failed")?;

            match cli.format {
                OutputFormat::Text => println!("Uploaded {}", filename),
                OutputFormat::Json => print_json(&UploadOutput {
                    filename: filename.as_str(),
                    key: upload_key(filename.as_str()),
                    output_key: derive_output_key(filename.as_str()),
                })?,
            }
        }
        Commands::Wait { filename } => {
            wait(storage, &config, filename, cli.format).await?;
        }
        Commands::Stat { key } => {
            let info = storage
                .stat(&key)
                .await
                .with_context(|| format!("Failed to stat {}", key))?;

            match cli.format {
                OutputFormat::Text => {
                    println!("Key:           {}", info.key);
                    println!("Size:          {} bytes", info.size);
                    println!("Last modified: {}", info.last_modified.to_rfc3339());
                    if let Some(e_tag) = &info.e_tag {
                        println!("ETag:          {}", e_tag);
                    }
                }
                OutputFormat::Json => print_json(&info)?,
            }
        }
    }

    Ok(())
}
