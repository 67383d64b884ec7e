use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upload_resizer::image::ImageProcessor;
use upload_resizer::models::{ResizerConfig, ServerConfig};
use upload_resizer::upload::DiskUploadService;
use upload_resizer::{app, Resizer};

#[derive(Debug, Parser)]
#[command(name = "upload-resizer")]
#[command(about = "Serve an upload endpoint that derives resized image variants")]
struct CliArgs {
    /// Address to listen on (overrides BIND_ADDR).
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// JSON file holding the task list (overrides RESIZER_TASKS).
    #[arg(long, value_name = "FILE")]
    tasks: Option<PathBuf>,
}

async fn serve(args: CliArgs) -> Result<()> {
    let mut config = ServerConfig::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(tasks) = args.tasks {
        config.tasks_file = Some(tasks);
    }

    let resizer_config = match &config.tasks_file {
        Some(path) => ResizerConfig::from_file(path)
            .with_context(|| format!("Failed to load tasks from {}", path.display()))?,
        None => ResizerConfig::default(),
    };

    let upload = DiskUploadService::new(&config.upload_dir)?;
    info!("Storing uploads in {}", upload.upload_dir().display());

    let resizer = Arc::new(
        Resizer::new(resizer_config, Arc::new(ImageProcessor::new())).with_upload(Arc::new(upload)),
    );
    info!("Loaded {} resize task(s)", resizer.config().tasks.len());

    let router = app::router(resizer, config.max_files, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, router).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upload_resizer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting upload-resizer");

    let args = CliArgs::parse();

    if let Err(e) = serve(args).await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::parse_from([
            "upload-resizer",
            "--bind",
            "0.0.0.0:8080",
            "--tasks",
            "tasks.json",
        ]);
        assert_eq!(args.bind.unwrap().port(), 8080);
        assert_eq!(args.tasks.unwrap().to_string_lossy(), "tasks.json");
    }

    #[test]
    fn test_cli_invalid_bind() {
        assert!(CliArgs::try_parse_from(["upload-resizer", "--bind", "nope"]).is_err());
    }
}
