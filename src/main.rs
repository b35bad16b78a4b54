/* src/main.rs */

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livemock::config::Settings;
use livemock::controller::LiveFile;
use livemock::reload::{Manager, ManagerConfig};
use livemock::server::MockService;
use livemock::signal::{BoxError, ChangeEvent};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serve mocked responses for an OpenAPI document, reloading on change.
#[derive(Debug, Parser)]
#[command(name = "livemock", version, about)]
struct Args {
	/// OpenAPI 3.x document (JSON or YAML).
	#[arg(long)]
	spec: PathBuf,

	/// Runtime settings file (JSON, YAML or TOML).
	#[arg(long)]
	config: Option<PathBuf>,

	/// Address to listen on.
	#[arg(long, default_value = "127.0.0.1:4010")]
	bind: SocketAddr,

	/// Quiet period after the last file change before reloading.
	#[arg(long, default_value_t = 500)]
	debounce_ms: u64,

	/// Serve the files as loaded at startup, without watching them.
	#[arg(long)]
	no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "livemock=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let args = Args::parse();
	tracing::info!(version = env!("CARGO_PKG_VERSION"), "livemock starting");

	let settings = match &args.config {
		Some(path) => Some(Arc::new(
			LiveFile::<Settings>::builder()
				.name("settings")
				.path(path)
				.load()
				.await?,
		)),
		None => None,
	};

	let mut service = MockService::load(&args.spec).await?;
	if let Some(settings) = &settings {
		service = service.with_settings(Arc::clone(settings));
	}
	let service = Arc::new(service);

	let manager = Manager::new(ManagerConfig {
		debounce: Duration::from_millis(args.debounce_ms),
		..ManagerConfig::default()
	})?;

	if !args.no_watch {
		manager.add_watch(watch_dir(&args.spec)).await?;
		manager.register_reloadable(service.clone()).await?;
		if let (Some(path), Some(settings)) = (&args.config, &settings) {
			manager.add_watch(watch_dir(path)).await?;
			manager.register_reloadable(settings.clone()).await?;
		}
		manager
			.add_listener("audit", |_cancel: CancellationToken, event: ChangeEvent| async move {
				tracing::debug!(path = ?event.path, op = %event.op, "file changed");
				Ok::<(), BoxError>(())
			})
			.await?;
		manager.start().await?;
		tracing::info!(debounce = ?manager.debounce(), "watching for changes");
	}

	let listener = TcpListener::bind(args.bind).await?;
	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(listener, service.router())
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	if let Err(e) = manager.shutdown(SHUTDOWN_TIMEOUT).await {
		tracing::warn!(error = %e, "reload subsystem did not stop cleanly");
	}
	tracing::info!("livemock stopped");
	Ok(())
}

/// Directory to watch for a file, so editors that replace files are seen.
fn watch_dir(file: &Path) -> PathBuf {
	match file.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
		_ => PathBuf::from("."),
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
	tracing::info!("shutdown signal received");
}
