mod app;
mod cache;
mod config;
mod error;
mod remote;
mod state;
mod ui;

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use app::App;
use cache::{CacheBackend, EvictionPolicy, FileBackend, MemoryBackend, PhotoCache, paths};
use config::AppConfig;
use error::Result;
use remote::FrameClient;
use state::{Settings, SettingsStore};

/// Send logs to a file in the cache directory; the terminal belongs to the UI.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_file = paths::log_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    match log_file {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let settings_store = SettingsStore::new(paths::settings_path());
    let mut settings = settings_store.load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load settings, using defaults");
        Settings::default()
    });

    let config = AppConfig::from_env(settings.server_url.as_deref());
    if config.server_url_from_shell && settings.server_url.as_deref() != Some(config.server_url.as_str()) {
        settings.server_url = Some(config.server_url.clone());
        if let Err(e) = settings_store.save(&settings) {
            tracing::warn!(error = %e, "failed to persist server url");
        }
    }
    tracing::info!(server = %config.server_url, cache = ?config.cache_dir, "starting photo frame");

    let backend: Arc<dyn CacheBackend> = match &config.cache_dir {
        Some(dir) => Arc::new(FileBackend::new(dir.clone())),
        None => {
            tracing::warn!("no cache directory available, caching in memory");
            Arc::new(MemoryBackend::new())
        }
    };
    let cache = PhotoCache::new(backend, EvictionPolicy::new(config.max_cached));

    let client = FrameClient::new(&config.server_url, config.http_timeout)?;
    tokio::spawn({
        let client = client.clone();
        async move {
            match client.health().await {
                Ok(health) => tracing::info!(
                    status = %health.status,
                    s3 = ?health.use_s3,
                    "photo server healthy"
                ),
                Err(e) => tracing::warn!(error = %e, "photo server health check failed"),
            }
        }
    });

    let source = Arc::new(client.clone());
    let (app, inbox) = App::new(config, settings, settings_store, client, source, cache);

    let mut terminal = ratatui::init();
    let result = app.run(&mut terminal, inbox).await;
    ratatui::restore();

    if let Err(e) = &result {
        tracing::error!(error = %e, "photo frame exited with error");
    }
    result
}
