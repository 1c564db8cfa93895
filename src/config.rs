// Runtime configuration.
// Resolves the server origin, storage locations and fixed limits once at startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{DEFAULT_MAX_CACHED, paths};

/// Environment variables the desktop shell may set, in priority order.
const SERVER_URL_VARS: [&str; 3] = ["PHOTOFRAME_SERVER_URL", "SERVER_URL", "RENDER_URL"];
const CACHE_DIR_VAR: &str = "PHOTOFRAME_CACHE_DIR";
const DEFAULT_PORT: &str = "3000";

/// Most photos shown in one slideshow cycle.
pub const MAX_DISPLAY: usize = 300;
/// Time between reconciliation passes.
pub const SYNC_PERIOD: Duration = Duration::from_secs(10);
/// How long shutdown waits for the cache clear before giving up.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Settings resolved at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Photo server origin without a trailing slash.
    pub server_url: String,
    /// Whether `server_url` came from the shell rather than a fallback.
    pub server_url_from_shell: bool,
    /// Root of the photo cache; `None` keeps the cache in memory.
    pub cache_dir: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub max_cached: usize,
    pub max_display: usize,
    pub sync_period: Duration,
    pub shutdown_grace: Duration,
    pub http_timeout: Duration,
}

impl AppConfig {
    /// Build the configuration from the command line and environment.
    ///
    /// `persisted_url` is the origin saved by an earlier run, used when the
    /// shell provides none.
    pub fn from_env(persisted_url: Option<&str>) -> Self {
        let shell_url = shell_server_url();
        let server_url_from_shell = shell_url.is_some();
        let port = std::env::var("PORT").ok();
        let server_url = resolve_server_url(shell_url.as_deref(), persisted_url, port.as_deref());

        let cache_dir = std::env::var(CACHE_DIR_VAR)
            .ok()
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .or_else(paths::cache_dir);

        Self {
            server_url,
            server_url_from_shell,
            cache_dir,
            settings_path: paths::settings_path(),
            max_cached: DEFAULT_MAX_CACHED,
            max_display: MAX_DISPLAY,
            sync_period: SYNC_PERIOD,
            shutdown_grace: SHUTDOWN_GRACE,
            http_timeout: HTTP_TIMEOUT,
        }
    }

    /// Page guests open (via the QR code) to upload photos.
    pub fn upload_url(&self) -> String {
        format!("{}/", self.server_url)
    }
}

/// Origin handed over by the shell: first CLI argument, then environment.
fn shell_server_url() -> Option<String> {
    std::env::args()
        .nth(1)
        .or_else(|| {
            SERVER_URL_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok())
        })
        .filter(|url| !url.trim().is_empty())
}

/// Pick the server origin: shell value, then persisted value, then localhost.
pub fn resolve_server_url(
    shell: Option<&str>,
    persisted: Option<&str>,
    port: Option<&str>,
) -> String {
    let chosen = shell
        .or(persisted)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("http://localhost:{}", port.unwrap_or(DEFAULT_PORT)));
    chosen.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_url_wins() {
        let url = resolve_server_url(
            Some("https://frame.onrender.com/"),
            Some("http://old.local"),
            None,
        );
        assert_eq!(url, "https://frame.onrender.com");
    }

    #[test]
    fn test_persisted_url_used_without_shell() {
        let url = resolve_server_url(None, Some("http://old.local"), Some("8080"));
        assert_eq!(url, "http://old.local");
    }

    #[test]
    fn test_default_localhost() {
        assert_eq!(resolve_server_url(None, None, None), "http://localhost:3000");
        assert_eq!(resolve_server_url(None, Some("  "), Some("8080")), "http://localhost:8080");
    }
}
