// App state and main event loop.
// Owns the slideshow and settings, and routes sync results, downloads and key presses.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

use crate::cache::PhotoCache;
use crate::config::AppConfig;
use crate::error::Result;
use crate::remote::{FrameClient, PhotoSource};
use crate::state::sync::ActivityMessage;
use crate::state::{
    Backfilled, Direction, Reconciler, SettingField, Settings, SettingsEditor, SettingsStore,
    Slideshow, SlideshowState, SyncOutcome, SyncState, run_sync_loop,
};
use crate::ui::{self, PageView};

/// Receiving ends of the channels feeding the event loop.
pub struct Inbox {
    outcomes_tx: UnboundedSender<SyncOutcome>,
    outcomes: UnboundedReceiver<SyncOutcome>,
    refresh: UnboundedReceiver<()>,
    backfills: UnboundedReceiver<Backfilled>,
    notices: UnboundedReceiver<ActivityMessage>,
}

/// Main application state.
pub struct App {
    pub config: AppConfig,
    pub slideshow: Slideshow<PageView>,
    pub settings: Settings,
    settings_store: SettingsStore,
    pub sync: SyncState,
    /// Settings panel, when open.
    pub settings_editor: Option<SettingsEditor>,
    /// Whether the delete-all confirmation is showing.
    pub confirm_delete: bool,
    pub show_help: bool,
    pub should_quit: bool,
    client: FrameClient,
    reconciler: Arc<Reconciler>,
    refresh_tx: UnboundedSender<()>,
    notices_tx: UnboundedSender<ActivityMessage>,
}

impl App {
    pub fn new(
        config: AppConfig,
        settings: Settings,
        settings_store: SettingsStore,
        client: FrameClient,
        source: Arc<dyn PhotoSource>,
        cache: PhotoCache,
    ) -> (Self, Inbox) {
        let (backfill_tx, backfills) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes) = mpsc::unbounded_channel();
        let (refresh_tx, refresh) = mpsc::unbounded_channel();
        let (notices_tx, notices) = mpsc::unbounded_channel();

        let reconciler = Arc::new(Reconciler::new(
            source,
            cache,
            &config.server_url,
            config.max_display,
            backfill_tx,
        ));
        let slideshow = Slideshow::new(PageView::default(), settings.slide_interval_seconds);

        let app = Self {
            config,
            slideshow,
            settings,
            settings_store,
            sync: SyncState::new(),
            settings_editor: None,
            confirm_delete: false,
            show_help: false,
            should_quit: false,
            client,
            reconciler,
            refresh_tx,
            notices_tx,
        };
        let inbox = Inbox {
            outcomes_tx,
            outcomes,
            refresh,
            backfills,
            notices,
        };
        (app, inbox)
    }

    /// Main event loop.
    pub async fn run(mut self, terminal: &mut Terminal<impl Backend>, inbox: Inbox) -> Result<()> {
        let Inbox {
            outcomes_tx,
            mut outcomes,
            refresh,
            mut backfills,
            mut notices,
        } = inbox;

        let sync_task = tokio::spawn(run_sync_loop(
            Arc::clone(&self.reconciler),
            self.config.sync_period,
            outcomes_tx,
            refresh,
        ));

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let stop = Arc::new(AtomicBool::new(false));
        let reader = tokio::task::spawn_blocking({
            let stop = Arc::clone(&stop);
            move || read_terminal_events(events_tx, stop)
        });

        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, &mut self))?;

            let deadline = self.slideshow.deadline();
            tokio::select! {
                Some(outcome) = outcomes.recv() => self.apply_sync(outcome),
                Some(done) = backfills.recv() => self.apply_backfill(done),
                Some(notice) = notices.recv() => self.sync.push(notice),
                Some(event) = events.recv() => self.handle_event(event),
                _ = wait_until(deadline) => {
                    self.slideshow.tick(Instant::now());
                }
            }
        }

        stop.store(true, Ordering::Relaxed);
        sync_task.abort();
        self.shutdown().await;
        let _ = reader.await;
        Ok(())
    }

    /// Take the result of a sync pass.
    pub fn apply_sync(&mut self, outcome: SyncOutcome) {
        self.sync.record_pass(&outcome);
        let now = Instant::now();

        if outcome.sequence.is_empty() {
            self.slideshow.stop();
            self.slideshow.update_sequence(outcome.sequence, now);
        } else if self.slideshow.state() == SlideshowState::Idle {
            self.slideshow.start(outcome.sequence, now);
        } else {
            self.slideshow.update_sequence(outcome.sequence, now);
        }
    }

    /// A photo finished downloading into the cache.
    pub fn apply_backfill(&mut self, done: Backfilled) {
        self.sync.record_backfill();
        self.slideshow.apply_backfill(&done.url, &done.id);
    }

    fn handle_event(&mut self, event: Event) {
        // Other events (resize) only wake the loop for a redraw
        if let Event::Key(key) = event {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key);
            }
        }
    }

    /// Handle a key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.confirm_delete {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirm_delete = false;
                    self.delete_all_photos();
                }
                KeyCode::Char('n') | KeyCode::Esc => self.confirm_delete = false,
                _ => {}
            }
            return;
        }

        if self.settings_editor.is_some() {
            self.handle_settings_key(key);
            return;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
                self.show_help = false;
            }
            return;
        }

        let now = Instant::now();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Left | KeyCode::Char('h') => {
                self.slideshow.navigate(Direction::Previous, now);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.slideshow.navigate(Direction::Next, now);
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.set_interval(self.settings.slide_interval_seconds + 1);
            }
            KeyCode::Char('-') => {
                self.set_interval(self.settings.slide_interval_seconds.saturating_sub(1));
            }
            KeyCode::Char('s') => self.settings_editor = Some(SettingsEditor::new()),
            KeyCode::Char('r') => {
                let _ = self.refresh_tx.send(());
            }
            KeyCode::Char('X') => self.confirm_delete = true,
            KeyCode::Char('?') => self.show_help = true,
            _ => {}
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        let Some(editor) = self.settings_editor.as_mut() else {
            return;
        };

        if editor.is_editing() {
            match key.code {
                KeyCode::Enter => {
                    if let Some(field) = editor.commit(&mut self.settings) {
                        self.apply_setting(field);
                    }
                }
                KeyCode::Esc => editor.cancel_edit(),
                KeyCode::Backspace => editor.pop_char(),
                KeyCode::Char(c) => editor.push_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => editor.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => editor.select_next(),
            KeyCode::Enter => editor.begin_edit(&self.settings),
            KeyCode::Esc | KeyCode::Char('s') => self.settings_editor = None,
            _ => {}
        }
    }

    /// Re-apply a changed setting and persist all settings.
    fn apply_setting(&mut self, field: SettingField) {
        if field == SettingField::SlideInterval {
            self.slideshow
                .set_interval(self.settings.slide_interval_seconds, Instant::now());
        }
        self.persist_settings();
    }

    /// Change the page interval, clamped, and persist it.
    pub fn set_interval(&mut self, seconds: u64) {
        let applied = self.slideshow.set_interval(seconds, Instant::now());
        if applied != self.settings.slide_interval_seconds {
            self.settings.slide_interval_seconds = applied;
            self.persist_settings();
        }
    }

    fn persist_settings(&mut self) {
        if let Err(e) = self.settings_store.save(&self.settings) {
            tracing::warn!(error = %e, "failed to save settings");
            self.sync.log_error(format!("Settings not saved: {}", e));
        }
    }

    /// Ask the server to delete every photo, then refresh.
    fn delete_all_photos(&mut self) {
        self.sync.log_warn("Deleting all photos on the server");
        let client = self.client.clone();
        let notices = self.notices_tx.clone();
        let refresh = self.refresh_tx.clone();

        tokio::spawn(async move {
            let notice = match client.delete_all().await {
                Ok(response) if response.ok => ActivityMessage::info(response.summary()),
                Ok(response) => ActivityMessage::error(response.summary()),
                Err(e) => {
                    tracing::warn!(error = %e, "delete_all failed");
                    ActivityMessage::error(format!("Delete failed: {}", e))
                }
            };
            let _ = notices.send(notice);
            let _ = refresh.send(());
        });
    }

    /// Stop the show and clear the cache, giving up after the grace period.
    pub async fn shutdown(&mut self) {
        self.slideshow.stop();
        self.reconciler.abort_backfills().await;

        let cache = self.reconciler.cache().clone();
        match tokio::time::timeout(self.config.shutdown_grace, cache.clear()).await {
            Ok(true) => tracing::info!("cache cleared on shutdown"),
            Ok(false) => tracing::warn!("cache clear on shutdown failed"),
            Err(_) => tracing::warn!("cache clear on shutdown abandoned after grace period"),
        }
    }
}

/// Sleep until `deadline`, or forever if there is none.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Forward terminal events until `stop` is set or the loop goes away.
fn read_terminal_events(events: UnboundedSender<Event>, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(event) => {
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "terminal read failed");
                    break;
                }
            },
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "terminal poll failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::local::tests::memory_cache;
    use crate::cache::CachedPhoto;
    use crate::config::{MAX_DISPLAY, SHUTDOWN_GRACE, SYNC_PERIOD};
    use crate::remote::RemotePhoto;
    use crate::state::reconcile::tests::FakeSource;
    use crossterm::event::KeyModifiers;
    use tempfile::TempDir;

    fn config() -> AppConfig {
        AppConfig {
            server_url: "http://frame.local:3000".to_string(),
            server_url_from_shell: false,
            cache_dir: None,
            settings_path: None,
            max_cached: 300,
            max_display: MAX_DISPLAY,
            sync_period: SYNC_PERIOD,
            shutdown_grace: SHUTDOWN_GRACE,
            http_timeout: Duration::from_secs(1),
        }
    }

    fn photos(count: usize) -> Vec<RemotePhoto> {
        (0..count)
            .map(|n| RemotePhoto::new(&format!("/uploads/{}.jpg", n), Some("2024-01-01")))
            .collect()
    }

    fn app_with(
        source: Arc<FakeSource>,
        cache: PhotoCache,
        settings_path: Option<std::path::PathBuf>,
    ) -> (App, Inbox) {
        let config = config();
        let client = FrameClient::new(&config.server_url, config.http_timeout).unwrap();
        App::new(
            config,
            Settings::default(),
            SettingsStore::new(settings_path),
            client,
            source,
            cache,
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_first_pass_starts_slideshow() {
        let source = Arc::new(FakeSource::with_list(photos(31)));
        let (mut app, _inbox) = app_with(source, memory_cache(300), None);

        let outcome = app.reconciler.sync().await;
        app.apply_sync(outcome);

        assert_eq!(app.slideshow.state(), SlideshowState::Running);
        assert_eq!(app.slideshow.total_pages(), 3);
        assert_eq!(app.slideshow.renderer().slots.len(), 15);
        assert_eq!(app.slideshow.armed_timers(), 1);
        app.reconciler.abort_backfills().await;
    }

    #[tokio::test]
    async fn test_arrow_keys_navigate() {
        let source = Arc::new(FakeSource::with_list(photos(31)));
        let (mut app, _inbox) = app_with(source, memory_cache(300), None);
        let outcome = app.reconciler.sync().await;
        app.apply_sync(outcome);

        app.handle_key(press(KeyCode::Left));
        assert_eq!(app.slideshow.current_page(), 2);
        app.handle_key(press(KeyCode::Right));
        assert_eq!(app.slideshow.current_page(), 0);
        assert_eq!(app.slideshow.armed_timers(), 1);
        app.reconciler.abort_backfills().await;
    }

    #[tokio::test]
    async fn test_interval_keys_persist_clamped_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        let source = Arc::new(FakeSource::default());
        let (mut app, _inbox) = app_with(source, memory_cache(300), Some(path.clone()));

        app.set_interval(3);
        assert_eq!(app.settings.slide_interval_seconds, 10);
        app.handle_key(press(KeyCode::Char('+')));
        assert_eq!(app.settings.slide_interval_seconds, 11);

        let saved = SettingsStore::new(Some(path)).load().unwrap();
        assert_eq!(saved.slide_interval_seconds, 11);
        assert_eq!(app.slideshow.interval(), Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_settings_panel_edits_interval() {
        let source = Arc::new(FakeSource::default());
        let (mut app, _inbox) = app_with(source, memory_cache(300), None);

        app.handle_key(press(KeyCode::Char('s')));
        for _ in 0..3 {
            app.handle_key(press(KeyCode::Down));
        }
        app.handle_key(press(KeyCode::Enter));
        app.handle_key(press(KeyCode::Backspace));
        app.handle_key(press(KeyCode::Backspace));
        app.handle_key(press(KeyCode::Char('9')));
        app.handle_key(press(KeyCode::Char('9')));
        app.handle_key(press(KeyCode::Enter));

        assert_eq!(app.settings.slide_interval_seconds, 35);
        assert_eq!(app.slideshow.interval(), Duration::from_secs(35));

        app.handle_key(press(KeyCode::Esc));
        assert!(app.settings_editor.is_none());
    }

    #[tokio::test]
    async fn test_backfill_event_updates_slot() {
        let source = Arc::new(FakeSource::with_list(photos(2)));
        let (mut app, mut inbox) = app_with(source, memory_cache(300), None);

        let outcome = app.reconciler.sync().await;
        app.apply_sync(outcome);
        app.reconciler.drain_backfills().await;

        while let Ok(done) = inbox.backfills.try_recv() {
            app.apply_backfill(done);
        }
        assert!(app.slideshow.sequence().items().iter().all(|i| i.is_cached()));
        assert_eq!(app.sync.metrics.photos_backfilled, 2);
    }

    #[tokio::test]
    async fn test_backfill_arriving_before_its_pass_is_kept() {
        let source = Arc::new(FakeSource::with_list(photos(2)));
        let (mut app, mut inbox) = app_with(source, memory_cache(300), None);

        // Downloads finish and are handled before the pass that started them
        let outcome = app.reconciler.sync().await;
        app.reconciler.drain_backfills().await;
        while let Ok(done) = inbox.backfills.try_recv() {
            app.apply_backfill(done);
        }
        app.apply_sync(outcome);

        let cached = app
            .slideshow
            .sequence()
            .items()
            .iter()
            .filter(|i| i.is_cached())
            .count();
        assert_eq!(cached, 2);
        assert!(app
            .slideshow
            .renderer()
            .slots
            .iter()
            .take(2)
            .all(|slot| matches!(slot, crate::ui::grid::SlotView::Photo { cached: true, .. })));
    }

    #[tokio::test]
    async fn test_empty_server_stops_show() {
        let source = Arc::new(FakeSource::with_list(photos(20)));
        let (mut app, _inbox) = app_with(Arc::clone(&source), memory_cache(300), None);
        let outcome = app.reconciler.sync().await;
        app.apply_sync(outcome);
        app.reconciler.abort_backfills().await;

        source.list.lock().unwrap().clear();
        let outcome = app.reconciler.sync().await;
        app.apply_sync(outcome);

        assert_eq!(app.slideshow.state(), SlideshowState::Idle);
        assert_eq!(app.slideshow.armed_timers(), 0);
        assert!(app.sync.status.is_empty_state());
    }

    #[tokio::test]
    async fn test_shutdown_clears_cache() {
        let cache = memory_cache(300);
        cache
            .put(&CachedPhoto::new("http://frame.local:3000/a.jpg", vec![1], None))
            .await;
        let source = Arc::new(FakeSource::default());
        let (mut app, _inbox) = app_with(source, cache.clone(), None);

        app.shutdown().await;
        assert!(cache.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_quit_and_help_keys() {
        let source = Arc::new(FakeSource::default());
        let (mut app, _inbox) = app_with(source, memory_cache(300), None);

        app.handle_key(press(KeyCode::Char('?')));
        assert!(app.show_help);
        app.handle_key(press(KeyCode::Char('q')));
        assert!(!app.should_quit);
        app.handle_key(press(KeyCode::Esc));
        app.handle_key(press(KeyCode::Char('X')));
        assert!(app.confirm_delete);
        app.handle_key(press(KeyCode::Char('n')));
        assert!(!app.confirm_delete);
        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
