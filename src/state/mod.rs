// State management module.
// Reconciliation, slideshow scheduling, sync status and persisted settings.

pub mod reconcile;
pub mod settings;
pub mod slideshow;
pub mod sync;

pub use reconcile::{Backfilled, DisplayItem, Reconciler, SyncOutcome};
pub use settings::{SettingField, Settings, SettingsEditor, SettingsStore};
pub use slideshow::{Direction, Page, PageRenderer, Slideshow, SlideshowState};
pub use sync::{ActivityLevel, SyncState, run_sync_loop};
