// Frame settings.
// Persisted display settings and the editor state for the settings panel.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use ratatui::widgets::ListState;
use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::slideshow::clamp_interval;

/// Interval used until the user picks one.
pub const DEFAULT_INTERVAL_SECS: u64 = 15;

/// User-editable display settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub background_image: Option<String>,
    pub background_color: String,
    pub qr_overlay_image: Option<String>,
    pub slide_interval_seconds: u64,
    pub qr_caption_top: String,
    pub qr_caption_bottom: String,
    /// Last server origin handed over by the shell.
    pub server_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            background_image: None,
            background_color: "#000000".to_string(),
            qr_overlay_image: None,
            slide_interval_seconds: DEFAULT_INTERVAL_SECS,
            qr_caption_top: "Share your photos".to_string(),
            qr_caption_bottom: "Scan the QR code to upload".to_string(),
            server_url: None,
        }
    }
}

impl Settings {
    /// Bring loaded or edited values back into range.
    pub fn normalize(mut self) -> Self {
        self.slide_interval_seconds = clamp_interval(self.slide_interval_seconds);
        self
    }
}

/// Reads and writes settings as JSON.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    /// `None` keeps settings in memory only.
    path: Option<PathBuf>,
}

impl SettingsStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Load settings, falling back to defaults when none are saved.
    pub fn load(&self) -> Result<Settings> {
        let Some(path) = &self.path else {
            return Ok(Settings::default());
        };

        match fs::read_to_string(path) {
            Ok(contents) => Ok(serde_json::from_str::<Settings>(&contents)?.normalize()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Save settings atomically.
    pub fn save(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(settings)?;

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }
}

/// Editable fields, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    BackgroundImage,
    BackgroundColor,
    QrOverlayImage,
    SlideInterval,
    QrCaptionTop,
    QrCaptionBottom,
}

impl SettingField {
    pub const ALL: [SettingField; 6] = [
        SettingField::BackgroundImage,
        SettingField::BackgroundColor,
        SettingField::QrOverlayImage,
        SettingField::SlideInterval,
        SettingField::QrCaptionTop,
        SettingField::QrCaptionBottom,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingField::BackgroundImage => "Background image",
            SettingField::BackgroundColor => "Background color",
            SettingField::QrOverlayImage => "QR overlay image",
            SettingField::SlideInterval => "Slide interval (s)",
            SettingField::QrCaptionTop => "QR caption (top)",
            SettingField::QrCaptionBottom => "QR caption (bottom)",
        }
    }

    /// Current value as editable text.
    pub fn value(&self, settings: &Settings) -> String {
        match self {
            SettingField::BackgroundImage => settings.background_image.clone().unwrap_or_default(),
            SettingField::BackgroundColor => settings.background_color.clone(),
            SettingField::QrOverlayImage => settings.qr_overlay_image.clone().unwrap_or_default(),
            SettingField::SlideInterval => settings.slide_interval_seconds.to_string(),
            SettingField::QrCaptionTop => settings.qr_caption_top.clone(),
            SettingField::QrCaptionBottom => settings.qr_caption_bottom.clone(),
        }
    }

    /// Apply edited text to `settings`.
    pub fn apply(&self, settings: &mut Settings, input: &str) -> std::result::Result<(), String> {
        let input = input.trim();
        let optional = |s: &str| (!s.is_empty()).then(|| s.to_string());
        match self {
            SettingField::BackgroundImage => settings.background_image = optional(input),
            SettingField::BackgroundColor => {
                if !is_hex_color(input) {
                    return Err(format!("'{}' is not a color like #1a2b3c", input));
                }
                settings.background_color = input.to_string();
            }
            SettingField::QrOverlayImage => settings.qr_overlay_image = optional(input),
            SettingField::SlideInterval => {
                let seconds: u64 = input
                    .parse()
                    .map_err(|_| format!("'{}' is not a number of seconds", input))?;
                settings.slide_interval_seconds = clamp_interval(seconds);
            }
            SettingField::QrCaptionTop => settings.qr_caption_top = input.to_string(),
            SettingField::QrCaptionBottom => settings.qr_caption_bottom = input.to_string(),
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// State of the settings panel.
#[derive(Debug, Default)]
pub struct SettingsEditor {
    pub list_state: ListState,
    /// Text being edited for the selected field.
    pub input: Option<String>,
    /// Validation error from the last commit.
    pub error: Option<String>,
}

impl SettingsEditor {
    pub fn new() -> Self {
        let mut list_state = ListState::default();
        list_state.select(Some(0));
        Self {
            list_state,
            input: None,
            error: None,
        }
    }

    pub fn selected_field(&self) -> SettingField {
        let index = self.list_state.selected().unwrap_or(0);
        SettingField::ALL[index.min(SettingField::ALL.len() - 1)]
    }

    pub fn is_editing(&self) -> bool {
        self.input.is_some()
    }

    /// Select the next field.
    pub fn select_next(&mut self) {
        let i = match self.list_state.selected() {
            Some(i) if i + 1 < SettingField::ALL.len() => i + 1,
            Some(i) => i, // Stay at end
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    /// Select the previous field.
    pub fn select_prev(&mut self) {
        let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.list_state.select(Some(i));
    }

    /// Start editing the selected field with its current value.
    pub fn begin_edit(&mut self, settings: &Settings) {
        self.input = Some(self.selected_field().value(settings));
        self.error = None;
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(input) = &mut self.input {
            input.push(c);
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(input) = &mut self.input {
            input.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.input = None;
        self.error = None;
    }

    /// Apply the edit to `settings`. Returns the field that changed.
    ///
    /// Invalid input keeps the editor open with an error message.
    pub fn commit(&mut self, settings: &mut Settings) -> Option<SettingField> {
        let input = self.input.as_deref()?;
        let field = self.selected_field();
        let mut updated = settings.clone();
        match field.apply(&mut updated, input) {
            Ok(()) => {
                self.input = None;
                self.error = None;
                if updated == *settings {
                    return None;
                }
                *settings = updated;
                Some(field)
            }
            Err(message) => {
                self.error = Some(message);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(Some(temp_dir.path().join("settings.json")));
        assert_eq!(store.load().unwrap(), Settings::default());

        let in_memory = SettingsStore::new(None);
        assert_eq!(in_memory.load().unwrap(), Settings::default());
        in_memory.save(&Settings::default()).unwrap();
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = SettingsStore::new(Some(temp_dir.path().join("nested/settings.json")));

        let settings = Settings {
            background_color: "#112233".to_string(),
            slide_interval_seconds: 30,
            qr_caption_top: "Wedding".to_string(),
            server_url: Some("https://frame.onrender.com".to_string()),
            ..Settings::default()
        };
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn test_load_clamps_interval_and_fills_missing_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.json");
        fs::write(&path, r#"{"slide_interval_seconds": 3, "qr_caption_top": "Hi"}"#).unwrap();

        let settings = SettingsStore::new(Some(path)).load().unwrap();
        assert_eq!(settings.slide_interval_seconds, 10);
        assert_eq!(settings.qr_caption_top, "Hi");
        assert_eq!(settings.background_color, "#000000");
    }

    #[test]
    fn test_field_apply() {
        let mut settings = Settings::default();

        SettingField::SlideInterval.apply(&mut settings, "90").unwrap();
        assert_eq!(settings.slide_interval_seconds, 35);

        assert!(SettingField::SlideInterval.apply(&mut settings, "soon").is_err());
        assert!(SettingField::BackgroundColor.apply(&mut settings, "red").is_err());

        SettingField::BackgroundColor.apply(&mut settings, "#fff").unwrap();
        assert_eq!(settings.background_color, "#fff");

        SettingField::BackgroundImage.apply(&mut settings, "  ").unwrap();
        assert_eq!(settings.background_image, None);
    }

    #[test]
    fn test_editor_commit() {
        let mut settings = Settings::default();
        let mut editor = SettingsEditor::new();

        // Move to the interval field
        for _ in 0..3 {
            editor.select_next();
        }
        assert_eq!(editor.selected_field(), SettingField::SlideInterval);

        editor.begin_edit(&settings);
        editor.pop_char();
        editor.pop_char();
        editor.push_char('2');
        editor.push_char('5');
        assert_eq!(editor.commit(&mut settings), Some(SettingField::SlideInterval));
        assert_eq!(settings.slide_interval_seconds, 25);
        assert!(!editor.is_editing());

        // Unchanged value reports nothing
        editor.begin_edit(&settings);
        assert_eq!(editor.commit(&mut settings), None);
    }

    #[test]
    fn test_editor_keeps_invalid_input() {
        let mut settings = Settings::default();
        let mut editor = SettingsEditor::new();
        editor.select_next();

        editor.begin_edit(&settings);
        editor.push_char('z');
        assert_eq!(editor.commit(&mut settings), None);
        assert!(editor.is_editing());
        assert!(editor.error.is_some());
        assert_eq!(settings.background_color, "#000000");
    }

    #[test]
    fn test_editor_selection_bounds() {
        let mut editor = SettingsEditor::new();
        editor.select_prev();
        assert_eq!(editor.selected_field(), SettingField::BackgroundImage);
        for _ in 0..10 {
            editor.select_next();
        }
        assert_eq!(editor.selected_field(), SettingField::QrCaptionBottom);
    }
}
