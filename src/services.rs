//! External services the viewer shell is parameterized over
//!
//! Mirrors the host-integration seam of the original viewer: a factory
//! trait for the download manager, the persisted preferences, and the
//! localization service, plus generic implementations suitable for a
//! plain desktop/terminal host.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "folio";
const PREFS_FILENAME: &str = "preferences.json";

/// Raw value of the default initial sidebar view (thumbnails).
pub const DEFAULT_SIDEBAR_VIEW_ON_LOAD: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("no usable download directory")]
    NoDownloadDirectory,

    #[error("storage: {0}")]
    Storage(#[from] std::io::Error),
}

/// Saves attachment bytes on the user's behalf.
pub trait DownloadManager {
    /// Write `data` under `filename`, returning the path actually used.
    fn download_data(&mut self, data: &[u8], filename: &str) -> Result<PathBuf, ServiceError>;
}

/// Download manager writing into a fixed directory, resolving name
/// collisions with a numeric suffix.
pub struct FileDownloadManager {
    target_dir: PathBuf,
}

impl FileDownloadManager {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
        }
    }
}

impl DownloadManager for FileDownloadManager {
    fn download_data(&mut self, data: &[u8], filename: &str) -> Result<PathBuf, ServiceError> {
        fs::create_dir_all(&self.target_dir)?;

        let name = sanitize_filename(filename);
        let path = disambiguate(&self.target_dir, &name);
        fs::write(&path, data)?;

        info!("saved attachment to {}", path.display());
        Ok(path)
    }
}

/// Strip path separators and control characters; an attachment name is
/// a plain file name, never a path.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(['.', ' ']);

    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned.to_string()
    }
}

fn disambiguate(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("attachment");
    let extension = path.extension().and_then(|e| e.to_str());

    let mut n = 1usize;
    loop {
        let next = match extension {
            Some(extension) => format!("{stem}({n}).{extension}"),
            None => format!("{stem}({n})"),
        };
        let candidate = dir.join(next);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn default_sidebar_view() -> u32 {
    DEFAULT_SIDEBAR_VIEW_ON_LOAD
}

/// The persisted preference values. Unknown and missing fields are
/// tolerated so older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefValues {
    /// Raw [`SidebarView`](crate::sidebar::SidebarView) value applied
    /// when a document loads.
    #[serde(default = "default_sidebar_view")]
    pub sidebar_view_on_load: u32,

    #[serde(default)]
    pub disable_notification: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for PrefValues {
    fn default() -> Self {
        Self {
            sidebar_view_on_load: DEFAULT_SIDEBAR_VIEW_ON_LOAD,
            disable_notification: false,
            locale: None,
            updated_at: Utc::now(),
        }
    }
}

/// Viewer preferences with an optional JSON file backing. Without a
/// file path the store is ephemeral and `save` is a no-op.
#[derive(Debug)]
pub struct Preferences {
    values: PrefValues,
    file_path: Option<PathBuf>,
}

impl Preferences {
    pub fn ephemeral() -> Self {
        Self {
            values: PrefValues::default(),
            file_path: None,
        }
    }

    pub fn with_file(file_path: impl Into<PathBuf>) -> Self {
        Self {
            values: PrefValues::default(),
            file_path: Some(file_path.into()),
        }
    }

    pub fn load_or_ephemeral(file_path: Option<PathBuf>) -> Self {
        match file_path {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                error!("failed to load preferences from {}: {e}", path.display());
                Self::with_file(path)
            }),
            None => Self::ephemeral(),
        }
    }

    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if file_path.exists() {
            let content = fs::read_to_string(file_path)?;
            let values: PrefValues = serde_json::from_str(&content)?;
            debug!("loaded preferences from {}", file_path.display());
            Ok(Self {
                values,
                file_path: Some(file_path.to_path_buf()),
            })
        } else {
            Ok(Self::with_file(file_path))
        }
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        let Some(path) = &self.file_path else {
            // Ephemeral preferences don't persist.
            return Ok(());
        };
        self.values.updated_at = Utc::now();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// The conventional on-disk location under the user config dir.
    pub fn default_location() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_NAME).join(PREFS_FILENAME))
    }

    #[must_use]
    pub fn sidebar_view_on_load(&self) -> u32 {
        self.values.sidebar_view_on_load
    }

    pub fn set_sidebar_view_on_load(&mut self, raw: u32) {
        self.values.sidebar_view_on_load = raw;
    }

    #[must_use]
    pub fn disable_notification(&self) -> bool {
        self.values.disable_notification
    }

    pub fn set_disable_notification(&mut self, disable: bool) {
        self.values.disable_notification = disable;
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.values.locale.as_deref()
    }

    pub fn set_locale(&mut self, locale: Option<String>) {
        self.values.locale = locale;
    }

    pub fn reset_to_defaults(&mut self) {
        self.values = PrefValues::default();
    }
}

/// Localization service seam. String resolution itself is external;
/// callers always supply a fallback.
pub trait Localizer {
    fn locale(&self) -> &str;

    fn get(&self, key: &str, fallback: &str) -> String;
}

/// Localizer that always answers with the fallback text.
pub struct NullL10n;

impl Localizer for NullL10n {
    fn locale(&self) -> &str {
        "en-US"
    }

    fn get(&self, _key: &str, fallback: &str) -> String {
        fallback.to_string()
    }
}

/// Localizer backed by an in-memory string table.
pub struct MapLocalizer {
    locale: String,
    strings: HashMap<String, String>,
}

impl MapLocalizer {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            strings: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.strings.insert(key.into(), value.into());
    }
}

impl Localizer for MapLocalizer {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn get(&self, key: &str, fallback: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Factory for the services a host substitutes into the shell.
pub trait ExternalServices {
    fn create_download_manager(&self) -> Result<Box<dyn DownloadManager>, ServiceError>;

    fn create_preferences(&self) -> Result<Preferences, ServiceError>;

    fn create_l10n(&self) -> Result<Box<dyn Localizer>, ServiceError>;

    fn supports_integrated_find(&self) -> bool {
        false
    }

    fn supports_document_fonts(&self) -> bool {
        true
    }
}

/// Placeholder services; every factory refuses. Hosts must substitute
/// a working implementation before using the corresponding feature.
pub struct DefaultServices;

impl ExternalServices for DefaultServices {
    fn create_download_manager(&self) -> Result<Box<dyn DownloadManager>, ServiceError> {
        Err(ServiceError::NotImplemented("create_download_manager"))
    }

    fn create_preferences(&self) -> Result<Preferences, ServiceError> {
        Err(ServiceError::NotImplemented("create_preferences"))
    }

    fn create_l10n(&self) -> Result<Box<dyn Localizer>, ServiceError> {
        Err(ServiceError::NotImplemented("create_l10n"))
    }
}

/// Generic services for a plain host: file downloads, JSON preferences
/// in the user config dir, fallback localization.
#[derive(Default)]
pub struct GenericServices {
    /// Download target; `None` uses the user download dir.
    pub download_dir: Option<PathBuf>,
    /// Preferences file; `None` uses the default location.
    pub preferences_path: Option<PathBuf>,
    pub locale: Option<String>,
}

impl GenericServices {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExternalServices for GenericServices {
    fn create_download_manager(&self) -> Result<Box<dyn DownloadManager>, ServiceError> {
        let dir = self
            .download_dir
            .clone()
            .or_else(dirs::download_dir)
            .ok_or(ServiceError::NoDownloadDirectory)?;
        Ok(Box::new(FileDownloadManager::new(dir)))
    }

    fn create_preferences(&self) -> Result<Preferences, ServiceError> {
        let path = self
            .preferences_path
            .clone()
            .or_else(Preferences::default_location);
        Ok(Preferences::load_or_ephemeral(path))
    }

    fn create_l10n(&self) -> Result<Box<dyn Localizer>, ServiceError> {
        match &self.locale {
            Some(locale) => Ok(Box::new(MapLocalizer::new(locale.clone()))),
            None => Ok(Box::new(NullL10n)),
        }
    }
}
