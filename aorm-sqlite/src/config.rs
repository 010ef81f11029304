//! SQLite configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SqliteError, SqliteResult};

/// Environment variable holding the database URL.
pub const DATABASE_URL_ENV: &str = "AORM_DATABASE_URL";

/// SQLite database configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteConfig {
    /// Database path (or ":memory:" for in-memory).
    pub path: DatabasePath,
    /// Enable foreign keys.
    pub foreign_keys: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Synchronous mode.
    pub synchronous: SynchronousMode,
    /// Journal mode.
    pub journal_mode: JournalMode,
}

/// Database path configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabasePath {
    /// In-memory database.
    #[default]
    Memory,
    /// File-based database.
    File(PathBuf),
}

impl DatabasePath {
    /// Check if this is an in-memory database.
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }

    /// Display form of the path.
    pub fn display(&self) -> String {
        match self {
            Self::Memory => ":memory:".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// SQLite synchronous mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynchronousMode {
    /// Synchronous OFF - Fastest but unsafe.
    Off,
    /// Synchronous NORMAL - Good balance.
    #[default]
    Normal,
    /// Synchronous FULL - Safe but slower.
    Full,
    /// Synchronous EXTRA - Maximum safety.
    Extra,
}

impl SynchronousMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Normal => "NORMAL",
            Self::Full => "FULL",
            Self::Extra => "EXTRA",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "off" => Some(Self::Off),
            "normal" => Some(Self::Normal),
            "full" => Some(Self::Full),
            "extra" => Some(Self::Extra),
            _ => None,
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// DELETE - Default mode, deletes journal after transaction.
    Delete,
    /// TRUNCATE - Truncates journal instead of deleting.
    Truncate,
    /// PERSIST - Keep journal file, zero out on commit.
    Persist,
    /// MEMORY - Keep journal in memory.
    Memory,
    /// WAL - Write-Ahead Logging.
    #[default]
    Wal,
    /// OFF - No journal.
    Off,
}

impl JournalMode {
    /// Get the SQLite pragma value.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Persist => "PERSIST",
            Self::Memory => "MEMORY",
            Self::Wal => "WAL",
            Self::Off => "OFF",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "delete" => Some(Self::Delete),
            "truncate" => Some(Self::Truncate),
            "persist" => Some(Self::Persist),
            "memory" => Some(Self::Memory),
            "wal" => Some(Self::Wal),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: DatabasePath::Memory,
            foreign_keys: true,
            busy_timeout_ms: Some(5000),
            synchronous: SynchronousMode::Normal,
            journal_mode: JournalMode::Wal,
        }
    }
}

/// The `[database]` table of a TOML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Database URL, in any form accepted by [`SqliteConfig::from_url`].
    pub url: Option<String>,
    /// Enable foreign keys.
    pub foreign_keys: Option<bool>,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Synchronous mode.
    pub synchronous: Option<SynchronousMode>,
    /// Journal mode.
    pub journal_mode: Option<JournalMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    database: DatabaseSection,
}

impl SqliteConfig {
    /// Create a new configuration for an in-memory database.
    pub fn memory() -> Self {
        Self {
            path: DatabasePath::Memory,
            ..Default::default()
        }
    }

    /// Create a new configuration for a file-based database.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: DatabasePath::File(path.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    /// Parse a SQLite URL into configuration.
    ///
    /// Supported formats:
    /// - `sqlite::memory:` - In-memory database
    /// - `sqlite://path/to/db.sqlite` - File-based database
    /// - `sqlite:///absolute/path/db.sqlite` - Absolute path
    /// - `file:path/to/db.sqlite` - Alternative format
    ///
    /// Query parameters `foreign_keys`, `busy_timeout`, `synchronous`,
    /// `journal_mode` and `mode=memory` adjust the result.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        let url_str = url.as_ref().trim();
        if url_str.is_empty() {
            return Err(SqliteError::config("database URL is empty"));
        }

        if url_str == "sqlite::memory:" || url_str == ":memory:" {
            return Ok(Self::memory());
        }

        let (location, query) = match url_str.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (url_str, None),
        };

        let path = if let Some(path) = location.strip_prefix("sqlite://") {
            if path.is_empty() {
                return Err(SqliteError::config("database path is required"));
            }
            path
        } else if let Some(path) = location.strip_prefix("sqlite:") {
            path
        } else if let Some(path) = location.strip_prefix("file:") {
            path
        } else if location.contains("://") {
            return Err(SqliteError::config(format!(
                "unsupported database URL scheme: {}",
                url_str
            )));
        } else {
            location
        };

        let mut config = if path == ":memory:" {
            Self::memory()
        } else {
            Self::file(path)
        };

        for pair in query.into_iter().flat_map(|q| q.split('&')) {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "mode" if value == "memory" => config.path = DatabasePath::Memory,
                "foreign_keys" => config.foreign_keys = value == "true" || value == "1",
                "busy_timeout" => {
                    let ms = value.parse().map_err(|_| {
                        SqliteError::config(format!("invalid busy_timeout: {}", value))
                    })?;
                    config.busy_timeout_ms = Some(ms);
                }
                "synchronous" => {
                    config.synchronous = SynchronousMode::parse(value).ok_or_else(|| {
                        SqliteError::config(format!("invalid synchronous mode: {}", value))
                    })?;
                }
                "journal_mode" => {
                    config.journal_mode = JournalMode::parse(value).ok_or_else(|| {
                        SqliteError::config(format!("invalid journal mode: {}", value))
                    })?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Read the URL from `AORM_DATABASE_URL`.
    pub fn from_env() -> SqliteResult<Self> {
        let url = std::env::var(DATABASE_URL_ENV)
            .map_err(|_| SqliteError::config(format!("{} is not set", DATABASE_URL_ENV)))?;
        Self::from_url(url)
    }

    /// Parse the `[database]` table of a TOML document.
    ///
    /// ```toml
    /// [database]
    /// url = "sqlite://blog.db"
    /// foreign_keys = true
    /// journal_mode = "delete"
    /// ```
    pub fn from_toml_str(content: &str) -> SqliteResult<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Self::from_section(file.database)
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> SqliteResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SqliteError::config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Build a configuration from a parsed `[database]` table.
    pub fn from_section(section: DatabaseSection) -> SqliteResult<Self> {
        let url = section
            .url
            .ok_or_else(|| SqliteError::config("database.url is required"))?;
        let mut config = Self::from_url(url)?;
        if let Some(enabled) = section.foreign_keys {
            config.foreign_keys = enabled;
        }
        if let Some(ms) = section.busy_timeout_ms {
            config.busy_timeout_ms = Some(ms);
        }
        if let Some(mode) = section.synchronous {
            config.synchronous = mode;
        }
        if let Some(mode) = section.journal_mode {
            config.journal_mode = mode;
        }
        Ok(config)
    }

    /// Set the database path.
    pub fn path(mut self, path: DatabasePath) -> Self {
        self.path = path;
        self
    }

    /// Enable or disable foreign keys.
    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = Some(ms);
        self
    }

    /// Set the synchronous mode.
    pub fn synchronous(mut self, mode: SynchronousMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the journal mode.
    pub fn journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }
}
