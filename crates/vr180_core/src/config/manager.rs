//! Reading and writing the TOML configuration file.
//!
//! Missing keys are filled from defaults and written back, so the file on
//! disk always lists every setting. Writes go through a temp file and a
//! rename. Each table is rendered through `toml_edit` so it carries its
//! section comment.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table};

use super::settings::{ConfigSection, Settings};

const FILE_HEADER: &str = "# VR180 stitching configuration\n\
                           # Missing keys are restored with their defaults on load.\n";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("settings could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config is not editable TOML: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("config file {0} does not exist")]
    Missing(PathBuf),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings together with the file they came from.
pub struct ConfigManager {
    path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until [`load`](Self::load) or
    /// [`load_or_create`](Self::load_or_create).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until [`save`](Self::save).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    /// Reads an existing file without touching it.
    pub fn load(&mut self) -> ConfigResult<()> {
        let text = self.read_existing()?;
        self.settings = toml::from_str(&text)?;
        Ok(())
    }

    /// Reads the file, writing a default one first if there is none.
    ///
    /// A file lacking keys or holding unknown tables is rewritten in full.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.path.exists() {
            self.settings = Settings::default();
            return self.save();
        }

        let text = self.read_existing()?;
        self.settings = toml::from_str(&text)?;
        let on_disk: DocumentMut = text.parse()?;
        if !covers(&on_disk, &self.render_document()?) {
            tracing::debug!("completing config {}", self.path.display());
            self.save()?;
        }
        Ok(())
    }

    /// Writes every table with its comment, replacing the file.
    pub fn save(&self) -> ConfigResult<()> {
        let doc = self.render_document()?;
        self.write_atomically(&format!("{FILE_HEADER}{doc}"))?;
        Ok(())
    }

    fn read_existing(&self) -> ConfigResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConfigError::Missing(self.path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Current settings as a document, one commented table per section.
    fn render_document(&self) -> ConfigResult<DocumentMut> {
        let mut doc: DocumentMut = toml::to_string_pretty(&self.settings)?.parse()?;
        for section in ConfigSection::ALL {
            if let Some(table) = doc.get_mut(section.table_name()).and_then(Item::as_table_mut) {
                table.decor_mut().set_prefix(format!("\n# {}\n", section.comment()));
            }
        }
        Ok(doc)
    }

    fn write_atomically(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.path.with_extension("toml.tmp");
        let mut file = fs::File::create(&staging)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&staging, &self.path)
    }
}

/// True when `on_disk` has exactly the tables of `complete` and every key in them.
fn covers(on_disk: &DocumentMut, complete: &DocumentMut) -> bool {
    let no_strangers = on_disk.iter().all(|(name, _)| complete.contains_key(name));
    let nothing_missing = complete.iter().all(|(name, item)| {
        match (item.as_table(), on_disk.get(name).and_then(Item::as_table)) {
            (Some(want), Some(have)) => has_keys(have, want),
            (None, _) => on_disk.contains_key(name),
            (Some(_), None) => false,
        }
    });
    no_strangers && nothing_missing
}

fn has_keys(have: &Table, want: &Table) -> bool {
    want.iter().all(|(key, _)| have.contains_key(key))
}
