//! Settings for every stage, kept in one TOML file.
//!
//! Each pipeline concern owns a table (`[masks]`, `[calibration]`,
//! `[render]` and so on). Absent keys take their defaults and are written
//! back on load.
//!
//! ```no_run
//! use vr180_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new(".config/vr180.toml");
//! config.load_or_create()?;
//! config.settings_mut().render.output_fps = 30.0;
//! config.save()?;
//! # Ok::<(), vr180_core::config::ConfigError>(())
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CalibrationSettings, ConfigSection, EncodeSettings, LoggingSettings, MaskSettings,
    PathSettings, RenderSettings, Settings, ToolSettings,
};
