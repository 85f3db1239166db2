// Configuration loading

pub mod settings;

pub use settings::{load_config, Settings, SettingsError};
