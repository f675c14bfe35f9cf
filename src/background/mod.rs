use crate::config::{BackgroundConfig, BackgroundKind};
use cfg_if::cfg_if;
use color_eyre::{Help, Report, Result};
use gio::prelude::*;
use std::fmt::Debug;
use tracing::{debug, error};

#[cfg(feature = "sway")]
pub mod sway;

/// Key-value store the selected wallpaper is written to.
pub trait BackgroundSink: Debug {
    fn set_string(&self, key: &str, value: &str) -> Result<()>;
}

/// Writes to a GSettings schema,
/// such as `org.gnome.desktop.background`.
#[derive(Debug)]
pub struct GSettingsSink {
    settings: gio::Settings,
}

impl GSettingsSink {
    /// Opens the schema, checking it is installed and has every key in `keys`.
    ///
    /// Opening a missing schema directly would abort the process,
    /// so it is looked up in the default schema source first.
    pub fn new(schema_id: &str, keys: &[&str]) -> Result<Self> {
        let schema = gio::SettingsSchemaSource::default()
            .and_then(|source| source.lookup(schema_id, true))
            .ok_or_else(|| {
                Report::msg(format!("GSettings schema '{schema_id}' is not installed"))
                    .suggestion("Set `background.schema` to an installed schema")
            })?;

        for key in keys {
            if !schema.has_key(key) {
                return Err(Report::msg(format!(
                    "GSettings schema '{schema_id}' has no key '{key}'"
                )));
            }
        }

        Ok(Self {
            settings: gio::Settings::new(schema_id),
        })
    }
}

impl BackgroundSink for GSettingsSink {
    fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.settings.set_string(key, value)?;
        Ok(())
    }
}

/// Applies a wallpaper to every key of a sink,
/// such as the light and dark GSettings keys, or sway outputs.
#[derive(Debug)]
pub struct Background {
    sink: Box<dyn BackgroundSink>,
    keys: Vec<String>,
}

impl Background {
    pub fn new(sink: Box<dyn BackgroundSink>, light_key: &str, dark_key: &str) -> Self {
        Self::with_keys(sink, [light_key, dark_key])
    }

    pub fn with_keys<I, S>(sink: Box<dyn BackgroundSink>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sink,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a background writing to the configured sink.
    pub fn from_config(config: &BackgroundConfig) -> Result<Self> {
        match config.kind {
            BackgroundKind::GSettings => {
                let sink = GSettingsSink::new(
                    &config.schema,
                    &[config.light_key.as_str(), config.dark_key.as_str()],
                )?;
                Ok(Self::new(Box::new(sink), &config.light_key, &config.dark_key))
            }
            BackgroundKind::Sway => {
                cfg_if! {
                    if #[cfg(feature = "sway")] {
                        let sink = sway::SwaySink::new(&config.mode)?;
                        Ok(Self::with_keys(Box::new(sink), [config.output.as_str()]))
                    } else {
                        Err(Report::msg("Not compiled with Sway support")
                            .suggestion("Set `background.kind` to `gsettings`"))
                    }
                }
            }
        }
    }

    /// Writes `uri` to every key.
    ///
    /// An empty `uri` leaves the background unchanged.
    /// Write failures are logged, not returned.
    pub fn apply(&self, uri: &str) {
        if uri.is_empty() {
            debug!("No wallpaper configured, leaving background unchanged");
            return;
        }

        debug!("Applying wallpaper: {uri}");

        for key in &self.keys {
            if let Err(err) = self.sink.set_string(key, uri) {
                error!("{:?}", err.wrap_err(format!("Failed to set background key '{key}'")));
            }
        }
    }
}
