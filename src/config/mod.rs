pub mod hot_reload;
mod store;

use crate::tracker::Occupancy;
use color_eyre::eyre::WrapErr;
use color_eyre::{Help, Report, Result};
use dirs::{config_dir, home_dir};
use gio::prelude::*;
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use universal_config::ConfigLoader;

pub use self::store::{ConfigStore, Wallpapers};

const APP_NAME: &str = "duowall";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Wallpaper applied while the active workspace has no visible windows.
    ///
    /// Accepts a URI, an absolute path, or a path starting with `~/`.
    /// Leave empty to keep the background unchanged.
    #[serde(default)]
    pub wallpaper_no_windows: String,

    /// Wallpaper applied while the active workspace has at least one visible window.
    #[serde(default)]
    pub wallpaper_with_windows: String,

    /// Only write to the background when the selected wallpaper changes,
    /// rather than on every window event.
    #[serde(default = "default_false")]
    pub skip_redundant_writes: bool,

    #[serde(default)]
    pub background: BackgroundConfig,
}

/// How the selected wallpaper is applied.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    /// Writes the light and dark keys of a GSettings schema.
    #[default]
    GSettings,
    /// Runs `output <output> bg <file> <mode>` over sway IPC.
    Sway,
}

/// Scaling modes accepted by sway's `output bg` command.
const SWAY_MODES: [&str; 5] = ["stretch", "fill", "fit", "center", "tile"];

/// Where the selected wallpaper is written to.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct BackgroundConfig {
    #[serde(default)]
    pub kind: BackgroundKind,

    /// GSettings schema holding the background keys.
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_light_key")]
    pub light_key: String,
    #[serde(default = "default_dark_key")]
    pub dark_key: String,

    /// Sway output name, or `*` for every output.
    #[serde(default = "default_output")]
    pub output: String,
    /// Sway scaling mode.
    #[serde(default = "default_mode")]
    pub mode: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            light_key: default_light_key(),
            dark_key: default_dark_key(),
            output: default_output(),
            mode: default_mode(),
            kind: BackgroundKind::default(),
        }
    }
}

fn default_schema() -> String {
    String::from("org.gnome.desktop.background")
}

fn default_light_key() -> String {
    String::from("picture-uri")
}

fn default_dark_key() -> String {
    String::from("picture-uri-dark")
}

fn default_output() -> String {
    String::from("*")
}

fn default_mode() -> String {
    String::from("fill")
}

pub const fn default_false() -> bool {
    false
}

impl BackgroundConfig {
    pub fn validate(&self) -> Result<()> {
        let required: &[(&str, &String)] = match self.kind {
            BackgroundKind::GSettings => &[
                ("schema", &self.schema),
                ("light-key", &self.light_key),
                ("dark-key", &self.dark_key),
            ],
            BackgroundKind::Sway => &[("output", &self.output), ("mode", &self.mode)],
        };

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Report::msg(format!("`background.{name}` must not be empty")));
            }
        }

        if self.kind == BackgroundKind::Sway && !SWAY_MODES.contains(&self.mode.as_str()) {
            return Err(Report::msg(format!(
                "`background.mode` '{}' is not a sway background mode",
                self.mode
            ))
            .suggestion(format!("Use one of: {}", SWAY_MODES.join(", "))));
        }

        Ok(())
    }

    /// Short description of where wallpapers are written.
    pub fn target(&self) -> String {
        match self.kind {
            BackgroundKind::GSettings => format!(
                "gsettings {} ({}, {})",
                self.schema, self.light_key, self.dark_key
            ),
            BackgroundKind::Sway => format!("sway output {} ({})", self.output, self.mode),
        }
    }
}

/// Typed access to the two configured wallpapers.
pub trait WallpaperSettings {
    fn wallpaper_no_windows(&self) -> String;

    fn wallpaper_with_windows(&self) -> String;

    /// Gets the wallpaper configured for the given occupancy.
    /// An empty string means the background should be left unchanged.
    fn wallpaper(&self, occupancy: Occupancy) -> String {
        match occupancy {
            Occupancy::Empty => self.wallpaper_no_windows(),
            Occupancy::Occupied => self.wallpaper_with_windows(),
        }
    }
}

/// Where the config file is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// An explicit file, from `--config` or `DUOWALL_CONFIG`.
    File(PathBuf),
    /// `$XDG_CONFIG_HOME/duowall/config.*`, in any supported format.
    Discovered,
}

impl ConfigLocation {
    /// Resolves the location, preferring `path`,
    /// then the `DUOWALL_CONFIG` env var.
    pub fn resolve(path: Option<PathBuf>) -> Self {
        path.or_else(|| env::var_os("DUOWALL_CONFIG").map(PathBuf::from))
            .map_or(Self::Discovered, Self::File)
    }

    pub fn load(&self) -> Result<Config> {
        let config: Config = match self {
            Self::File(path) => ConfigLoader::load(path)
                .wrap_err_with(|| format!("Failed to load config from '{}'", path.display()))?,
            Self::Discovered => ConfigLoader::new(APP_NAME)
                .find_and_load()
                .wrap_err("Failed to load config")?,
        };

        config.background.validate()?;
        Ok(config)
    }

    /// Gets the directory to watch and the file stem to match
    /// for changes to the config.
    pub fn watch_target(&self) -> Option<(PathBuf, OsString)> {
        match self {
            Self::File(path) => {
                let dir = path.parent().map(Path::to_path_buf)?;
                let stem = path.file_stem()?.to_os_string();
                Some((dir, stem))
            }
            Self::Discovered => {
                config_dir().map(|dir| (dir.join(APP_NAME), OsString::from("config")))
            }
        }
    }
}

/// Normalises a configured wallpaper reference into a URI.
///
/// References with a scheme (`file://`, `resource://`, ...) are kept as-is,
/// `~/` is expanded against the home directory,
/// and absolute paths become `file://` URIs.
/// Empty references stay empty.
pub fn normalize_wallpaper(reference: &str) -> Result<String> {
    let reference = reference.trim();

    if reference.is_empty() {
        return Ok(String::new());
    }

    if has_uri_scheme(reference) {
        return Ok(reference.to_string());
    }

    let path = match reference.strip_prefix("~/") {
        Some(rest) => home_dir()
            .ok_or_else(|| Report::msg("Failed to locate home directory"))?
            .join(rest),
        None => PathBuf::from(reference),
    };

    if !path.is_absolute() {
        return Err(
            Report::msg(format!("Wallpaper '{reference}' is a relative path"))
                .suggestion("Use an absolute path or a file:// URI"),
        );
    }

    Ok(gio::File::for_path(&path).uri().to_string())
}

/// Gets the file name a wallpaper URI points to, if any.
pub fn wallpaper_basename(uri: &str) -> Option<String> {
    if uri.is_empty() {
        return None;
    }

    gio::File::for_uri(uri)
        .basename()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Checks for an RFC 3986 scheme followed by `://`.
fn has_uri_scheme(reference: &str) -> bool {
    reference.split_once("://").is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}
