use super::{Config, WallpaperSettings, normalize_wallpaper};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use std::cell::RefCell;
use tracing::{debug, info};

/// Validated wallpaper URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wallpapers {
    pub no_windows: String,
    pub with_windows: String,
}

impl Wallpapers {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            no_windows: normalize_wallpaper(&config.wallpaper_no_windows)
                .wrap_err("Invalid `wallpaper-no-windows`")?,
            with_windows: normalize_wallpaper(&config.wallpaper_with_windows)
                .wrap_err("Invalid `wallpaper-with-windows`")?,
        })
    }
}

/// The settings store read by the tracker.
///
/// Values can be replaced at runtime by [`ConfigStore::reload`];
/// the tracker picks them up on its next recompute.
#[derive(Debug)]
pub struct ConfigStore {
    wallpapers: RefCell<Wallpapers>,
}

impl ConfigStore {
    pub fn new(config: &Config) -> Result<Self> {
        let wallpapers = Wallpapers::from_config(config)?;
        debug!("Loaded wallpapers: {wallpapers:?}");

        Ok(Self {
            wallpapers: RefCell::new(wallpapers),
        })
    }

    /// Replaces the stored wallpapers.
    /// On error the previous values are kept.
    ///
    /// Returns whether anything changed.
    pub fn reload(&self, config: &Config) -> Result<bool> {
        let wallpapers = Wallpapers::from_config(config)?;

        if *self.wallpapers.borrow() == wallpapers {
            return Ok(false);
        }

        info!("Wallpapers updated: {wallpapers:?}");
        *self.wallpapers.borrow_mut() = wallpapers;
        Ok(true)
    }

    pub fn wallpapers(&self) -> Wallpapers {
        self.wallpapers.borrow().clone()
    }
}

impl WallpaperSettings for ConfigStore {
    fn wallpaper_no_windows(&self) -> String {
        self.wallpapers.borrow().no_windows.clone()
    }

    fn wallpaper_with_windows(&self) -> String {
        self.wallpapers.borrow().with_windows.clone()
    }
}
