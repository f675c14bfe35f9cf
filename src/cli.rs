use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the config file.
    /// Overrides `DUOWALL_CONFIG`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print debug information to stdout.
    #[arg(long)]
    pub debug: bool,

    /// Format to output the response as.
    #[arg(short, long)]
    pub format: Option<Format>,
}

#[derive(Subcommand, Debug, Serialize, Deserialize)]
pub enum Command {
    /// Print the configured wallpapers and background keys, then exit.
    Show,

    /// Write one configured wallpaper to the background, then exit.
    Apply {
        #[arg(value_enum)]
        state: WallpaperKey,
    },
}

#[derive(Debug, Serialize, Deserialize, ValueEnum, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WallpaperKey {
    /// `wallpaper-no-windows`
    NoWindows,
    /// `wallpaper-with-windows`
    WithWindows,
}

#[derive(Debug, Serialize, Deserialize, Default, ValueEnum, Clone, Copy)]
pub enum Format {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct WallpaperStatus {
    pub key: WallpaperKey,
    pub uri: String,
    /// File name shown in place of the full reference.
    pub basename: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Status {
    pub wallpapers: Vec<WallpaperStatus>,
    /// Where wallpapers are written, such as `gsettings org.gnome.desktop.background (...)`.
    pub background: String,
    pub skip_redundant_writes: bool,
}

pub fn print_status(status: &Status, format: Format) {
    match format {
        Format::Plain => {
            for wallpaper in &status.wallpapers {
                let key = match wallpaper.key {
                    WallpaperKey::NoWindows => "wallpaper-no-windows",
                    WallpaperKey::WithWindows => "wallpaper-with-windows",
                };

                match &wallpaper.basename {
                    Some(basename) => println!("{key}: {basename} ({})", wallpaper.uri),
                    None => println!("{key}: (none)"),
                }
            }

            println!("background: {}", status.background);
            println!("skip-redundant-writes: {}", status.skip_redundant_writes);
        }
        Format::Json => println!(
            "{}",
            serde_json::to_string(status).expect("to be valid json")
        ),
    }
}
