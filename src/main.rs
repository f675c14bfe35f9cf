use std::process::exit;
use std::rc::Rc;
use std::sync::LazyLock;

use cfg_if::cfg_if;
#[cfg(feature = "cli")]
use clap::Parser;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::background::Background;
use crate::channels::{AsyncSenderExt, GlibReceiverExt};
use crate::clients::compositor::{Compositor, DesktopUpdate};
use crate::config::{Config, ConfigLocation, ConfigStore, Wallpapers};
use crate::desktop::Desktop;
use crate::error::ExitCode;
use crate::tracker::{TrackerOptions, WorkspaceWindowTracker};

mod background;
mod channels;
#[cfg(feature = "cli")]
mod cli;
mod clients;
mod config;
mod desktop;
mod error;
mod logging;
mod macros;
mod tracker;
mod unique_id;

const VERSION: &str = env!("CARGO_PKG_VERSION");

static RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("to create tokio runtime")
});

/// Spawns a future on the Tokio runtime.
///
/// Safe to call from any thread.
pub fn spawn<F>(f: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(f)
}

/// Blocks the current thread on a `Future` until it resolves.
///
/// Must not be called from within the Tokio runtime.
pub fn block_on<F: Future>(f: F) -> F::Output {
    RUNTIME.block_on(f)
}

fn main() {
    cfg_if! {
        if #[cfg(feature = "cli")] {
            run_with_args();
        } else {
            let _guard = install_logging(false);
            start_duowall(ConfigLocation::resolve(None));
        }
    }
}

#[cfg(feature = "cli")]
fn run_with_args() {
    let args = cli::Args::parse();
    let _guard = install_logging(args.debug);

    let location = ConfigLocation::resolve(args.config);

    match args.command {
        Some(cli::Command::Show) => show(&location, args.format.unwrap_or_default()),
        Some(cli::Command::Apply { state }) => apply_once(&location, state),
        None => start_duowall(location),
    }
}

fn install_logging(debug: bool) -> Option<WorkerGuard> {
    match logging::install_logging(debug) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("Failed to install logging: {err:?}");
            None
        }
    }
}

fn start_duowall(location: ConfigLocation) {
    info!("duowall version {}", VERSION);

    let config = load_config(&location);
    let store = Rc::new(create_store(&config));
    let background = Rc::new(create_background(&config));

    let main_context = glib::MainContext::default();
    let Ok(_acquired) = main_context.acquire() else {
        error!("{}", error::ERR_MAIN_CONTEXT);
        exit(ExitCode::MainContext as i32);
    };
    let main_loop = glib::MainLoop::new(Some(&main_context), false);

    let client = block_on(Compositor::create_desktop_client()).unwrap_or_else(|err| {
        error!("{err:?}");
        exit(ExitCode::Compositor as i32);
    });

    let desktop = Desktop::new();
    let tracker = Rc::new(WorkspaceWindowTracker::new(
        desktop.clone(),
        store.clone(),
        background,
        TrackerOptions {
            skip_redundant_writes: config.skip_redundant_writes,
        },
    ));

    client.subscribe().recv_glib({
        let tracker = tracker.clone();
        let main_loop = main_loop.clone();

        move |update| match update {
            DesktopUpdate::Snapshot(snapshot) => desktop.apply(&snapshot),
            DesktopUpdate::Shutdown => {
                info!("Compositor exited, shutting down");
                tracker.disable();
                main_loop.quit();
            }
        }
    });

    tracker.enable();

    config::hot_reload::install(location, {
        let tracker = tracker.clone();
        let background_config = config.background;
        let skip_redundant_writes = config.skip_redundant_writes;

        move |config| {
            if config.background != background_config
                || config.skip_redundant_writes != skip_redundant_writes
            {
                warn!("Background settings changed, restart duowall to apply them");
            }

            match store.reload(&config) {
                Ok(true) => tracker.refresh(),
                Ok(false) => debug!("Wallpapers unchanged"),
                Err(err) => error!("{err:?}"),
            }
        }
    });

    let (tx, rx) = mpsc::channel(1);

    if let Err(err) = ctrlc::set_handler(move || tx.send_spawn(())) {
        error!("Failed to set Ctrl-C handler: {err}");
    }

    rx.recv_glib({
        let main_loop = main_loop.clone();

        move |()| {
            info!("Shutting down");
            tracker.disable();
            main_loop.quit();
        }
    });

    main_loop.run();
    debug!("Main loop exited");
}

/// Loads the config, falling back to the default if it cannot be loaded.
fn load_config(location: &ConfigLocation) -> Config {
    let config = location.load().unwrap_or_else(|err| {
        error!("{err:?}");
        warn!("Falling back to the default config");
        info!("Create a config in ~/.config/duowall/ to choose wallpapers");

        Config::default()
    });

    debug!("Loaded config: {config:?}");
    config
}

fn create_store(config: &Config) -> ConfigStore {
    ConfigStore::new(config).unwrap_or_else(|err| {
        error!("{err:?}");
        exit(ExitCode::Config as i32);
    })
}

fn create_background(config: &Config) -> Background {
    Background::from_config(&config.background).unwrap_or_else(|err| {
        error!("{err:?}");
        exit(ExitCode::Background as i32);
    })
}

#[cfg(feature = "cli")]
fn load_wallpapers(config: &Config) -> Wallpapers {
    Wallpapers::from_config(config).unwrap_or_else(|err| {
        error!("{err:?}");
        exit(ExitCode::Config as i32);
    })
}

#[cfg(feature = "cli")]
fn show(location: &ConfigLocation, format: cli::Format) {
    use cli::{Status, WallpaperKey, WallpaperStatus};
    use config::wallpaper_basename;

    let config = load_config(location);
    let Wallpapers {
        no_windows,
        with_windows,
    } = load_wallpapers(&config);

    let status = Status {
        wallpapers: [
            (WallpaperKey::NoWindows, no_windows),
            (WallpaperKey::WithWindows, with_windows),
        ]
        .into_iter()
        .map(|(key, uri)| WallpaperStatus {
            key,
            basename: wallpaper_basename(&uri),
            uri,
        })
        .collect(),
        background: config.background.target(),
        skip_redundant_writes: config.skip_redundant_writes,
    };

    cli::print_status(&status, format);
}

#[cfg(feature = "cli")]
fn apply_once(location: &ConfigLocation, key: cli::WallpaperKey) {
    let config = load_config(location);
    let wallpapers = load_wallpapers(&config);
    let background = create_background(&config);

    let uri = match key {
        cli::WallpaperKey::NoWindows => wallpapers.no_windows,
        cli::WallpaperKey::WithWindows => wallpapers.with_windows,
    };

    if uri.is_empty() {
        warn!("No wallpaper configured for {key:?}");
        return;
    }

    background.apply(&uri);

    // gsettings writes are queued until the main context runs, so flush before exiting
    gio::Settings::sync();
    info!("Applied {uri}");
}
