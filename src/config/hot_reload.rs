use super::{Config, ConfigLocation};
use crate::channels::{AsyncSenderExt, GlibReceiverExt};
use crate::spawn;
use notify::{Event, EventKind, Result, Watcher, recommended_watcher};
use tracing::{debug, error, info};

/// Watches the config file for changes,
/// calling `on_change` on the main context with each successfully reloaded config.
///
/// A config that fails to load is logged and skipped.
pub fn install<F>(location: ConfigLocation, mut on_change: F)
where
    F: FnMut(Config) + 'static,
{
    let Some((dir_path, stem)) = location.watch_target() else {
        error!("failed to resolve config directory, hot reloading disabled");
        return;
    };

    let (tx, rx) = tokio::sync::mpsc::channel(8);

    spawn(async move {
        let is_conf_change = move |event: &Event| {
            event
                .paths
                .first()
                .is_some_and(|p| p.file_stem() == Some(stem.as_os_str()))
                && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        };

        let watcher = recommended_watcher(move |res: Result<Event>| match res {
            Ok(event) if is_conf_change(&event) => {
                tx.send_spawn(());
            }
            Ok(_) => {}
            Err(err) => error!("{err:?}"),
        });

        let Ok(mut watcher) = watcher else {
            error!("failed to start config watcher");
            return;
        };

        if let Err(err) = watcher.watch(&dir_path, notify::RecursiveMode::NonRecursive) {
            error!("{err:?}");
            return;
        }

        debug!("Watching {} for config changes", dir_path.display());

        // avoid watcher from dropping
        loop {
            tokio::time::sleep(core::time::Duration::from_secs(1)).await;
        }
    });

    rx.recv_glib(move |()| match location.load() {
        Ok(config) => {
            info!("Reloaded config");
            on_change(config);
        }
        Err(err) => error!("{err:?}"),
    });
}
